use std::fmt;

type Updater<T> = Box<dyn FnOnce(T) -> T + Send>;

/// The argument of a dispatch: a literal replacement or an updater.
///
/// A plain value converts into [`Update::Replace`]:
///
/// ```
/// use libstate::{create_state, StoreAdapter, Update};
///
/// let state = create_state(1);
/// let adapter = StoreAdapter::new(&state);
///
/// adapter.dispatch(5);
/// adapter.dispatch(Update::apply(|n: i32| n * 2));
/// assert_eq!(state.get(), 10);
/// ```
pub enum Update<T> {
    /// Adopt the value verbatim.
    Replace(T),
    /// Compute the next value from the current one.
    Apply(Updater<T>),
}

impl<T> Update<T> {
    /// Literal replacement, same as `Update::from(value)`.
    pub fn replace(value: T) -> Self {
        Update::Replace(value)
    }

    /// Updater computing the next value from the current one.
    pub fn apply<F>(f: F) -> Self
    where
        F: FnOnce(T) -> T + Send + 'static,
    {
        Update::Apply(Box::new(f))
    }

    /// Produce the value to commit. `current` is only read for updaters.
    pub(crate) fn resolve(self, current: impl FnOnce() -> T) -> T {
        match self {
            Update::Replace(value) => value,
            Update::Apply(f) => f(current()),
        }
    }
}

impl<T> From<T> for Update<T> {
    fn from(value: T) -> Self {
        Update::Replace(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Update<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Replace(value) => f.debug_tuple("Replace").field(value).finish(),
            Update::Apply(_) => f.write_str("Apply(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_ignores_current() {
        let update = Update::from(3);
        assert_eq!(update.resolve(|| unreachable!()), 3);
    }

    #[test]
    fn apply_reads_current() {
        let update = Update::apply(|n: i32| n + 1);
        assert_eq!(update.resolve(|| 41), 42);
    }

    #[test]
    fn debug_hides_updater() {
        assert_eq!(format!("{:?}", Update::replace("a")), r#"Replace("a")"#);
        assert_eq!(format!("{:?}", Update::<i32>::apply(|n| n)), "Apply(..)");
    }
}
