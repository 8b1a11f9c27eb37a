use indexmap::IndexMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

static NEXT_CALLBACK_ID: AtomicUsize = AtomicUsize::new(0);

/// Process-unique identity of a [`Callback`].
///
/// Closures carry no identity of their own, so set membership for
/// subscribers and effects is keyed by this id instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(usize);

impl CallbackId {
    fn next() -> Self {
        Self(NEXT_CALLBACK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cb#{}", self.0)
    }
}

/// A zero-argument notification callback with a stable identity.
///
/// Cloning a `Callback` keeps its id, so registering a clone on a container
/// that already holds the original is a no-op.
///
/// # Examples
///
/// ```
/// use libstate::{create_state, Callback};
///
/// let state = create_state(0);
/// let callback = Callback::new(|| {});
///
/// assert!(state.add_effect(&callback));
/// assert!(!state.add_effect(&callback.clone()));
/// assert_eq!(state.effect_count(), 1);
/// ```
#[derive(Clone)]
pub struct Callback {
    id: CallbackId,
    run: Arc<dyn Fn() + Send + Sync>,
}

impl Callback {
    /// Wrap a closure, allocating a fresh id.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            id: CallbackId::next(),
            run: Arc::new(f),
        }
    }

    /// The identity used for set membership.
    pub fn id(&self) -> CallbackId {
        self.id
    }

    /// Invoke the wrapped closure.
    pub fn call(&self) {
        (self.run)();
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").field("id", &self.id).finish()
    }
}

/// Which of a container's two callback sets a registration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    /// Render-triggering callback, notified first.
    Subscriber,
    /// Side-effect callback, run after all subscribers.
    Effect,
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackKind::Subscriber => f.write_str("subscriber"),
            CallbackKind::Effect => f.write_str("effect"),
        }
    }
}

/// Insertion-ordered set of callbacks keyed by id.
#[derive(Default)]
pub(crate) struct CallbackSet {
    entries: IndexMap<CallbackId, Callback>,
}

impl CallbackSet {
    /// Returns `true` if the callback was not already present.
    pub(crate) fn insert(&mut self, callback: &Callback) -> bool {
        if self.entries.contains_key(&callback.id) {
            return false;
        }
        self.entries.insert(callback.id, callback.clone());
        true
    }

    /// Returns `true` if the callback was present.
    pub(crate) fn remove(&mut self, id: CallbackId) -> bool {
        self.entries.shift_remove(&id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Copy out the current members so they can be invoked without holding
    /// the lock that guards the set.
    pub(crate) fn snapshot(&self) -> Vec<Callback> {
        self.entries.values().cloned().collect()
    }
}
