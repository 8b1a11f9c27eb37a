use crate::runtime::{Callback, CallbackKind, Detach, Disposer};
use crate::state::State;
use std::sync::Arc;

/// Something an effect can be keyed to.
///
/// Implemented by every [`State`], so one effect may depend on containers
/// holding different value types.
pub trait EffectSource {
    /// Register `effect` and return the handle used to remove it again.
    fn attach_effect(&self, effect: &Callback) -> Arc<dyn Detach>;
}

impl<T: Clone + Send + Sync + 'static> EffectSource for State<T> {
    fn attach_effect(&self, effect: &Callback) -> Arc<dyn Detach> {
        self.add_effect(effect);
        self.detach_handle()
    }
}

/// Bind a side effect to one or more containers.
///
/// The effect runs once per dispatch on *any* dependency, after that
/// container's subscribers. It takes no arguments; read state through the
/// captured handles. Nothing runs at creation time.
///
/// The returned [`Disposer`] removes the effect from every dependency. An
/// empty dependency list yields an effect that never fires.
///
/// # Examples
///
/// ```
/// use libstate::{create_effect, create_state};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let name = create_state("a");
/// let count = create_state(0);
/// let runs = Arc::new(AtomicUsize::new(0));
///
/// let runs_clone = runs.clone();
/// let disposer = create_effect(
///     move || {
///         runs_clone.fetch_add(1, Ordering::SeqCst);
///     },
///     &[&name, &count],
/// );
///
/// name.dispatch(|_| "b");
/// count.dispatch(|n| n + 1);
/// assert_eq!(runs.load(Ordering::SeqCst), 2);
///
/// disposer.dispose();
/// count.dispatch(|n| n + 1);
/// assert_eq!(runs.load(Ordering::SeqCst), 2);
/// ```
pub fn create_effect<F>(effect: F, dependencies: &[&dyn EffectSource]) -> Disposer
where
    F: Fn() + Send + Sync + 'static,
{
    bind_effect(&Callback::new(effect), dependencies)
}

/// Bind an existing [`Callback`] as an effect.
///
/// Binding the same callback to a container twice registers it once.
pub fn bind_effect(effect: &Callback, dependencies: &[&dyn EffectSource]) -> Disposer {
    let targets: Vec<_> = dependencies
        .iter()
        .map(|dependency| dependency.attach_effect(effect))
        .collect();

    tracing::debug!(
        callback = %effect.id(),
        dependencies = targets.len(),
        "effect bound"
    );
    Disposer::new(effect.id(), CallbackKind::Effect, targets)
}
