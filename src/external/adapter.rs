use crate::error::DispatchError;
use crate::runtime::{Callback, CallbackKind, Disposer};
use crate::state::{State, Update};

/// The snapshot/subscribe contract a rendering framework's synchronization
/// primitive consumes.
pub trait ExternalStore {
    type Snapshot;

    /// Register `on_store_change`, to be called after every change. The
    /// returned [`Disposer`] is the matching unsubscribe.
    fn subscribe(&self, on_store_change: Callback) -> Disposer;

    /// The current value.
    fn get_snapshot(&self) -> Self::Snapshot;

    /// The value used for server rendering and hydration.
    fn get_server_snapshot(&self) -> Self::Snapshot {
        self.get_snapshot()
    }
}

/// Bridges a [`State`] to the [`ExternalStore`] contract and adds a
/// caller-facing [`dispatch`](StoreAdapter::dispatch).
///
/// Holds nothing but a handle to the container, so it is cheap to create per
/// rendering subscription.
#[derive(Debug)]
pub struct StoreAdapter<T> {
    state: State<T>,
}

impl<T> Clone for StoreAdapter<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> StoreAdapter<T> {
    pub fn new(state: &State<T>) -> Self {
        Self {
            state: state.clone(),
        }
    }

    /// The bridged container.
    pub fn state(&self) -> &State<T> {
        &self.state
    }

    /// Commit a replacement value or apply an updater, then notify
    /// subscribers, then run effects.
    ///
    /// A plain `T` converts into [`Update::Replace`]. The next
    /// [`get_snapshot`](ExternalStore::get_snapshot) returns the committed
    /// value.
    pub fn dispatch(&self, update: impl Into<Update<T>>) {
        self.state.dispatch_update(update.into());
    }

    /// Fallible form of [`dispatch`](StoreAdapter::dispatch).
    pub fn try_dispatch(&self, update: impl Into<Update<T>>) -> Result<(), DispatchError> {
        self.state.try_dispatch_update(update.into())
    }
}

impl<T: Clone + Send + Sync + 'static> From<&State<T>> for StoreAdapter<T> {
    fn from(state: &State<T>) -> Self {
        Self::new(state)
    }
}

impl<T: Clone + Send + Sync + 'static> ExternalStore for StoreAdapter<T> {
    type Snapshot = T;

    fn subscribe(&self, on_store_change: Callback) -> Disposer {
        let id = on_store_change.id();
        self.state.add_subscriber(&on_store_change);
        tracing::debug!(state = self.state.label(), callback = %id, "store subscribed");
        Disposer::new(id, CallbackKind::Subscriber, vec![self.state.detach_handle()])
    }

    fn get_snapshot(&self) -> T {
        self.state.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_state;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, Callback) {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let callback = Callback::new(move || {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });
        (hits, callback)
    }

    #[test]
    fn snapshot_passes_through() {
        let state = create_state(vec![1, 2]);
        let adapter = StoreAdapter::new(&state);

        assert_eq!(adapter.get_snapshot(), vec![1, 2]);
        assert_eq!(adapter.get_server_snapshot(), vec![1, 2]);

        state.set(vec![3]);
        assert_eq!(adapter.get_snapshot(), vec![3]);
    }

    #[test]
    fn dispatch_literal_and_updater() {
        let state = create_state(String::from("a"));
        let adapter = StoreAdapter::from(&state);

        adapter.dispatch(String::from("b"));
        assert_eq!(adapter.get_snapshot(), "b");

        adapter.dispatch(Update::apply(|s: String| s + "c"));
        assert_eq!(adapter.get_snapshot(), "bc");
    }

    #[test]
    fn subscribe_and_unsubscribe() {
        let state = create_state(0);
        let adapter = StoreAdapter::new(&state);
        let (hits, on_change) = counter();

        let unsubscribe = adapter.subscribe(on_change);
        assert_eq!(state.subscriber_count(), 1);

        adapter.dispatch(1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        unsubscribe.dispose();
        unsubscribe.dispose();
        adapter.dispatch(2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(state.subscriber_count(), 0);
    }

    #[test]
    fn snapshot_is_fresh_inside_notification() {
        let state = create_state(0);
        let adapter = StoreAdapter::new(&state);
        let observed = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let reader = adapter.clone();
        let sink = observed.clone();
        let _unsubscribe = adapter.subscribe(Callback::new(move || {
            sink.lock().push(reader.get_snapshot());
        }));

        for value in 1..=3 {
            adapter.dispatch(value);
            assert_eq!(adapter.get_snapshot(), value);
        }
        assert_eq!(*observed.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn adapter_dispatch_runs_effects_after_subscribers() {
        let state = create_state(0);
        let adapter = StoreAdapter::new(&state);
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let effect_order = order.clone();
        let _effect = crate::effect::create_effect(move || effect_order.lock().push("effect"), &[&state]);
        let subscriber_order = order.clone();
        let _unsubscribe = adapter.subscribe(Callback::new(move || {
            subscriber_order.lock().push("subscriber");
        }));

        adapter.dispatch(Update::apply(|n: i32| n + 1));

        assert_eq!(*order.lock(), vec!["subscriber", "effect"]);
    }

    #[test]
    fn try_dispatch_reports_updater_failure() {
        let state = create_state(3);
        let adapter = StoreAdapter::new(&state);

        let result = adapter.try_dispatch(Update::apply(|_: i32| -> i32 { panic!("nope") }));

        assert!(matches!(result, Err(DispatchError::UpdaterPanicked { .. })));
        assert_eq!(adapter.get_snapshot(), 3);
    }
}
