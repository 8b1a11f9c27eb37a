use super::adapter::{ExternalStore, StoreAdapter};
use crate::state::State;

/// A rendering runtime's external-store synchronization primitive.
///
/// The core never renders anything. A host subscribes to the store, reads
/// the snapshot for the current render and schedules a re-render when the
/// store reports a change.
pub trait SyncExternalStoreHost {
    fn use_sync_external_store<S>(&mut self, store: &S) -> S::Snapshot
    where
        S: ExternalStore;
}

/// Read `state` inside a render of `host` and get a dispatcher for it.
///
/// Returns the snapshot seen by this render together with the
/// [`StoreAdapter`] used to mutate the container.
pub fn use_lib_state<H, T>(host: &mut H, state: &State<T>) -> (T, StoreAdapter<T>)
where
    H: SyncExternalStoreHost,
    T: Clone + Send + Sync + 'static,
{
    let adapter = StoreAdapter::new(state);
    let snapshot = host.use_sync_external_store(&adapter);
    (snapshot, adapter)
}
