use crate::external::{ExternalStore, SyncExternalStoreHost};
use crate::runtime::{Callback, Disposer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// An in-process rendering host.
///
/// Behaves like a single component: each [`render`](RenderHarness::render)
/// subscribes to the stores it reads and releases the subscriptions of the
/// previous render once it finishes. Store changes are counted as pending
/// re-render requests until the next render.
///
/// # Examples
///
/// ```
/// use libstate::testing::RenderHarness;
/// use libstate::{create_state, use_lib_state};
///
/// let state = create_state(0);
/// let mut harness = RenderHarness::new();
///
/// let (count, set_count) = harness.render(|host| use_lib_state(host, &state));
/// assert_eq!(count, 0);
///
/// set_count.dispatch(count + 1);
/// assert!(harness.needs_render());
///
/// let (count, _) = harness.render(|host| use_lib_state(host, &state));
/// assert_eq!(count, 1);
/// ```
pub struct RenderHarness {
    on_store_change: Callback,
    pending: Arc<AtomicUsize>,
    subscriptions: Vec<Disposer>,
    renders: usize,
}

impl RenderHarness {
    pub fn new() -> Self {
        let pending = Arc::new(AtomicUsize::new(0));
        Self {
            on_store_change: Self::change_callback(&pending),
            pending,
            subscriptions: Vec::new(),
            renders: 0,
        }
    }

    // Each render gets a fresh identity so releasing the previous render's
    // subscriptions cannot remove the new ones, and a fresh counter so those
    // subscriptions stop counting as soon as the render starts.
    fn change_callback(pending: &Arc<AtomicUsize>) -> Callback {
        let pending = Arc::clone(pending);
        Callback::new(move || {
            pending.fetch_add(1, Ordering::SeqCst);
        })
    }

    /// Run one render of `component`.
    pub fn render<R>(&mut self, component: impl FnOnce(&mut Self) -> R) -> R {
        let previous = std::mem::take(&mut self.subscriptions);
        self.pending = Arc::new(AtomicUsize::new(0));
        self.on_store_change = Self::change_callback(&self.pending);

        let output = component(self);

        for subscription in previous {
            subscription.dispose();
        }
        self.renders += 1;
        tracing::trace!(
            renders = self.renders,
            subscriptions = self.subscriptions.len(),
            "harness rendered"
        );
        output
    }

    /// Store changes observed since the last render started.
    pub fn pending_renders(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn needs_render(&self) -> bool {
        self.pending_renders() > 0
    }

    /// Completed renders.
    pub fn renders(&self) -> usize {
        self.renders
    }

    /// Live subscriptions held by the most recent render.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Release every subscription.
    pub fn unmount(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            subscription.dispose();
        }
        self.pending.store(0, Ordering::SeqCst);
    }
}

impl Default for RenderHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RenderHarness {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl SyncExternalStoreHost for RenderHarness {
    fn use_sync_external_store<S>(&mut self, store: &S) -> S::Snapshot
    where
        S: ExternalStore,
    {
        let subscription = store.subscribe(self.on_store_change.clone());
        self.subscriptions.push(subscription);
        store.get_snapshot()
    }
}
