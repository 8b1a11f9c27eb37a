use super::callback::{CallbackId, CallbackKind};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A registration target that can drop a callback again.
///
/// Implemented by every state container; a [`Disposer`] keeps one of these
/// per container it registered on.
pub trait Detach: Send + Sync {
    /// Remove `id` from the set selected by `kind`. Returns `true` if it was
    /// present.
    fn detach(&self, kind: CallbackKind, id: CallbackId) -> bool;
}

struct DisposerInner {
    id: CallbackId,
    kind: CallbackKind,
    targets: Vec<Arc<dyn Detach>>,
    disposed: AtomicBool,
}

/// Undoes a registration: an effect binding or a store subscription.
///
/// Calling [`dispose`](Disposer::dispose) removes the callback from every
/// container it was registered on. Further calls are no-ops. Clones share the
/// same registration.
///
/// Dropping a `Disposer` does **not** dispose; use
/// [`into_guard`](Disposer::into_guard) for that.
#[derive(Clone)]
pub struct Disposer {
    inner: Arc<DisposerInner>,
}

impl Disposer {
    pub(crate) fn new(id: CallbackId, kind: CallbackKind, targets: Vec<Arc<dyn Detach>>) -> Self {
        Self {
            inner: Arc::new(DisposerInner {
                id,
                kind,
                targets,
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Remove the registration from every container it was made on.
    pub fn dispose(&self) {
        let inner = &self.inner;
        if inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let removed = inner
            .targets
            .iter()
            .filter(|target| target.detach(inner.kind, inner.id))
            .count();

        tracing::debug!(
            callback = %inner.id,
            kind = %inner.kind,
            targets = inner.targets.len(),
            removed,
            "registration disposed"
        );
    }

    /// Whether [`dispose`](Disposer::dispose) has been called on this
    /// registration.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Id of the registered callback.
    pub fn callback_id(&self) -> CallbackId {
        self.inner.id
    }

    /// Which callback set the registration lives in.
    pub fn kind(&self) -> CallbackKind {
        self.inner.kind
    }

    /// Number of containers the registration was made on.
    pub fn target_count(&self) -> usize {
        self.inner.targets.len()
    }

    /// Convert into a guard that disposes when dropped.
    pub fn into_guard(self) -> DisposeGuard {
        DisposeGuard { disposer: self }
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("callback", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("targets", &self.inner.targets.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// RAII guard for a [`Disposer`].
#[derive(Debug)]
pub struct DisposeGuard {
    disposer: Disposer,
}

impl DisposeGuard {
    /// The guarded registration.
    pub fn disposer(&self) -> &Disposer {
        &self.disposer
    }
}

impl Drop for DisposeGuard {
    fn drop(&mut self) {
        self.disposer.dispose();
    }
}
