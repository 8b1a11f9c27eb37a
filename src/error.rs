//! Failures surfaced by the dispatch protocol.

use crate::runtime::{CallbackId, CallbackKind};

/// Error returned by the `try_*` dispatch entry points.
///
/// `State::dispatch` and friends panic with this value as the payload
/// instead of returning it, so it can be recovered with
/// `payload.downcast_ref::<DispatchError>()`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The updater panicked. The value was left unchanged and no callback ran.
    #[error("updater for {state} panicked: {message}")]
    UpdaterPanicked { state: String, message: String },

    /// A callback panicked under `PanicPolicy::Propagate`. The new value was
    /// committed; the callbacks after the failing one did not run.
    #[error("{kind} {id} of {state} panicked: {message}")]
    CallbackPanicked {
        state: String,
        kind: CallbackKind,
        id: CallbackId,
        message: String,
    },

    /// Re-entrant dispatches kept scheduling each other past the configured
    /// bound. The remaining queued updates were dropped.
    #[error("{state} exceeded {limit} deferred dispatch passes, dropped {dropped} queued updates")]
    DeferredOverflow {
        state: String,
        limit: usize,
        dropped: usize,
    },
}

impl DispatchError {
    /// Label of the container the failure happened on.
    pub fn state(&self) -> &str {
        match self {
            DispatchError::UpdaterPanicked { state, .. }
            | DispatchError::CallbackPanicked { state, .. }
            | DispatchError::DeferredOverflow { state, .. } => state,
        }
    }
}
