//! Runtime support for state containers.
//!
//! This module provides the callback identity model, the disposer handles
//! returned by every registration, and the per-container notification cycle
//! that serializes dispatches and isolates callback panics.

mod callback;
mod context;
mod disposer;

pub use callback::{Callback, CallbackId, CallbackKind};
pub use disposer::{Detach, DisposeGuard, Disposer};

pub(crate) use callback::CallbackSet;
pub(crate) use context::{invoke_callbacks, panic_message, CyclePolicy, NotifyCycle};
