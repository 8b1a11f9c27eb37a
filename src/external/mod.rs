//! Bindings for rendering frameworks.
//!
//! [`StoreAdapter`] exposes a [`State`](crate::State) through the
//! subscribe/snapshot contract of an external-store synchronization hook,
//! and [`use_lib_state`] wires it into any [`SyncExternalStoreHost`].

mod adapter;
mod hook;

pub use adapter::{ExternalStore, StoreAdapter};
pub use hook::{use_lib_state, SyncExternalStoreHost};
