//! # libstate
//!
//! External mutable state for UI rendering frameworks.
//!
//! State lives outside any component tree, is mutated imperatively and still
//! drives re-renders through the subscribe/snapshot contract that
//! external-store synchronization hooks expect.
//!
//! ## State containers
//!
//! - [`State<T>`] - owns one value plus subscriber and effect sets
//! - [`dispatch`] - compute, store, notify subscribers, then run effects
//! - [`create_effect`] - side effects keyed to one or more containers
//!
//! ## Rendering integration
//!
//! - [`StoreAdapter<T>`] - `subscribe` / `get_snapshot` / `dispatch` bridge
//! - [`use_lib_state`] - hook-shaped entry point over any
//!   [`SyncExternalStoreHost`]
//!
//! ```
//! use libstate::{create_effect, create_state, dispatch};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let count = create_state(0);
//! let changes = Arc::new(AtomicUsize::new(0));
//!
//! let changes_clone = changes.clone();
//! let disposer = create_effect(
//!     move || {
//!         changes_clone.fetch_add(1, Ordering::SeqCst);
//!     },
//!     &[&count],
//! );
//!
//! dispatch(&count, |n| n + 1);
//! assert_eq!(count.get(), 1);
//! assert_eq!(changes.load(Ordering::SeqCst), 1);
//!
//! disposer.dispose();
//! ```

pub mod effect;
pub mod error;
pub mod external;
pub mod runtime;
pub mod state;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

// Re-export main types for convenience
pub use effect::{bind_effect, create_effect, EffectSource};
pub use error::DispatchError;
pub use external::{use_lib_state, ExternalStore, StoreAdapter, SyncExternalStoreHost};
pub use runtime::{Callback, CallbackId, CallbackKind, DisposeGuard, Disposer};
pub use state::{
    create_state, create_state_with, dispatch, PanicPolicy, Reentrancy, State, StateConfig,
    StateId, Update,
};
