//! External state containers.
//!
//! A [`State`] owns one value that lives outside any component tree. It is
//! mutated imperatively through [`dispatch`] and notifies two independent
//! callback sets on every dispatch: subscribers first, effects second.

mod config;
mod state;
mod update;

pub use config::{PanicPolicy, Reentrancy, StateConfig, DEFAULT_MAX_DEFERRED_PASSES};
pub use state::{create_state, create_state_with, dispatch, State, StateId};
pub use update::Update;
