/// Default bound on deferred passes drained after one top-level dispatch.
pub const DEFAULT_MAX_DEFERRED_PASSES: usize = 100;

/// What happens when a subscriber or effect panics during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum PanicPolicy {
    /// Log the panic and keep notifying the remaining callbacks.
    #[default]
    Isolate,
    /// Stop the pass and surface the failure to the dispatcher.
    ///
    /// Only the dispatcher's own pass reports back. Passes that were queued
    /// (re-entrant dispatches, or dispatches from other threads) already
    /// returned `Ok(())` to their callers, so their failures are logged.
    Propagate,
}

/// How a dispatch issued from inside a notification pass of the same
/// container is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Reentrancy {
    /// Queue it and run it as its own pass once the current pass finishes.
    #[default]
    Defer,
    /// Run it immediately, nested inside the current pass.
    Nested,
}

/// Per-container configuration.
///
/// # Examples
///
/// ```
/// use libstate::{create_state_with, PanicPolicy, StateConfig};
///
/// let config = StateConfig::default()
///     .with_label("user")
///     .with_panic_policy(PanicPolicy::Propagate);
/// let state = create_state_with(0, config);
///
/// assert_eq!(state.label(), "user");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct StateConfig {
    /// Name used in logs and errors. Defaults to `state#<id>`.
    pub label: Option<String>,
    pub panic_policy: PanicPolicy,
    pub reentrancy: Reentrancy,
    /// Deferred passes allowed per top-level dispatch before the queue is
    /// dropped.
    pub max_deferred_passes: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            label: None,
            panic_policy: PanicPolicy::default(),
            reentrancy: Reentrancy::default(),
            max_deferred_passes: DEFAULT_MAX_DEFERRED_PASSES,
        }
    }
}

impl StateConfig {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_panic_policy(mut self, policy: PanicPolicy) -> Self {
        self.panic_policy = policy;
        self
    }

    pub fn with_reentrancy(mut self, reentrancy: Reentrancy) -> Self {
        self.reentrancy = reentrancy;
        self
    }

    pub fn with_max_deferred_passes(mut self, limit: usize) -> Self {
        self.max_deferred_passes = limit;
        self
    }
}
