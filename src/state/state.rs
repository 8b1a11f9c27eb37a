use super::config::StateConfig;
use super::update::Update;
use crate::error::DispatchError;
use crate::runtime::{
    invoke_callbacks, panic_message, Callback, CallbackId, CallbackKind, CallbackSet,
    CyclePolicy, Detach, NotifyCycle,
};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

static NEXT_STATE_ID: AtomicUsize = AtomicUsize::new(0);

/// Process-unique identity of a state container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(usize);

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "state#{}", self.0)
    }
}

struct Inner<T> {
    id: StateId,
    label: String,
    config: StateConfig,
    value: RwLock<T>,
    subscribers: Mutex<CallbackSet>,
    effects: Mutex<CallbackSet>,
    cycle: NotifyCycle<Update<T>>,
}

impl<T: Send + Sync> Detach for Inner<T> {
    fn detach(&self, kind: CallbackKind, id: CallbackId) -> bool {
        match kind {
            CallbackKind::Subscriber => self.subscribers.lock().remove(id),
            CallbackKind::Effect => self.effects.lock().remove(id),
        }
    }
}

/// An external mutable state container.
///
/// Holds one value plus two independent callback sets: subscribers (render
/// triggers) and effects (side effects). Mutating through
/// [`dispatch`](State::dispatch) stores the new value, then notifies every
/// subscriber, then runs every effect. [`set`](State::set) alone never
/// notifies.
///
/// `State` is a handle; clones share the same container.
///
/// # Examples
///
/// ```
/// use libstate::{create_state, Callback};
/// use std::sync::{Arc, Mutex};
///
/// let state = create_state(1);
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// let reader = state.clone();
/// let sink = seen.clone();
/// state.add_subscriber(&Callback::new(move || sink.lock().unwrap().push(reader.get())));
///
/// state.dispatch(|n| n + 1);
/// state.set(10); // no notification
/// state.dispatch(|n| n * 2);
///
/// assert_eq!(*seen.lock().unwrap(), vec![2, 20]);
/// ```
pub struct State<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("label", &self.inner.label)
            .field("value", &*self.inner.value.read())
            .field("subscribers", &self.inner.subscribers.lock().len())
            .field("effects", &self.inner.effects.lock().len())
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> State<T> {
    /// Create a container holding `initial` with the default configuration.
    pub fn new(initial: T) -> Self {
        Self::with_config(initial, StateConfig::default())
    }

    /// Create a container holding `initial`.
    pub fn with_config(initial: T, config: StateConfig) -> Self {
        let id = StateId(NEXT_STATE_ID.fetch_add(1, Ordering::Relaxed));
        let label = config.label.clone().unwrap_or_else(|| id.to_string());
        tracing::trace!(state = %label, "state created");

        Self {
            inner: Arc::new(Inner {
                id,
                label,
                config,
                value: RwLock::new(initial),
                subscribers: Mutex::new(CallbackSet::default()),
                effects: Mutex::new(CallbackSet::default()),
                cycle: NotifyCycle::new(),
            }),
        }
    }

    /// Identity of the underlying container, shared by all clones.
    pub fn id(&self) -> StateId {
        self.inner.id
    }

    /// Name used in logs and errors.
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Configuration the container was created with.
    pub fn config(&self) -> &StateConfig {
        &self.inner.config
    }

    /// Get a clone of the current value. Never notifies.
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Read the current value without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.inner.value.read())
    }

    /// Replace the value without notifying anyone.
    ///
    /// This is the low-level primitive the dispatch protocol is built on;
    /// use [`dispatch`](State::dispatch) or [`replace`](State::replace) to
    /// mutate and notify.
    pub fn set(&self, value: T) {
        *self.inner.value.write() = value;
    }

    /// Add a subscriber. Returns `false` if it was already registered.
    pub fn add_subscriber(&self, subscriber: &Callback) -> bool {
        self.inner.subscribers.lock().insert(subscriber)
    }

    /// Remove a subscriber. Returns `false` if it was not registered.
    pub fn remove_subscriber(&self, id: CallbackId) -> bool {
        self.inner.subscribers.lock().remove(id)
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    /// Add an effect. Returns `false` if it was already registered.
    pub fn add_effect(&self, effect: &Callback) -> bool {
        self.inner.effects.lock().insert(effect)
    }

    /// Remove an effect. Returns `false` if it was not registered.
    pub fn remove_effect(&self, id: CallbackId) -> bool {
        self.inner.effects.lock().remove(id)
    }

    /// Number of registered effects.
    pub fn effect_count(&self) -> usize {
        self.inner.effects.lock().len()
    }

    /// Invoke every registered subscriber once, in registration order.
    ///
    /// # Panics
    ///
    /// Under `PanicPolicy::Propagate`, panics with a [`DispatchError`] if a
    /// subscriber panics.
    pub fn update_subscribers(&self) {
        if let Err(err) = self.notify(CallbackKind::Subscriber) {
            panic::panic_any(err);
        }
    }

    /// Invoke every registered effect once, in registration order.
    ///
    /// # Panics
    ///
    /// Under `PanicPolicy::Propagate`, panics with a [`DispatchError`] if an
    /// effect panics.
    pub fn run_effects(&self) {
        if let Err(err) = self.notify(CallbackKind::Effect) {
            panic::panic_any(err);
        }
    }

    /// Replace the value with `updater(current)`, then notify subscribers,
    /// then run effects.
    ///
    /// # Panics
    ///
    /// Panics with a [`DispatchError`] payload if the updater panics (the
    /// value is left unchanged), or if a callback panics under
    /// `PanicPolicy::Propagate`. Use [`try_dispatch`](State::try_dispatch)
    /// to get the error instead.
    pub fn dispatch<F>(&self, updater: F)
    where
        F: FnOnce(T) -> T + Send + 'static,
    {
        self.dispatch_update(Update::apply(updater));
    }

    /// Fallible form of [`dispatch`](State::dispatch).
    pub fn try_dispatch<F>(&self, updater: F) -> Result<(), DispatchError>
    where
        F: FnOnce(T) -> T + Send + 'static,
    {
        self.try_dispatch_update(Update::apply(updater))
    }

    /// Adopt `value` verbatim through the full dispatch protocol.
    pub fn replace(&self, value: T) {
        self.dispatch_update(Update::Replace(value));
    }

    /// Mutate the value in place through the full dispatch protocol.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        self.dispatch(move |mut value| {
            f(&mut value);
            value
        });
    }

    /// Dispatch either form of [`Update`].
    ///
    /// A [`DispatchError::DeferredOverflow`] is only logged here; other
    /// failures panic as described on [`dispatch`](State::dispatch).
    pub fn dispatch_update(&self, update: Update<T>) {
        match self.try_dispatch_update(update) {
            Ok(()) | Err(DispatchError::DeferredOverflow { .. }) => {}
            Err(err) => panic::panic_any(err),
        }
    }

    /// Dispatch either form of [`Update`], returning failures.
    ///
    /// If this is called from inside a notification pass of the same
    /// container and the container defers re-entrant dispatches, the update
    /// is queued and `Ok(())` is returned immediately; it is applied once the
    /// running pass completes.
    ///
    /// If another thread is running a pass on this container, the update is
    /// queued behind it and `Ok(())` is returned. That thread applies it
    /// before its own dispatch returns and logs any failure.
    pub fn try_dispatch_update(&self, update: Update<T>) -> Result<(), DispatchError> {
        let inner = &self.inner;
        let policy = CyclePolicy {
            label: &inner.label,
            reentrancy: inner.config.reentrancy,
            max_deferred_passes: inner.config.max_deferred_passes,
        };
        inner.cycle.run(update, policy, |next| self.commit(next))
    }

    /// One full pass: compute, store, notify subscribers, run effects.
    fn commit(&self, update: Update<T>) -> Result<(), DispatchError> {
        let next = panic::catch_unwind(AssertUnwindSafe(|| update.resolve(|| self.get())))
            .map_err(|payload| DispatchError::UpdaterPanicked {
                state: self.inner.label.clone(),
                message: panic_message(payload.as_ref()),
            })?;

        self.set(next);
        tracing::trace!(
            state = %self.inner.label,
            subscribers = self.subscriber_count(),
            effects = self.effect_count(),
            "dispatch committed"
        );

        self.notify(CallbackKind::Subscriber)?;
        self.notify(CallbackKind::Effect)
    }

    fn notify(&self, kind: CallbackKind) -> Result<(), DispatchError> {
        // Snapshot first so callbacks may (un)register without deadlocking.
        let callbacks = match kind {
            CallbackKind::Subscriber => self.inner.subscribers.lock().snapshot(),
            CallbackKind::Effect => self.inner.effects.lock().snapshot(),
        };
        invoke_callbacks(
            &self.inner.label,
            kind,
            &callbacks,
            self.inner.config.panic_policy,
        )
    }

    /// Handle that removes callbacks from this container.
    pub(crate) fn detach_handle(&self) -> Arc<dyn Detach> {
        self.inner.clone()
    }
}

/// Create a state container holding `initial`.
pub fn create_state<T>(initial: T) -> State<T>
where
    T: Clone + Send + Sync + 'static,
{
    State::new(initial)
}

/// Create a state container with an explicit configuration.
pub fn create_state_with<T>(initial: T, config: StateConfig) -> State<T>
where
    T: Clone + Send + Sync + 'static,
{
    State::with_config(initial, config)
}

/// Mutate `state` through the dispatch protocol without establishing a
/// rendering subscription.
pub fn dispatch<T, F>(state: &State<T>, updater: F)
where
    T: Clone + Send + Sync + 'static,
    F: FnOnce(T) -> T + Send + 'static,
{
    state.dispatch(updater);
}
