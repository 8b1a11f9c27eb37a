use super::callback::{Callback, CallbackKind};
use crate::error::DispatchError;
use crate::state::{PanicPolicy, Reentrancy};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, ThreadId};

/// Where a queued dispatch came from.
enum Queued<Q> {
    // Issued on the owning thread from inside a pass.
    Reentrant(Q),
    // Issued on another thread while a pass was running.
    Foreign(Q),
}

/// Book-keeping for the notification pass currently running on a container.
struct CycleState<Q> {
    // Thread running the outermost pass, if any.
    owner: Option<ThreadId>,
    // Dispatches waiting for the owner to drain them, in arrival order.
    pending: VecDeque<Queued<Q>>,
}

/// Per-container mutation queue.
///
/// At most one thread runs passes on a container at a time. The lock only
/// guards the owner and the queue and is never held while a pass runs, so
/// callbacks may freely dispatch into other containers from any thread.
///
/// A dispatch issued on the owning thread while a pass is running (a
/// callback mutating the container it was notified by) is either queued until
/// the current pass finishes or run in place, depending on [`Reentrancy`].
/// A dispatch issued on another thread while a pass is running is always
/// queued; the owner applies it before its own dispatch returns.
pub(crate) struct NotifyCycle<Q> {
    state: Mutex<CycleState<Q>>,
}

/// Limits applied while running a dispatch through a [`NotifyCycle`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct CyclePolicy<'a> {
    pub(crate) label: &'a str,
    pub(crate) reentrancy: Reentrancy,
    pub(crate) max_deferred_passes: usize,
}

impl<Q> NotifyCycle<Q> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(CycleState {
                owner: None,
                pending: VecDeque::new(),
            }),
        }
    }

    /// Run `item` through `pass`, or queue it for the thread already doing so.
    ///
    /// The owner drains the queue before returning. Only its own first pass
    /// reports an error; failures of queued passes are logged. Re-entrant
    /// passes beyond `max_deferred_passes` are dropped. A panic escaping
    /// `pass` empties the queue and releases the container before resuming.
    pub(crate) fn run<F>(
        &self,
        item: Q,
        policy: CyclePolicy<'_>,
        mut pass: F,
    ) -> Result<(), DispatchError>
    where
        F: FnMut(Q) -> Result<(), DispatchError>,
    {
        let current = thread::current().id();
        {
            let mut cycle = self.state.lock();
            let owner = cycle.owner;
            match owner {
                None => cycle.owner = Some(current),
                Some(owner) if owner == current => {
                    if policy.reentrancy == Reentrancy::Nested {
                        drop(cycle);
                        return pass(item);
                    }
                    cycle.pending.push_back(Queued::Reentrant(item));
                    let queued = cycle.pending.len();
                    drop(cycle);
                    tracing::debug!(state = policy.label, queued, "re-entrant dispatch deferred");
                    return Ok(());
                }
                Some(_) => {
                    cycle.pending.push_back(Queued::Foreign(item));
                    let queued = cycle.pending.len();
                    drop(cycle);
                    tracing::trace!(state = policy.label, queued, "dispatch queued behind running pass");
                    return Ok(());
                }
            }
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.drain(item, policy, &mut pass)));

        match result {
            Ok(outcome) => outcome,
            Err(payload) => {
                let dropped = {
                    let mut cycle = self.state.lock();
                    cycle.owner = None;
                    let dropped = cycle.pending.len();
                    cycle.pending.clear();
                    dropped
                };
                if dropped > 0 {
                    tracing::warn!(state = policy.label, dropped, "pass panicked, dropping queued updates");
                }
                panic::resume_unwind(payload)
            }
        }
    }

    /// Owner loop: the first pass, then everything queued meanwhile. Releases
    /// ownership under the same lock that observes the empty queue.
    fn drain<F>(&self, item: Q, policy: CyclePolicy<'_>, pass: &mut F) -> Result<(), DispatchError>
    where
        F: FnMut(Q) -> Result<(), DispatchError>,
    {
        let mut outcome = pass(item);
        let mut deferred = 0;

        loop {
            let next = {
                let mut cycle = self.state.lock();
                match cycle.pending.pop_front() {
                    Some(next) => next,
                    None => {
                        cycle.owner = None;
                        return outcome;
                    }
                }
            };

            match next {
                Queued::Foreign(item) => {
                    if let Err(err) = pass(item) {
                        tracing::error!(state = policy.label, error = %err, "queued dispatch failed");
                    }
                }
                Queued::Reentrant(_) if deferred == policy.max_deferred_passes => {
                    let dropped = {
                        let mut cycle = self.state.lock();
                        let before = cycle.pending.len();
                        cycle.pending.retain(|queued| matches!(queued, Queued::Foreign(_)));
                        before - cycle.pending.len() + 1
                    };
                    tracing::warn!(
                        state = policy.label,
                        limit = policy.max_deferred_passes,
                        dropped,
                        "deferred dispatch limit reached, dropping queued updates"
                    );
                    outcome = outcome.and(Err(DispatchError::DeferredOverflow {
                        state: policy.label.to_owned(),
                        limit: policy.max_deferred_passes,
                        dropped,
                    }));
                }
                Queued::Reentrant(item) => {
                    deferred += 1;
                    if let Err(err) = pass(item) {
                        tracing::error!(state = policy.label, error = %err, "deferred dispatch failed");
                    }
                }
            }
        }
    }
}

/// Invoke each callback once, applying `policy` to panics.
///
/// Under [`PanicPolicy::Isolate`] a panicking callback is logged and the
/// rest still run. Under [`PanicPolicy::Propagate`] the first panic ends the
/// pass and is returned.
pub(crate) fn invoke_callbacks(
    label: &str,
    kind: CallbackKind,
    callbacks: &[Callback],
    policy: PanicPolicy,
) -> Result<(), DispatchError> {
    for callback in callbacks {
        let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback.call())) else {
            continue;
        };

        let message = panic_message(payload.as_ref());
        match policy {
            PanicPolicy::Isolate => {
                tracing::error!(
                    state = label,
                    kind = %kind,
                    callback = %callback.id(),
                    panic = %message,
                    "callback panicked, continuing notification pass"
                );
            }
            PanicPolicy::Propagate => {
                return Err(DispatchError::CallbackPanicked {
                    state: label.to_owned(),
                    kind,
                    id: callback.id(),
                    message,
                });
            }
        }
    }
    Ok(())
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(err) = payload.downcast_ref::<DispatchError>() {
        err.to_string()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn policy(reentrancy: Reentrancy) -> CyclePolicy<'static> {
        CyclePolicy {
            label: "test",
            reentrancy,
            max_deferred_passes: 3,
        }
    }

    #[test]
    fn isolate_runs_remaining_callbacks() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let callbacks = vec![
            Callback::new(|| panic!("boom")),
            Callback::new(move || {
                hits_clone.fetch_add(1, Ordering::SeqCst);
            }),
        ];

        let result = invoke_callbacks("test", CallbackKind::Effect, &callbacks, PanicPolicy::Isolate);

        assert!(result.is_ok());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn propagate_stops_at_first_panic() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let failing = Callback::new(|| panic!("boom"));
        let failing_id = failing.id();
        let callbacks = vec![
            failing,
            Callback::new(move || {
                hits_clone.fetch_add(1, Ordering::SeqCst);
            }),
        ];

        let result =
            invoke_callbacks("test", CallbackKind::Subscriber, &callbacks, PanicPolicy::Propagate);

        assert_eq!(
            result,
            Err(DispatchError::CallbackPanicked {
                state: "test".to_owned(),
                kind: CallbackKind::Subscriber,
                id: failing_id,
                message: "boom".to_owned(),
            })
        );
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panic_message_handles_owned_strings() {
        let payload = panic::catch_unwind(|| panic!("value was {}", 3)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "value was 3");
    }

    #[test]
    fn nested_run_is_deferred() {
        let cycle: Arc<NotifyCycle<u32>> = Arc::new(NotifyCycle::new());
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let inner_cycle = cycle.clone();
        let inner_order = order.clone();
        let result = cycle.run(1, policy(Reentrancy::Defer), |item| {
            inner_order.lock().push(format!("start {item}"));
            if item == 1 {
                let nested = inner_cycle.run(2, policy(Reentrancy::Defer), |_| unreachable!());
                assert!(nested.is_ok());
            }
            inner_order.lock().push(format!("end {item}"));
            Ok(())
        });

        assert!(result.is_ok());
        assert_eq!(*order.lock(), vec!["start 1", "end 1", "start 2", "end 2"]);
    }

    #[test]
    fn run_from_other_thread_is_queued_for_owner() {
        let cycle: Arc<NotifyCycle<u32>> = Arc::new(NotifyCycle::new());
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let owner = thread::current().id();

        let other_cycle = cycle.clone();
        let pass_seen = seen.clone();
        let result = cycle.run(1, policy(Reentrancy::Nested), |item| {
            pass_seen.lock().push((item, thread::current().id()));
            if item == 1 {
                let other_cycle = other_cycle.clone();
                let queued = thread::spawn(move || {
                    other_cycle.run(2, policy(Reentrancy::Nested), |_| unreachable!())
                })
                .join()
                .unwrap();
                assert!(queued.is_ok());
            }
            Ok(())
        });

        assert!(result.is_ok());
        assert_eq!(*seen.lock(), vec![(1, owner), (2, owner)]);
    }

    #[test]
    fn deferred_overflow_drops_queue() {
        let cycle: Arc<NotifyCycle<u32>> = Arc::new(NotifyCycle::new());
        let passes = Arc::new(AtomicUsize::new(0));

        let inner_cycle = cycle.clone();
        let inner_passes = passes.clone();
        let result = cycle.run(0, policy(Reentrancy::Defer), |item| {
            inner_passes.fetch_add(1, Ordering::SeqCst);
            // Every pass schedules another one.
            let _ = inner_cycle.run(item + 1, policy(Reentrancy::Defer), |_| Ok(()));
            Ok(())
        });

        assert_eq!(
            result,
            Err(DispatchError::DeferredOverflow {
                state: "test".to_owned(),
                limit: 3,
                dropped: 1,
            })
        );
        // One direct pass plus the three allowed deferred passes.
        assert_eq!(passes.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn panic_resets_cycle() {
        let cycle: NotifyCycle<u32> = NotifyCycle::new();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = cycle.run(1, policy(Reentrancy::Defer), |_| panic!("pass failed"));
        }));
        assert!(outcome.is_err());

        let hits = AtomicUsize::new(0);
        let result = cycle.run(2, policy(Reentrancy::Defer), |_| {
            hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert!(result.is_ok());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
