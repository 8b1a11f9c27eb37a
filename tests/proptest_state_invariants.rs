//! Property-based invariant tests for state containers.
//!
//! 1. A fresh container returns its initial value.
//! 2. `get` returns the most recently set value after any sequence of sets.
//! 3. Every dispatch notifies each subscriber and effect exactly once,
//!    subscribers first.
//! 4. Subscribers observe the post-dispatch value.
//! 5. Disposers are idempotent.

use libstate::{create_effect, create_state, Callback, ExternalStore, StoreAdapter, Update};
use proptest::prelude::*;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum Op {
    Replace(i64),
    Add(i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<i64>().prop_map(Op::Replace),
        (-1000i64..1000).prop_map(Op::Add),
    ]
}

proptest! {
    #[test]
    fn fresh_state_returns_initial(initial in any::<i64>(), label in "[a-z]{0,12}") {
        prop_assert_eq!(create_state(initial).get(), initial);
        prop_assert_eq!(create_state(label.clone()).get(), label);
    }

    #[test]
    fn get_returns_last_set(values in proptest::collection::vec(any::<i64>(), 1..32)) {
        let state = create_state(0i64);
        for value in &values {
            state.set(*value);
            prop_assert_eq!(state.get(), *value);
        }
        prop_assert_eq!(state.get(), *values.last().unwrap());
    }

    #[test]
    fn each_dispatch_is_one_ordered_pass(
        ops in proptest::collection::vec(op_strategy(), 1..24),
        subscribers in 1usize..4,
        effects in 1usize..4,
    ) {
        let state = create_state(0i64);
        let adapter = StoreAdapter::new(&state);
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut disposers = Vec::new();
        for index in 0..subscribers {
            let reader = adapter.clone();
            let sink = log.clone();
            disposers.push(adapter.subscribe(Callback::new(move || {
                sink.lock().unwrap().push(("subscriber", index, reader.get_snapshot()));
            })));
        }
        for index in 0..effects {
            let reader = state.clone();
            let sink = log.clone();
            disposers.push(create_effect(
                move || sink.lock().unwrap().push(("effect", index, reader.get())),
                &[&state],
            ));
        }

        let mut expected_value = 0i64;
        for op in &ops {
            log.lock().unwrap().clear();
            match op {
                Op::Replace(value) => {
                    expected_value = *value;
                    adapter.dispatch(*value);
                }
                Op::Add(delta) => {
                    expected_value = expected_value.wrapping_add(*delta);
                    let delta = *delta;
                    adapter.dispatch(Update::apply(move |n: i64| n.wrapping_add(delta)));
                }
            }

            let entries = log.lock().unwrap().clone();
            prop_assert_eq!(entries.len(), subscribers + effects);
            for (position, (kind, index, value)) in entries.iter().enumerate() {
                prop_assert_eq!(*value, expected_value);
                if position < subscribers {
                    prop_assert_eq!(*kind, "subscriber");
                    prop_assert_eq!(*index, position);
                } else {
                    prop_assert_eq!(*kind, "effect");
                    prop_assert_eq!(*index, position - subscribers);
                }
            }
        }

        for disposer in &disposers {
            disposer.dispose();
        }
        prop_assert_eq!(state.subscriber_count(), 0);
        prop_assert_eq!(state.effect_count(), 0);
    }

    #[test]
    fn disposal_is_idempotent(extra_calls in 1usize..5, dispatches in 0usize..5) {
        let state = create_state(0u32);
        let runs = Arc::new(Mutex::new(0usize));

        let runs_clone = runs.clone();
        let disposer = create_effect(move || *runs_clone.lock().unwrap() += 1, &[&state]);
        disposer.dispose();
        for _ in 0..extra_calls {
            disposer.dispose();
        }
        for _ in 0..dispatches {
            state.dispatch(|n| n + 1);
        }

        prop_assert!(disposer.is_disposed());
        prop_assert_eq!(*runs.lock().unwrap(), 0);
        prop_assert_eq!(state.get(), dispatches as u32);
    }
}
