//! User component demo: shared state, a logging effect and a rendered view

use libstate::testing::RenderHarness;
use libstate::{create_effect, create_state, dispatch, use_lib_state, State};

#[derive(Clone, Debug)]
struct UserState {
    count: u32,
    name: String,
    is_logged_in: bool,
}

fn increment_count(state: &State<UserState>) {
    dispatch(state, |prev| UserState {
        count: prev.count + 1,
        ..prev
    });
}

fn user_component(host: &mut RenderHarness, state: &State<UserState>) -> String {
    let (user, _) = use_lib_state(host, state);
    format!(
        "User Component\n  Count: {}\n  Name: {}\n  Is Logged In: {}",
        user.count, user.name, user.is_logged_in
    )
}

fn main() {
    println!("=== User State Demo ===\n");

    let state = create_state(UserState {
        count: 0,
        name: "Arjun".to_string(),
        is_logged_in: false,
    });

    let logged = state.clone();
    let _logger = create_effect(
        move || println!("   [Effect] User State Changed: {:?}", logged.get()),
        &[&state],
    );

    let mut harness = RenderHarness::new();
    println!("{}\n", harness.render(|host| user_component(host, &state)));

    for click in 1..=3 {
        println!("Click {click}: Increment Count");
        increment_count(&state);
        if harness.needs_render() {
            println!("{}\n", harness.render(|host| user_component(host, &state)));
        }
    }

    harness.unmount();
    println!("Unmounted, {} subscribers left", state.subscriber_count());
}
