//! Effects keyed to one or more state containers.

mod effect;

pub use effect::{bind_effect, create_effect, EffectSource};
