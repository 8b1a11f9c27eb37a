//! Test helpers for code built on this crate.
//!
//! Enabled by the `test-helpers` feature.

mod harness;

pub use harness::RenderHarness;
