//! Test module for scenario, integration and determinism tests.
//!
//! # Test Structure
//!
//! - `determinism.rs`: sequential and parallel scheduling agree; properties
//!   of movement, collisions and termination
//! - `integration.rs`: end-to-end runs, including the reference scenarios
//! - `helpers.rs`: fleet factories and small assertions

mod helpers;
mod integration;

pub use helpers::*;
