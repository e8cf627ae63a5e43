//! Fanout Coordinator
//!
//! Accepts `build` requests and forwards each one to the next worker in a
//! fixed pool, in strict rotation. Workers are not health-checked: a dead
//! worker surfaces as a transport error for the request that landed on it,
//! and the following request moves on to the next worker.

pub mod config;
pub mod coordinator;

pub use config::CoordinatorConfig;
pub use coordinator::BuildCoordinator;
