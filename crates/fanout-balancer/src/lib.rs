//! Fanout Balancer
//!
//! An HTTP reverse proxy over a fixed set of backends. Each request goes to
//! the next backend in rotation that the health checker currently considers
//! healthy; when none is, the client gets a 503.
//!
//! # Architecture
//!
//! ```text
//! client ──HTTP──> Balancer ──HTTP──> backend (round-robin, healthy only)
//!                     │
//!                     └── HealthChecker ──GET health path──> every backend
//! ```

pub mod backend;
pub mod balancer;
pub mod probe;
pub mod router;
pub mod server;

pub use backend::Backend;
pub use balancer::{Balancer, BalancerConfig};
pub use probe::{BackendProbe, HttpProbe};
pub use router::{Router, NO_HEALTHY_BACKENDS};
pub use server::serve;
