//! Fixed endpoint pools shared by the build coordinator and the balancer.
//!
//! - [`PoolRegistry`]: ordered, non-empty, fixed membership; one health flag per entry
//! - [`Selector`]: round-robin cursor with an optional skip-unhealthy fallback
//! - [`HealthChecker`]: periodic concurrent probes that keep the health flags current

pub mod endpoint;
pub mod health_checker;
pub mod registry;
pub mod selector;

pub use endpoint::Endpoint;
pub use health_checker::{AlwaysHealthy, HealthCheckConfig, HealthChecker, HealthProbe};
pub use registry::PoolRegistry;
pub use selector::{Selected, Selector};
