use std::sync::Arc;
use std::time::Duration;

use fanout_common::{FanoutError, Result};
use fanout_pool::{HealthCheckConfig, HealthChecker, PoolRegistry};
use tokio::net::TcpListener;
use tracing::info;

use crate::backend::Backend;
use crate::probe::{BackendProbe, HttpProbe};
use crate::router::Router;
use crate::server;

/// Balancer settings.
#[derive(Debug, Clone)]
pub struct BalancerConfig {
    pub health: HealthCheckConfig,
    /// Path requested by the HTTP probe
    pub health_path: String,
    /// Replace the HTTP probe with one that reports every backend healthy
    pub noop_health_check: bool,
    /// Bound on dialing a backend, for both forwarding and probing
    pub connect_timeout: Duration,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            health: HealthCheckConfig::default(),
            health_path: "/".to_string(),
            noop_health_check: false,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// A reverse proxy over a fixed backend pool, with its health checker.
pub struct Balancer {
    router: Arc<Router>,
    checker: HealthChecker<Backend, BackendProbe>,
}

impl Balancer {
    /// Parses the backend URLs and sets up routing and health checking.
    ///
    /// Fails with [`FanoutError::Configuration`] for an empty list or a
    /// malformed URL.
    pub fn new(backends: &[String], config: BalancerConfig) -> Result<Self> {
        if backends.is_empty() {
            return Err(FanoutError::Configuration(
                "At least one backend is required".to_string(),
            ));
        }

        let backends = backends
            .iter()
            .map(|url| Backend::parse(url))
            .collect::<Result<Vec<_>>>()?;
        let registry = Arc::new(PoolRegistry::new(backends)?);

        let probe = if config.noop_health_check {
            BackendProbe::Noop
        } else {
            BackendProbe::Http(HttpProbe::new(&config.health_path, config.connect_timeout)?)
        };

        let router = Arc::new(Router::new(Arc::clone(&registry), config.connect_timeout));
        let checker = HealthChecker::new(registry, probe, config.health);

        Ok(Self { router, checker })
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Runs one probe round over every backend and waits for it.
    pub async fn check_health(&self) {
        self.checker.check_all().await;
    }

    /// Starts the health checker and serves traffic until the server stops.
    pub async fn run(self, listener: TcpListener) -> Result<()> {
        info!("Balancing over {} backends", self.router.registry().len());

        let checker = self.checker.spawn();
        let result = server::serve(listener, self.router).await;
        checker.abort();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_backend_list_rejected() {
        let err = Balancer::new(&[], BalancerConfig::default()).err().unwrap();
        assert!(matches!(err, FanoutError::Configuration(_)));
    }

    #[test]
    fn test_malformed_backend_rejected() {
        let backends = vec!["127.0.0.1:8080".to_string(), "https://secure".to_string()];
        let err = Balancer::new(&backends, BalancerConfig::default()).err().unwrap();
        assert!(matches!(err, FanoutError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_noop_probe_keeps_backends_healthy() {
        let backends = vec!["127.0.0.1:1".to_string()];
        let config = BalancerConfig {
            noop_health_check: true,
            ..BalancerConfig::default()
        };
        let balancer = Balancer::new(&backends, config).unwrap();
        balancer.router().registry().set_health(0, false);

        balancer.check_health().await;
        assert!(balancer.router().registry().is_healthy(0));
    }
}
