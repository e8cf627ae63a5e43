use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::registry::PoolRegistry;

/// Liveness check for a single endpoint target.
///
/// The returned future must not borrow the target; implementations clone
/// whatever they need. A probe that never resolves is cut off by the checker's
/// timeout and counted as unhealthy.
pub trait HealthProbe<T>: Send + Sync + 'static {
    fn probe(&self, target: &T) -> BoxFuture<'static, bool>;
}

/// Placeholder probe that reports every endpoint healthy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysHealthy;

impl<T> HealthProbe<T> for AlwaysHealthy {
    fn probe(&self, _target: &T) -> BoxFuture<'static, bool> {
        Box::pin(futures::future::ready(true))
    }
}

/// Health check configuration.
#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    /// Time between probe rounds
    pub interval: Duration,
    /// Bound on a single probe
    pub timeout: Duration,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_millis(2000),
        }
    }
}

/// Periodically probes every endpoint of a registry.
///
/// Each round launches one task per endpoint; each task writes only its own
/// endpoint's health flag. A probe still running when the next round starts
/// is not duplicated.
pub struct HealthChecker<T, P> {
    registry: Arc<PoolRegistry<T>>,
    probe: Arc<P>,
    config: HealthCheckConfig,
}

/// Releases an endpoint's in-flight slot when the probe task ends, even if it panics.
struct InFlight<T> {
    registry: Arc<PoolRegistry<T>>,
    index: usize,
}

impl<T> Drop for InFlight<T> {
    fn drop(&mut self) {
        if let Some(endpoint) = self.registry.get(self.index) {
            endpoint.end_probe();
        }
    }
}

impl<T, P> HealthChecker<T, P>
where
    T: Display + Send + Sync + 'static,
    P: HealthProbe<T>,
{
    pub fn new(registry: Arc<PoolRegistry<T>>, probe: P, config: HealthCheckConfig) -> Self {
        Self {
            registry,
            probe: Arc::new(probe),
            config,
        }
    }

    pub fn config(&self) -> &HealthCheckConfig {
        &self.config
    }

    /// Starts the periodic probe loop on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(self) {
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            "Health checker started for {} endpoints (interval {:?}, timeout {:?})",
            self.registry.len(),
            self.config.interval,
            self.config.timeout
        );

        loop {
            interval.tick().await;
            self.launch_round();
        }
    }

    /// Runs one probe round and waits for every launched probe to finish.
    pub async fn check_all(&self) {
        let handles = self.launch_round();
        futures::future::join_all(handles).await;
    }

    /// Launches one probe per endpoint that has no probe in flight.
    fn launch_round(&self) -> Vec<JoinHandle<()>> {
        (0..self.registry.len())
            .filter_map(|index| self.launch_probe(index))
            .collect()
    }

    fn launch_probe(&self, index: usize) -> Option<JoinHandle<()>> {
        let endpoint = self.registry.get(index)?;
        if !endpoint.try_begin_probe() {
            debug!("Probe for {} still in flight, skipping", endpoint.target());
            return None;
        }

        let guard = InFlight {
            registry: Arc::clone(&self.registry),
            index,
        };
        let name = endpoint.target().to_string();
        let probe = self.probe.probe(endpoint.target());
        let timeout = self.config.timeout;

        Some(tokio::spawn(async move {
            let healthy = matches!(tokio::time::timeout(timeout, probe).await, Ok(true));
            let previous = guard.registry.set_health(guard.index, healthy);

            match (previous, healthy) {
                (Some(true), false) => warn!("Endpoint {} marked unhealthy", name),
                (Some(false), true) => info!("Endpoint {} recovered", name),
                _ => debug!("Endpoint {} healthy={}", name, healthy),
            }
        }))
    }
}
