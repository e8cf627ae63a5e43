// Copyright 2025 Fanout Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::snapshot::{EndpointMetrics, MetricsSnapshot, ServerInfo, ServerType};
use fanout_pool::PoolRegistry;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Dispatch counters for a fixed pool.
///
/// One slot per registry index, allocated up front; pool membership never
/// changes, so recording is a single relaxed atomic increment.
#[derive(Debug)]
pub struct PoolMetrics {
    start_time: Instant,
    total_requests: AtomicU64,
    failed_requests: AtomicU64,
    rejected_requests: AtomicU64,
    dispatched: Vec<AtomicU64>,
    failed: Vec<AtomicU64>,
}

impl PoolMetrics {
    pub fn new(pool_size: usize) -> Self {
        Self {
            start_time: Instant::now(),
            total_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            rejected_requests: AtomicU64::new(0),
            dispatched: (0..pool_size).map(|_| AtomicU64::new(0)).collect(),
            failed: (0..pool_size).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    /// Records a request sent to the endpoint at `index`.
    pub fn record_dispatch(&self, index: usize) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if let Some(counter) = self.dispatched.get(index) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records that the request sent to `index` failed in transport.
    pub fn record_failure(&self, index: usize) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
        if let Some(counter) = self.failed.get(index) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records a request rejected before dispatch (no healthy endpoint).
    pub fn record_rejected(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.rejected_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dispatched(&self, index: usize) -> u64 {
        self.dispatched
            .get(index)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn uptime_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    pub fn info(&self, server_type: ServerType) -> ServerInfo {
        ServerInfo::new(server_type, self.uptime_ms())
    }

    /// Takes a snapshot, pairing each counter slot with its registry entry.
    pub fn snapshot<T: Display>(&self, registry: &PoolRegistry<T>) -> MetricsSnapshot {
        let endpoints = registry
            .iter()
            .enumerate()
            .map(|(index, endpoint)| EndpointMetrics {
                target: endpoint.target().to_string(),
                healthy: endpoint.is_healthy(),
                dispatched: self.dispatched(index),
                failed: self
                    .failed
                    .get(index)
                    .map(|c| c.load(Ordering::Relaxed))
                    .unwrap_or(0),
            })
            .collect();

        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            rejected_requests: self.rejected_requests.load(Ordering::Relaxed),
            uptime_ms: self.uptime_ms(),
            endpoints,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn registry() -> PoolRegistry<String> {
        PoolRegistry::new(vec!["a:1".to_string(), "b:2".to_string()]).unwrap()
    }

    #[test]
    fn test_snapshot_pairs_counters_with_targets() {
        let registry = registry();
        let metrics = PoolMetrics::new(registry.len());

        metrics.record_dispatch(0);
        metrics.record_dispatch(1);
        metrics.record_dispatch(1);
        metrics.record_failure(1);
        metrics.record_rejected();
        registry.set_health(0, false);

        let snapshot = metrics.snapshot(&registry);
        assert_eq!(snapshot.total_requests, 4);
        assert_eq!(snapshot.failed_requests, 1);
        assert_eq!(snapshot.rejected_requests, 1);
        assert_eq!(
            snapshot.endpoints,
            vec![
                EndpointMetrics {
                    target: "a:1".to_string(),
                    healthy: false,
                    dispatched: 1,
                    failed: 0,
                },
                EndpointMetrics {
                    target: "b:2".to_string(),
                    healthy: true,
                    dispatched: 2,
                    failed: 1,
                },
            ]
        );
    }

    #[test]
    fn test_out_of_range_index_only_counts_total() {
        let metrics = PoolMetrics::new(1);
        metrics.record_dispatch(7);
        assert_eq!(metrics.dispatched(7), 0);
        assert_eq!(metrics.snapshot(&registry()).total_requests, 1);
    }

    #[test]
    fn test_info_serializes_lowercase_type() {
        let info = PoolMetrics::new(1).info(ServerType::Coordinator);
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["server_type"], "coordinator");
        assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_concurrent_recording() {
        let metrics = Arc::new(PoolMetrics::new(4));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let metrics = Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.record_dispatch(t % 4);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!((0..4).all(|i| metrics.dispatched(i) == 2000));
    }
}
