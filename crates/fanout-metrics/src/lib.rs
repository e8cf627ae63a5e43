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

//! Fanout Metrics
//!
//! Lock-free counters describing how a pool's traffic was spread:
//! requests dispatched and failed per endpoint, plus requests rejected because
//! no endpoint was healthy. Both the coordinator (`_metrics` RPC) and the
//! balancer record into a [`PoolMetrics`].
//!
//! # Usage Example
//!
//! ```rust
//! use fanout_metrics::PoolMetrics;
//! use fanout_pool::PoolRegistry;
//!
//! let registry = PoolRegistry::new(vec!["127.0.0.1:9001".to_string()]).unwrap();
//! let metrics = PoolMetrics::new(registry.len());
//!
//! metrics.record_dispatch(0);
//! let snapshot = metrics.snapshot(&registry);
//! assert_eq!(snapshot.total_requests, 1);
//! assert_eq!(snapshot.endpoints[0].dispatched, 1);
//! ```

mod collector;
mod snapshot;

pub use collector::PoolMetrics;
pub use snapshot::{EndpointMetrics, MetricsSnapshot, ServerInfo, ServerType};
