use std::time::Duration;

use fanout_common::transport::{TcpTransport, DEFAULT_CONNECT_TIMEOUT};

/// Coordinator timeouts.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Bound on dialing a worker
    pub connect_timeout: Duration,
    /// Bound on the whole exchange with a worker, unbounded when `None`
    pub call_timeout: Option<Duration>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            call_timeout: None,
        }
    }
}

impl CoordinatorConfig {
    pub(crate) fn transport(&self) -> TcpTransport {
        TcpTransport::new()
            .with_connect_timeout(self.connect_timeout)
            .with_call_timeout(self.call_timeout)
    }
}
