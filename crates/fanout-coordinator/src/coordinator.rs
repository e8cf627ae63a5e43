use std::sync::Arc;

use fanout_common::transport::{TcpServer, TcpTransport};
use fanout_common::{
    BuildResponse, BuildTask, FanoutError, Request, Response, Result, BUILD_METHOD, INFO_METHOD,
    METRICS_METHOD,
};
use fanout_metrics::{PoolMetrics, ServerType};
use fanout_pool::{PoolRegistry, Selector};
use tracing::{debug, info, warn};

use crate::config::CoordinatorConfig;

/// Round-robin dispatcher for build tasks.
///
/// Each call to [`build`](BuildCoordinator::build) takes the next worker in
/// rotation, opens a connection, performs one exchange and drops the
/// connection. There is no retry: a failed call is returned to the caller.
pub struct BuildCoordinator {
    selector: Selector<String>,
    transport: TcpTransport,
    metrics: PoolMetrics,
}

impl BuildCoordinator {
    /// Creates a coordinator over a fixed list of worker addresses.
    ///
    /// Fails with [`FanoutError::Configuration`] when `workers` is empty.
    pub fn new(workers: Vec<String>, config: CoordinatorConfig) -> Result<Self> {
        let registry = Arc::new(PoolRegistry::new(workers)?);
        let metrics = PoolMetrics::new(registry.len());

        Ok(Self {
            selector: Selector::new(registry),
            transport: config.transport(),
            metrics,
        })
    }

    pub fn registry(&self) -> &Arc<PoolRegistry<String>> {
        self.selector.registry()
    }

    /// Forwards `task` to the next worker and returns its output verbatim.
    pub async fn build(&self, task: &BuildTask) -> Result<BuildResponse> {
        let selected = self.selector.next();
        let index = selected.index;
        let worker = selected.target();

        self.metrics.record_dispatch(index);
        debug!("Dispatching {} to worker {}", task.source, worker);

        let result = self.call_worker(worker, task).await;
        if let Err(e) = &result {
            self.metrics.record_failure(index);
            warn!("Build of {} on worker {} failed: {}", task.source, worker, e);
        }
        result
    }

    async fn call_worker(&self, worker: &str, task: &BuildTask) -> Result<BuildResponse> {
        let request = task.to_request()?;
        let response = self.transport.call(worker, &request).await?;
        BuildResponse::from_response(response)
    }

    /// Dispatches one RPC request received from a client.
    pub async fn handle_request(&self, request: Request) -> Result<Response> {
        match request.method.as_str() {
            BUILD_METHOD => {
                let task = BuildTask::from_request(&request)?;
                self.build(&task).await?.to_response(request.id)
            }
            INFO_METHOD => {
                let info = self.metrics.info(ServerType::Coordinator);
                Ok(Response::success(request.id, serde_json::to_value(info)?))
            }
            METRICS_METHOD => {
                let snapshot = self.metrics.snapshot(self.registry());
                Ok(Response::success(request.id, serde_json::to_value(snapshot)?))
            }
            other => Err(FanoutError::InvalidRequest(format!("Unknown method: {}", other))),
        }
    }

    /// Serves client requests on `server` until the accept loop fails.
    pub async fn serve(self: Arc<Self>, server: TcpServer) -> Result<()> {
        info!(
            "Coordinator listening on {} with {} workers",
            server.local_addr()?,
            self.registry().len()
        );

        server
            .run_with_handler(move |request| {
                let coordinator = self.clone();
                async move { coordinator.handle_request(request).await }
            })
            .await
    }
}
