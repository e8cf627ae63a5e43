use std::sync::Arc;
use std::time::Instant;

use fanout_common::transport::TcpServer;
use fanout_common::{
    BuildResponse, BuildTask, FanoutError, Request, Response, Result, BUILD_METHOD, INFO_METHOD,
};
use fanout_metrics::{ServerInfo, ServerType};
use tracing::{debug, info};

use crate::compiler::{CommandCompiler, Compiler};

/// Marker line appended to the output of a compilation that exited 0.
pub const SUCCESS_MARKER: &str = "Build successful.";
/// Marker line appended to the output of a failed compilation, or to the
/// error text when the compiler could not be run.
pub const FAILURE_MARKER: &str = "Build failed.";

/// A build worker.
///
/// Cheap to clone; clones share the compiler and uptime clock, so a single
/// worker can hand one clone to each connection task.
#[derive(Clone)]
pub struct Worker {
    compiler: Arc<dyn Compiler>,
    started: Instant,
}

impl Worker {
    pub fn new(compiler: impl Compiler) -> Self {
        Self {
            compiler: Arc::new(compiler),
            started: Instant::now(),
        }
    }

    /// Runs the compiler and appends the outcome marker.
    ///
    /// Never fails: a compiler that cannot be started yields its error text
    /// followed by the failure marker.
    pub async fn execute(&self, task: &BuildTask) -> BuildResponse {
        let output = match self.compiler.compile(task).await {
            Ok(out) if out.success => format!("{}\n{}", out.output, SUCCESS_MARKER),
            Ok(out) => format!("{}\n{}", out.output, FAILURE_MARKER),
            Err(e) => {
                debug!("Compiler could not be started for {}: {}", task.source, e);
                format!("{}\n{}", e, FAILURE_MARKER)
            }
        };

        BuildResponse::new(output)
    }

    /// Dispatches one RPC request.
    pub async fn handle_request(&self, request: Request) -> Result<Response> {
        debug!("Handling request for method: {}", request.method);

        match request.method.as_str() {
            BUILD_METHOD => {
                let task = BuildTask::from_request(&request)?;
                self.execute(&task).await.to_response(request.id)
            }
            INFO_METHOD => {
                let uptime_ms = self.started.elapsed().as_millis() as u64;
                let info = ServerInfo::new(ServerType::Worker, uptime_ms);
                Ok(Response::success(request.id, serde_json::to_value(info)?))
            }
            other => Err(FanoutError::InvalidRequest(format!("Unknown method: {}", other))),
        }
    }

    /// Serves requests on `server` until the accept loop fails.
    pub async fn serve(self, server: TcpServer) -> Result<()> {
        info!("Worker listening on {}", server.local_addr()?);

        server
            .run_with_handler(move |request| {
                let worker = self.clone();
                async move { worker.handle_request(request).await }
            })
            .await
    }
}

impl Default for Worker {
    fn default() -> Self {
        Self::new(CommandCompiler::default())
    }
}
