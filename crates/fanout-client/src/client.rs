use std::time::Duration;

use fanout_common::transport::TcpTransport;
use fanout_common::{BuildResponse, BuildTask, FanoutError, Request, Result};
use serde_json::Value;

/// Client for the `build` RPC.
///
/// Opens a fresh connection per call, so a single client can be shared by
/// concurrent tasks.
#[derive(Debug, Clone)]
pub struct BuildClient {
    addr: String,
    transport: TcpTransport,
}

impl BuildClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            transport: TcpTransport::new(),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.transport = self.transport.with_connect_timeout(timeout);
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Submits a build task and returns the compiler output with its marker.
    pub async fn build(&self, task: &BuildTask) -> Result<BuildResponse> {
        let request = task.to_request()?;
        let response = self.transport.call(&self.addr, &request).await?;
        BuildResponse::from_response(response)
    }

    /// Calls any method, e.g. the `_info` and `_metrics` built-ins.
    pub async fn call(&self, method: impl Into<String>, args: Value) -> Result<Value> {
        let request = Request::new(method, args);
        let response = self.transport.call(&self.addr, &request).await?;

        if response.success {
            response.result.ok_or_else(|| {
                FanoutError::InvalidResponse("Missing result in success response".to_string())
            })
        } else {
            Err(FanoutError::Transport(format!(
                "Remote call failed: {}",
                response.error.unwrap_or_else(|| "Unknown error".to_string())
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_is_clonable() {
        let client = BuildClient::new("localhost:9000");
        let clone = client.clone();
        assert_eq!(client.addr(), clone.addr());
    }

    #[tokio::test]
    async fn test_build_against_nothing_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = BuildClient::new(addr)
            .with_connect_timeout(Duration::from_millis(500))
            .build(&BuildTask::new("C", "main.c"))
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }
}
