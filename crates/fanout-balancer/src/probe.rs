use std::time::Duration;

use axum::http::uri::PathAndQuery;
use axum::http::Request;
use fanout_common::{FanoutError, Result};
use fanout_pool::{AlwaysHealthy, HealthProbe};
use futures::future::BoxFuture;
use http_body_util::Empty;
use hyper::body::Bytes;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::debug;

use crate::backend::Backend;

/// Liveness check over HTTP: `GET <health path>` on the backend.
///
/// Any response below 500 counts as alive; a refused connection, a reset or
/// a 5xx status does not.
#[derive(Clone)]
pub struct HttpProbe {
    client: Client<HttpConnector, Empty<Bytes>>,
    path: PathAndQuery,
}

impl HttpProbe {
    pub fn new(path: &str, connect_timeout: Duration) -> Result<Self> {
        let path = path
            .parse::<PathAndQuery>()
            .map_err(|e| {
                FanoutError::Configuration(format!("Invalid health path '{}': {}", path, e))
            })?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self { client, path })
    }

    pub fn path(&self) -> &str {
        self.path.as_str()
    }
}

impl HealthProbe<Backend> for HttpProbe {
    fn probe(&self, backend: &Backend) -> BoxFuture<'static, bool> {
        let client = self.client.clone();
        let request = backend
            .uri_with(self.path.clone())
            .and_then(|uri| {
                Request::get(uri)
                    .body(Empty::new())
                    .map_err(|e| FanoutError::InvalidRequest(e.to_string()))
            });
        let name = backend.to_string();

        Box::pin(async move {
            let request = match request {
                Ok(request) => request,
                Err(e) => {
                    debug!("Cannot probe {}: {}", name, e);
                    return false;
                }
            };

            match client.request(request).await {
                Ok(response) => !response.status().is_server_error(),
                Err(e) => {
                    debug!("Probe of {} failed: {}", name, e);
                    false
                }
            }
        })
    }
}

/// The probe a balancer runs: real HTTP checks, or the placeholder that
/// keeps every backend healthy.
#[derive(Clone)]
pub enum BackendProbe {
    Http(HttpProbe),
    Noop,
}

impl HealthProbe<Backend> for BackendProbe {
    fn probe(&self, backend: &Backend) -> BoxFuture<'static, bool> {
        match self {
            BackendProbe::Http(probe) => probe.probe(backend),
            BackendProbe::Noop => HealthProbe::<Backend>::probe(&AlwaysHealthy, backend),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;

    async fn spawn_backend(status: StatusCode) -> Backend {
        let app = axum::Router::new().route("/healthz", get(move || async move { status }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Backend::parse(&addr.to_string()).unwrap()
    }

    fn probe() -> HttpProbe {
        HttpProbe::new("/healthz", Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_invalid_path_rejected() {
        let err = HttpProbe::new("not a path", Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, FanoutError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_ok_and_client_errors_are_alive() {
        assert!(probe().probe(&spawn_backend(StatusCode::OK).await).await);
        assert!(probe().probe(&spawn_backend(StatusCode::NOT_FOUND).await).await);
    }

    #[tokio::test]
    async fn test_server_error_is_dead() {
        let backend = spawn_backend(StatusCode::SERVICE_UNAVAILABLE).await;
        assert!(!probe().probe(&backend).await);
    }

    #[tokio::test]
    async fn test_refused_connection_is_dead() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = Backend::parse(&addr.to_string()).unwrap();
        assert!(!probe().probe(&backend).await);
    }

    #[tokio::test]
    async fn test_noop_probe_always_alive() {
        let backend = Backend::parse("127.0.0.1:1").unwrap();
        assert!(BackendProbe::Noop.probe(&backend).await);
    }
}
