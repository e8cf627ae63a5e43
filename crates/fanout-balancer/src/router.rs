use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode};
use axum::response::IntoResponse;
use fanout_metrics::{MetricsSnapshot, PoolMetrics};
use fanout_pool::{PoolRegistry, Selector};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, warn};

use crate::backend::Backend;

/// Body of the 503 returned when every backend is unhealthy.
pub const NO_HEALTHY_BACKENDS: &str = "Couldn't process request: no healthy backends";

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Connection-scoped headers that must not be forwarded.
const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Forwards HTTP requests to healthy backends in rotation.
pub struct Router {
    selector: Selector<Backend>,
    client: Client<HttpConnector, Body>,
    metrics: PoolMetrics,
}

impl Router {
    pub fn new(registry: Arc<PoolRegistry<Backend>>, connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);
        let metrics = PoolMetrics::new(registry.len());

        Self {
            selector: Selector::new(registry),
            client,
            metrics,
        }
    }

    pub fn registry(&self) -> &Arc<PoolRegistry<Backend>> {
        self.selector.registry()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot(self.registry())
    }

    /// Forwards `request` to the next healthy backend.
    ///
    /// Answers 503 when no backend is healthy and 502 when the chosen backend
    /// cannot be reached. The backend's response body is streamed through.
    pub async fn route(
        &self,
        mut request: Request<Body>,
        client_ip: Option<IpAddr>,
    ) -> Response<Body> {
        let selected = match self.selector.next_healthy() {
            Ok(selected) => selected,
            Err(e) => {
                self.metrics.record_rejected();
                warn!("Rejecting {} {}: {}", request.method(), request.uri(), e);
                return (StatusCode::SERVICE_UNAVAILABLE, NO_HEALTHY_BACKENDS).into_response();
            }
        };
        let index = selected.index;
        let backend = selected.target();

        self.metrics.record_dispatch(index);

        let uri = match backend.rewrite(request.uri()) {
            Ok(uri) => uri,
            Err(e) => {
                self.metrics.record_failure(index);
                warn!("Cannot forward to {}: {}", backend, e);
                return StatusCode::BAD_GATEWAY.into_response();
            }
        };
        debug!("Forwarding {} {} to {}", request.method(), request.uri(), backend);

        *request.uri_mut() = uri;
        let headers = request.headers_mut();
        strip_hop_by_hop(headers);
        headers.remove(header::HOST);
        if let Some(ip) = client_ip {
            append_forwarded_for(headers, ip);
        }

        match self.client.request(request).await {
            Ok(response) => {
                let mut response = response.map(Body::new);
                strip_hop_by_hop(response.headers_mut());
                response
            }
            Err(e) => {
                self.metrics.record_failure(index);
                warn!("Backend {} failed: {}", backend, e);
                StatusCode::BAD_GATEWAY.into_response()
            }
        }
    }
}

/// Removes the fixed hop-by-hop headers and any header named in `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    for name in HOP_BY_HOP_HEADERS
        .iter()
        .copied()
        .chain(listed.iter().map(String::as_str))
    {
        headers.remove(name);
    }
}

/// Appends `client` to the `X-Forwarded-For` chain, folding every prior
/// value into one header. Prior values are kept byte for byte.
fn append_forwarded_for(headers: &mut HeaderMap, client: IpAddr) {
    let mut chain = Vec::new();
    for prior in headers.get_all(X_FORWARDED_FOR) {
        chain.extend_from_slice(prior.as_bytes());
        chain.extend_from_slice(b", ");
    }
    chain.extend_from_slice(client.to_string().as_bytes());

    if let Ok(value) = HeaderValue::from_bytes(&chain) {
        headers.insert(HeaderName::from_static(X_FORWARDED_FOR), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_strip_fixed_and_listed_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("close, X-Session"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        headers.insert("x-session", HeaderValue::from_static("abc"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert_eq!(headers[header::ACCEPT], "*/*");
    }

    #[test]
    fn test_forwarded_for_set_when_absent() {
        let mut headers = HeaderMap::new();
        append_forwarded_for(&mut headers, IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3)));
        assert_eq!(headers[X_FORWARDED_FOR], "10.1.2.3");
    }

    #[test]
    fn test_forwarded_for_appends_to_chain() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("203.0.113.9"));
        append_forwarded_for(&mut headers, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(headers[X_FORWARDED_FOR], "203.0.113.9, 127.0.0.1");
    }

    #[test]
    fn test_forwarded_for_folds_every_prior_value() {
        let mut headers = HeaderMap::new();
        headers.append(X_FORWARDED_FOR, HeaderValue::from_static("203.0.113.9"));
        headers.append(X_FORWARDED_FOR, HeaderValue::from_static("198.51.100.4"));

        append_forwarded_for(&mut headers, IpAddr::V4(Ipv4Addr::LOCALHOST));

        let values: Vec<_> = headers.get_all(X_FORWARDED_FOR).iter().collect();
        assert_eq!(values, ["203.0.113.9, 198.51.100.4, 127.0.0.1"]);
    }

    #[test]
    fn test_forwarded_for_keeps_non_utf8_prior_value() {
        let mut headers = HeaderMap::new();
        let prior = HeaderValue::from_bytes(b"proxy-\xfe").unwrap();
        headers.insert(X_FORWARDED_FOR, prior);

        append_forwarded_for(&mut headers, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)));

        assert_eq!(headers[X_FORWARDED_FOR].as_bytes(), b"proxy-\xfe, 10.0.0.2");
    }

    #[tokio::test]
    async fn test_all_unhealthy_answers_503() {
        let registry = Arc::new(
            PoolRegistry::new(vec![
                Backend::parse("127.0.0.1:1").unwrap(),
                Backend::parse("127.0.0.1:2").unwrap(),
            ])
            .unwrap(),
        );
        registry.set_health(0, false);
        registry.set_health(1, false);
        let router = Router::new(registry, Duration::from_secs(1));

        let response = router
            .route(Request::get("/").body(Body::empty()).unwrap(), None)
            .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], NO_HEALTHY_BACKENDS.as_bytes());
        assert_eq!(router.snapshot().rejected_requests, 1);
    }

    #[tokio::test]
    async fn test_unreachable_backend_answers_502() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = Backend::parse(&addr.to_string()).unwrap();
        let registry = Arc::new(PoolRegistry::new(vec![backend]).unwrap());
        let router = Router::new(registry, Duration::from_secs(1));

        let response = router
            .route(Request::get("/").body(Body::empty()).unwrap(), None)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let snapshot = router.snapshot();
        assert_eq!(snapshot.endpoints[0].dispatched, 1);
        assert_eq!(snapshot.endpoints[0].failed, 1);
    }
}
