//! HTTP front end of the balancer.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::response::Response;
use fanout_common::{FanoutError, Result};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::router::Router;

/// Serves every method and path on `listener` through `router`.
pub async fn serve(listener: TcpListener, router: Arc<Router>) -> Result<()> {
    let app = axum::Router::new()
        .fallback(proxy)
        .layer(TraceLayer::new_for_http())
        .with_state(router);

    info!(
        "Balancer listening on {}",
        listener
            .local_addr()
            .map_err(|e| FanoutError::Connection(format!("Failed to get local addr: {}", e)))?
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| FanoutError::Connection(format!("Server error: {}", e)))
}

async fn proxy(
    State(router): State<Arc<Router>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
) -> Response {
    router.route(request, Some(peer.ip())).await
}
