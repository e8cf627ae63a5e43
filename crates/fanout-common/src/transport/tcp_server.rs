use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

use crate::protocol::error::{FanoutError, Result};
use crate::protocol::{Request, Response};
use crate::transport::codec::{read_frame, write_frame, JsonCodec};

/// Async TCP server for the RPC channel.
///
/// Each accepted connection gets its own task; a connection may carry any
/// number of request/response pairs until the peer closes it.
pub struct TcpServer {
    listener: TcpListener,
}

impl TcpServer {
    /// Creates a new TCP server bound to the specified address.
    ///
    /// # Arguments
    /// * `bind_addr` - The address to bind to (e.g., "0.0.0.0:9001")
    pub async fn new(bind_addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(bind_addr).await.map_err(|e| {
            FanoutError::Connection(format!("Failed to bind to {}: {}", bind_addr, e))
        })?;

        Ok(Self { listener })
    }

    /// Gets the actual bound address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| FanoutError::Connection(format!("Failed to get local addr: {}", e)))
    }

    /// Runs the accept loop, dispatching each request to `handler`.
    ///
    /// Handler errors are sent back as error responses; they never close the
    /// connection.
    pub async fn run_with_handler<F, Fut>(self, handler: F) -> Result<()>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        let handler = Arc::new(handler);

        loop {
            let (stream, peer_addr) = self.listener.accept().await.map_err(|e| {
                FanoutError::Connection(format!("Failed to accept connection: {}", e))
            })?;

            debug!("Connection established from {}", peer_addr);

            let handler = handler.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, handler).await {
                    warn!("Connection error from {}: {}", peer_addr, e);
                }
            });
        }
    }
}

/// Serves requests on one connection until the peer closes it.
async fn handle_connection<F, Fut>(mut stream: TcpStream, handler: Arc<F>) -> Result<()>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    while let Some(buf) = read_frame(&mut stream).await? {
        let request = match JsonCodec::decode_request(&buf) {
            Ok(req) => req,
            Err(e) => {
                warn!("Failed to decode request: {}", e);
                send_response(&mut stream, &Response::error(0, e.to_string())).await?;
                continue;
            }
        };

        let request_id = request.id;
        let response = match handler(request).await {
            Ok(resp) => resp,
            Err(e) => {
                debug!("Handler error: {}", e);
                Response::error(request_id, e.to_string())
            }
        };

        send_response(&mut stream, &response).await?;
    }

    debug!("Connection closed by peer");
    Ok(())
}

async fn send_response(stream: &mut TcpStream, response: &Response) -> Result<()> {
    let encoded = JsonCodec::encode_response(response)?;
    write_frame(stream, &encoded)
        .await
        .map_err(|e| FanoutError::Connection(format!("Failed to send response: {}", e)))
}
