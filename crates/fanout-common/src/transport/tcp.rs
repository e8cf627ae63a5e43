use std::time::Duration;

use tokio::net::TcpStream;
use tracing::debug;

use crate::protocol::error::{FanoutError, Result};
use crate::protocol::{Request, Response};
use crate::transport::codec::{read_frame, write_frame, JsonCodec};

/// Default bound on opening a TCP connection (5 seconds)
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Async TCP transport for the RPC channel.
///
/// Every [`call`](TcpTransport::call) opens a fresh connection, sends one
/// request, reads one response and drops the connection, whatever the outcome.
///
/// # Example
///
/// ```no_run
/// use fanout_common::transport::TcpTransport;
/// use fanout_common::BuildTask;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = TcpTransport::new();
/// let request = BuildTask::new("C", "main.c").to_request()?;
/// let response = transport.call("127.0.0.1:9001", &request).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TcpTransport {
    connect_timeout: Duration,
    call_timeout: Option<Duration>,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            call_timeout: None,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Bounds the request/response exchange once connected. Unbounded by default.
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Connects to a remote endpoint.
    ///
    /// Resolves `addr` and tries each resolved address until one accepts, all
    /// within the connect timeout.
    pub async fn connect(&self, addr: &str) -> Result<TcpStream> {
        tokio::time::timeout(self.connect_timeout, Self::connect_any(addr))
            .await
            .map_err(|_| FanoutError::Timeout(self.connect_timeout.as_millis() as u64))?
    }

    async fn connect_any(addr: &str) -> Result<TcpStream> {
        let socket_addrs = tokio::net::lookup_host(addr)
            .await
            .map_err(|e| FanoutError::Connection(format!("Invalid address '{}': {}", addr, e)))?;

        let mut last_err = None;
        for socket_addr in socket_addrs {
            match TcpStream::connect(socket_addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }

        Err(FanoutError::Connection(format!(
            "Failed to connect to {}: {}",
            addr,
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string())
        )))
    }

    /// Sends a request on an open stream and waits for its response.
    pub async fn send_request(
        &self,
        stream: &mut TcpStream,
        request: &Request,
    ) -> Result<Response> {
        let exchange = Self::exchange(stream, request);
        match self.call_timeout {
            Some(timeout) => tokio::time::timeout(timeout, exchange)
                .await
                .map_err(|_| FanoutError::Timeout(timeout.as_millis() as u64))?,
            None => exchange.await,
        }
    }

    /// Opens a connection to `addr`, performs one request/response exchange and
    /// closes the connection.
    pub async fn call(&self, addr: &str, request: &Request) -> Result<Response> {
        let mut stream = self.connect(addr).await?;
        debug!("Connected to {} for {}", addr, request.method);
        self.send_request(&mut stream, request).await
    }

    async fn exchange(stream: &mut TcpStream, request: &Request) -> Result<Response> {
        let encoded = JsonCodec::encode_request(request)?;
        write_frame(stream, &encoded)
            .await
            .map_err(|e| Self::map_io_error(e, "sending request"))?;

        let data = read_frame(stream)
            .await?
            .ok_or_else(|| {
                FanoutError::Connection("Connection closed before response".to_string())
            })?;

        JsonCodec::decode_response(&data)
    }

    /// Maps I/O errors onto the transport taxonomy.
    fn map_io_error(err: std::io::Error, context: &str) -> FanoutError {
        match err.kind() {
            std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::NotConnected => {
                FanoutError::Connection(format!("{}: Connection lost", context))
            }
            _ => FanoutError::Io(err),
        }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}
