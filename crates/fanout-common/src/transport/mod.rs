//! Fanout Transport Layer
//!
//! TCP transport for the build path's RPC channel.
//!
//! # Components
//!
//! - **[`JsonCodec`]**: Encode/decode protocol messages to JSON
//! - **[`TcpTransport`]**: Async TCP client transport (used by the coordinator and clients)
//! - **[`TcpServer`]**: Async TCP server (used by workers and the coordinator)
//!
//! # Wire Format
//!
//! ```text
//! [4-byte length as u32 big-endian] [JSON data]
//! ```
//!
//! All implementations reject frames larger than [`MAX_MESSAGE_SIZE`].

pub mod codec;
pub mod tcp;
pub mod tcp_server;

pub use codec::{read_frame, write_frame, JsonCodec, MAX_MESSAGE_SIZE};
pub use tcp::{TcpTransport, DEFAULT_CONNECT_TIMEOUT};
pub use tcp_server::TcpServer;
