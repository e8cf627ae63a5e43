//! Fanout Common Types and Transport
//!
//! Shared protocol definitions, error taxonomy and TCP transport used by every
//! Fanout component.
//!
//! # Overview
//!
//! Fanout spreads work across a fixed pool of remote endpoints. Two subsystems
//! sit on top of this crate:
//!
//! - **Build path**: a coordinator forwards [`BuildTask`]s over an RPC channel
//!   to worker processes that run a compiler.
//! - **Traffic path**: a reverse-proxy balancer forwards HTTP requests to
//!   backend servers. It only uses the error taxonomy from here.
//!
//! # Wire Protocol
//!
//! - **Transport**: TCP, one connection per call on the build path
//! - **Serialization**: JSON
//! - **Message Format**: `[4-byte length prefix as u32 big-endian] + [JSON data]`
//! - **Max Message Size**: 100 MB
//!
//! # Example
//!
//! ```
//! use fanout_common::{BuildTask, BuildResponse, Response};
//!
//! let task = BuildTask::new("C", "hello.c");
//! let request = task.to_request().unwrap();
//! assert_eq!(request.method, "build");
//!
//! let response = Response::success(request.id, serde_json::json!({"output": "ok"}));
//! let result = BuildResponse::from_response(response).unwrap();
//! assert_eq!(result.output, "ok");
//! ```

pub mod protocol;
pub mod transport;

pub use protocol::*;
