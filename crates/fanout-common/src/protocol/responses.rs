//! RPC response envelope.

use super::RequestId;
use serde::{Deserialize, Serialize};

/// RPC method result (JSON value)
pub type RpcResult = serde_json::Value;

/// An RPC response returned by a worker or coordinator.
///
/// `success = false` means the call failed at the protocol level (unknown
/// method, malformed arguments). A compiler failure is still a successful
/// response whose result text ends in the failure marker.
///
/// # Example
///
/// ```
/// use fanout_common::protocol::responses::Response;
/// use serde_json::json;
///
/// let ok = Response::success(7, json!({"output": "Build successful."}));
/// assert!(ok.success);
///
/// let err = Response::error(7, "Unknown method: link");
/// assert_eq!(err.error.as_deref(), Some("Unknown method: link"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    /// Request identifier this response corresponds to
    pub id: RequestId,
    /// Result value (present on success)
    pub result: Option<RpcResult>,
    /// Error message (present on failure)
    pub error: Option<String>,
    /// Whether the request succeeded
    pub success: bool,
}

impl Response {
    /// Creates a successful response.
    pub fn success(id: RequestId, result: RpcResult) -> Self {
        Response {
            id,
            result: Some(result),
            error: None,
            success: true,
        }
    }

    /// Creates an error response.
    pub fn error(id: RequestId, error: impl Into<String>) -> Self {
        Response {
            id,
            result: None,
            error: Some(error.into()),
            success: false,
        }
    }
}
