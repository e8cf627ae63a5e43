//! Build task types carried by the `build` RPC.

use serde::{Deserialize, Serialize};

use super::error::{FanoutError, Result};
use super::{Request, Response};

/// Method name of the build operation, served by workers and the coordinator.
pub const BUILD_METHOD: &str = "build";
/// Built-in method returning server type, version and uptime.
pub const INFO_METHOD: &str = "_info";
/// Built-in method returning dispatch counters.
pub const METRICS_METHOD: &str = "_metrics";

/// A compilation task: a language tag and the source file or directory to
/// compile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildTask {
    /// Language tag, e.g. `"C"`, `"C++"`, `"Objective-C"`
    pub language: String,
    /// Source file or directory path as seen by the worker
    pub source: String,
}

impl BuildTask {
    pub fn new(language: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            source: source.into(),
        }
    }

    /// Wraps the task in a `build` request.
    pub fn to_request(&self) -> Result<Request> {
        Ok(Request::new(BUILD_METHOD, serde_json::to_value(self)?))
    }

    /// Extracts a task from the arguments of a `build` request.
    pub fn from_request(request: &Request) -> Result<Self> {
        serde_json::from_value(request.args.clone())
            .map_err(|e| FanoutError::InvalidRequest(format!("Malformed build task: {}", e)))
    }
}

/// Result of a build: the compiler's combined output followed by a marker line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildResponse {
    pub output: String,
}

impl BuildResponse {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
        }
    }

    /// Converts the response into a JSON-RPC result payload.
    pub fn to_response(&self, id: u64) -> Result<Response> {
        Ok(Response::success(id, serde_json::to_value(self)?))
    }

    /// Extracts the build result from an RPC response.
    ///
    /// A protocol-level failure on the remote side means the call did not
    /// complete, so it is reported as a transport error.
    pub fn from_response(response: Response) -> Result<Self> {
        if !response.success {
            return Err(FanoutError::Transport(format!(
                "Remote call failed: {}",
                response.error.unwrap_or_else(|| "Unknown error".to_string())
            )));
        }

        let result = response.result.ok_or_else(|| {
            FanoutError::InvalidResponse("Missing result in success response".to_string())
        })?;

        serde_json::from_value(result)
            .map_err(|e| FanoutError::InvalidResponse(format!("Malformed build response: {}", e)))
    }
}
