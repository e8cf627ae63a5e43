pub mod build;
pub mod error;
pub mod requests;
pub mod responses;

pub use build::{BuildResponse, BuildTask, BUILD_METHOD, INFO_METHOD, METRICS_METHOD};
pub use error::{FanoutError, Result};
pub use requests::{MethodName, Request, RequestId, RpcArgs};
pub use responses::{Response, RpcResult};
