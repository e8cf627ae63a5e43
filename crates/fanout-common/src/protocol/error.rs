use thiserror::Error;

/// Error taxonomy shared by every Fanout component.
///
/// Build failures reported by the compiler are *not* errors: they travel as
/// text inside a successful [`BuildResponse`](super::BuildResponse).
#[derive(Error, Debug)]
pub enum FanoutError {
    /// Invalid startup configuration, such as an empty endpoint pool. Fatal.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The remote call could not complete.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// Every endpoint failed the health filter within one selection attempt.
    #[error("No healthy target after {attempts} attempts")]
    NoHealthyTarget { attempts: usize },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FanoutError {
    /// Returns `true` for failures of the channel itself: dialing, I/O,
    /// timeouts, and responses that could not be read.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FanoutError::Transport(_)
                | FanoutError::Connection(_)
                | FanoutError::Timeout(_)
                | FanoutError::InvalidResponse(_)
                | FanoutError::JsonSerialization(_)
                | FanoutError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FanoutError>;
