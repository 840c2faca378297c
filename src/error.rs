/// Error types for the triton-loadgen crate.
use thiserror::Error;

/// Errors that can occur while synthesizing a request payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("datatype {datatype} not supported")]
    UnsupportedDatatype { datatype: String },

    #[error("input {input} has negative dimension {dim}; variable-size inputs need a concrete shape")]
    NegativeDimension { input: String, dim: i64 },

    #[error("input {input} shape {shape:?} overflows the element count")]
    ShapeOverflow { input: String, shape: Vec<i64> },
}

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    /// The request never produced a response (connect, write, read or timeout).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The server answered with something other than 200 OK.
    #[error("Unexpected status {status}\n{body}")]
    Status { status: u16, body: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task error: {0}")]
    Task(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// True for failures where no response was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, AppError::Http(_))
    }

    /// True for failures where the server responded with a non-200 status.
    pub fn is_status(&self) -> bool {
        matches!(self, AppError::Status { .. })
    }
}
