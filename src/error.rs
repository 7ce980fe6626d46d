//! Error types for the sieve pipeline

use std::fmt;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while building or running the pipeline
#[derive(Debug, Clone)]
pub enum Error {
    /// Channel send error
    SendError(String),

    /// Channel receive error
    ReceiveError(String),

    /// A frame of an unexpected variant arrived at a receive site
    Protocol(String),

    /// A stage thread panicked
    StagePanicked(String),

    /// Invalid configuration
    InvalidConfig(String),

    /// Other error
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SendError(msg) => write!(f, "Channel send error: {}", msg),
            Error::ReceiveError(msg) => write!(f, "Channel receive error: {}", msg),
            Error::Protocol(msg) => write!(f, "Protocol violation: {}", msg),
            Error::StagePanicked(msg) => write!(f, "Stage panicked: {}", msg),
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl<T> From<flume::SendError<T>> for Error {
    fn from(err: flume::SendError<T>) -> Self {
        Error::SendError(err.to_string())
    }
}

impl From<flume::RecvError> for Error {
    fn from(err: flume::RecvError) -> Self {
        Error::ReceiveError(err.to_string())
    }
}

impl<T> From<crossbeam::channel::SendError<T>> for Error {
    fn from(err: crossbeam::channel::SendError<T>) -> Self {
        Error::SendError(err.to_string())
    }
}

impl From<crossbeam::channel::RecvError> for Error {
    fn from(err: crossbeam::channel::RecvError) -> Self {
        Error::ReceiveError(err.to_string())
    }
}
