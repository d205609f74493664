//! Transfer error type used for retry classification.

use std::fmt;

/// Error returned by a single transfer (curl failure, HTTP error, short body,
/// disk failure or cancellation).
#[derive(Debug)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection reset, DNS, ...).
    Curl(curl::Error),
    /// HTTP response had a non-2xx status.
    Http(u32),
    /// Server announced `expected` bytes but the stream ended after `received`.
    PartialTransfer { expected: u64, received: u64 },
    /// Writing the body to disk failed. Not retried.
    Storage(std::io::Error),
    /// The run was cancelled while the transfer was in flight.
    Cancelled,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Curl(e) => write!(f, "{}", e),
            FetchError::Http(code) => write!(f, "HTTP {}", code),
            FetchError::PartialTransfer { expected, received } => {
                write!(f, "partial transfer: expected {} bytes, got {}", expected, received)
            }
            FetchError::Storage(e) => write!(f, "storage: {}", e),
            FetchError::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Curl(e) => Some(e),
            FetchError::Storage(e) => Some(e),
            FetchError::Http(_) | FetchError::PartialTransfer { .. } | FetchError::Cancelled => None,
        }
    }
}

impl From<curl::Error> for FetchError {
    fn from(e: curl::Error) -> Self {
        FetchError::Curl(e)
    }
}
