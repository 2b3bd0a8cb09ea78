//! Error surface of the AT transaction queue.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Failures reported by [`super::AtQueue`] and query construction.
#[derive(Debug, Clone, Error)]
pub enum AtError {
    /// The reply did not match before the query deadline.
    #[error("no reply to '{command}' within {timeout:?}")]
    Timeout {
        /// Command text without the line terminator.
        command: String,
        /// Deadline that expired.
        timeout: Duration,
    },
    /// The channel failed; the queue stays failed until resumed.
    #[error("AT channel failure: {message}")]
    Io {
        /// Description of the underlying I/O error.
        message: String,
    },
    /// The response pattern did not compile.
    #[error("invalid response pattern: {message}")]
    Pattern {
        /// Compiler diagnostic.
        message: String,
    },
    /// The queue was shut down while the query waited.
    #[error("AT queue closed")]
    Closed,
}

impl AtError {
    pub(crate) fn io(error: &io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}

impl From<regex::Error> for AtError {
    fn from(error: regex::Error) -> Self {
        Self::Pattern {
            message: error.to_string(),
        }
    }
}
