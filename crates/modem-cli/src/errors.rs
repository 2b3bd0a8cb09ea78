//! Error types for the CLI runtime and the RPC client.

use std::io;
use std::sync::Arc;

use modem_rpc::{FrameError, PayloadError};
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to connect to modemd at {endpoint}: {source}")]
    Connect { endpoint: String, source: io::Error },
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

/// Failures talking to the daemon.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be written.
    #[error("failed to send '{function}': {source}")]
    Send {
        /// Function being called.
        function: &'static str,
        /// Codec or socket error.
        #[source]
        source: FrameError,
    },
    /// The reply could not be read.
    #[error("failed to read reply to '{function}': {source}")]
    Receive {
        /// Function being called.
        function: &'static str,
        /// Codec or socket error.
        #[source]
        source: FrameError,
    },
    /// The daemon hung up before replying.
    #[error("modemd closed the connection during '{function}'")]
    Closed {
        /// Function being called.
        function: &'static str,
    },
    /// The reply named a different function.
    #[error("reply to '{function}' was labelled '{received}'")]
    Mismatch {
        /// Function being called.
        function: &'static str,
        /// Name carried by the reply.
        received: String,
    },
    /// The daemon answered with the empty failure payload.
    #[error("modemd reported failure for '{function}'")]
    Failed {
        /// Function being called.
        function: &'static str,
    },
    /// The success payload did not match the function's schema.
    #[error("malformed reply to '{function}': {source}")]
    Decode {
        /// Function being called.
        function: &'static str,
        /// Schema violation.
        #[source]
        source: PayloadError,
    },
}

impl ClientError {
    /// Whether the daemon answered and reported failure, leaving the
    /// connection usable.
    #[must_use]
    pub fn is_refusal(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
