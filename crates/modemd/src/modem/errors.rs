//! Modem-level failures and the numeric codes reported to clients.

use thiserror::Error;

use crate::at::AtError;
use crate::discovery::DiscoveryError;
use crate::qmi::QmiError;

/// Sticky error codes returned by `modem_get_last_error`.
pub mod codes {
    /// The last operation succeeded.
    pub const NONE: i32 = -1;
    /// Channel or device I/O failed.
    pub const IO: i32 = 5;
    /// The port has no usable device.
    pub const NO_DEVICE: i32 = 19;
    /// The request payload was rejected.
    pub const INVALID_ARGUMENT: i32 = 22;
    /// The modem replied with something the parser did not expect.
    pub const PROTOCOL: i32 = 71;
    /// The model does not implement the operation.
    pub const NOT_SUPPORTED: i32 = 95;
    /// The modem did not reply in time.
    pub const TIMEOUT: i32 = 110;
    /// The modem is held by registration or a background scan.
    pub const BUSY: i32 = 258;
}

/// Failures of operations on an open modem.
#[derive(Debug, Error)]
pub enum ModemError {
    /// The resolved profile leaves the operation unbound.
    #[error("operation '{operation}' is not supported by this modem")]
    NotSupported {
        /// Operation name.
        operation: &'static str,
    },
    /// A privileged call was refused while the modem is locked.
    #[error("modem is busy")]
    Busy,
    /// A background operator scan is already running.
    #[error("operator scan already running")]
    ScanRunning,
    /// The port could not be bound to a device.
    #[error("no usable modem at port '{port}'")]
    DeviceNotFound {
        /// Requested port.
        port: String,
    },
    /// Device inspection failed.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    /// The request could not be turned into a modem command.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Why the argument was rejected.
        reason: String,
    },
    /// The AT exchange failed.
    #[error(transparent)]
    At(#[from] AtError),
    /// The QMI exchange failed.
    #[error(transparent)]
    Qmi(#[from] QmiError),
    /// The reply matched but its content could not be interpreted.
    #[error("unexpected reply to '{command}': {detail}")]
    Unexpected {
        /// Command that produced the reply.
        command: &'static str,
        /// What was wrong with it.
        detail: String,
    },
    /// Writing the scan result file failed.
    #[error("failed to write scan result '{path}': {message}")]
    ScanOutput {
        /// Output file.
        path: String,
        /// Underlying failure.
        message: String,
    },
}

impl ModemError {
    /// Numeric code recorded as the handle's last error.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::NotSupported { .. } => codes::NOT_SUPPORTED,
            Self::Busy | Self::ScanRunning => codes::BUSY,
            Self::DeviceNotFound { .. } | Self::Discovery(_) => codes::NO_DEVICE,
            Self::InvalidArgument { .. } | Self::At(AtError::Pattern { .. }) => {
                codes::INVALID_ARGUMENT
            }
            Self::At(AtError::Timeout { .. }) => codes::TIMEOUT,
            Self::At(AtError::Io { .. } | AtError::Closed)
            | Self::Qmi(_)
            | Self::ScanOutput { .. } => codes::IO,
            Self::Unexpected { .. } => codes::PROTOCOL,
        }
    }

    pub(crate) fn unexpected(command: &'static str, detail: impl Into<String>) -> Self {
        Self::Unexpected {
            command,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;

    #[rstest]
    #[case(ModemError::NotSupported { operation: "get_cell_id" }, codes::NOT_SUPPORTED)]
    #[case(ModemError::Busy, codes::BUSY)]
    #[case(ModemError::ScanRunning, codes::BUSY)]
    #[case(
        ModemError::At(AtError::Timeout { command: String::from("AT"), timeout: Duration::from_secs(5) }),
        codes::TIMEOUT
    )]
    #[case(ModemError::At(AtError::Io { message: String::from("gone") }), codes::IO)]
    #[case(ModemError::At(AtError::Closed), codes::IO)]
    #[case(ModemError::Qmi(QmiError::Sdk { operation: "imei", code: 3 }), codes::IO)]
    #[case(ModemError::unexpected("AT+CSQ", "rssi"), codes::PROTOCOL)]
    #[case(ModemError::InvalidArgument { reason: String::from("pin") }, codes::INVALID_ARGUMENT)]
    fn errors_map_to_codes(#[case] error: ModemError, #[case] code: i32) {
        assert_eq!(error.code(), code);
    }
}
