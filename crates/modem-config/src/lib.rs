//! Shared configuration for the modem daemon and its command-line client.
//!
//! Values are layered by `ortho_config`: built-in defaults, then a TOML file
//! (`--config-path` or `MODEMD_CONFIG_PATH`), then `MODEMD_*` environment
//! variables, then command-line flags.

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;
mod policy;
mod socket;

pub use defaults::*;
pub use logging::{LogFormat, LogFormatParseError};
pub use policy::{AtTimeouts, WakeupPolicy};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Resolved configuration for `modemd` and `modem_cli`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "MODEMD")]
pub struct Config {
    /// Control socket the daemon listens on and clients connect to.
    #[serde(default = "default_socket_endpoint")]
    #[ortho_config(default = default_socket_endpoint())]
    pub daemon_socket: SocketEndpoint,
    /// `tracing` filter directive.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log output encoding.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Root of the sysfs USB device tree.
    #[serde(default = "default_sysfs_root")]
    #[ortho_config(default = default_sysfs_root())]
    pub sysfs_root: Utf8PathBuf,
    /// Directory holding device nodes.
    #[serde(default = "default_device_root")]
    #[ortho_config(default = default_device_root())]
    pub device_root: Utf8PathBuf,
    /// Wake-up attempts made for a port whose AT interface is missing.
    #[serde(default = "default_wakeup_attempts")]
    #[ortho_config(default = default_wakeup_attempts())]
    pub wakeup_attempts: u32,
    /// Pause after each wake-up attempt, in milliseconds.
    #[serde(default = "default_wakeup_delay_ms")]
    #[ortho_config(default = default_wakeup_delay_ms())]
    pub wakeup_delay_ms: u64,
    /// Deadline for ordinary AT queries, in milliseconds.
    #[serde(default = "default_at_timeout_ms")]
    #[ortho_config(default = default_at_timeout_ms())]
    pub at_timeout_ms: u64,
    /// Deadline for AT pass-through and USSD, in milliseconds.
    #[serde(default = "default_at_command_timeout_ms")]
    #[ortho_config(default = default_at_command_timeout_ms())]
    pub at_command_timeout_ms: u64,
    /// Deadline for operator scans, in milliseconds.
    #[serde(default = "default_operator_scan_timeout_ms")]
    #[ortho_config(default = default_operator_scan_timeout_ms())]
    pub operator_scan_timeout_ms: u64,
    /// Interval between registration polls, in milliseconds.
    #[serde(default = "default_registration_poll_ms")]
    #[ortho_config(default = default_registration_poll_ms())]
    pub registration_poll_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon_socket: default_socket_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            sysfs_root: default_sysfs_root(),
            device_root: default_device_root(),
            wakeup_attempts: default_wakeup_attempts(),
            wakeup_delay_ms: default_wakeup_delay_ms(),
            at_timeout_ms: default_at_timeout_ms(),
            at_command_timeout_ms: default_at_command_timeout_ms(),
            operator_scan_timeout_ms: default_operator_scan_timeout_ms(),
            registration_poll_ms: default_registration_poll_ms(),
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        <Self as OrthoConfig>::load()
    }

    /// Loads configuration from an explicit argument list.
    ///
    /// The first item is treated as the program name.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Control socket endpoint.
    #[must_use]
    pub fn daemon_socket(&self) -> &SocketEndpoint {
        &self.daemon_socket
    }

    /// `tracing` filter directive.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output encoding.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Wake-up retry policy for absent ports.
    #[must_use]
    pub fn wakeup_policy(&self) -> WakeupPolicy {
        WakeupPolicy::new(
            self.wakeup_attempts,
            Duration::from_millis(self.wakeup_delay_ms),
        )
    }

    /// AT transaction and background work deadlines.
    #[must_use]
    pub fn at_timeouts(&self) -> AtTimeouts {
        AtTimeouts {
            query: Duration::from_millis(self.at_timeout_ms),
            command: Duration::from_millis(self.at_command_timeout_ms),
            operator_scan: Duration::from_millis(self.operator_scan_timeout_ms),
            registration_poll: Duration::from_millis(self.registration_poll_ms),
        }
    }
}
