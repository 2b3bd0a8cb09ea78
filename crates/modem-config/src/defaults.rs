use camino::Utf8PathBuf;

use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// Control socket path used when nothing overrides it.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/modemd.ctl";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Root of the USB device tree exported by sysfs.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/bus/usb/devices";

/// Directory holding the device nodes for tty and QMI interfaces.
pub const DEFAULT_DEVICE_ROOT: &str = "/dev";

/// Number of wake-up attempts made before a port is declared absent.
pub const DEFAULT_WAKEUP_ATTEMPTS: u32 = 3;

/// Pause between wake-up attempts, in milliseconds.
pub const DEFAULT_WAKEUP_DELAY_MS: u64 = 20_000;

/// Deadline for ordinary AT transactions, in milliseconds.
pub const DEFAULT_AT_TIMEOUT_MS: u64 = 5_000;

/// Deadline for raw AT pass-through and USSD requests, in milliseconds.
pub const DEFAULT_AT_COMMAND_TIMEOUT_MS: u64 = 10_000;

/// Deadline for a full operator scan, in milliseconds.
pub const DEFAULT_OPERATOR_SCAN_TIMEOUT_MS: u64 = 180_000;

/// Interval between registration polls while a modem attaches, in milliseconds.
pub const DEFAULT_REGISTRATION_POLL_MS: u64 = 2_000;

/// Default log filter expression used by the binaries.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value for serde and `ortho_config` defaults.
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default control socket endpoint.
#[must_use]
pub fn default_socket_endpoint() -> SocketEndpoint {
    SocketEndpoint::unix(DEFAULT_SOCKET_PATH)
}

/// Default sysfs USB device root.
#[must_use]
pub fn default_sysfs_root() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_SYSFS_ROOT)
}

/// Default device node directory.
#[must_use]
pub fn default_device_root() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_DEVICE_ROOT)
}

/// Default wake-up attempt count.
#[must_use]
pub const fn default_wakeup_attempts() -> u32 {
    DEFAULT_WAKEUP_ATTEMPTS
}

/// Default wake-up delay.
#[must_use]
pub const fn default_wakeup_delay_ms() -> u64 {
    DEFAULT_WAKEUP_DELAY_MS
}

/// Default AT transaction deadline.
#[must_use]
pub const fn default_at_timeout_ms() -> u64 {
    DEFAULT_AT_TIMEOUT_MS
}

/// Default AT pass-through deadline.
#[must_use]
pub const fn default_at_command_timeout_ms() -> u64 {
    DEFAULT_AT_COMMAND_TIMEOUT_MS
}

/// Default operator scan deadline.
#[must_use]
pub const fn default_operator_scan_timeout_ms() -> u64 {
    DEFAULT_OPERATOR_SCAN_TIMEOUT_MS
}

/// Default registration poll interval.
#[must_use]
pub const fn default_registration_poll_ms() -> u64 {
    DEFAULT_REGISTRATION_POLL_MS
}
