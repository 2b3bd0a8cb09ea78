//! Attached-device discovery.
//!
//! A [`DeviceEnumerator`] answers the hardware questions the registry asks:
//! which USB devices are attached, who made them, and which device node backs
//! each interface. [`FindCursor`] is the per-session iterator behind
//! `modem_find_first` / `modem_find_next` / `modem_find_close`.

mod sysfs;
#[cfg(test)]
pub(crate) mod test_support;

use std::collections::VecDeque;
use std::io;

use camino::Utf8PathBuf;
use modem_rpc::DeviceInfo;
use thiserror::Error;

pub use sysfs::SysfsEnumerator;

/// Errors raised while inspecting attached devices.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// No device is attached at the port.
    #[error("no USB device at port '{port}'")]
    NotFound {
        /// Requested port.
        port: String,
    },
    /// Reading device attributes failed.
    #[error("failed to read '{path}': {source}")]
    Io {
        /// Attribute or directory path.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// An attribute held an unparsable value.
    #[error("invalid value '{value}' in '{path}'")]
    InvalidAttribute {
        /// Attribute path.
        path: Utf8PathBuf,
        /// Raw value.
        value: String,
    },
}

/// Source of attached USB device information.
pub trait DeviceEnumerator: Send + Sync {
    /// Every attached USB device, in port order.
    fn devices(&self) -> Result<Vec<DeviceInfo>, DiscoveryError>;

    /// Identity of the device at `port`.
    fn device_info(&self, port: &str) -> Result<DeviceInfo, DiscoveryError>;

    /// Device node serving `interface` of the device at `port`.
    ///
    /// `Ok(None)` means the interface exists in the profile but the kernel has
    /// not bound a node for it yet.
    fn interface_node(
        &self,
        port: &str,
        interface: u8,
    ) -> Result<Option<Utf8PathBuf>, DiscoveryError>;

    /// Asks the kernel to power up the device at `port`.
    fn wake(&self, port: &str) -> Result<(), DiscoveryError>;
}

/// Snapshot of recognised devices handed out one at a time.
#[derive(Debug, Default)]
pub struct FindCursor {
    remaining: VecDeque<DeviceInfo>,
}

impl FindCursor {
    /// Builds a cursor over `devices`.
    #[must_use]
    pub fn new(devices: Vec<DeviceInfo>) -> Self {
        Self {
            remaining: devices.into(),
        }
    }

    /// Next device, or `None` once the snapshot is exhausted.
    pub fn advance(&mut self) -> Option<DeviceInfo> {
        self.remaining.pop_front()
    }
}
