//! Scripted hardware handed to bootstrap in place of sysfs and serial ports.

use std::sync::Arc;

use camino::Utf8PathBuf;
use modem_config::Config;
use modem_rpc::DeviceInfo;

use crate::at::ChannelOpener;
use crate::at::test_support::{ScriptedChannel, ScriptedOpener};
use crate::bootstrap::HardwareProvider;
use crate::discovery::test_support::FakeEnumerator;
use crate::discovery::{DeviceEnumerator, DiscoveryError};
use crate::registry::{self, Protocol};

/// Fake USB tree paired with scripted AT channels.
#[derive(Clone)]
pub struct FakeHardware {
    pub enumerator: Arc<FakeEnumerator>,
    pub opener: ScriptedOpener,
}

impl FakeHardware {
    #[must_use]
    pub fn new() -> Self {
        Self {
            enumerator: Arc::new(FakeEnumerator::new()),
            opener: ScriptedOpener::new(),
        }
    }

    /// Attaches a modem whose AT interface is served by a scripted channel.
    pub fn attach_modem(&self, port: &str, vendor: u16, product: u16) -> ScriptedChannel {
        let node = format!("/dev/tty-{port}");
        let interface = registry::resolve(vendor, product)
            .interface(Protocol::At)
            .expect("profile declares an AT interface");
        self.enumerator.attach(port, vendor, product, "Modem");
        self.enumerator.bind(port, interface, &node);
        let channel = ScriptedChannel::new();
        self.opener.insert(node, channel.clone());
        channel
    }
}

impl HardwareProvider for FakeHardware {
    fn enumerator(&self, _config: &Config) -> Arc<dyn DeviceEnumerator> {
        self.enumerator.clone()
    }

    fn opener(&self, _config: &Config) -> Arc<dyn ChannelOpener> {
        Arc::new(self.opener.clone())
    }
}

/// Enumerator whose device tree cannot be read.
#[derive(Debug, Default)]
struct BrokenEnumerator;

impl BrokenEnumerator {
    fn failure() -> DiscoveryError {
        DiscoveryError::Io {
            path: Utf8PathBuf::from("/sys/bus/usb/devices"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        }
    }
}

impl DeviceEnumerator for BrokenEnumerator {
    fn devices(&self) -> Result<Vec<DeviceInfo>, DiscoveryError> {
        Err(Self::failure())
    }

    fn device_info(&self, _port: &str) -> Result<DeviceInfo, DiscoveryError> {
        Err(Self::failure())
    }

    fn interface_node(
        &self,
        _port: &str,
        _interface: u8,
    ) -> Result<Option<Utf8PathBuf>, DiscoveryError> {
        Err(Self::failure())
    }

    fn wake(&self, _port: &str) -> Result<(), DiscoveryError> {
        Err(Self::failure())
    }
}

/// Hardware whose enumeration always fails.
#[derive(Debug, Default)]
pub struct BrokenHardware;

impl HardwareProvider for BrokenHardware {
    fn enumerator(&self, _config: &Config) -> Arc<dyn DeviceEnumerator> {
        Arc::new(BrokenEnumerator)
    }

    fn opener(&self, _config: &Config) -> Arc<dyn ChannelOpener> {
        Arc::new(ScriptedOpener::new())
    }
}
