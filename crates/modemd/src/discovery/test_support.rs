//! In-memory device tree for tests.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use camino::Utf8PathBuf;
use modem_rpc::DeviceInfo;

use super::{DeviceEnumerator, DiscoveryError};

struct Binding {
    node: Utf8PathBuf,
    after_wakes: u32,
}

#[derive(Default)]
struct Tree {
    devices: Vec<DeviceInfo>,
    bindings: HashMap<(String, u8), Binding>,
    wakes: HashMap<String, u32>,
}

/// Enumerator over devices attached by the test.
#[derive(Default)]
pub(crate) struct FakeEnumerator {
    tree: Mutex<Tree>,
}

impl FakeEnumerator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn tree(&self) -> std::sync::MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn attach(&self, port: &str, vendor_id: u16, product_id: u16, product: &str) {
        let mut tree = self.tree();
        tree.devices.push(DeviceInfo {
            port: port.to_owned(),
            vendor_id,
            product_id,
            manufacturer: String::from("Vendor Inc."),
            product: product.to_owned(),
        });
        tree.devices.sort_by(|left, right| left.port.cmp(&right.port));
    }

    pub(crate) fn bind(&self, port: &str, interface: u8, node: &str) {
        self.bind_after_wakes(port, interface, node, 0);
    }

    /// Node appears only once the port has been woken `after_wakes` times.
    pub(crate) fn bind_after_wakes(&self, port: &str, interface: u8, node: &str, after_wakes: u32) {
        self.tree().bindings.insert(
            (port.to_owned(), interface),
            Binding {
                node: Utf8PathBuf::from(node),
                after_wakes,
            },
        );
    }

    /// Unplugs the device and every node it exposed.
    pub(crate) fn detach(&self, port: &str) {
        let mut tree = self.tree();
        tree.devices.retain(|device| device.port != port);
        tree.bindings.retain(|(bound, _), _| bound != port);
    }

    pub(crate) fn wakes(&self, port: &str) -> u32 {
        self.tree().wakes.get(port).copied().unwrap_or(0)
    }
}

impl DeviceEnumerator for FakeEnumerator {
    fn devices(&self) -> Result<Vec<DeviceInfo>, DiscoveryError> {
        Ok(self.tree().devices.clone())
    }

    fn device_info(&self, port: &str) -> Result<DeviceInfo, DiscoveryError> {
        self.tree()
            .devices
            .iter()
            .find(|device| device.port == port)
            .cloned()
            .ok_or_else(|| DiscoveryError::NotFound {
                port: port.to_owned(),
            })
    }

    fn interface_node(
        &self,
        port: &str,
        interface: u8,
    ) -> Result<Option<Utf8PathBuf>, DiscoveryError> {
        let tree = self.tree();
        let woken = tree.wakes.get(port).copied().unwrap_or(0);
        Ok(tree
            .bindings
            .get(&(port.to_owned(), interface))
            .filter(|binding| woken >= binding.after_wakes)
            .map(|binding| binding.node.clone()))
    }

    fn wake(&self, port: &str) -> Result<(), DiscoveryError> {
        *self.tree().wakes.entry(port.to_owned()).or_default() += 1;
        Ok(())
    }
}
