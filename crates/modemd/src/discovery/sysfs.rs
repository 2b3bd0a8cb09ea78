use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use modem_rpc::DeviceInfo;
use tracing::debug;

use super::{DeviceEnumerator, DiscoveryError};

const DISCOVERY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::discovery");

/// Node layouts a USB interface directory may hold, as
/// `(subdirectory, node prefix)`.
const NODE_LAYOUTS: [(Option<&str>, &str); 4] = [
    (None, "ttyUSB"),
    (Some("tty"), "ttyACM"),
    (Some("qcqmi"), "qcqmi"),
    (Some("usbmisc"), "cdc-wdm"),
];

/// Enumerator reading the kernel's USB device tree.
#[derive(Debug, Clone)]
pub struct SysfsEnumerator {
    sysfs_root: Utf8PathBuf,
    device_root: Utf8PathBuf,
}

impl SysfsEnumerator {
    /// Reads devices below `sysfs_root`, mapping nodes into `device_root`.
    #[must_use]
    pub fn new(sysfs_root: impl Into<Utf8PathBuf>, device_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            sysfs_root: sysfs_root.into(),
            device_root: device_root.into(),
        }
    }

    fn port_dir(&self, port: &str) -> Utf8PathBuf {
        self.sysfs_root.join(port)
    }

    fn read_attribute(&self, port: &str, name: &str) -> Result<String, DiscoveryError> {
        let path = self.port_dir(port).join(name);
        fs::read_to_string(&path)
            .map(|value| value.trim().to_owned())
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => DiscoveryError::NotFound {
                    port: port.to_owned(),
                },
                _ => DiscoveryError::Io { path, source },
            })
    }

    fn read_id(&self, port: &str, name: &str) -> Result<u16, DiscoveryError> {
        let value = self.read_attribute(port, name)?;
        u16::from_str_radix(&value, 16).map_err(|_| DiscoveryError::InvalidAttribute {
            path: self.port_dir(port).join(name),
            value,
        })
    }

    fn read_optional(&self, port: &str, name: &str) -> String {
        self.read_attribute(port, name).unwrap_or_default()
    }

    fn interface_dir(&self, port: &str, interface: u8) -> Result<Option<Utf8PathBuf>, DiscoveryError> {
        let prefix = format!("{port}:");
        let entries = read_dir(&self.sysfs_root)?;
        Ok(entries.into_iter().find_map(|name| {
            let rest = name.strip_prefix(&prefix)?;
            let (_, number) = rest.split_once('.')?;
            (number.parse::<u8>().ok()? == interface).then(|| self.sysfs_root.join(&name))
        }))
    }
}

fn read_dir(path: &Utf8Path) -> Result<Vec<String>, DiscoveryError> {
    let to_error = |source| DiscoveryError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut names = Vec::new();
    for entry in fs::read_dir(path.as_std_path()).map_err(to_error)? {
        let entry = entry.map_err(to_error)?;
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

fn find_node(dir: &Utf8Path, prefix: &str) -> Option<String> {
    let entries = fs::read_dir(dir.as_std_path()).ok()?;
    let mut matches: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with(prefix))
        .collect();
    matches.sort();
    matches.into_iter().next()
}

impl DeviceEnumerator for SysfsEnumerator {
    fn devices(&self) -> Result<Vec<DeviceInfo>, DiscoveryError> {
        let mut devices = Vec::new();
        for name in read_dir(&self.sysfs_root)? {
            if name.contains(':') || !self.port_dir(&name).join("idVendor").is_file() {
                continue;
            }
            match self.device_info(&name) {
                Ok(info) => devices.push(info),
                Err(error) => {
                    debug!(target: DISCOVERY_TARGET, port = %name, error = %error, "skipping device");
                }
            }
        }
        Ok(devices)
    }

    fn device_info(&self, port: &str) -> Result<DeviceInfo, DiscoveryError> {
        Ok(DeviceInfo {
            port: port.to_owned(),
            vendor_id: self.read_id(port, "idVendor")?,
            product_id: self.read_id(port, "idProduct")?,
            manufacturer: self.read_optional(port, "manufacturer"),
            product: self.read_optional(port, "product"),
        })
    }

    fn interface_node(
        &self,
        port: &str,
        interface: u8,
    ) -> Result<Option<Utf8PathBuf>, DiscoveryError> {
        let Some(dir) = self.interface_dir(port, interface)? else {
            return Ok(None);
        };
        Ok(NODE_LAYOUTS.iter().find_map(|(subdir, prefix)| {
            let search = subdir.map_or_else(|| dir.clone(), |subdir| dir.join(subdir));
            find_node(&search, prefix).map(|node| self.device_root.join(node))
        }))
    }

    fn wake(&self, port: &str) -> Result<(), DiscoveryError> {
        let path = self.port_dir(port).join("power").join("control");
        debug!(target: DISCOVERY_TARGET, port, "waking device");
        fs::write(path.as_std_path(), b"on").map_err(|source| DiscoveryError::Io { path, source })
    }
}
