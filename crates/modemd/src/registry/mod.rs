//! Capability registry.
//!
//! Maps a USB vendor/product identity to a static [`DeviceProfile`] and turns
//! a port into an opened [`ModemHandle`] with its channels bound.

pub mod generic;
pub mod huawei;
mod profile;
pub mod sierra;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;

use camino::Utf8PathBuf;
use modem_config::{AtTimeouts, WakeupPolicy};
use modem_rpc::DeviceInfo;
use tracing::{debug, info, warn};

use crate::at::{AtChannel, AtError, AtQueue, ChannelOpener, QueueOptions};
use crate::discovery::{DeviceEnumerator, DiscoveryError, FindCursor};
use crate::modem::{ModemContext, ModemError, ModemHandle};
use crate::qmi::{QmiSession, QmiTransport};

pub use profile::{DeviceProfile, Interface, Op, Operations, PinOp, Protocol, TextOp, WwanProfileOp};

const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Models with dedicated profiles.
pub static PROFILES: [&DeviceProfile; 3] = [&huawei::E1550, &sierra::MC7700, &sierra::MC7750];

/// Profile registered for the identity, if any.
#[must_use]
pub fn lookup(vendor_id: u16, product_id: u16) -> Option<&'static DeviceProfile> {
    PROFILES
        .iter()
        .copied()
        .find(|profile| profile.matches(vendor_id, product_id))
}

/// Profile for the identity, falling back to the generic AT profile.
#[must_use]
pub fn resolve(vendor_id: u16, product_id: u16) -> &'static DeviceProfile {
    lookup(vendor_id, product_id).unwrap_or(&generic::PROFILE)
}

/// Attached device located on a port.
struct Located {
    info: DeviceInfo,
    profile: &'static DeviceProfile,
    at_node: Option<Utf8PathBuf>,
}

/// Opens modems by port using injected hardware collaborators.
pub struct ModemRegistry {
    enumerator: Arc<dyn DeviceEnumerator>,
    opener: Arc<dyn ChannelOpener>,
    qmi: Option<Arc<dyn QmiTransport>>,
    wakeup: WakeupPolicy,
    timeouts: AtTimeouts,
    next_id: AtomicU32,
}

impl std::fmt::Debug for ModemRegistry {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ModemRegistry")
            .field("qmi", &self.qmi.is_some())
            .field("wakeup", &self.wakeup)
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl ModemRegistry {
    /// Builds a registry without a QMI transport.
    #[must_use]
    pub fn new(
        enumerator: Arc<dyn DeviceEnumerator>,
        opener: Arc<dyn ChannelOpener>,
        wakeup: WakeupPolicy,
        timeouts: AtTimeouts,
    ) -> Self {
        Self {
            enumerator,
            opener,
            qmi: None,
            wakeup,
            timeouts,
            next_id: AtomicU32::new(1),
        }
    }

    /// Supplies the transport used for profiles that declare QMI.
    #[must_use]
    pub fn with_qmi(mut self, transport: Arc<dyn QmiTransport>) -> Self {
        self.qmi = Some(transport);
        self
    }

    /// Snapshot of attached devices with a dedicated profile.
    pub fn find_cursor(&self) -> Result<FindCursor, DiscoveryError> {
        let devices = self
            .enumerator
            .devices()?
            .into_iter()
            .filter(|device| lookup(device.vendor_id, device.product_id).is_some())
            .collect();
        Ok(FindCursor::new(devices))
    }

    /// Opens the modem on `port`, waking it if its AT interface is absent.
    pub fn open_by_port(&self, port: &str) -> Result<ModemHandle, ModemError> {
        let located = self.locate(port)?;
        let profile = located.profile;

        let at = match located.at_node {
            Some(node) => Some(Arc::new(self.open_queue(&node)?)),
            None => None,
        };
        let qmi = self.open_qmi(port, profile)?;
        let context = ModemContext::new(at, qmi, self.timeouts);

        let mut id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if id == 0 {
            id = self.next_id.fetch_add(1, Ordering::Relaxed);
        }
        let mut handle = ModemHandle::new(id, port, located.info, profile, context);
        if profile.registration_watch {
            handle.start_registration_watch()?;
        }
        info!(
            target: REGISTRY_TARGET,
            id,
            port,
            model = profile.model,
            "modem opened"
        );
        Ok(handle)
    }

    /// Rebinds the handle's AT queue to a freshly opened channel.
    ///
    /// Submissions issued meanwhile wait for the new channel. When no
    /// channel can be opened the queue is left failed, so later submissions
    /// report an I/O error at once.
    pub fn reload(&self, handle: &ModemHandle) -> Result<(), ModemError> {
        let Some(queue) = handle.context().at_queue() else {
            return Ok(());
        };
        queue.suspend();
        let rebound = self.open_at_channel(handle.port()).and_then(|(node, channel)| {
            queue.resume(channel)?;
            Ok(node)
        });
        match rebound {
            Ok(node) => {
                info!(
                    target: REGISTRY_TARGET,
                    port = handle.port(),
                    node = %node,
                    "AT channel rebound"
                );
                Ok(())
            }
            Err(error) => {
                queue.fail(format!("reload of {} failed: {error}", handle.port()));
                Err(error)
            }
        }
    }

    fn open_at_channel(&self, port: &str) -> Result<(Utf8PathBuf, Box<dyn AtChannel>), ModemError> {
        let located = self.locate(port)?;
        let node = located.at_node.ok_or_else(|| ModemError::DeviceNotFound {
            port: port.to_owned(),
        })?;
        let channel = self
            .opener
            .open(&node)
            .map_err(|error| AtError::io(&error))?;
        Ok((node, channel))
    }

    fn locate(&self, port: &str) -> Result<Located, ModemError> {
        let mut attempt = 0;
        loop {
            if let Some(located) = self.probe(port)? {
                return Ok(located);
            }
            if attempt >= self.wakeup.attempts {
                return Err(ModemError::DeviceNotFound {
                    port: port.to_owned(),
                });
            }
            attempt += 1;
            debug!(target: REGISTRY_TARGET, port, attempt, "waking port");
            if let Err(error) = self.enumerator.wake(port) {
                warn!(target: REGISTRY_TARGET, port, error = %error, "wake-up request failed");
            }
            thread::sleep(self.wakeup.delay);
        }
    }

    fn probe(&self, port: &str) -> Result<Option<Located>, ModemError> {
        let info = match self.enumerator.device_info(port) {
            Ok(info) => info,
            Err(DiscoveryError::NotFound { .. }) => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        let profile = resolve(info.vendor_id, info.product_id);
        let at_node = match profile.interface(Protocol::At) {
            Some(interface) => match self.enumerator.interface_node(port, interface)? {
                Some(node) => Some(node),
                None => return Ok(None),
            },
            None => None,
        };
        Ok(Some(Located {
            info,
            profile,
            at_node,
        }))
    }

    fn open_queue(&self, node: &Utf8PathBuf) -> Result<AtQueue, ModemError> {
        let channel = self
            .opener
            .open(node)
            .map_err(|error| AtError::io(&error))?;
        let name = node.file_name().unwrap_or(node.as_str());
        Ok(AtQueue::open(channel, QueueOptions::named(name))?)
    }

    fn open_qmi(
        &self,
        port: &str,
        profile: &DeviceProfile,
    ) -> Result<Option<Arc<QmiSession>>, ModemError> {
        let Some(interface) = profile.interface(Protocol::Qmi) else {
            return Ok(None);
        };
        let Some(transport) = &self.qmi else {
            debug!(target: REGISTRY_TARGET, port, "no QMI transport; QMI operations unavailable");
            return Ok(None);
        };
        let Some(node) = self.enumerator.interface_node(port, interface)? else {
            warn!(target: REGISTRY_TARGET, port, interface, "QMI interface has no device node");
            return Ok(None);
        };
        let session = QmiSession::open(Arc::clone(transport), node.as_str())?;
        Ok(Some(Arc::new(session)))
    }
}
