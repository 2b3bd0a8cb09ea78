//! Daemon bootstrap orchestration.

use std::sync::Arc;

use modem_config::{Config, SocketPreparationError};
use modem_rpc::DeviceInfo;
use ortho_config::OrthoError;
use thiserror::Error;

use crate::at::{ChannelOpener, SerialOpener};
use crate::discovery::{DeviceEnumerator, DiscoveryError, SysfsEnumerator};
use crate::health::HealthReporter;
use crate::qmi::QmiTransport;
use crate::registry::ModemRegistry;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that hands out a configuration resolved earlier.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Supplies the hardware collaborators the registry drives.
pub trait HardwareProvider: Send + Sync {
    /// Source of attached USB devices.
    fn enumerator(&self, config: &Config) -> Arc<dyn DeviceEnumerator>;

    /// Opens AT channels on device nodes.
    fn opener(&self, config: &Config) -> Arc<dyn ChannelOpener>;

    /// Transport for QMI profiles; `None` leaves QMI operations unsupported.
    fn qmi_transport(&self, _config: &Config) -> Option<Arc<dyn QmiTransport>> {
        None
    }
}

/// Sysfs enumeration and serial device nodes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHardware;

impl HardwareProvider for SystemHardware {
    fn enumerator(&self, config: &Config) -> Arc<dyn DeviceEnumerator> {
        Arc::new(SysfsEnumerator::new(
            config.sysfs_root.clone(),
            config.device_root.clone(),
        ))
    }

    fn opener(&self, _config: &Config) -> Arc<dyn ChannelOpener> {
        Arc::new(SerialOpener)
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Socket preparation failed.
    #[error("failed to prepare daemon socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    config: Config,
    registry: Arc<ModemRegistry>,
    telemetry: TelemetryHandle,
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Daemon")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registry shared by every client session.
    #[must_use]
    pub fn registry(&self) -> Arc<ModemRegistry> {
        Arc::clone(&self.registry)
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// Loads configuration, installs telemetry, prepares the socket directory and
/// builds the registry from `hardware`. The attached modems are surveyed once
/// for the health log; a failed survey does not fail bootstrap.
pub fn bootstrap_with<H>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    hardware: &H,
) -> Result<Daemon, BootstrapError>
where
    H: HardwareProvider + ?Sized,
{
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    if let Err(source) = config.daemon_socket().prepare_filesystem() {
        let error = BootstrapError::Socket { source };
        reporter.bootstrap_failed(&error);
        return Err(error);
    }

    let mut registry = ModemRegistry::new(
        hardware.enumerator(&config),
        hardware.opener(&config),
        config.wakeup_policy(),
        config.at_timeouts(),
    );
    if let Some(transport) = hardware.qmi_transport(&config) {
        registry = registry.with_qmi(transport);
    }

    match survey(&registry) {
        Ok(devices) => reporter.modems_detected(&devices),
        Err(error) => reporter.enumeration_failed(&error),
    }
    reporter.bootstrap_succeeded(&config);

    Ok(Daemon {
        config,
        registry: Arc::new(registry),
        telemetry,
    })
}

fn survey(registry: &ModemRegistry) -> Result<Vec<DeviceInfo>, DiscoveryError> {
    let mut cursor = registry.find_cursor()?;
    Ok(std::iter::from_fn(|| cursor.advance()).collect())
}
