//! Structured health reporting for daemon lifecycle events.

use std::sync::Arc;

use modem_config::Config;
use modem_rpc::DeviceInfo;

use crate::bootstrap::BootstrapError;
use crate::discovery::DiscoveryError;

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked with the recognised modems attached at startup.
    fn modems_detected(&self, devices: &[DeviceInfo]);

    /// Invoked when the startup device survey fails.
    fn enumeration_failed(&self, error: &DiscoveryError);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn modems_detected(&self, devices: &[DeviceInfo]) {
        (**self).modems_detected(devices);
    }

    fn enumeration_failed(&self, error: &DiscoveryError) {
        (**self).enumeration_failed(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: "modemd::health",
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: "modemd::health",
            event = "bootstrap_succeeded",
            socket = %config.daemon_socket(),
            sysfs_root = %config.sysfs_root,
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: "modemd::health",
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn modems_detected(&self, devices: &[DeviceInfo]) {
        tracing::info!(
            target: "modemd::health",
            event = "modems_detected",
            count = devices.len(),
            "startup device survey completed"
        );
        for device in devices {
            tracing::info!(
                target: "modemd::health",
                event = "modem_present",
                port = %device.port,
                vendor_id = device.vendor_id,
                product_id = device.product_id,
                product = %device.product,
                "recognised modem attached"
            );
        }
    }

    fn enumeration_failed(&self, error: &DiscoveryError) {
        tracing::warn!(
            target: "modemd::health",
            event = "enumeration_failed",
            error = %error,
            "startup device survey failed"
        );
    }
}
