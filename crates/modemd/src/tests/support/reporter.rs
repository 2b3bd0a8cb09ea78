//! Test double for [`HealthReporter`] that records structured events.

use std::sync::Mutex;

use modem_config::Config;
use modem_rpc::DeviceInfo;

use crate::bootstrap::BootstrapError;
use crate::discovery::DiscoveryError;
use crate::health::HealthReporter;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    /// Ports of the recognised modems, in survey order.
    ModemsDetected(Vec<String>),
    EnumerationFailed(String),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn modems_detected(&self, devices: &[DeviceInfo]) {
        self.record(HealthEvent::ModemsDetected(
            devices.iter().map(|device| device.port.clone()).collect(),
        ));
    }

    fn enumeration_failed(&self, error: &DiscoveryError) {
        self.record(HealthEvent::EnumerationFailed(error.to_string()));
    }
}
