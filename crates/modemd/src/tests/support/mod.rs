//! Test harness utilities for the daemon behavioural suites.

mod config_loader;
mod hardware;
mod reporter;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use hardware::{BrokenHardware, FakeHardware};
pub use reporter::{HealthEvent, RecordingHealthReporter};
