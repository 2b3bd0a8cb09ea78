//! Modem daemon.
//!
//! `modemd` owns every attached USB cellular modem and serves short-lived
//! clients over a local Unix socket. Each connection gets its own
//! [`session::ClientSession`], which decodes framed requests, resolves them
//! against a static function table, and drives one opened
//! [`modem::ModemHandle`].
//!
//! A handle dispatches every abstract operation through the operation table
//! of the [`registry::DeviceProfile`] matched by USB identity. Most operations
//! are AT transactions served by an [`at::AtQueue`]; models with a QMI
//! interface route some of them through an injected [`qmi::QmiTransport`].
//!
//! Startup follows a fixed order: load configuration, install telemetry,
//! prepare the socket directory, build the registry, bind the listener, then
//! block until a termination signal arrives. Health hooks report each stage.

pub mod at;
mod bootstrap;
pub mod discovery;
mod health;
pub mod modem;
mod process;
pub mod qmi;
pub mod registry;
pub mod session;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, HardwareProvider, StaticConfigLoader,
    SystemConfigLoader, SystemHardware, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{ConnectionHandler, ListenerError, ListenerHandle, SocketListener};

#[cfg(test)]
mod tests;
