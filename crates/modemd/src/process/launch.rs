//! Supervises daemon launch sequencing and runtime orchestration.

use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::StructuredHealthReporter;
use crate::bootstrap::{
    ConfigLoader, HardwareProvider, StaticConfigLoader, SystemConfigLoader, SystemHardware,
    bootstrap_with,
};
use crate::health::HealthReporter;
use crate::session::SessionHandler;
use crate::transport::{ListenerHandle, SocketListener};

use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};
use super::{PROCESS_TARGET, SHUTDOWN_TIMEOUT};

/// Process-level collaborators needed to control daemon lifecycle.
pub(crate) struct ProcessControl<S> {
    pub(crate) shutdown: S,
    pub(crate) shutdown_timeout: Duration,
}

/// Service dependencies required to construct the daemon runtime.
pub(crate) struct ServiceDeps<L, H> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) hardware: H,
}

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<L, H, S> {
    pub(crate) process: ProcessControl<S>,
    pub(crate) services: ServiceDeps<L, H>,
}

/// Runs the daemon in the foreground using the production collaborators.
pub fn run_daemon() -> Result<(), LaunchError> {
    let plan = LaunchPlan {
        process: ProcessControl {
            shutdown: SystemShutdownSignal::new(),
            shutdown_timeout: SHUTDOWN_TIMEOUT,
        },
        services: ServiceDeps {
            loader: SystemConfigLoader,
            reporter: Arc::new(StructuredHealthReporter::new()),
            hardware: SystemHardware,
        },
    };
    run_daemon_with(plan)
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<L, H, S>(plan: LaunchPlan<L, H, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    H: HardwareProvider,
    S: ShutdownSignal,
{
    let LaunchPlan { process, services } = plan;
    let ProcessControl {
        shutdown,
        shutdown_timeout,
    } = process;
    let ServiceDeps {
        loader,
        reporter,
        hardware,
    } = services;

    info!(target: PROCESS_TARGET, pid = std::process::id(), "starting daemon runtime");
    let config = loader.load()?;
    config.daemon_socket().prepare_filesystem()?;
    let listener = SocketListener::bind(config.daemon_socket())?;

    let static_loader = StaticConfigLoader::new(config);
    let daemon = bootstrap_with(&static_loader, reporter, &hardware)?;
    let handler = Arc::new(SessionHandler::new(daemon.registry()));

    let listener_handle = listener.start(handler)?;
    info!(
        target: PROCESS_TARGET,
        socket = %daemon.config().daemon_socket(),
        "daemon ready"
    );
    let waited = shutdown.wait();
    listener_handle.shutdown();
    join_listener(listener_handle, shutdown_timeout)?;
    waited?;
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}

/// Joins the accept loop, giving up once `budget` has elapsed.
fn join_listener(handle: ListenerHandle, budget: Duration) -> Result<(), LaunchError> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        drop(sender.send(handle.join()));
    });
    match receiver.recv_timeout(budget) {
        Ok(result) => Ok(result?),
        Err(_) => {
            warn!(
                target: PROCESS_TARGET,
                budget_ms = budget.as_millis(),
                "listener did not stop in time"
            );
            Ok(())
        }
    }
}
