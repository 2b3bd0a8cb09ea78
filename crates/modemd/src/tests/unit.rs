//! Unit tests for bootstrap and the launch sequence.

use std::io;
use std::os::unix::net::UnixStream;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use camino::Utf8PathBuf;
use modem_rpc::{DeviceInfo, Frame, Payload, read_frame, write_frame};
use rstest::rstest;

use crate::bootstrap::bootstrap_with;
use crate::process::launch::{LaunchPlan, ProcessControl, ServiceDeps, run_daemon_with};
use crate::process::{LaunchError, ShutdownError, ShutdownSignal};

use super::support::{
    FailingConfigLoader, FakeHardware, HealthEvent, RecordingHealthReporter, TestConfigLoader,
};

#[rstest]
fn bootstrap_builds_a_registry_over_the_supplied_hardware() {
    let loader = TestConfigLoader::new();
    let reporter = Arc::new(RecordingHealthReporter::default());
    let hardware = FakeHardware::new();
    hardware.attach_modem("2-1", 0x1199, 0x68a3);

    let daemon = bootstrap_with(&loader, reporter.clone(), &hardware).expect("bootstrap");

    let handle = daemon.registry().open_by_port("2-1").expect("open");
    assert_eq!(handle.profile().model, "MC7700");
    assert_eq!(
        reporter.events(),
        [
            HealthEvent::BootstrapStarting,
            HealthEvent::ModemsDetected(vec![String::from("2-1")]),
            HealthEvent::BootstrapSucceeded,
        ]
    );
}

/// Talks to the running daemon once, then lets it shut down.
struct ProbeThenStop {
    socket: Utf8PathBuf,
    reply: Arc<Mutex<Option<Frame>>>,
}

impl ShutdownSignal for ProbeThenStop {
    fn wait(&self) -> Result<(), ShutdownError> {
        let mut client = UnixStream::connect(&self.socket).expect("connect to daemon");
        client
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("read timeout");
        write_frame(&mut client, &Frame::query("modem_find_first", Vec::new()))
            .expect("send request");
        let reply = read_frame(&mut client).expect("read reply");
        *self.reply.lock().expect("reply mutex") = reply;
        Ok(())
    }
}

struct FailingSignal;

impl ShutdownSignal for FailingSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        Err(ShutdownError::Install {
            source: io::Error::other("signal handlers unavailable"),
        })
    }
}

fn plan<L, S>(loader: L, shutdown: S, hardware: FakeHardware) -> LaunchPlan<L, FakeHardware, S> {
    LaunchPlan {
        process: ProcessControl {
            shutdown,
            shutdown_timeout: Duration::from_secs(2),
        },
        services: ServiceDeps {
            loader,
            reporter: Arc::new(RecordingHealthReporter::default()),
            hardware,
        },
    }
}

#[rstest]
fn daemon_serves_clients_until_shutdown() {
    let loader = TestConfigLoader::new();
    let socket = loader.socket_path();
    let hardware = FakeHardware::new();
    hardware.attach_modem("1-1", 0x12d1, 0x1001);
    let reply = Arc::new(Mutex::new(None));
    let shutdown = ProbeThenStop {
        socket: socket.clone(),
        reply: Arc::clone(&reply),
    };

    run_daemon_with(plan(loader, shutdown, hardware)).expect("daemon run");

    let frame = reply.lock().expect("reply mutex").take().expect("daemon replied");
    let device = DeviceInfo::from_bytes(frame.payload()).expect("device info");
    assert_eq!(device.port, "1-1");
    assert_eq!(device.vendor_id, 0x12d1);
    assert!(!socket.exists(), "socket should be removed on shutdown");
}

#[rstest]
fn signal_failures_still_release_the_socket() {
    let loader = TestConfigLoader::new();
    let socket = loader.socket_path();

    let error = run_daemon_with(plan(loader, FailingSignal, FakeHardware::new()))
        .expect_err("shutdown wait should fail");

    assert!(matches!(error, LaunchError::Shutdown { .. }));
    assert!(!socket.exists());
}

#[rstest]
fn configuration_errors_stop_the_launch() {
    let error = run_daemon_with(plan(FailingConfigLoader, FailingSignal, FakeHardware::new()))
        .expect_err("configuration should fail");
    assert!(matches!(error, LaunchError::Config { .. }));
}
