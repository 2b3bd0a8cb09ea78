//! Behavioural tests for the daemon bootstrap sequence.

use std::cell::RefCell;
use std::sync::Arc;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::bootstrap::{BootstrapError, ConfigLoader, Daemon, HardwareProvider, bootstrap_with};

use super::support::{
    BrokenHardware, FailingConfigLoader, FakeHardware, HealthEvent, RecordingHealthReporter,
    TestConfigLoader,
};

struct BootstrapWorld {
    loader: Option<TestConfigLoader>,
    hardware: FakeHardware,
    broken: bool,
    reporter: Arc<RecordingHealthReporter>,
    outcome: Option<Result<Daemon, BootstrapError>>,
}

impl BootstrapWorld {
    fn new() -> Self {
        Self {
            loader: None,
            hardware: FakeHardware::new(),
            broken: false,
            reporter: Arc::new(RecordingHealthReporter::default()),
            outcome: None,
        }
    }

    fn bootstrap(&mut self) {
        let loader: &dyn ConfigLoader = match &self.loader {
            Some(loader) => loader,
            None => &FailingConfigLoader,
        };
        let reporter = self.reporter.clone();
        let hardware: &dyn HardwareProvider = if self.broken {
            &BrokenHardware
        } else {
            &self.hardware
        };
        self.outcome = Some(bootstrap_with(loader, reporter, hardware));
    }

    fn events(&self) -> Vec<HealthEvent> {
        self.reporter.events()
    }
}

#[fixture]
fn world() -> RefCell<BootstrapWorld> {
    RefCell::new(BootstrapWorld::new())
}

#[given("a healthy configuration loader")]
fn given_healthy_loader(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().loader = Some(TestConfigLoader::new());
}

#[given("a failing configuration loader")]
fn given_failing_loader(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().loader = None;
}

#[given("a recognised modem on port \"{port}\"")]
fn given_recognised_modem(world: &RefCell<BootstrapWorld>, port: String) {
    world.borrow().hardware.attach_modem(&port, 0x12d1, 0x1001);
}

#[given("an unrecognised modem on port \"{port}\"")]
fn given_unrecognised_modem(world: &RefCell<BootstrapWorld>, port: String) {
    world.borrow().hardware.attach_modem(&port, 0x0bda, 0x8153);
}

#[given("an unreadable device tree")]
fn given_unreadable_tree(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().broken = true;
}

#[when("the daemon bootstrap runs")]
fn when_bootstrap_runs(world: &RefCell<BootstrapWorld>) {
    world.borrow_mut().bootstrap();
}

#[then("bootstrap succeeds")]
fn then_bootstrap_succeeds(world: &RefCell<BootstrapWorld>) {
    let world = world.borrow();
    match &world.outcome {
        Some(Ok(_)) => {}
        other => panic!("bootstrap did not succeed: {other:?}"),
    }
    assert!(world.events().contains(&HealthEvent::BootstrapSucceeded));
}

#[then("bootstrap fails")]
fn then_bootstrap_fails(world: &RefCell<BootstrapWorld>) {
    let world = world.borrow();
    assert!(
        matches!(world.outcome, Some(Err(BootstrapError::Configuration { .. }))),
        "expected a configuration failure, got {:?}",
        world.outcome
    );
}

#[then("the survey reports the modems \"{ports}\"")]
fn then_survey_reports(world: &RefCell<BootstrapWorld>, ports: String) {
    let expected: Vec<String> = ports.split(',').map(|port| port.trim().to_owned()).collect();
    assert!(
        world
            .borrow()
            .events()
            .contains(&HealthEvent::ModemsDetected(expected)),
        "events: {:?}",
        world.borrow().events()
    );
}

#[then("the control socket directory exists")]
fn then_socket_directory_exists(world: &RefCell<BootstrapWorld>) {
    let world = world.borrow();
    let loader = world.loader.as_ref().expect("healthy loader");
    let socket = loader.socket_path();
    let parent = socket.parent().expect("socket parent");
    assert!(parent.is_dir(), "missing {parent}");
}

#[then("the survey failure is reported")]
fn then_survey_failure_reported(world: &RefCell<BootstrapWorld>) {
    let events = world.borrow().events();
    assert!(
        events
            .iter()
            .any(|event| matches!(event, HealthEvent::EnumerationFailed(_))),
        "events: {events:?}"
    );
}

#[then("the bootstrap failure is reported")]
fn then_failure_reported(world: &RefCell<BootstrapWorld>) {
    let events = world.borrow().events();
    assert_eq!(events.first(), Some(&HealthEvent::BootstrapStarting));
    assert!(
        matches!(events.last(), Some(HealthEvent::BootstrapFailed(_))),
        "events: {events:?}"
    );
}

#[scenario(path = "tests/features/daemon_bootstrap.feature")]
fn daemon_bootstrap(#[from(world)] world: RefCell<BootstrapWorld>) {
    drop(world);
}
