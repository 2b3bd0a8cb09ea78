//! One opened modem and the background work bound to it.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use modem_rpc::{
    DeviceInfo, FirmwareVersion, Operator, PinChange, RegistrationState, SignalQuality,
    WwanProfile, WwanState,
};
use tracing::{debug, info, warn};

use crate::registry::{DeviceProfile, Operations};

use super::{MODEM_TARGET, ModemContext, ModemError, codes};

struct Status {
    last_error: AtomicI32,
    locks: AtomicU32,
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl Status {
    fn new() -> Self {
        Self {
            last_error: AtomicI32::new(codes::NONE),
            locks: AtomicU32::new(0),
            stopped: Mutex::new(false),
            wake: Condvar::new(),
        }
    }

    fn record<T>(&self, result: &Result<T, ModemError>) {
        let code = result.as_ref().map_or_else(ModemError::code, |_| codes::NONE);
        self.last_error.store(code, Ordering::SeqCst);
    }

    fn is_locked(&self) -> bool {
        self.locks.load(Ordering::SeqCst) > 0
    }

    fn stop(&self) {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.wake.notify_all();
    }

    /// Sleeps for `interval`; returns `true` once the handle is stopping.
    fn wait_for_stop(&self, interval: Duration) -> bool {
        let stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        let (stopped, _) = self
            .wake
            .wait_timeout_while(stopped, interval, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *stopped
    }
}

/// Holds the modem locked for as long as it lives.
struct LockGuard {
    status: Arc<Status>,
}

impl LockGuard {
    fn acquire(status: &Arc<Status>) -> Self {
        status.locks.fetch_add(1, Ordering::SeqCst);
        Self {
            status: Arc::clone(status),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.status.locks.fetch_sub(1, Ordering::SeqCst);
    }
}

/// An opened modem owned by exactly one client session.
///
/// Every abstract call goes through the profile's operation table and leaves
/// its outcome in the sticky last-error code. Background work (operator scan,
/// registration watch) keeps the modem locked while it runs and is stopped
/// and joined when the handle is dropped.
pub struct ModemHandle {
    id: u32,
    port: String,
    info: DeviceInfo,
    profile: &'static DeviceProfile,
    context: ModemContext,
    status: Arc<Status>,
    scan: Option<JoinHandle<()>>,
    watch: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for ModemHandle {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ModemHandle")
            .field("id", &self.id)
            .field("port", &self.port)
            .field("model", &self.profile.model)
            .finish_non_exhaustive()
    }
}

impl ModemHandle {
    /// Wraps bound channels resolved for `port`.
    #[must_use]
    pub fn new(
        id: u32,
        port: impl Into<String>,
        info: DeviceInfo,
        profile: &'static DeviceProfile,
        context: ModemContext,
    ) -> Self {
        Self {
            id,
            port: port.into(),
            info,
            profile,
            context,
            status: Arc::new(Status::new()),
            scan: None,
            watch: None,
        }
    }

    /// Identifier returned to the client on open.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// USB port the modem was opened on.
    #[must_use]
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Device identity captured at open time.
    #[must_use]
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Resolved model profile.
    #[must_use]
    pub fn profile(&self) -> &'static DeviceProfile {
        self.profile
    }

    /// Bound channels.
    #[must_use]
    pub fn context(&self) -> &ModemContext {
        &self.context
    }

    /// Whether background work currently holds the modem.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.status.is_locked()
    }

    /// Sticky outcome of the last operation.
    ///
    /// A locked modem with nothing else to report answers `BUSY`.
    #[must_use]
    pub fn last_error(&self) -> i32 {
        let code = self.status.last_error.load(Ordering::SeqCst);
        if code == codes::NONE && self.is_locked() {
            codes::BUSY
        } else {
            code
        }
    }

    /// Records a failure detected outside the operation table, such as a
    /// refused privileged call or an undecodable request.
    pub fn record_failure(&self, error: ModemError) {
        debug!(
            target: MODEM_TARGET,
            port = %self.port,
            code = error.code(),
            error = %error,
            "request rejected"
        );
        self.status.record::<()>(&Err(error));
    }

    fn operations(&self) -> &'static Operations {
        &self.profile.operations
    }

    fn invoke<F, T>(
        &self,
        operation: &'static str,
        slot: Option<F>,
        run: impl FnOnce(F, &ModemContext) -> Result<T, ModemError>,
    ) -> Result<T, ModemError> {
        let result = slot
            .ok_or(ModemError::NotSupported { operation })
            .and_then(|bound| run(bound, &self.context));
        self.status.record(&result);
        if let Err(error) = &result {
            debug!(
                target: MODEM_TARGET,
                port = %self.port,
                operation,
                code = error.code(),
                error = %error,
                "modem operation failed"
            );
        }
        result
    }

    /// Reads the IMEI.
    pub fn imei(&self) -> Result<String, ModemError> {
        self.invoke("get_imei", self.operations().imei, |op, context| op(context))
    }

    /// Reads the IMSI.
    pub fn imsi(&self) -> Result<String, ModemError> {
        self.invoke("get_imsi", self.operations().imsi, |op, context| op(context))
    }

    /// Reads the signal quality.
    pub fn signal_quality(&self) -> Result<SignalQuality, ModemError> {
        self.invoke("get_signal_quality", self.operations().signal_quality, |op, context| {
            op(context)
        })
    }

    /// Reads the network time as Unix seconds.
    pub fn network_time(&self) -> Result<i64, ModemError> {
        self.invoke("get_network_time", self.operations().network_time, |op, context| {
            op(context)
        })
    }

    /// Reads the registered operator name.
    pub fn operator_name(&self) -> Result<String, ModemError> {
        self.invoke("get_operator_name", self.operations().operator_name, |op, context| {
            op(context)
        })
    }

    /// Reads the network registration state.
    pub fn network_registration(&self) -> Result<RegistrationState, ModemError> {
        self.invoke(
            "network_registration",
            self.operations().network_registration,
            |op, context| op(context),
        )
    }

    /// Reads the radio access technology.
    pub fn network_type(&self) -> Result<String, ModemError> {
        self.invoke("get_network_type", self.operations().network_type, |op, context| {
            op(context)
        })
    }

    /// Changes the SIM PIN.
    pub fn change_pin(&self, request: &PinChange) -> Result<(), ModemError> {
        self.invoke("change_pin", self.operations().change_pin, |op, context| {
            op(context, request)
        })
    }

    /// Reads the firmware version.
    pub fn firmware_version(&self) -> Result<FirmwareVersion, ModemError> {
        self.invoke("get_fw_version", self.operations().firmware_version, |op, context| {
            op(context)
        })
    }

    /// Scans for operators and waits for the result.
    pub fn operator_scan(&self) -> Result<Vec<Operator>, ModemError> {
        self.invoke("operator_scan", self.operations().operator_scan, |op, context| {
            op(context)
        })
    }

    /// Reads the serving cell identifier.
    pub fn cell_id(&self) -> Result<i32, ModemError> {
        self.invoke("get_cell_id", self.operations().cell_id, |op, context| op(context))
    }

    /// Passes a raw AT command through and returns the raw reply.
    pub fn at_command(&self, command: &str) -> Result<String, ModemError> {
        self.invoke("at_command", self.operations().at_command, |op, context| {
            op(context, command)
        })
    }

    /// Sends a USSD request and returns the network's answer.
    pub fn ussd(&self, request: &str) -> Result<String, ModemError> {
        self.invoke("ussd_cmd", self.operations().ussd, |op, context| op(context, request))
    }

    /// Stores the packet data profile.
    pub fn set_wwan_profile(&self, profile: &WwanProfile) -> Result<(), ModemError> {
        self.invoke("set_wwan_profile", self.operations().set_wwan_profile, |op, context| {
            op(context, profile)
        })
    }

    /// Starts the packet data session.
    pub fn start_wwan(&self) -> Result<(), ModemError> {
        self.invoke("start_wwan", self.operations().start_wwan, |op, context| op(context))
    }

    /// Stops the packet data session.
    pub fn stop_wwan(&self) -> Result<(), ModemError> {
        self.invoke("stop_wwan", self.operations().stop_wwan, |op, context| op(context))
    }

    /// Reports the packet data session state.
    pub fn state_wwan(&self) -> Result<WwanState, ModemError> {
        self.invoke("state_wwan", self.operations().state_wwan, |op, context| op(context))
    }

    /// Starts a background operator scan writing JSON to `output`.
    pub fn start_operator_scan(&mut self, output: &Utf8Path) -> Result<(), ModemError> {
        let result = self.spawn_scan(output.to_path_buf());
        self.status.record(&result);
        result
    }

    fn spawn_scan(&mut self, output: Utf8PathBuf) -> Result<(), ModemError> {
        if self.operator_scan_is_running() {
            return Err(ModemError::ScanRunning);
        }
        let scan = self
            .operations()
            .operator_scan
            .ok_or(ModemError::NotSupported {
                operation: "operator_scan_start",
            })?;
        let lock = LockGuard::acquire(&self.status);
        let status = Arc::clone(&self.status);
        let context = self.context.clone();
        let port = self.port.clone();
        let path = output.clone();
        let thread = thread::Builder::new()
            .name(format!("scan-{}", self.port))
            .spawn(move || {
                let _lock = lock;
                let result = scan(&context).and_then(|operators| write_scan(&path, &operators));
                match &result {
                    Ok(()) => info!(
                        target: MODEM_TARGET,
                        port = %port,
                        output = %path,
                        "operator scan finished"
                    ),
                    Err(error) => warn!(
                        target: MODEM_TARGET,
                        port = %port,
                        output = %path,
                        error = %error,
                        "operator scan failed"
                    ),
                }
                status.record(&result);
            })
            .map_err(|error| ModemError::ScanOutput {
                path: output.into_string(),
                message: error.to_string(),
            })?;
        self.scan = Some(thread);
        Ok(())
    }

    /// Whether a background scan is still running; reaps a finished one.
    pub fn operator_scan_is_running(&mut self) -> bool {
        match self.scan.take() {
            Some(thread) if thread.is_finished() => {
                join_background(thread, &self.port, "operator scan");
                false
            }
            Some(thread) => {
                self.scan = Some(thread);
                true
            }
            None => false,
        }
    }

    /// Holds the modem locked until it reports a registered state.
    pub(crate) fn start_registration_watch(&mut self) -> Result<(), ModemError> {
        let Some(probe) = self.operations().network_registration else {
            return Ok(());
        };
        let lock = LockGuard::acquire(&self.status);
        let status = Arc::clone(&self.status);
        let context = self.context.clone();
        let port = self.port.clone();
        let interval = self.context.timeouts().registration_poll;
        let thread = thread::Builder::new()
            .name(format!("watch-{}", self.port))
            .spawn(move || {
                let _lock = lock;
                loop {
                    match probe(&context) {
                        Ok(state) if state.is_registered() => {
                            info!(target: MODEM_TARGET, port = %port, %state, "modem registered");
                            break;
                        }
                        Ok(state) => {
                            debug!(target: MODEM_TARGET, port = %port, %state, "waiting for registration");
                        }
                        Err(error) => {
                            debug!(target: MODEM_TARGET, port = %port, error = %error, "registration poll failed");
                        }
                    }
                    if status.wait_for_stop(interval) {
                        break;
                    }
                }
            })
            .map_err(|error| ModemError::unexpected("registration watch", error.to_string()))?;
        self.watch = Some(thread);
        Ok(())
    }
}

impl Drop for ModemHandle {
    fn drop(&mut self) {
        self.status.stop();
        if let Some(queue) = self.context.at_queue() {
            queue.shutdown();
        }
        if let Some(thread) = self.scan.take() {
            join_background(thread, &self.port, "operator scan");
        }
        if let Some(thread) = self.watch.take() {
            join_background(thread, &self.port, "registration watch");
        }
        debug!(target: MODEM_TARGET, id = self.id, port = %self.port, "modem closed");
    }
}

fn write_scan(path: &Utf8Path, operators: &[Operator]) -> Result<(), ModemError> {
    let output_error = |message: String| ModemError::ScanOutput {
        path: path.to_string(),
        message,
    };
    let file = File::create(path).map_err(|error| output_error(error.to_string()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, operators)
        .map_err(|error| output_error(error.to_string()))?;
    writer
        .flush()
        .map_err(|error| output_error(error.to_string()))
}

fn join_background(thread: JoinHandle<()>, port: &str, work: &str) {
    if thread.join().is_err() {
        warn!(target: MODEM_TARGET, port, work, "background thread panicked");
    }
}
