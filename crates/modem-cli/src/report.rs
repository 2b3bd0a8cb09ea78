//! Human-readable output of `modem_cli`.
//!
//! Per-modem queries that the daemon refuses are left out of the report;
//! transport failures abort it.

use std::io::{Read, Write};

use modem_rpc::{DeviceInfo, RegistrationState};
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::{AppError, ClientError, ModemClient};

/// `asctime(3)` layout, without the trailing newline.
const ASCTIME: &[BorrowedFormatItem<'_>] = format_description!(
    "[weekday repr:short] [month repr:short] [day padding:space] [hour]:[minute]:[second] [year]"
);

const RELEASE: &[BorrowedFormatItem<'_>] =
    format_description!("[year].[month].[day] [hour]:[minute]:[second]");

/// Effective settings echoed before any daemon traffic.
#[derive(Debug)]
pub(crate) struct Banner<'a> {
    pub(crate) basename: &'a str,
    pub(crate) socket: &'a str,
    pub(crate) port: &'a str,
    pub(crate) command: &'a str,
    pub(crate) detect: bool,
    pub(crate) test: bool,
}

const fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

pub(crate) fn write_banner<W: Write>(out: &mut W, banner: &Banner<'_>) -> std::io::Result<()> {
    writeln!(out, "     Basename: {}", banner.basename)?;
    writeln!(out, "  Socket file: {}", banner.socket)?;
    writeln!(out, "         Port: {}", banner.port)?;
    writeln!(out, "      Command: {}", banner.command)?;
    writeln!(out, "Detect modems: {}", yes_no(banner.detect))?;
    writeln!(out, "  Test modems: {}", yes_no(banner.test))?;
    writeln!(out)
}

pub(crate) fn write_device<W: Write>(out: &mut W, device: &DeviceInfo) -> std::io::Result<()> {
    writeln!(
        out,
        "Device: [port: {}] [{:04x}:{:04x}] [{} {}]",
        device.port, device.vendor_id, device.product_id, device.manufacturer, device.product
    )
}

/// Turns a refusal into `None`, keeping transport failures.
fn answered<T>(result: Result<T, ClientError>) -> Result<Option<T>, ClientError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(error) if error.is_refusal() => Ok(None),
        Err(error) => Err(error),
    }
}

fn format_unix(seconds: i64, layout: &[BorrowedFormatItem<'_>]) -> Option<String> {
    OffsetDateTime::from_unix_timestamp(seconds)
        .ok()?
        .format(layout)
        .ok()
}

/// Opens `port` and runs the standard query sequence.
///
/// `announce` prints the device line first, for when discovery has not
/// already done so. A port that cannot be opened produces no output.
pub(crate) fn write_test<S, W>(
    client: &mut ModemClient<S>,
    out: &mut W,
    port: &str,
    announce: bool,
) -> Result<(), AppError>
where
    S: Read + Write,
    W: Write,
{
    if answered(client.open_by_port(port))?.is_none() {
        return Ok(());
    }

    if announce && let Some(device) = answered(client.info())? {
        write_device(out, &device)?;
    }
    if let Some(imei) = answered(client.imei())? {
        writeln!(out, "IMEI: [{imei}]")?;
    }
    if let Some(imsi) = answered(client.imsi())? {
        writeln!(out, "IMSI: [{imsi}]")?;
    }
    if let Some(operator) = answered(client.operator_name())? {
        writeln!(out, "Operator: [{operator}]")?;
    }
    if let Some(network) = answered(client.network_type())? {
        writeln!(out, "Network: [{network}]")?;
    }
    if let Some(signal) = answered(client.signal_quality())? {
        writeln!(out, "Signal: {} dBm, {} Level", signal.dbm, signal.level)?;
    }
    if let Some(time) = answered(client.network_time())?
        .filter(|seconds| *seconds != 0)
        .and_then(|seconds| format_unix(seconds, ASCTIME))
    {
        writeln!(out, "Modem time: {time}")?;
    }
    let registration =
        answered(client.network_registration())?.unwrap_or(RegistrationState::Unknown);
    writeln!(out, "Registration: {registration}")?;
    if let Some(version) = answered(client.firmware_version())? {
        match format_unix(version.release, RELEASE) {
            Some(release) => writeln!(out, "Firmware: {}, Release: {release}", version.firmware)?,
            None => writeln!(out, "Firmware: {}", version.firmware)?,
        }
    }
    if let Some(cell_id) = answered(client.cell_id())?.filter(|cell_id| *cell_id != 0) {
        writeln!(out, "Cell ID: {cell_id}")?;
    }

    client.close()?;
    Ok(())
}

/// Opens `port`, sends `command`, and prints the modem's answer.
pub(crate) fn write_answer<S, W>(
    client: &mut ModemClient<S>,
    out: &mut W,
    port: &str,
    command: &str,
) -> Result<(), AppError>
where
    S: Read + Write,
    W: Write,
{
    if answered(client.open_by_port(port))?.is_none() {
        return Ok(());
    }
    if let Some(answer) = answered(client.at_command(command))? {
        writeln!(out, "Answer: [\n{answer}\n]")?;
    }
    client.close()?;
    Ok(())
}
