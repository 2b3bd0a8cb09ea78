//! Sierra Wireless MC7700/MC7750 overrides.

use modem_rpc::{FirmwareVersion, WwanProfile, WwanState};
use time::PrimitiveDateTime;
use time::macros::format_description;

use crate::modem::{ModemContext, ModemError};

use super::generic;
use super::profile::{DeviceProfile, Interface, Operations, Protocol};

const AT_OPERATIONS: Operations = Operations {
    firmware_version: Some(firmware_version),
    network_time: Some(network_time),
    cell_id: Some(cell_id),
    ..generic::OPERATIONS
};

/// Sierra Wireless MC7700 (AT only).
pub static MC7700: DeviceProfile = DeviceProfile {
    model: "MC7700",
    vendor_id: 0x1199,
    product_id: 0x68a3,
    interfaces: &[Interface {
        index: 3,
        protocol: Protocol::At,
    }],
    operations: AT_OPERATIONS,
    registration_watch: true,
};

/// Sierra Wireless MC7750 (AT plus QMI).
pub static MC7750: DeviceProfile = DeviceProfile {
    model: "MC7750",
    vendor_id: 0x1199,
    product_id: 0x68a2,
    interfaces: &[
        Interface {
            index: 3,
            protocol: Protocol::At,
        },
        Interface {
            index: 8,
            protocol: Protocol::Qmi,
        },
    ],
    operations: Operations {
        imei: Some(qmi_imei),
        imsi: Some(qmi_imsi),
        network_time: Some(qmi_network_time),
        set_wwan_profile: Some(qmi_set_wwan_profile),
        start_wwan: Some(qmi_start_wwan),
        stop_wwan: Some(qmi_stop_wwan),
        state_wwan: Some(qmi_state_wwan),
        ..AT_OPERATIONS
    },
    registration_watch: true,
};

/// Parses a `YYYY/MM/DD HH:MM:SS` timestamp as UTC Unix seconds.
pub fn parse_timestamp(text: &str, command: &'static str) -> Result<i64, ModemError> {
    let format = format_description!("[year]/[month]/[day] [hour]:[minute]:[second]");
    let normalised = text.replace("\r\n", " ");
    PrimitiveDateTime::parse(normalised.trim(), &format)
        .map(|moment| moment.assume_utc().unix_timestamp())
        .map_err(|error| ModemError::unexpected(command, format!("'{normalised}': {error}")))
}

fn firmware_version(context: &ModemContext) -> Result<FirmwareVersion, ModemError> {
    let response = context.query(
        "AT+CGMR",
        "\r\n.*(SWI.*) .* .* ([0-9,/]+ [0-9,:]+)\r\n\r\nOK\r\n",
    )?;
    Ok(FirmwareVersion {
        firmware: generic::group(&response, 1, "AT+CGMR")?.to_owned(),
        release: parse_timestamp(generic::group(&response, 2, "AT+CGMR")?, "AT+CGMR")?,
    })
}

fn network_time(context: &ModemContext) -> Result<i64, ModemError> {
    let response = context.query(
        "AT!TIME?",
        "!TIME:.*\r\n[0-9,/]+\r\n[0-9,:]+ \\(local\\)\r\n([0-9,/]+\r\n[0-9,:]+) \\(UTC\\)\r\n\r\n\r\nOK\r\n",
    )?;
    parse_timestamp(generic::group(&response, 1, "AT!TIME?")?, "AT!TIME?")
}

fn cell_id(context: &ModemContext) -> Result<i32, ModemError> {
    let response = context.query(
        "AT!GSMINFO?",
        "!GSMINFO:.*\r\nCell ID:[\t ]*([0-9]+)\r\n.*\r\nOK\r\n",
    )?;
    generic::number(&response, 1, "AT!GSMINFO?")
}

// Identity and clock fall back to AT when no QMI session was bound.

fn qmi_imei(context: &ModemContext) -> Result<String, ModemError> {
    match context.qmi_session() {
        Some(session) => Ok(session.imei()?),
        None => generic::imei(context),
    }
}

fn qmi_imsi(context: &ModemContext) -> Result<String, ModemError> {
    match context.qmi_session() {
        Some(session) => Ok(session.imsi()?),
        None => generic::imsi(context),
    }
}

fn qmi_network_time(context: &ModemContext) -> Result<i64, ModemError> {
    match context.qmi_session() {
        Some(session) => Ok(session.network_time()?),
        None => network_time(context),
    }
}

fn qmi_set_wwan_profile(context: &ModemContext, profile: &WwanProfile) -> Result<(), ModemError> {
    Ok(context.qmi()?.set_data_profile(profile)?)
}

fn qmi_start_wwan(context: &ModemContext) -> Result<(), ModemError> {
    Ok(context.qmi()?.start_data_session()?)
}

fn qmi_stop_wwan(context: &ModemContext) -> Result<(), ModemError> {
    Ok(context.qmi()?.stop_data_session()?)
}

fn qmi_state_wwan(context: &ModemContext) -> Result<WwanState, ModemError> {
    Ok(context.qmi()?.state())
}
