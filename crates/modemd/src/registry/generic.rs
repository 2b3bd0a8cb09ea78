//! Operations every AT modem understands (3GPP TS 27.007).

use modem_rpc::{
    FirmwareVersion, Operator, OperatorStatus, PinChange, RegistrationState, SignalQuality,
    WwanProfile,
};
use regex::Regex;

use crate::at::AtResponse;
use crate::modem::{ModemContext, ModemError};

use super::profile::{DeviceProfile, Interface, Operations, Protocol};

const OK: &str = "\r\nOK\r\n";
const DIGITS_REPLY: &str = "\r\n([0-9]+)\r\n\r\nOK\r\n";

/// Generic AT implementations, the base every model table builds on.
pub const OPERATIONS: Operations = Operations {
    imei: Some(imei),
    imsi: Some(imsi),
    signal_quality: Some(signal_quality),
    operator_name: Some(operator_name),
    network_registration: Some(network_registration),
    network_type: Some(network_type),
    change_pin: Some(change_pin),
    firmware_version: Some(firmware_version),
    operator_scan: Some(operator_scan),
    at_command: Some(at_command),
    ussd: Some(ussd),
    set_wwan_profile: Some(set_wwan_profile),
    ..Operations::UNSUPPORTED
};

/// Fallback profile for unregistered vendor/product pairs.
pub static PROFILE: DeviceProfile = DeviceProfile {
    model: "generic",
    vendor_id: 0,
    product_id: 0,
    interfaces: &[Interface {
        index: 0,
        protocol: Protocol::At,
    }],
    operations: OPERATIONS,
    registration_watch: false,
};

/// Capture group `index` or an `Unexpected` error naming `command`.
pub(crate) fn group<'a>(
    response: &'a AtResponse,
    index: usize,
    command: &'static str,
) -> Result<&'a str, ModemError> {
    response
        .group(index)
        .ok_or_else(|| ModemError::unexpected(command, format!("missing group {index}")))
}

/// Parses capture group `index` as a number.
pub(crate) fn number<T: std::str::FromStr>(
    response: &AtResponse,
    index: usize,
    command: &'static str,
) -> Result<T, ModemError> {
    let text = group(response, index, command)?;
    text.trim()
        .parse()
        .map_err(|_| ModemError::unexpected(command, format!("'{text}' is not a number")))
}

/// Rejects text that would break out of a quoted AT argument.
pub(crate) fn quoted_argument<'a>(name: &str, value: &'a str) -> Result<&'a str, ModemError> {
    if value.contains(['"', '\r', '\n']) {
        return Err(ModemError::InvalidArgument {
            reason: format!("{name} contains a quote or line break"),
        });
    }
    Ok(value)
}

pub(crate) fn imei(context: &ModemContext) -> Result<String, ModemError> {
    let response = context.query("AT+CGSN", DIGITS_REPLY)?;
    Ok(group(&response, 1, "AT+CGSN")?.to_owned())
}

pub(crate) fn imsi(context: &ModemContext) -> Result<String, ModemError> {
    let response = context.query("AT+CIMI", DIGITS_REPLY)?;
    Ok(group(&response, 1, "AT+CIMI")?.to_owned())
}

/// Converts a `+CSQ` RSSI index into dBm and a 0-5 bar count.
///
/// Index 99 (and anything above 31) means unknown and yields zero dBm.
#[must_use]
pub fn signal_from_rssi(rssi: u8) -> SignalQuality {
    if rssi > 31 {
        return SignalQuality { dbm: 0, level: 0 };
    }
    let dbm = i16::from(rssi) * 2 - 113;
    let level = 1 + [-95, -85, -73, -65]
        .into_iter()
        .filter(|threshold| dbm >= *threshold)
        .fold(0_u8, |count, _| count + 1);
    SignalQuality { dbm, level }
}

pub(crate) fn signal_quality(context: &ModemContext) -> Result<SignalQuality, ModemError> {
    let response = context.query("AT+CSQ", "\r\n\\+CSQ: ([0-9]+),([0-9]+)\r\n\r\nOK\r\n")?;
    let rssi: u8 = number(&response, 1, "AT+CSQ")?;
    Ok(signal_from_rssi(rssi))
}

pub(crate) fn operator_name(context: &ModemContext) -> Result<String, ModemError> {
    context.query("AT+COPS=3,0", OK)?;
    let response = context.query(
        "AT+COPS?",
        "\r\n\\+COPS: [0-9],[0-9],\"(.+)\",[0-9]\r\n\r\nOK\r\n",
    )?;
    Ok(group(&response, 1, "AT+COPS?")?.to_owned())
}

pub(crate) fn network_registration(
    context: &ModemContext,
) -> Result<RegistrationState, ModemError> {
    let response = context.query("AT+CREG?", "\r\n\\+CREG: [0-9],([0-9])\r\n\r\nOK\r\n")?;
    let code: u8 = number(&response, 1, "AT+CREG?")?;
    RegistrationState::from_code(code)
        .ok_or_else(|| ModemError::unexpected("AT+CREG?", format!("status {code}")))
}

pub(crate) fn network_type(context: &ModemContext) -> Result<String, ModemError> {
    let response = context.query("AT*CNTI=0", "\r\n\\*CNTI: 0,(.+)\r\n\r\nOK\r\n")?;
    Ok(group(&response, 1, "AT*CNTI=0")?.to_owned())
}

pub(crate) fn change_pin(context: &ModemContext, request: &PinChange) -> Result<(), ModemError> {
    for (name, pin) in [("old PIN", &request.old_pin), ("new PIN", &request.new_pin)] {
        if pin.is_empty() || !pin.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(ModemError::InvalidArgument {
                reason: format!("{name} must be digits"),
            });
        }
    }
    let command = format!(
        "AT+CPWD=\"SC\",\"{}\",\"{}\"",
        request.old_pin, request.new_pin
    );
    context.query(&command, OK)?;
    Ok(())
}

pub(crate) fn firmware_version(context: &ModemContext) -> Result<FirmwareVersion, ModemError> {
    let response = context.query("AT+CGMR", "\r\n([^\r\n]+)\r\n\r\nOK\r\n")?;
    Ok(FirmwareVersion {
        firmware: group(&response, 1, "AT+CGMR")?.trim().to_owned(),
        release: 0,
    })
}

/// Parses the operator list of a `+COPS=?` reply.
///
/// Entries with an unrecognised shape are skipped.
pub fn parse_operators(list: &str) -> Result<Vec<Operator>, ModemError> {
    let entry = Regex::new(r#"\(([0-9]),"([^"]*)","([^"]*)","([^"]*)",([0-9]+)\)"#)
        .map_err(|error| ModemError::unexpected("AT+COPS=?", error.to_string()))?;
    Ok(entry
        .captures_iter(list)
        .filter_map(|found| {
            Some(Operator {
                status: OperatorStatus::from_code(found.get(1)?.as_str().parse().ok()?),
                long_name: found.get(2)?.as_str().to_owned(),
                short_name: found.get(3)?.as_str().to_owned(),
                numeric: found.get(4)?.as_str().to_owned(),
                access_technology: found.get(5)?.as_str().parse().ok()?,
            })
        })
        .collect())
}

pub(crate) fn operator_scan(context: &ModemContext) -> Result<Vec<Operator>, ModemError> {
    let response = context.query_within(
        "AT+COPS=?",
        "\r\n\\+COPS: ([^\r\n]*)\r\n\r\nOK\r\n",
        context.timeouts().operator_scan,
    )?;
    parse_operators(group(&response, 1, "AT+COPS=?")?)
}

pub(crate) fn at_command(context: &ModemContext, command: &str) -> Result<String, ModemError> {
    let command = command.trim_end_matches(['\r', '\n', '\0']);
    if command.is_empty() || command.contains(['\r', '\n']) {
        return Err(ModemError::InvalidArgument {
            reason: String::from("AT command must be a single non-empty line"),
        });
    }
    let response = context.query_within(
        command,
        "(.*?)(?:^|\r\n)(OK|ERROR|\\+CM[ES] ERROR: [^\r\n]*)\r\n",
        context.timeouts().command,
    )?;
    Ok(response.raw().trim().to_owned())
}

pub(crate) fn ussd(context: &ModemContext, request: &str) -> Result<String, ModemError> {
    let request = quoted_argument("USSD request", request.trim_end_matches('\0'))?;
    let command = format!("AT+CUSD=1,\"{request}\",15");
    let response = context.query_within(
        &command,
        "\\+CUSD: [0-9],\"(.*)\",[0-9]+\r\n",
        context.timeouts().command,
    )?;
    Ok(group(&response, 1, "AT+CUSD")?.to_owned())
}

pub(crate) fn set_wwan_profile(
    context: &ModemContext,
    profile: &WwanProfile,
) -> Result<(), ModemError> {
    let apn = quoted_argument("APN", &profile.apn)?;
    context.query(&format!("AT+CGDCONT=1,\"IP\",\"{apn}\""), OK)?;
    Ok(())
}
