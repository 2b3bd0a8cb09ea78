//! Request handlers, one per function.
//!
//! Handlers return the success payload or `None`. Functions that need a modem
//! are only called once the dispatcher has checked one is open.

use camino::Utf8Path;
use modem_rpc::{
    Payload, PinChange, RegistrationState, WwanProfile, encode_operators, encode_text,
    text_until_nul,
};
use tracing::warn;

use crate::modem::{ModemError, ModemHandle};

use super::{ClientSession, SESSION_TARGET};

fn decode<T: Payload>(modem: &ModemHandle, payload: &[u8]) -> Option<T> {
    match T::from_bytes(payload) {
        Ok(value) => Some(value),
        Err(error) => {
            modem.record_failure(ModemError::InvalidArgument {
                reason: error.to_string(),
            });
            None
        }
    }
}

fn text_argument(modem: &ModemHandle, payload: &[u8]) -> Option<String> {
    let text = text_until_nul(payload);
    if text.is_empty() {
        modem.record_failure(ModemError::InvalidArgument {
            reason: String::from("empty text argument"),
        });
        return None;
    }
    Some(text)
}

fn status_ok() -> Vec<u8> {
    0_i32.to_bytes()
}

pub(super) fn find_first(session: &mut ClientSession, _: &[u8]) -> Option<Vec<u8>> {
    match session.registry.find_cursor() {
        Ok(cursor) => session.cursor = Some(cursor),
        Err(error) => {
            warn!(target: SESSION_TARGET, error = %error, "device enumeration failed");
            session.cursor = None;
            return None;
        }
    }
    find_next(session, &[])
}

pub(super) fn find_next(session: &mut ClientSession, _: &[u8]) -> Option<Vec<u8>> {
    session
        .cursor
        .as_mut()?
        .advance()
        .map(|device| device.to_bytes())
}

pub(super) fn find_close(session: &mut ClientSession, _: &[u8]) -> Option<Vec<u8>> {
    session.cursor = None;
    Some(Vec::new())
}

pub(super) fn open_by_port(session: &mut ClientSession, payload: &[u8]) -> Option<Vec<u8>> {
    session.modem = None;
    let port = text_until_nul(payload);
    match session.registry.open_by_port(&port) {
        Ok(modem) => {
            let id = modem.id();
            session.modem = Some(modem);
            Some(id.to_bytes())
        }
        Err(error) => {
            warn!(target: SESSION_TARGET, port = %port, error = %error, "failed to open modem");
            None
        }
    }
}

pub(super) fn close(session: &mut ClientSession, _: &[u8]) -> Option<Vec<u8>> {
    session.modem = None;
    Some(Vec::new())
}

pub(super) fn get_info(session: &mut ClientSession, _: &[u8]) -> Option<Vec<u8>> {
    Some(session.modem.as_ref()?.info().to_bytes())
}

pub(super) fn get_last_error(session: &mut ClientSession, _: &[u8]) -> Option<Vec<u8>> {
    Some(session.modem.as_ref()?.last_error().to_bytes())
}

pub(super) fn get_imei(session: &mut ClientSession, _: &[u8]) -> Option<Vec<u8>> {
    let imei = session.modem.as_ref()?.imei().ok()?;
    Some(encode_text(&imei))
}

pub(super) fn get_imsi(session: &mut ClientSession, _: &[u8]) -> Option<Vec<u8>> {
    let imsi = session.modem.as_ref()?.imsi().ok()?;
    Some(encode_text(&imsi))
}

pub(super) fn change_pin(session: &mut ClientSession, payload: &[u8]) -> Option<Vec<u8>> {
    let modem = session.modem.as_ref()?;
    let request: PinChange = decode(modem, payload)?;
    modem.change_pin(&request).ok()?;
    Some(request.to_bytes())
}

pub(super) fn get_fw_version(session: &mut ClientSession, _: &[u8]) -> Option<Vec<u8>> {
    let version = session.modem.as_ref()?.firmware_version().ok()?;
    Some(version.to_bytes())
}

/// A failed poll still answers, reporting [`RegistrationState::Failed`].
pub(super) fn network_registration(session: &mut ClientSession, _: &[u8]) -> Option<Vec<u8>> {
    let state = session
        .modem
        .as_ref()?
        .network_registration()
        .unwrap_or(RegistrationState::Failed);
    Some(state.to_bytes())
}

pub(super) fn get_signal_quality(session: &mut ClientSession, _: &[u8]) -> Option<Vec<u8>> {
    let signal = session.modem.as_ref()?.signal_quality().ok()?;
    Some(signal.to_bytes())
}

pub(super) fn operator_scan(session: &mut ClientSession, _: &[u8]) -> Option<Vec<u8>> {
    let operators = session.modem.as_ref()?.operator_scan().ok()?;
    Some(encode_operators(&operators))
}

pub(super) fn operator_scan_start(session: &mut ClientSession, payload: &[u8]) -> Option<Vec<u8>> {
    let modem = session.modem.as_mut()?;
    let output = text_argument(modem, payload)?;
    modem.start_operator_scan(Utf8Path::new(&output)).ok()?;
    Some(status_ok())
}

pub(super) fn operator_scan_is_running(session: &mut ClientSession, _: &[u8]) -> Option<Vec<u8>> {
    let running = session.modem.as_mut()?.operator_scan_is_running();
    Some(i8::from(running).to_bytes())
}

pub(super) fn at_command(session: &mut ClientSession, payload: &[u8]) -> Option<Vec<u8>> {
    let modem = session.modem.as_ref()?;
    let command = text_argument(modem, payload)?;
    let answer = modem.at_command(&command).ok()?;
    Some(encode_text(&answer))
}

pub(super) fn get_network_time(session: &mut ClientSession, _: &[u8]) -> Option<Vec<u8>> {
    let time = session.modem.as_ref()?.network_time().ok()?;
    Some(time.to_bytes())
}

pub(super) fn get_operator_name(session: &mut ClientSession, _: &[u8]) -> Option<Vec<u8>> {
    let name = session.modem.as_ref()?.operator_name().ok()?;
    Some(encode_text(&name))
}

pub(super) fn get_network_type(session: &mut ClientSession, _: &[u8]) -> Option<Vec<u8>> {
    let network_type = session.modem.as_ref()?.network_type().ok()?;
    Some(encode_text(&network_type))
}

pub(super) fn get_cell_id(session: &mut ClientSession, _: &[u8]) -> Option<Vec<u8>> {
    let cell_id = session.modem.as_ref()?.cell_id().ok()?;
    Some(cell_id.to_bytes())
}

pub(super) fn conf_reload(session: &mut ClientSession, _: &[u8]) -> Option<Vec<u8>> {
    let modem = session.modem.as_ref()?;
    match session.registry.reload(modem) {
        Ok(()) => Some(Vec::new()),
        Err(error) => {
            warn!(target: SESSION_TARGET, port = modem.port(), error = %error, "reload failed");
            modem.record_failure(error);
            None
        }
    }
}

pub(super) fn set_wwan_profile(session: &mut ClientSession, payload: &[u8]) -> Option<Vec<u8>> {
    let modem = session.modem.as_ref()?;
    let profile: WwanProfile = decode(modem, payload)?;
    modem.set_wwan_profile(&profile).ok()?;
    Some(profile.to_bytes())
}

pub(super) fn start_wwan(session: &mut ClientSession, _: &[u8]) -> Option<Vec<u8>> {
    session.modem.as_ref()?.start_wwan().ok()?;
    Some(status_ok())
}

pub(super) fn stop_wwan(session: &mut ClientSession, _: &[u8]) -> Option<Vec<u8>> {
    session.modem.as_ref()?.stop_wwan().ok()?;
    Some(status_ok())
}

pub(super) fn state_wwan(session: &mut ClientSession, _: &[u8]) -> Option<Vec<u8>> {
    let state = session.modem.as_ref()?.state_wwan().ok()?;
    Some(state.to_bytes())
}

pub(super) fn ussd_cmd(session: &mut ClientSession, payload: &[u8]) -> Option<Vec<u8>> {
    let modem = session.modem.as_ref()?;
    let request = text_argument(modem, payload)?;
    let answer = modem.ussd(&request).ok()?;
    Some(encode_text(&answer))
}
