//! Function name to handler mapping.

use modem_rpc::Function;

use super::ClientSession;
use super::handlers;

/// Handler for one function; `None` is answered with an empty payload.
pub(super) type Handler = fn(&mut ClientSession, &[u8]) -> Option<Vec<u8>>;

pub(super) struct Entry {
    pub(super) function: Function,
    pub(super) handler: Handler,
    /// Refused while the modem is locked.
    pub(super) privileged: bool,
}

const fn entry(function: Function, handler: Handler, privileged: bool) -> Entry {
    Entry {
        function,
        handler,
        privileged,
    }
}

static ENTRIES: [Entry; 27] = [
    entry(Function::FindFirst, handlers::find_first, false),
    entry(Function::FindNext, handlers::find_next, false),
    entry(Function::FindClose, handlers::find_close, false),
    entry(Function::OpenByPort, handlers::open_by_port, false),
    entry(Function::Close, handlers::close, false),
    entry(Function::GetInfo, handlers::get_info, false),
    entry(Function::GetLastError, handlers::get_last_error, false),
    entry(Function::GetImei, handlers::get_imei, false),
    entry(Function::GetImsi, handlers::get_imsi, true),
    entry(Function::ChangePin, handlers::change_pin, false),
    entry(Function::GetFwVersion, handlers::get_fw_version, false),
    entry(Function::NetworkRegistration, handlers::network_registration, false),
    entry(Function::GetSignalQuality, handlers::get_signal_quality, true),
    entry(Function::OperatorScan, handlers::operator_scan, true),
    entry(Function::OperatorScanStart, handlers::operator_scan_start, true),
    entry(Function::OperatorScanIsRunning, handlers::operator_scan_is_running, false),
    entry(Function::AtCommand, handlers::at_command, true),
    entry(Function::GetNetworkTime, handlers::get_network_time, true),
    entry(Function::GetOperatorName, handlers::get_operator_name, true),
    entry(Function::GetNetworkType, handlers::get_network_type, true),
    entry(Function::GetCellId, handlers::get_cell_id, true),
    entry(Function::ConfReload, handlers::conf_reload, false),
    entry(Function::SetWwanProfile, handlers::set_wwan_profile, false),
    entry(Function::StartWwan, handlers::start_wwan, false),
    entry(Function::StopWwan, handlers::stop_wwan, false),
    entry(Function::StateWwan, handlers::state_wwan, false),
    entry(Function::UssdCmd, handlers::ussd_cmd, true),
];

pub(super) fn lookup(function: Function) -> Option<&'static Entry> {
    ENTRIES.iter().find(|entry| entry.function == function)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn every_function_has_exactly_one_entry() {
        for function in Function::iter() {
            let count = ENTRIES.iter().filter(|entry| entry.function == function).count();
            assert_eq!(count, 1, "{function}");
        }
    }

    #[test]
    fn scan_progress_and_last_error_are_never_gated() {
        for function in [Function::OperatorScanIsRunning, Function::GetLastError] {
            assert!(!lookup(function).expect("entry").privileged);
        }
    }
}
