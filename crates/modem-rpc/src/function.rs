//! Catalogue of RPC function selectors.

use strum::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

/// Every function the daemon answers, keyed by its exact wire name.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumCount,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
pub enum Function {
    /// Starts device discovery and returns the first recognised modem.
    #[strum(serialize = "modem_find_first")]
    FindFirst,
    /// Returns the next recognised modem.
    #[strum(serialize = "modem_find_next")]
    FindNext,
    /// Releases the discovery cursor.
    #[strum(serialize = "modem_find_close")]
    FindClose,
    /// Opens the modem attached to a USB port.
    #[strum(serialize = "modem_open_by_port")]
    OpenByPort,
    /// Closes the open modem.
    #[strum(serialize = "modem_close")]
    Close,
    /// Describes the open modem.
    #[strum(serialize = "modem_get_info")]
    GetInfo,
    /// Reports the sticky error code of the open modem.
    #[strum(serialize = "modem_get_last_error")]
    GetLastError,
    /// Reads the IMEI.
    #[strum(serialize = "modem_get_imei")]
    GetImei,
    /// Reads the IMSI.
    #[strum(serialize = "modem_get_imsi")]
    GetImsi,
    /// Changes the SIM PIN.
    #[strum(serialize = "modem_change_pin")]
    ChangePin,
    /// Reads the firmware version.
    #[strum(serialize = "modem_get_fw_version")]
    GetFwVersion,
    /// Reads the network registration state.
    #[strum(serialize = "modem_network_registration")]
    NetworkRegistration,
    /// Reads the signal quality.
    #[strum(serialize = "modem_get_signal_quality")]
    GetSignalQuality,
    /// Scans for operators and waits for the result.
    #[strum(serialize = "modem_operator_scan")]
    OperatorScan,
    /// Starts a background operator scan.
    #[strum(serialize = "modem_operator_scan_start")]
    OperatorScanStart,
    /// Reports whether a background scan is still running.
    #[strum(serialize = "modem_operator_scan_is_running")]
    OperatorScanIsRunning,
    /// Passes a raw AT command through to the modem.
    #[strum(serialize = "modem_at_command")]
    AtCommand,
    /// Reads the network time.
    #[strum(serialize = "modem_get_network_time")]
    GetNetworkTime,
    /// Reads the registered operator name.
    #[strum(serialize = "modem_get_operator_name")]
    GetOperatorName,
    /// Reads the radio access technology.
    #[strum(serialize = "modem_get_network_type")]
    GetNetworkType,
    /// Reads the serving cell identifier.
    #[strum(serialize = "modem_get_cell_id")]
    GetCellId,
    /// Rebinds the modem's AT channel.
    #[strum(serialize = "modem_conf_reload")]
    ConfReload,
    /// Stores the packet data profile.
    #[strum(serialize = "modem_set_wwan_profile")]
    SetWwanProfile,
    /// Starts the packet data session.
    #[strum(serialize = "modem_start_wwan")]
    StartWwan,
    /// Stops the packet data session.
    #[strum(serialize = "modem_stop_wwan")]
    StopWwan,
    /// Reports the packet data session state.
    #[strum(serialize = "modem_state_wwan")]
    StateWwan,
    /// Sends a USSD request.
    #[strum(serialize = "modem_ussd_cmd")]
    UssdCmd,
}

impl Function {
    /// Exact wire name.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Resolves a raw selector; `None` for anything outside the catalogue.
    #[must_use]
    pub fn from_name(name: &[u8]) -> Option<Self> {
        std::str::from_utf8(name).ok()?.parse().ok()
    }

    /// Whether the call needs an opened modem.
    #[must_use]
    pub const fn requires_modem(self) -> bool {
        !matches!(
            self,
            Self::FindFirst | Self::FindNext | Self::FindClose | Self::OpenByPort
        )
    }
}
