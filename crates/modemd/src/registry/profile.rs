//! Static description of a supported modem model.

use modem_rpc::{
    FirmwareVersion, Operator, PinChange, RegistrationState, SignalQuality, WwanProfile, WwanState,
};

use crate::modem::{ModemContext, ModemError};

/// Operation without arguments.
pub type Op<T> = fn(&ModemContext) -> Result<T, ModemError>;
/// Operation taking a text argument.
pub type TextOp = fn(&ModemContext, &str) -> Result<String, ModemError>;
/// Operation taking a PIN change request.
pub type PinOp = fn(&ModemContext, &PinChange) -> Result<(), ModemError>;
/// Operation taking a packet data profile.
pub type WwanProfileOp = fn(&ModemContext, &WwanProfile) -> Result<(), ModemError>;

/// Control protocol spoken on a USB interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Text AT commands over a tty.
    At,
    /// QMI through the vendor SDK.
    Qmi,
}

/// One bound USB interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interface {
    /// USB interface number.
    pub index: u8,
    /// Protocol spoken on it.
    pub protocol: Protocol,
}

/// Per-model implementations; `None` means unsupported.
#[derive(Debug, Clone, Copy)]
pub struct Operations {
    /// `modem_get_imei`.
    pub imei: Option<Op<String>>,
    /// `modem_get_imsi`.
    pub imsi: Option<Op<String>>,
    /// `modem_get_signal_quality`.
    pub signal_quality: Option<Op<SignalQuality>>,
    /// `modem_get_network_time`.
    pub network_time: Option<Op<i64>>,
    /// `modem_get_operator_name`.
    pub operator_name: Option<Op<String>>,
    /// `modem_network_registration`.
    pub network_registration: Option<Op<RegistrationState>>,
    /// `modem_get_network_type`.
    pub network_type: Option<Op<String>>,
    /// `modem_change_pin`.
    pub change_pin: Option<PinOp>,
    /// `modem_get_fw_version`.
    pub firmware_version: Option<Op<FirmwareVersion>>,
    /// `modem_operator_scan` and the background scan.
    pub operator_scan: Option<Op<Vec<Operator>>>,
    /// `modem_get_cell_id`.
    pub cell_id: Option<Op<i32>>,
    /// `modem_at_command`.
    pub at_command: Option<TextOp>,
    /// `modem_ussd_cmd`.
    pub ussd: Option<TextOp>,
    /// `modem_set_wwan_profile`.
    pub set_wwan_profile: Option<WwanProfileOp>,
    /// `modem_start_wwan`.
    pub start_wwan: Option<Op<()>>,
    /// `modem_stop_wwan`.
    pub stop_wwan: Option<Op<()>>,
    /// `modem_state_wwan`.
    pub state_wwan: Option<Op<WwanState>>,
}

impl Operations {
    /// Table with every slot unbound.
    pub const UNSUPPORTED: Self = Self {
        imei: None,
        imsi: None,
        signal_quality: None,
        network_time: None,
        operator_name: None,
        network_registration: None,
        network_type: None,
        change_pin: None,
        firmware_version: None,
        operator_scan: None,
        cell_id: None,
        at_command: None,
        ussd: None,
        set_wwan_profile: None,
        start_wwan: None,
        stop_wwan: None,
        state_wwan: None,
    };
}

/// Identity, interfaces, and operations of one modem model.
#[derive(Debug)]
pub struct DeviceProfile {
    /// Short model name.
    pub model: &'static str,
    /// USB vendor identifier; zero for the generic profile.
    pub vendor_id: u16,
    /// USB product identifier; zero for the generic profile.
    pub product_id: u16,
    /// Interfaces bound on open.
    pub interfaces: &'static [Interface],
    /// Operation table.
    pub operations: Operations,
    /// Whether the modem stays locked until it registers after open.
    pub registration_watch: bool,
}

impl DeviceProfile {
    /// Interface number speaking `protocol`, if declared.
    #[must_use]
    pub fn interface(&self, protocol: Protocol) -> Option<u8> {
        self.interfaces
            .iter()
            .find(|interface| interface.protocol == protocol)
            .map(|interface| interface.index)
    }

    /// Whether the profile matches the USB identity.
    #[must_use]
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }
}
