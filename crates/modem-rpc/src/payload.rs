//! Fixed-layout payload schemas for the RPC functions.
//!
//! Integers are little-endian. Fixed-width strings are NUL padded and hold at
//! most `width - 1` bytes of text, truncated on a character boundary.
#![expect(
    clippy::little_endian_bytes,
    reason = "payload integers are little-endian by definition"
)]

use serde::Serialize;
use thiserror::Error;

/// Errors raised while decoding a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// The payload ended before the schema did.
    #[error("payload truncated: needed {needed} bytes, {available} available")]
    Truncated {
        /// Bytes the schema requires.
        needed: usize,
        /// Bytes present.
        available: usize,
    },
    /// Bytes remained after the schema was fully read.
    #[error("payload has {0} unexpected trailing bytes")]
    TrailingBytes(usize),
    /// A field carried a value outside its domain.
    #[error("invalid {field} value {value}")]
    InvalidValue {
        /// Field name.
        field: &'static str,
        /// Raw value.
        value: i64,
    },
}

/// Types with a fixed binary layout on the wire.
pub trait Payload: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Appends the encoded form to `writer`.
    fn write(&self, writer: &mut PayloadWriter);

    /// Reads one value from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError`] when the bytes do not match the schema.
    fn read(reader: &mut PayloadReader<'_>) -> Result<Self, PayloadError>;

    /// Encodes the value into a fresh buffer.
    #[must_use]
    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = PayloadWriter::with_capacity(Self::SIZE);
        self.write(&mut writer);
        writer.finish()
    }

    /// Decodes a payload holding exactly one value.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError`] when the payload is short, long, or invalid.
    fn from_bytes(bytes: &[u8]) -> Result<Self, PayloadError> {
        let mut reader = PayloadReader::new(bytes);
        let value = Self::read(&mut reader)?;
        reader.finish()?;
        Ok(value)
    }
}

/// Append-only payload builder.
#[derive(Debug, Default)]
pub struct PayloadWriter {
    bytes: Vec<u8>,
}

impl PayloadWriter {
    /// Builds a writer with preallocated space.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Appends raw bytes.
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Appends text into a NUL padded field of `width` bytes.
    pub fn put_fixed_str(&mut self, text: &str, width: usize) {
        let limit = width.saturating_sub(1);
        let mut end = text.len().min(limit);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let kept = text.as_bytes().get(..end).unwrap_or_default();
        self.bytes.extend_from_slice(kept);
        self.bytes.resize(self.bytes.len() + (width - kept.len()), 0);
    }

    /// Returns the encoded bytes.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

/// Cursor over an encoded payload.
#[derive(Debug)]
pub struct PayloadReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> PayloadReader<'a> {
    /// Starts reading at the beginning of `bytes`.
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Takes the next `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Truncated`] when fewer bytes remain.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], PayloadError> {
        let end = self.offset + len;
        let slice = self.bytes.get(self.offset..end).ok_or(PayloadError::Truncated {
            needed: end,
            available: self.bytes.len(),
        })?;
        self.offset = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], PayloadError> {
        let slice = self.take(N)?;
        let mut array = [0_u8; N];
        array.copy_from_slice(slice);
        Ok(array)
    }

    /// Reads a NUL padded text field of `width` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Truncated`] when fewer bytes remain.
    pub fn fixed_str(&mut self, width: usize) -> Result<String, PayloadError> {
        Ok(text_until_nul(self.take(width)?))
    }

    /// Number of unread bytes.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.offset)
    }

    /// Confirms every byte was consumed.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::TrailingBytes`] when bytes remain.
    pub fn finish(self) -> Result<(), PayloadError> {
        match self.remaining() {
            0 => Ok(()),
            extra => Err(PayloadError::TrailingBytes(extra)),
        }
    }
}

/// Decodes a text payload, stopping at the first NUL.
#[must_use]
pub fn text_until_nul(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|byte| *byte == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(bytes.get(..end).unwrap_or_default()).into_owned()
}

/// Encodes a text payload as its bare bytes, with no terminator.
#[must_use]
pub fn encode_text(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

macro_rules! scalar_payload {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Payload for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn write(&self, writer: &mut PayloadWriter) {
                    writer.put_bytes(&self.to_le_bytes());
                }

                fn read(reader: &mut PayloadReader<'_>) -> Result<Self, PayloadError> {
                    Ok(<$ty>::from_le_bytes(reader.take_array()?))
                }
            }
        )*
    };
}

scalar_payload!(u8, i8, u16, i16, u32, i32, i64);

/// Width of [`DeviceInfo::port`].
pub const PORT_LEN: usize = 8;
/// Width of the descriptive strings in [`DeviceInfo`].
pub const DESCRIPTION_LEN: usize = 256;
/// Width of [`FirmwareVersion::firmware`].
pub const FIRMWARE_LEN: usize = 256;
/// Width of each PIN in [`PinChange`].
pub const PIN_LEN: usize = 16;
/// Width of [`Operator::long_name`].
pub const OPERATOR_LONG_LEN: usize = 17;
/// Width of [`Operator::short_name`].
pub const OPERATOR_SHORT_LEN: usize = 9;
/// Width of [`Operator::numeric`].
pub const OPERATOR_NUMERIC_LEN: usize = 13;
/// Width of [`WwanProfile::apn`].
pub const APN_LEN: usize = 101;
/// Width of the credentials in [`WwanProfile`].
pub const CREDENTIAL_LEN: usize = 33;

/// Identity of an attached USB modem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// USB port path such as `1-1`.
    pub port: String,
    /// USB vendor identifier.
    pub vendor_id: u16,
    /// USB product identifier.
    pub product_id: u16,
    /// Manufacturer string.
    pub manufacturer: String,
    /// Product string.
    pub product: String,
}

impl Payload for DeviceInfo {
    const SIZE: usize = PORT_LEN + 2 + 2 + DESCRIPTION_LEN + DESCRIPTION_LEN;

    fn write(&self, writer: &mut PayloadWriter) {
        writer.put_fixed_str(&self.port, PORT_LEN);
        self.vendor_id.write(writer);
        self.product_id.write(writer);
        writer.put_fixed_str(&self.manufacturer, DESCRIPTION_LEN);
        writer.put_fixed_str(&self.product, DESCRIPTION_LEN);
    }

    fn read(reader: &mut PayloadReader<'_>) -> Result<Self, PayloadError> {
        Ok(Self {
            port: reader.fixed_str(PORT_LEN)?,
            vendor_id: u16::read(reader)?,
            product_id: u16::read(reader)?,
            manufacturer: reader.fixed_str(DESCRIPTION_LEN)?,
            product: reader.fixed_str(DESCRIPTION_LEN)?,
        })
    }
}

/// Received signal strength.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SignalQuality {
    /// Signal strength in dBm; zero when unknown.
    pub dbm: i16,
    /// Bar count from 0 to 5.
    pub level: u8,
}

impl Payload for SignalQuality {
    const SIZE: usize = 3;

    fn write(&self, writer: &mut PayloadWriter) {
        self.dbm.write(writer);
        self.level.write(writer);
    }

    fn read(reader: &mut PayloadReader<'_>) -> Result<Self, PayloadError> {
        Ok(Self {
            dbm: i16::read(reader)?,
            level: u8::read(reader)?,
        })
    }
}

/// Firmware identification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FirmwareVersion {
    /// Firmware revision string.
    pub firmware: String,
    /// Build date as Unix seconds; zero when unknown.
    pub release: i64,
}

impl Payload for FirmwareVersion {
    const SIZE: usize = FIRMWARE_LEN + 8;

    fn write(&self, writer: &mut PayloadWriter) {
        writer.put_fixed_str(&self.firmware, FIRMWARE_LEN);
        self.release.write(writer);
    }

    fn read(reader: &mut PayloadReader<'_>) -> Result<Self, PayloadError> {
        Ok(Self {
            firmware: reader.fixed_str(FIRMWARE_LEN)?,
            release: i64::read(reader)?,
        })
    }
}

/// Network registration state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, strum::Display)]
#[repr(u8)]
pub enum RegistrationState {
    /// Not registered and not searching.
    #[default]
    #[strum(to_string = "Not registered")]
    Failed = 0,
    /// Registered on the home network.
    #[strum(to_string = "Home network")]
    Home = 1,
    /// Searching for a network.
    #[strum(to_string = "Searching")]
    Searching = 2,
    /// Registration denied.
    #[strum(to_string = "Registration denied")]
    Denied = 3,
    /// State unknown.
    #[strum(to_string = "Unknown")]
    Unknown = 4,
    /// Registered while roaming.
    #[strum(to_string = "Roaming")]
    Roaming = 5,
}

impl RegistrationState {
    /// Maps a `+CREG` status code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Failed),
            1 => Some(Self::Home),
            2 => Some(Self::Searching),
            3 => Some(Self::Denied),
            4 => Some(Self::Unknown),
            5 => Some(Self::Roaming),
            _ => None,
        }
    }

    /// Whether the modem can carry traffic.
    #[must_use]
    pub const fn is_registered(self) -> bool {
        matches!(self, Self::Home | Self::Roaming)
    }
}

impl Payload for RegistrationState {
    const SIZE: usize = 1;

    fn write(&self, writer: &mut PayloadWriter) {
        (*self as u8).write(writer);
    }

    fn read(reader: &mut PayloadReader<'_>) -> Result<Self, PayloadError> {
        let code = u8::read(reader)?;
        Self::from_code(code).ok_or(PayloadError::InvalidValue {
            field: "registration",
            value: i64::from(code),
        })
    }
}

/// SIM PIN change request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinChange {
    /// Current PIN.
    pub old_pin: String,
    /// Replacement PIN.
    pub new_pin: String,
}

impl Payload for PinChange {
    const SIZE: usize = PIN_LEN * 2;

    fn write(&self, writer: &mut PayloadWriter) {
        writer.put_fixed_str(&self.old_pin, PIN_LEN);
        writer.put_fixed_str(&self.new_pin, PIN_LEN);
    }

    fn read(reader: &mut PayloadReader<'_>) -> Result<Self, PayloadError> {
        Ok(Self {
            old_pin: reader.fixed_str(PIN_LEN)?,
            new_pin: reader.fixed_str(PIN_LEN)?,
        })
    }
}

/// Availability of an operator found by a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum OperatorStatus {
    /// Availability not reported.
    #[default]
    Unknown = 0,
    /// Operator can be selected.
    Available = 1,
    /// Operator currently serving the modem.
    Current = 2,
    /// Operator is forbidden.
    Forbidden = 3,
}

impl OperatorStatus {
    /// Maps a `+COPS` status code; unrecognised codes become `Unknown`.
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Available,
            2 => Self::Current,
            3 => Self::Forbidden,
            _ => Self::Unknown,
        }
    }
}

/// One entry of an operator scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Operator {
    /// Availability.
    pub status: OperatorStatus,
    /// Long alphanumeric name.
    pub long_name: String,
    /// Short alphanumeric name.
    pub short_name: String,
    /// MCC and MNC digits.
    pub numeric: String,
    /// Access technology code as reported by the modem.
    pub access_technology: u8,
}

impl Payload for Operator {
    const SIZE: usize = 1 + OPERATOR_LONG_LEN + OPERATOR_SHORT_LEN + OPERATOR_NUMERIC_LEN + 1;

    fn write(&self, writer: &mut PayloadWriter) {
        (self.status as u8).write(writer);
        writer.put_fixed_str(&self.long_name, OPERATOR_LONG_LEN);
        writer.put_fixed_str(&self.short_name, OPERATOR_SHORT_LEN);
        writer.put_fixed_str(&self.numeric, OPERATOR_NUMERIC_LEN);
        self.access_technology.write(writer);
    }

    fn read(reader: &mut PayloadReader<'_>) -> Result<Self, PayloadError> {
        Ok(Self {
            status: OperatorStatus::from_code(u8::read(reader)?),
            long_name: reader.fixed_str(OPERATOR_LONG_LEN)?,
            short_name: reader.fixed_str(OPERATOR_SHORT_LEN)?,
            numeric: reader.fixed_str(OPERATOR_NUMERIC_LEN)?,
            access_technology: u8::read(reader)?,
        })
    }
}

/// Encodes a list of operators back to back.
#[must_use]
pub fn encode_operators(operators: &[Operator]) -> Vec<u8> {
    let mut writer = PayloadWriter::with_capacity(operators.len() * Operator::SIZE);
    for operator in operators {
        operator.write(&mut writer);
    }
    writer.finish()
}

/// Decodes a back-to-back list of operators.
///
/// # Errors
///
/// Returns [`PayloadError`] when the payload is not a whole number of entries.
pub fn decode_operators(bytes: &[u8]) -> Result<Vec<Operator>, PayloadError> {
    let mut reader = PayloadReader::new(bytes);
    let mut operators = Vec::new();
    while reader.remaining() > 0 {
        operators.push(Operator::read(&mut reader)?);
    }
    Ok(operators)
}

/// PPP authentication used by a data profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum AuthProtocol {
    /// No authentication.
    #[default]
    None = 0,
    /// PAP.
    Pap = 1,
    /// CHAP.
    Chap = 2,
}

/// Packet data profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WwanProfile {
    /// Access point name.
    pub apn: String,
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
    /// Authentication protocol.
    pub auth: AuthProtocol,
}

impl Payload for WwanProfile {
    const SIZE: usize = APN_LEN + CREDENTIAL_LEN * 2 + 1;

    fn write(&self, writer: &mut PayloadWriter) {
        writer.put_fixed_str(&self.apn, APN_LEN);
        writer.put_fixed_str(&self.username, CREDENTIAL_LEN);
        writer.put_fixed_str(&self.password, CREDENTIAL_LEN);
        (self.auth as u8).write(writer);
    }

    fn read(reader: &mut PayloadReader<'_>) -> Result<Self, PayloadError> {
        let apn = reader.fixed_str(APN_LEN)?;
        let username = reader.fixed_str(CREDENTIAL_LEN)?;
        let password = reader.fixed_str(CREDENTIAL_LEN)?;
        let auth = match u8::read(reader)? {
            0 => AuthProtocol::None,
            1 => AuthProtocol::Pap,
            2 => AuthProtocol::Chap,
            other => {
                return Err(PayloadError::InvalidValue {
                    field: "auth",
                    value: i64::from(other),
                });
            }
        };
        Ok(Self {
            apn,
            username,
            password,
            auth,
        })
    }
}

/// Packet data session state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum WwanState {
    /// No session.
    #[default]
    Disconnected = 0,
    /// Session being established.
    Connecting = 1,
    /// Session up.
    Connected = 2,
}

impl Payload for WwanState {
    const SIZE: usize = 1;

    fn write(&self, writer: &mut PayloadWriter) {
        (*self as u8).write(writer);
    }

    fn read(reader: &mut PayloadReader<'_>) -> Result<Self, PayloadError> {
        match u8::read(reader)? {
            0 => Ok(Self::Disconnected),
            1 => Ok(Self::Connecting),
            2 => Ok(Self::Connected),
            other => Err(PayloadError::InvalidValue {
                field: "wwan_state",
                value: i64::from(other),
            }),
        }
    }
}
