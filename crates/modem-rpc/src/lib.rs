//! Wire protocol spoken between `modemd` and its clients.
//!
//! Each message is a [`Frame`]: a one byte [`FrameType`], a one byte name
//! length, a little-endian `u16` payload length, then the name and payload
//! bytes. The name selects a [`Function`]; the payload is a fixed-layout
//! structure from [`payload`]. A reply with an empty payload signals failure.

pub mod frame;
pub mod function;
pub mod payload;

pub use frame::{
    Frame, FrameError, FrameField, FrameType, HEADER_LEN, MAX_NAME_LEN, MAX_PAYLOAD_LEN, decode,
    read_frame, write_frame,
};
pub use function::Function;
pub use payload::{
    AuthProtocol, DeviceInfo, FirmwareVersion, Operator, OperatorStatus, Payload, PayloadError,
    PayloadReader, PayloadWriter, PinChange, RegistrationState, SignalQuality, WwanProfile,
    WwanState, decode_operators, encode_operators, encode_text, text_until_nul,
};
