//! Length-prefixed frame envelope used on the control socket.
//!
//! Layout: one type byte, one name-length byte, a little-endian `u16`
//! payload length, the name bytes, then the payload bytes. The codec never
//! looks inside the payload.
#![expect(
    clippy::little_endian_bytes,
    reason = "the control socket header is little-endian by definition"
)]

use std::fmt;
use std::io::{self, Read, Write};

use thiserror::Error;

/// Size of the fixed frame header.
pub const HEADER_LEN: usize = 4;

/// Longest function name a frame can carry.
pub const MAX_NAME_LEN: usize = u8::MAX as usize;

/// Longest payload a frame can carry.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Direction of a frame.
///
/// Type bytes other than QUERY and RESPONSE are kept so the whole frame can
/// still be consumed and skipped by the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Client request.
    Query,
    /// Daemon reply.
    Response,
    /// Any other type byte.
    Other(u8),
}

impl From<u8> for FrameType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Query,
            1 => Self::Response,
            other => Self::Other(other),
        }
    }
}

impl From<FrameType> for u8 {
    fn from(kind: FrameType) -> Self {
        match kind {
            FrameType::Query => 0,
            FrameType::Response => 1,
            FrameType::Other(byte) => byte,
        }
    }
}

/// Field that exceeded its width during encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameField {
    /// The function name.
    Name,
    /// The opaque payload.
    Payload,
}

impl fmt::Display for FrameField {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Name => "name",
            Self::Payload => "payload",
        })
    }
}

/// Errors raised while encoding, decoding, or transferring frames.
#[derive(Debug, Error)]
pub enum FrameError {
    /// A field does not fit its length prefix.
    #[error("frame {field} is {len} bytes, exceeding the {max}-byte limit")]
    OversizedField {
        /// Offending field.
        field: FrameField,
        /// Actual length.
        len: usize,
        /// Protocol maximum.
        max: usize,
    },
    /// A buffer ended before the frame it announces.
    #[error("frame truncated: needed {needed} bytes, {available} available")]
    ShortRead {
        /// Bytes the frame requires.
        needed: usize,
        /// Bytes present in the buffer.
        available: usize,
    },
    /// The peer closed the stream part-way through a frame.
    #[error("peer disconnected after {received} of {expected} frame bytes")]
    Disconnected {
        /// Bytes the frame requires.
        expected: usize,
        /// Bytes received before the stream ended.
        received: usize,
    },
    /// The underlying stream failed.
    #[error("frame transfer failed: {0}")]
    Io(#[from] io::Error),
}

/// One request or reply on the control socket.
///
/// The name is kept as raw bytes so an unknown or malformed selector can be
/// echoed back exactly as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    kind: FrameType,
    name: Vec<u8>,
    payload: Vec<u8>,
}

impl Frame {
    /// Builds a frame of the given type.
    #[must_use]
    pub fn new(kind: FrameType, name: impl Into<Vec<u8>>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            name: name.into(),
            payload: payload.into(),
        }
    }

    /// Builds a QUERY frame.
    #[must_use]
    pub fn query(name: impl Into<Vec<u8>>, payload: impl Into<Vec<u8>>) -> Self {
        Self::new(FrameType::Query, name, payload)
    }

    /// Builds a RESPONSE frame.
    #[must_use]
    pub fn response(name: impl Into<Vec<u8>>, payload: impl Into<Vec<u8>>) -> Self {
        Self::new(FrameType::Response, name, payload)
    }

    /// Builds the RESPONSE to this frame carrying `payload`.
    #[must_use]
    pub fn reply(&self, payload: impl Into<Vec<u8>>) -> Self {
        Self::response(self.name.clone(), payload)
    }

    /// Builds the empty RESPONSE that signals failure of this frame's call.
    #[must_use]
    pub fn failure(&self) -> Self {
        self.reply(Vec::new())
    }

    /// Frame direction.
    #[must_use]
    pub const fn kind(&self) -> FrameType {
        self.kind
    }

    /// Raw function name bytes.
    #[must_use]
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Function name as text, when it is valid UTF-8.
    #[must_use]
    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.name).ok()
    }

    /// Opaque payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consumes the frame, returning its payload.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Total encoded size.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.name.len() + self.payload.len()
    }

    /// Serialises the frame.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::OversizedField`] when the name exceeds
    /// [`MAX_NAME_LEN`] or the payload exceeds [`MAX_PAYLOAD_LEN`].
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        let name_len = u8::try_from(self.name.len()).map_err(|_| FrameError::OversizedField {
            field: FrameField::Name,
            len: self.name.len(),
            max: MAX_NAME_LEN,
        })?;
        let payload_len =
            u16::try_from(self.payload.len()).map_err(|_| FrameError::OversizedField {
                field: FrameField::Payload,
                len: self.payload.len(),
                max: MAX_PAYLOAD_LEN,
            })?;

        let mut bytes = Vec::with_capacity(self.encoded_len());
        bytes.push(u8::from(self.kind));
        bytes.push(name_len);
        bytes.extend_from_slice(&payload_len.to_le_bytes());
        bytes.extend_from_slice(&self.name);
        bytes.extend_from_slice(&self.payload);
        Ok(bytes)
    }
}

#[derive(Debug, Clone, Copy)]
struct Header {
    kind: FrameType,
    name_len: usize,
    payload_len: usize,
}

impl Header {
    fn parse(bytes: [u8; HEADER_LEN]) -> Self {
        let [kind, name_len, low, high] = bytes;
        Self {
            kind: FrameType::from(kind),
            name_len: usize::from(name_len),
            payload_len: usize::from(u16::from_le_bytes([low, high])),
        }
    }

    const fn body_len(&self) -> usize {
        self.name_len + self.payload_len
    }
}

/// Decodes one frame from the start of `bytes`.
///
/// Returns the frame and the number of bytes it occupied.
///
/// # Errors
///
/// Returns [`FrameError::ShortRead`] when `bytes` ends before the announced
/// frame does.
pub fn decode(bytes: &[u8]) -> Result<(Frame, usize), FrameError> {
    let header_bytes: [u8; HEADER_LEN] = bytes
        .get(..HEADER_LEN)
        .and_then(|slice| slice.try_into().ok())
        .ok_or(FrameError::ShortRead {
            needed: HEADER_LEN,
            available: bytes.len(),
        })?;
    let header = Header::parse(header_bytes);
    let total = HEADER_LEN + header.body_len();
    let body = bytes
        .get(HEADER_LEN..total)
        .ok_or(FrameError::ShortRead {
            needed: total,
            available: bytes.len(),
        })?;
    let (name, payload) = body.split_at(header.name_len);
    Ok((Frame::new(header.kind, name, payload), total))
}

/// Reads one complete frame from a blocking stream.
///
/// Returns `Ok(None)` when the stream ends cleanly before a new frame starts.
///
/// # Errors
///
/// Returns [`FrameError::Disconnected`] when the stream ends inside a frame
/// and [`FrameError::Io`] for stream failures.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Frame>, FrameError> {
    let mut header_bytes = [0_u8; HEADER_LEN];
    let received = fill(reader, &mut header_bytes)?;
    if received == 0 {
        return Ok(None);
    }
    if received < HEADER_LEN {
        return Err(FrameError::Disconnected {
            expected: HEADER_LEN,
            received,
        });
    }

    let header = Header::parse(header_bytes);
    let mut body = vec![0_u8; header.body_len()];
    let received = fill(reader, &mut body)?;
    if received < body.len() {
        return Err(FrameError::Disconnected {
            expected: HEADER_LEN + body.len(),
            received: HEADER_LEN + received,
        });
    }

    let payload = body.split_off(header.name_len);
    Ok(Some(Frame::new(header.kind, body, payload)))
}

/// Writes one complete frame and flushes the stream.
///
/// # Errors
///
/// Returns [`FrameError::OversizedField`] when the frame cannot be encoded
/// and [`FrameError::Io`] when the stream fails.
pub fn write_frame<W: Write>(writer: &mut W, frame: &Frame) -> Result<(), FrameError> {
    let bytes = frame.encode()?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Reads until `buffer` is full or the stream ends, retrying interrupted reads.
fn fill<R: Read>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while let Some(remaining) = buffer.get_mut(filled..) {
        if remaining.is_empty() {
            break;
        }
        match reader.read(remaining) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    #[rstest]
    #[case(FrameType::Query, 0, 0)]
    #[case(FrameType::Response, 16, 524)]
    #[case(FrameType::Query, MAX_NAME_LEN, MAX_PAYLOAD_LEN)]
    #[case(FrameType::Other(2), 1, 0)]
    fn frames_survive_encoding(
        #[case] kind: FrameType,
        #[case] name_len: usize,
        #[case] payload_len: usize,
    ) {
        let name: Vec<u8> = (0..name_len).map(|index| (index % 251) as u8).collect();
        let payload: Vec<u8> = (0..payload_len).map(|index| (index % 253) as u8).collect();
        let frame = Frame::new(kind, name, payload);

        let bytes = frame.encode().expect("encode frame");
        assert_eq!(bytes.len(), frame.encoded_len());
        let (decoded, used) = decode(&bytes).expect("decode frame");
        assert_eq!(decoded, frame);
        assert_eq!(used, bytes.len());
    }

    #[test]
    fn header_layout_is_little_endian() {
        let frame = Frame::query("modem_get_imei", vec![0_u8; 0x0102]);
        let bytes = frame.encode().expect("encode frame");
        assert_eq!(bytes.get(..HEADER_LEN), Some(&[0_u8, 14, 0x02, 0x01][..]));
        assert_eq!(bytes.get(HEADER_LEN..HEADER_LEN + 14), Some(&b"modem_get_imei"[..]));
    }

    #[test]
    fn oversized_name_is_rejected() {
        let frame = Frame::query(vec![b'a'; MAX_NAME_LEN + 1], Vec::new());
        let error = frame.encode().expect_err("name too long");
        assert!(matches!(
            error,
            FrameError::OversizedField {
                field: FrameField::Name,
                len: 256,
                max: 255
            }
        ));
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let frame = Frame::response("modem_operator_scan", vec![0_u8; MAX_PAYLOAD_LEN + 1]);
        let error = frame.encode().expect_err("payload too long");
        assert!(matches!(
            error,
            FrameError::OversizedField {
                field: FrameField::Payload,
                ..
            }
        ));
    }

    #[test]
    fn every_truncation_is_a_short_read() {
        let bytes = Frame::query("modem_get_imsi", b"abc".to_vec())
            .encode()
            .expect("encode frame");
        for cut in 0..bytes.len() {
            let prefix = bytes.get(..cut).expect("prefix within bounds");
            let error = decode(prefix).expect_err("truncated frame");
            assert!(
                matches!(error, FrameError::ShortRead { available, .. } if available == cut),
                "cut at {cut} produced {error:?}"
            );
        }
    }

    #[test]
    fn unknown_type_frame_is_consumed_whole() {
        let next = Frame::query("bogus_fn", Vec::new());
        let mut bytes = vec![2, 1, 0, 0, b'x'];
        bytes.extend(next.encode().expect("encode frame"));
        let mut cursor = Cursor::new(bytes);

        let stray = read_frame(&mut cursor).expect("read").expect("frame");
        assert_eq!(stray.kind(), FrameType::Other(2));
        assert_eq!(stray.name(), b"x");
        assert_eq!(read_frame(&mut cursor).expect("read"), Some(next));
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let mut bytes = Frame::query("modem_close", Vec::new())
            .encode()
            .expect("encode frame");
        let frame_len = bytes.len();
        bytes.extend_from_slice(&[0xff, 0xff]);
        let (_, used) = decode(&bytes).expect("decode frame");
        assert_eq!(used, frame_len);
    }

    #[test]
    fn stream_reads_consecutive_frames_then_eof() {
        let first = Frame::query("modem_find_first", Vec::new());
        let second = Frame::query("modem_open_by_port", b"1-1".to_vec());
        let mut bytes = first.encode().expect("encode first");
        bytes.extend(second.encode().expect("encode second"));
        let mut cursor = Cursor::new(bytes);

        assert_eq!(read_frame(&mut cursor).expect("first"), Some(first));
        assert_eq!(read_frame(&mut cursor).expect("second"), Some(second));
        assert_eq!(read_frame(&mut cursor).expect("eof"), None);
    }

    #[rstest]
    #[case(2)]
    #[case(HEADER_LEN + 3)]
    fn stream_ending_mid_frame_is_disconnected(#[case] cut: usize) {
        let bytes = Frame::query("modem_get_imei", b"xyz".to_vec())
            .encode()
            .expect("encode frame");
        let mut cursor = Cursor::new(bytes.get(..cut).expect("prefix").to_vec());
        let error = read_frame(&mut cursor).expect_err("disconnected");
        assert!(matches!(error, FrameError::Disconnected { received, .. } if received == cut));
    }

    #[test]
    fn write_frame_emits_encoded_bytes() {
        let frame = Frame::response("modem_get_imei", b"359072066322327".to_vec());
        let mut sink = Vec::new();
        write_frame(&mut sink, &frame).expect("write frame");
        assert_eq!(sink, frame.encode().expect("encode frame"));
    }

    #[test]
    fn failure_reply_keeps_name_and_drops_payload() {
        let request = Frame::query(b"bogus_fn".to_vec(), b"data".to_vec());
        let reply = request.failure();
        assert_eq!(reply.kind(), FrameType::Response);
        assert_eq!(reply.name(), b"bogus_fn");
        assert!(reply.payload().is_empty());
    }
}
