//! Codec for encoding and decoding Huddle frames.
//!
//! Each frame on the wire is a 4-byte big-endian length followed by the
//! MessagePack body.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::frames::Frame;

/// Maximum frame size (16 MiB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Length prefix size in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame exceeds maximum size.
    #[error("Frame size {0} exceeds maximum {MAX_FRAME_SIZE}")]
    FrameTooLarge(usize),

    /// Not enough data to decode frame.
    #[error("Incomplete frame: need {0} more bytes")]
    Incomplete(usize),

    /// MessagePack encoding error.
    #[error("Encoding error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// MessagePack decoding error.
    #[error("Decoding error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// Client major version is not supported.
    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(u8),
}

/// Body length announced by the prefix at the start of `data`, if present.
fn announced_length(data: &[u8]) -> Result<Option<usize>, ProtocolError> {
    let Some(prefix) = data.get(..LENGTH_PREFIX_SIZE) else {
        return Ok(None);
    };
    let length = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    if length > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(length));
    }
    Ok(Some(length))
}

/// Encode a frame to bytes.
///
/// # Errors
///
/// Returns an error if the frame is too large or encoding fails.
pub fn encode(frame: &Frame) -> Result<Bytes, ProtocolError> {
    let mut buf = BytesMut::new();
    encode_into(frame, &mut buf)?;
    Ok(buf.freeze())
}

/// Append an encoded frame to an existing buffer.
///
/// # Errors
///
/// Returns an error if the frame is too large or encoding fails.
pub fn encode_into(frame: &Frame, buf: &mut BytesMut) -> Result<(), ProtocolError> {
    let body = rmp_serde::to_vec_named(frame)?;

    if body.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(body.len()));
    }

    buf.reserve(LENGTH_PREFIX_SIZE + body.len());
    buf.put_u32(body.len() as u32);
    buf.extend_from_slice(&body);

    Ok(())
}

/// Decode exactly one frame from the start of `data`.
///
/// # Errors
///
/// Returns an error if the data is incomplete, too large, or invalid.
pub fn decode(data: &[u8]) -> Result<Frame, ProtocolError> {
    let length = announced_length(data)?
        .ok_or_else(|| ProtocolError::Incomplete(LENGTH_PREFIX_SIZE - data.len()))?;

    let total_size = LENGTH_PREFIX_SIZE + length;
    if data.len() < total_size {
        return Err(ProtocolError::Incomplete(total_size - data.len()));
    }

    Ok(rmp_serde::from_slice(&data[LENGTH_PREFIX_SIZE..total_size])?)
}

/// Try to decode a frame from a buffer, advancing it if successful.
///
/// Returns `Ok(None)` while the buffer holds less than one full frame.
///
/// # Errors
///
/// Returns an error if the frame is too large or invalid.
pub fn decode_from(buf: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
    let Some(length) = announced_length(&buf[..])? else {
        return Ok(None);
    };

    if buf.len() < LENGTH_PREFIX_SIZE + length {
        return Ok(None);
    }

    buf.advance(LENGTH_PREFIX_SIZE);
    let body = buf.split_to(length);
    Ok(Some(rmp_serde::from_slice(&body)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::{ChannelEntry, ChannelKind};

    #[test]
    fn test_encode_decode_roundtrip() {
        let frames = vec![
            Frame::connect(1, "alice"),
            Frame::create_group_chat(1, "g1"),
            Frame::send_message(2, "g1", ChannelKind::Group, "hello"),
            Frame::Channels {
                id: 3,
                items: vec![ChannelEntry {
                    name: "g1".into(),
                    kind: ChannelKind::Group,
                }],
            },
            Frame::Message {
                id: 42,
                from: "alice".into(),
                to: "bob".into(),
                kind: ChannelKind::Direct,
                body: "hi".into(),
                timestamp: 1_700_000_000_000,
            },
            Frame::error(4, 2004, "not a member"),
            Frame::ping(),
        ];

        for frame in frames {
            let encoded = encode(&frame).unwrap();
            let decoded = decode(&encoded).unwrap();
            assert_eq!(frame, decoded);
        }
    }

    #[test]
    fn test_decode_incomplete() {
        let encoded = encode(&Frame::join_group_chat(1, "g1")).unwrap();

        match decode(&encoded[..2]) {
            Err(ProtocolError::Incomplete(2)) => {}
            other => panic!("Expected Incomplete(2), got {:?}", other),
        }
        match decode(&encoded[..5]) {
            Err(ProtocolError::Incomplete(_)) => {}
            other => panic!("Expected Incomplete error, got {:?}", other),
        }
    }

    #[test]
    fn test_oversized_prefix_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u32((MAX_FRAME_SIZE + 1) as u32);

        match decode_from(&mut buf) {
            Err(ProtocolError::FrameTooLarge(_)) => {}
            other => panic!("Expected FrameTooLarge error, got {:?}", other),
        }
    }

    #[test]
    fn test_frame_too_large() {
        let body = "x".repeat(MAX_FRAME_SIZE + 1);
        let frame = Frame::send_message(1, "g1", ChannelKind::Group, body);

        match encode(&frame) {
            Err(ProtocolError::FrameTooLarge(_)) => {}
            other => panic!("Expected FrameTooLarge error, got {:?}", other),
        }
    }

    #[test]
    fn test_streaming_decode() {
        let first = Frame::create_group_chat(1, "g1");
        let second = Frame::list_channels(2);

        let mut buf = BytesMut::new();
        encode_into(&first, &mut buf).unwrap();
        encode_into(&second, &mut buf).unwrap();
        let tail = buf.split_off(buf.len() - 3);

        assert_eq!(decode_from(&mut buf).unwrap(), Some(first));
        assert_eq!(decode_from(&mut buf).unwrap(), None);

        buf.unsplit(tail);
        assert_eq!(decode_from(&mut buf).unwrap(), Some(second));
        assert!(buf.is_empty());
    }
}
