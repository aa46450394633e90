//! Link frame encoding/decoding.
//!
//! ```text
//! +------+-----+------+------+-------------+-----+
//! | 0xFE | len | cmd0 | cmd1 | payload[len] | FCS |
//! +------+-----+------+------+-------------+-----+
//! ```
//!
//! FCS is the XOR of every byte from `len` through the end of the payload.

use bytes::{Buf, BufMut, BytesMut};

use crate::command::{command_by_id, CommandDescriptor, CommandType, Subsystem};
use crate::constants::{FRAME_OVERHEAD, MAX_PAYLOAD, SOF};
use crate::error::ProtocolError;

/// XOR checksum over `data`.
pub fn calculate_fcs(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, byte| acc ^ byte)
}

/// One decoded link frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFrame {
    pub kind: CommandType,
    pub subsystem: Subsystem,
    pub command_id: u8,
    pub payload: Vec<u8>,
}

impl LinkFrame {
    pub fn new(kind: CommandType, subsystem: Subsystem, command_id: u8, payload: Vec<u8>) -> Self {
        Self {
            kind,
            subsystem,
            command_id,
            payload,
        }
    }

    /// Frame carrying `command` in its host-to-radio type.
    pub fn request(command: &CommandDescriptor, payload: Vec<u8>) -> Self {
        Self::new(command.kind, command.subsystem, command.id, payload)
    }

    pub fn cmd0(&self) -> u8 {
        self.kind.bits() | self.subsystem.bits()
    }

    /// Table entry for this frame, regardless of type.
    pub fn descriptor(&self) -> Option<&'static CommandDescriptor> {
        command_by_id(self.subsystem, self.command_id)
    }

    /// Command name, or `None` for commands outside the table.
    pub fn name(&self) -> Option<&'static str> {
        self.descriptor().map(|d| d.name)
    }

    /// First payload byte, which carries the status of synchronous replies.
    pub fn status_byte(&self) -> Result<u8, ProtocolError> {
        self.payload.first().copied().ok_or(ProtocolError::FrameTooShort {
            expected: 1,
            actual: 0,
        })
    }

    /// Serialize with SOF, length and checksum.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        if self.payload.len() > MAX_PAYLOAD {
            return Err(ProtocolError::FrameTooLong {
                length: self.payload.len(),
                max: MAX_PAYLOAD,
            });
        }
        let mut buf = Vec::with_capacity(FRAME_OVERHEAD + self.payload.len());
        buf.put_u8(SOF);
        buf.put_u8(self.payload.len() as u8);
        buf.put_u8(self.cmd0());
        buf.put_u8(self.command_id);
        buf.extend_from_slice(&self.payload);
        let fcs = calculate_fcs(&buf[1..]);
        buf.put_u8(fcs);
        Ok(buf)
    }
}

/// Incremental decoder for the inbound byte stream.
///
/// Bytes before a start-of-frame marker are discarded. A frame whose checksum
/// fails, or whose length exceeds [`MAX_PAYLOAD`], costs only its SOF byte:
/// scanning resumes at the next byte so a real frame hiding behind a false
/// marker is still found.
#[derive(Debug, Default)]
pub struct FrameCodec {
    buffer: BytesMut,
}

impl FrameCodec {
    pub fn new() -> Self {
        FrameCodec {
            buffer: BytesMut::with_capacity(2 * (MAX_PAYLOAD + FRAME_OVERHEAD)),
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Decode the next frame.
    ///
    /// Returns `None` when more data is needed, `Some(Err(_))` for a rejected
    /// candidate frame (already skipped), `Some(Ok(frame))` otherwise.
    pub fn decode(&mut self) -> Option<Result<LinkFrame, ProtocolError>> {
        let skip = self.buffer.iter().position(|&b| b == SOF).unwrap_or(self.buffer.len());
        if skip > 0 {
            log::trace!("discarding {skip} bytes before start of frame");
            self.buffer.advance(skip);
        }

        if self.buffer.len() < 2 {
            return None;
        }

        let len = self.buffer[1] as usize;
        if len > MAX_PAYLOAD {
            self.buffer.advance(1);
            return Some(Err(ProtocolError::FrameTooLong {
                length: len,
                max: MAX_PAYLOAD,
            }));
        }

        let total = FRAME_OVERHEAD + len;
        if self.buffer.len() < total {
            return None;
        }

        let expected = calculate_fcs(&self.buffer[1..total - 1]);
        let actual = self.buffer[total - 1];
        if expected != actual {
            log::debug!("checksum mismatch on {total}-byte frame, resyncing");
            self.buffer.advance(1);
            return Some(Err(ProtocolError::ChecksumMismatch { expected, actual }));
        }

        let frame = self.buffer.split_to(total);
        let cmd0 = frame[2];
        Some(Ok(LinkFrame {
            kind: CommandType::from_cmd0(cmd0),
            subsystem: Subsystem::from_cmd0(cmd0),
            command_id: frame[3],
            payload: frame[4..total - 1].to_vec(),
        }))
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::command_by_name;

    fn ping_reply() -> LinkFrame {
        LinkFrame::new(CommandType::Srsp, Subsystem::Sys, 0x01, vec![0x59, 0x06])
    }

    #[test]
    fn test_ping_request_bytes() {
        let ping = command_by_name("SYS_PING").unwrap();
        let bytes = LinkFrame::request(ping, vec![]).encode().unwrap();
        assert_eq!(bytes, vec![0xFE, 0x00, 0x21, 0x01, 0x20]);
    }

    #[test]
    fn test_frame_codec_encode_decode() {
        let mut codec = FrameCodec::new();
        let frame = ping_reply();
        codec.push(&frame.encode().unwrap());

        let decoded = codec.decode().unwrap().unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(decoded.name(), Some("SYS_PING"));
        assert!(codec.decode().is_none());
    }

    #[test]
    fn test_frame_codec_partial() {
        let mut codec = FrameCodec::new();
        let encoded = ping_reply().encode().unwrap();

        codec.push(&encoded[..4]);
        assert!(codec.decode().is_none());

        codec.push(&encoded[4..]);
        assert_eq!(codec.decode().unwrap().unwrap(), ping_reply());
    }

    #[test]
    fn test_frame_codec_multiple_with_garbage() {
        let mut codec = FrameCodec::new();
        let first = ping_reply();
        let second = LinkFrame::new(CommandType::Areq, Subsystem::Zdo, 0xC0, vec![9]);

        codec.push(&[0x00, 0x13, 0x37]);
        codec.push(&first.encode().unwrap());
        codec.push(&second.encode().unwrap());

        assert_eq!(codec.decode().unwrap().unwrap(), first);
        assert_eq!(codec.decode().unwrap().unwrap(), second);
        assert!(codec.decode().is_none());
        assert_eq!(codec.buffered_len(), 0);
    }

    #[test]
    fn test_bit_flip_rejected() {
        let mut codec = FrameCodec::new();
        let mut encoded = ping_reply().encode().unwrap();
        encoded[4] ^= 0x01;
        codec.push(&encoded);

        assert!(matches!(
            codec.decode(),
            Some(Err(ProtocolError::ChecksumMismatch { .. }))
        ));
        // Remaining bytes hold no SOF, so nothing else decodes
        assert!(codec.decode().is_none());
    }

    #[test]
    fn test_resync_after_false_sof() {
        let mut codec = FrameCodec::new();
        let frame = ping_reply();
        // A stray SOF whose "length" swallows the real frame
        codec.push(&[SOF, 0x03]);
        codec.push(&frame.encode().unwrap());

        assert!(matches!(codec.decode(), Some(Err(_))));
        assert_eq!(codec.decode().unwrap().unwrap(), frame);
    }

    #[test]
    fn test_oversized_length_skipped() {
        let mut codec = FrameCodec::new();
        codec.push(&[SOF, 0xFF]);
        codec.push(&ping_reply().encode().unwrap());

        assert!(matches!(codec.decode(), Some(Err(ProtocolError::FrameTooLong { .. }))));
        assert_eq!(codec.decode().unwrap().unwrap(), ping_reply());
    }

    #[test]
    fn test_encode_rejects_long_payload() {
        let frame = LinkFrame::new(CommandType::Sreq, Subsystem::Af, 0x02, vec![0; MAX_PAYLOAD + 1]);
        assert!(matches!(frame.encode(), Err(ProtocolError::FrameTooLong { .. })));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_fcs_self_check(payload in proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD), cmd0 in any::<u8>(), cmd1 in any::<u8>()) {
                let frame = LinkFrame::new(CommandType::from_cmd0(cmd0), Subsystem::from_cmd0(cmd0), cmd1, payload);
                let bytes = frame.encode().unwrap();
                // XOR over everything after SOF, FCS included, cancels out
                prop_assert_eq!(calculate_fcs(&bytes[1..]), 0);

                let mut codec = FrameCodec::new();
                codec.push(&bytes);
                prop_assert_eq!(codec.decode().unwrap().unwrap(), frame);
            }

            #[test]
            fn test_single_bit_flip_detected(payload in proptest::collection::vec(any::<u8>(), 1..32), bit in 0usize..8, at in 0usize..32) {
                let frame = LinkFrame::new(CommandType::Srsp, Subsystem::Util, 0x49, payload);
                let mut bytes = frame.encode().unwrap();
                // Flip a bit anywhere in cmd0..payload, keeping the length byte intact
                let index = 2 + at % (bytes.len() - 3);
                bytes[index] ^= 1 << bit;

                let mut codec = FrameCodec::new();
                codec.push(&bytes);
                let is_checksum_mismatch = matches!(codec.decode(), Some(Err(ProtocolError::ChecksumMismatch { .. })));
                prop_assert!(is_checksum_mismatch);
            }
        }
    }
}
