//! Error types for the ZNP link protocol.

use thiserror::Error;
use zigbee_codec::SchemaError;

use crate::status::ZnpStatus;

/// Errors raised while framing or interpreting link traffic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Frame checksum did not match its contents.
    #[error("Checksum mismatch: expected 0x{expected:02x}, got 0x{actual:02x}")]
    ChecksumMismatch {
        /// Checksum computed over the received bytes.
        expected: u8,
        /// Checksum byte carried by the frame.
        actual: u8,
    },

    /// Declared length exceeds what the radio can send.
    #[error("Frame length {length} exceeds maximum {max}")]
    FrameTooLong { length: usize, max: usize },

    /// Payload too short for the command.
    #[error("Frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort { expected: usize, actual: usize },

    /// Name not present in the command table.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Radio replied with a non-success status.
    #[error("{command} failed with status {status}")]
    Status {
        command: &'static str,
        status: ZnpStatus,
    },

    /// Payload did not match its layout.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}
