//! Runtime error type.

use std::io;

use thiserror::Error;
use zcl_protocol::ZclStatus;
use zigbee_codec::SchemaError;
use znp_protocol::{ProtocolError, ZnpStatus};

/// Errors surfaced by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Bytes on the link could not be framed.
    #[error("Link framing error: {0}")]
    LinkFraming(ProtocolError),

    /// The transport is not connected, or dropped while a request was pending.
    #[error("Transport disconnected")]
    TransportDisconnected,

    #[error("Timed out waiting for {command}")]
    LinkRequestTimeout { command: &'static str },

    #[error("Application request {sequence} timed out")]
    ApplicationRequestTimeout { sequence: u8 },

    /// Sequence slot still held by an earlier request.
    #[error("Too many pending requests: sequence {sequence} is in use")]
    TooManyPendingRequests { sequence: u8 },

    /// The radio answered a well-formed request with a failure status.
    #[error("{command} failed with status {status}")]
    RadioStatus {
        command: &'static str,
        status: ZnpStatus,
    },

    /// The remote device answered with a failing default response.
    #[error("Command 0x{command_id:02x} failed with status {status}")]
    ZclStatus { command_id: u8, status: ZclStatus },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Unknown attribute '{attribute}' on cluster 0x{cluster_id:04x}")]
    UnknownAttribute { cluster_id: u16, attribute: String },

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Unexpected reply to {command}: {message}")]
    UnexpectedReply {
        command: &'static str,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The session task has stopped.
    #[error("Client closed")]
    Closed,
}

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Status { command, status } => ClientError::RadioStatus { command, status },
            ProtocolError::Schema(err) => ClientError::Schema(err),
            ProtocolError::UnknownCommand(name) => ClientError::UnknownCommand(name),
            other => ClientError::LinkFraming(other),
        }
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
