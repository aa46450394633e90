//! ZCL frame header.
//!
//! ```text
//! | frame control | manufacturer code (opt) | sequence | command id | payload |
//! |      1        |           2             |    1     |     1      |   N     |
//! ```

use zigbee_codec::{Record, SchemaError, Value};

use crate::constants::{CLUSTER_COMMANDS, GENERAL_COMMANDS, UNKNOWN_COMMAND};
use crate::packets::{schemas, ZCL_FRAME};

/// Decoded frame control byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameControl {
    /// Command is specific to the cluster rather than profile-wide.
    pub cluster_specific: bool,
    pub manufacturer_specific: bool,
    /// Frame travels from the cluster server to the client.
    pub server_to_client: bool,
    pub disable_default_response: bool,
}

impl FrameControl {
    /// Profile-wide command, client to server.
    pub fn general() -> Self {
        Self::default()
    }

    /// Cluster-specific command, client to server.
    pub fn cluster() -> Self {
        Self {
            cluster_specific: true,
            ..Self::default()
        }
    }

    pub fn to_record(&self) -> Record {
        Record::new()
            .with("ClusterSpecific", self.cluster_specific)
            .with("ManufacturerSpecific", self.manufacturer_specific)
            .with("ServerToClientDirection", self.server_to_client)
            .with("DisableDefaultResponse", self.disable_default_response)
    }

    pub fn from_record(record: &Record) -> Result<Self, SchemaError> {
        Ok(Self {
            cluster_specific: record.flag("ClusterSpecific")?,
            manufacturer_specific: record.flag("ManufacturerSpecific")?,
            server_to_client: record.flag("ServerToClientDirection")?,
            disable_default_response: record.flag("DisableDefaultResponse")?,
        })
    }
}

/// A complete application-layer frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZclFrame {
    pub frame_control: FrameControl,
    /// Present exactly when `frame_control.manufacturer_specific` is set.
    pub manufacturer_code: Option<u16>,
    /// Transaction sequence number; 0 marks an unsolicited frame.
    pub sequence: u8,
    pub command_id: u8,
    pub payload: Vec<u8>,
}

impl ZclFrame {
    pub fn new(frame_control: FrameControl, command_id: u8, payload: Vec<u8>) -> Self {
        Self {
            frame_control,
            manufacturer_code: None,
            sequence: 0,
            command_id,
            payload,
        }
    }

    /// Mark the frame manufacturer specific.
    pub fn with_manufacturer(mut self, code: u16) -> Self {
        self.frame_control.manufacturer_specific = true;
        self.manufacturer_code = Some(code);
        self
    }

    pub fn with_sequence(mut self, sequence: u8) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn encode(&self) -> Result<Vec<u8>, SchemaError> {
        let mut values = Record::new()
            .with("FrameControl", self.frame_control.to_record())
            .with("TransactionSequenceNumber", self.sequence)
            .with("CommandIdentifier", self.command_id)
            .with("Payload", self.payload.clone());
        if let Some(code) = self.manufacturer_code {
            values.insert("ManufacturerCode", code);
        }
        schemas()?.write(ZCL_FRAME, &values)
    }

    pub fn decode(data: &[u8]) -> Result<Self, SchemaError> {
        let record = schemas()?.read(ZCL_FRAME, data)?;
        let manufacturer_code = match record.get("ManufacturerCode") {
            Some(_) => Some(record.u16("ManufacturerCode")?),
            None => None,
        };
        let frame = Self {
            frame_control: FrameControl::from_record(record.record("FrameControl")?)?,
            manufacturer_code,
            sequence: record.u8("TransactionSequenceNumber")?,
            command_id: record.u8("CommandIdentifier")?,
            payload: record.bytes("Payload")?.to_vec(),
        };
        log::trace!(
            "zcl: seq {} command 0x{:02x} ({} payload bytes)",
            frame.sequence,
            frame.command_id,
            frame.payload.len()
        );
        Ok(frame)
    }

    /// Symbolic command name for dispatch.
    pub fn command_name(&self, cluster_id: u16) -> &'static str {
        command_name(cluster_id, self.frame_control.cluster_specific, self.command_id)
    }
}

/// Name a command by cluster and id; unrecognized commands get [`UNKNOWN_COMMAND`].
pub fn command_name(cluster_id: u16, cluster_specific: bool, command_id: u8) -> &'static str {
    if !cluster_specific {
        return GENERAL_COMMANDS
            .by_code(u64::from(command_id))
            .map(|e| e.name)
            .unwrap_or(UNKNOWN_COMMAND);
    }
    CLUSTER_COMMANDS
        .iter()
        .find(|(cluster, id, _)| *cluster == cluster_id && *id == command_id)
        .map(|(_, _, name)| *name)
        .unwrap_or(UNKNOWN_COMMAND)
}

impl From<FrameControl> for Value {
    fn from(control: FrameControl) -> Self {
        Value::Record(control.to_record())
    }
}
