//! Cluster library operations on one cluster of one endpoint.

use std::collections::BTreeMap;

use tracing::debug;
use zcl_protocol::{
    decode_configure_reporting_response, decode_discover_attributes_response, decode_read_attributes_response,
    decode_read_reporting_configuration_response, decode_write_attributes_response, encode_configure_reporting,
    encode_discover_attributes, encode_read_attributes, encode_read_reporting_configuration, encode_write_attributes,
    AttributeStatus, DiscoveredAttributes, FrameControl, ReportingConfiguration, ReportingConfigurationRecord,
    WriteAttribute, ZclFrame, ZclStatus, CONFIGURE_REPORTING, CONFIGURE_REPORTING_RESPONSE, DISCOVER_ATTRIBUTES,
    DISCOVER_ATTRIBUTES_RESPONSE, READ_ATTRIBUTES, READ_ATTRIBUTES_RESPONSE, READ_REPORTING_CONFIGURATION,
    READ_REPORTING_CONFIGURATION_RESPONSE, WRITE_ATTRIBUTES, WRITE_ATTRIBUTES_RESPONSE,
};
use zigbee_codec::{SchemaError, Value};

use crate::catalog::{AttributeDescriptor, ClusterInfo};
use crate::client::{Client, Target};
use crate::error::{ClientError, Result};
use crate::transactions::ApplicationReply;

/// Attributes requested per read when reading everything a device reports.
const READ_BATCH: usize = 8;
/// Page size for attribute discovery.
const DISCOVER_PAGE: u8 = 16;

/// Attribute named by id or by catalog name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeRef {
    Id(u16),
    Name(String),
}

impl From<u16> for AttributeRef {
    fn from(id: u16) -> Self {
        AttributeRef::Id(id)
    }
}

impl From<&str> for AttributeRef {
    fn from(name: &str) -> Self {
        AttributeRef::Name(name.to_string())
    }
}

impl From<String> for AttributeRef {
    fn from(name: String) -> Self {
        AttributeRef::Name(name)
    }
}

/// Cluster-specific command named by id or by catalog name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandRef {
    Id(u8),
    Name(String),
}

impl From<u8> for CommandRef {
    fn from(id: u8) -> Self {
        CommandRef::Id(id)
    }
}

impl From<&str> for CommandRef {
    fn from(name: &str) -> Self {
        CommandRef::Name(name.to_string())
    }
}

/// One record of a read attributes response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValue {
    pub id: u16,
    pub name: Option<String>,
    pub status: ZclStatus,
    pub data_type: Option<u8>,
    /// Present only when `status` is success.
    pub value: Option<Value>,
}

/// Read results indexed by attribute id and by known name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeValues {
    values: BTreeMap<u16, AttributeValue>,
    names: BTreeMap<String, u16>,
}

impl AttributeValues {
    pub fn insert(&mut self, value: AttributeValue) {
        if let Some(name) = &value.name {
            self.names.insert(name.clone(), value.id);
        }
        self.values.insert(value.id, value);
    }

    pub fn get(&self, attribute: impl Into<AttributeRef>) -> Option<&AttributeValue> {
        match attribute.into() {
            AttributeRef::Id(id) => self.values.get(&id),
            AttributeRef::Name(name) => self.names.get(&name).and_then(|id| self.values.get(id)),
        }
    }

    /// Decoded value, if the record succeeded.
    pub fn value(&self, attribute: impl Into<AttributeRef>) -> Option<&Value> {
        self.get(attribute).and_then(|v| v.value.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeValue> {
        self.values.values()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A cluster on a remote endpoint, with its catalog metadata if known.
#[derive(Clone)]
pub struct ClusterBinding {
    client: Client,
    target: Target,
    cluster_id: u16,
    info: Option<ClusterInfo>,
}

impl Client {
    pub fn cluster(&self, target: impl Into<Target>, cluster_id: u16) -> ClusterBinding {
        ClusterBinding {
            client: self.clone(),
            target: target.into(),
            cluster_id,
            info: self.catalog().cluster(cluster_id).cloned(),
        }
    }
}

impl ClusterBinding {
    pub fn cluster_id(&self) -> u16 {
        self.cluster_id
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn info(&self) -> Option<&ClusterInfo> {
        self.info.as_ref()
    }

    pub fn name(&self) -> Option<&str> {
        self.info.as_ref().map(|i| i.name.as_str())
    }

    pub fn attribute(&self, attribute: &AttributeRef) -> Option<&AttributeDescriptor> {
        let info = self.info.as_ref()?;
        match attribute {
            AttributeRef::Id(id) => info.attribute(*id),
            AttributeRef::Name(name) => info.attribute_by_name(name),
        }
    }

    fn attribute_id(&self, attribute: &AttributeRef) -> Result<u16> {
        match attribute {
            AttributeRef::Id(id) => Ok(*id),
            AttributeRef::Name(_) => self
                .attribute(attribute)
                .map(|a| a.id)
                .ok_or_else(|| self.unknown_attribute(attribute)),
        }
    }

    fn unknown_attribute(&self, attribute: &AttributeRef) -> ClientError {
        let attribute = match attribute {
            AttributeRef::Id(id) => format!("0x{id:04x}"),
            AttributeRef::Name(name) => name.clone(),
        };
        ClientError::UnknownAttribute {
            cluster_id: self.cluster_id,
            attribute,
        }
    }

    /// Send a general command and check the response command id.
    async fn general(&self, command_id: u8, payload: Vec<u8>, response: u8) -> Result<ZclFrame> {
        let frame = ZclFrame::new(FrameControl::general(), command_id, payload);
        let reply = self.client.send_zcl(self.target, self.cluster_id, frame).await?;
        if reply.frame.frame_control.cluster_specific || reply.frame.command_id != response {
            return Err(ClientError::UnexpectedReply {
                command: "AF_INCOMING_MSG",
                message: format!(
                    "expected command 0x{response:02x}, got 0x{:02x}",
                    reply.frame.command_id
                ),
            });
        }
        Ok(reply.frame)
    }

    /// Read attributes; with none given, discover every attribute first and
    /// read them all.
    ///
    /// One record with an unsupported data type fails the whole batch.
    pub async fn read_attributes(&self, attributes: &[AttributeRef]) -> Result<AttributeValues> {
        let ids = if attributes.is_empty() {
            self.discover_all_attributes()
                .await?
                .into_iter()
                .map(|(id, _)| id)
                .collect()
        } else {
            attributes
                .iter()
                .map(|a| self.attribute_id(a))
                .collect::<Result<Vec<u16>>>()?
        };

        let mut values = AttributeValues::default();
        for batch in ids.chunks(READ_BATCH) {
            let reply = self
                .general(READ_ATTRIBUTES, encode_read_attributes(batch)?, READ_ATTRIBUTES_RESPONSE)
                .await?;
            for record in decode_read_attributes_response(&reply.payload)? {
                let name = self
                    .info
                    .as_ref()
                    .and_then(|i| i.attribute(record.attribute_id))
                    .map(|a| a.name.clone());
                values.insert(AttributeValue {
                    id: record.attribute_id,
                    name,
                    status: record.status,
                    data_type: record.data_type,
                    value: record.value,
                });
            }
        }
        Ok(values)
    }

    /// Read a single attribute; a failing record status is an error.
    pub async fn read_attribute(&self, attribute: impl Into<AttributeRef>) -> Result<Value> {
        let attribute = attribute.into();
        let id = self.attribute_id(&attribute)?;
        let values = self.read_attributes(&[AttributeRef::Id(id)]).await?;
        let record = values.get(id).ok_or_else(|| self.unknown_attribute(&attribute))?;
        match &record.value {
            Some(value) if record.status.is_success() => Ok(value.clone()),
            _ => Err(ClientError::ZclStatus {
                command_id: READ_ATTRIBUTES,
                status: record.status,
            }),
        }
    }

    pub async fn write_attributes(&self, attributes: &[WriteAttribute]) -> Result<Vec<AttributeStatus>> {
        let reply = self
            .general(
                WRITE_ATTRIBUTES,
                encode_write_attributes(attributes)?,
                WRITE_ATTRIBUTES_RESPONSE,
            )
            .await?;
        Ok(decode_write_attributes_response(&reply.payload)?)
    }

    /// Write one attribute whose data type comes from the catalog.
    pub async fn write_attribute(&self, attribute: impl Into<AttributeRef>, value: impl Into<Value>) -> Result<()> {
        let attribute = attribute.into();
        let descriptor = self
            .attribute(&attribute)
            .ok_or_else(|| self.unknown_attribute(&attribute))?;
        let write = WriteAttribute {
            attribute_id: descriptor.id,
            data_type: descriptor.data_type,
            value: value.into(),
        };
        let statuses = self.write_attributes(&[write]).await?;
        match statuses.iter().find(|s| !s.status.is_success()) {
            Some(failed) => Err(ClientError::ZclStatus {
                command_id: WRITE_ATTRIBUTES,
                status: failed.status,
            }),
            None => Ok(()),
        }
    }

    pub async fn configure_reporting(&self, configurations: &[ReportingConfiguration]) -> Result<Vec<AttributeStatus>> {
        let reply = self
            .general(
                CONFIGURE_REPORTING,
                encode_configure_reporting(configurations)?,
                CONFIGURE_REPORTING_RESPONSE,
            )
            .await?;
        Ok(decode_configure_reporting_response(&reply.payload)?)
    }

    pub async fn read_reporting_configuration(&self, attribute_ids: &[u16]) -> Result<Vec<ReportingConfigurationRecord>> {
        if attribute_ids.is_empty() {
            return Err(SchemaError::violation("attributes", "at least one attribute is required").into());
        }
        let reply = self
            .general(
                READ_REPORTING_CONFIGURATION,
                encode_read_reporting_configuration(attribute_ids)?,
                READ_REPORTING_CONFIGURATION_RESPONSE,
            )
            .await?;
        Ok(decode_read_reporting_configuration_response(&reply.payload)?)
    }

    /// One page of attribute discovery starting at `start`.
    pub async fn discover_attributes(&self, start: u16, max_attributes: u8) -> Result<DiscoveredAttributes> {
        let reply = self
            .general(
                DISCOVER_ATTRIBUTES,
                encode_discover_attributes(start, max_attributes)?,
                DISCOVER_ATTRIBUTES_RESPONSE,
            )
            .await?;
        Ok(decode_discover_attributes_response(&reply.payload)?)
    }

    /// Page through discovery until the device reports completion.
    pub async fn discover_all_attributes(&self) -> Result<Vec<(u16, u8)>> {
        let mut found = Vec::new();
        let mut start = 0u16;
        loop {
            let page = self.discover_attributes(start, DISCOVER_PAGE).await?;
            let last = page.attributes.last().map(|(id, _)| *id);
            found.extend(page.attributes);
            match last {
                Some(id) if !page.complete && id < u16::MAX => start = id + 1,
                _ => break,
            }
        }
        debug!(
            "cluster 0x{:04x}: discovered {} attributes on 0x{:04x}/{}",
            self.cluster_id,
            found.len(),
            self.target.address,
            self.target.endpoint
        );
        Ok(found)
    }

    /// Invoke a cluster-specific command with a raw payload.
    pub async fn invoke(&self, command: impl Into<CommandRef>, payload: Vec<u8>) -> Result<ApplicationReply> {
        let command_id = match command.into() {
            CommandRef::Id(id) => id,
            CommandRef::Name(name) => self
                .info
                .as_ref()
                .and_then(|i| i.command_by_name(&name))
                .map(|c| c.id)
                .ok_or(ClientError::UnknownCommand(name))?,
        };
        let frame = ZclFrame::new(FrameControl::cluster(), command_id, payload);
        self.client.send_zcl(self.target, self.cluster_id, frame).await
    }
}

/// Read the attribute `descriptor` describes.
pub async fn read_attribute(cluster: &ClusterBinding, descriptor: &AttributeDescriptor) -> Result<Value> {
    cluster.read_attribute(descriptor.id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_indexed_by_id_and_name() {
        let mut values = AttributeValues::default();
        values.insert(AttributeValue {
            id: 0x0005,
            name: Some("ModelIdentifier".into()),
            status: ZclStatus::Success,
            data_type: Some(0x42),
            value: Some(Value::from("lumi.sensor")),
        });
        values.insert(AttributeValue {
            id: 0x4000,
            name: None,
            status: ZclStatus::UnsupportedAttribute,
            data_type: None,
            value: None,
        });

        assert_eq!(values.value(0x0005u16), Some(&Value::from("lumi.sensor")));
        assert_eq!(values.value("ModelIdentifier"), Some(&Value::from("lumi.sensor")));
        assert_eq!(values.get(0x4000u16).unwrap().status, ZclStatus::UnsupportedAttribute);
        assert!(values.value(0x4000u16).is_none());
        assert_eq!(values.len(), 2);
    }
}
