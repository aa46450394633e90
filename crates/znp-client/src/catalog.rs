//! Cluster metadata lookup.
//!
//! The client only needs names and declared data types for cluster,
//! attribute and command ids; how that mapping is built is up to the
//! caller.

use std::collections::BTreeMap;

use zcl_protocol::data_types::{self, DataTypeInfo};
use zcl_protocol::{cluster, IAS_ZONE_ENROLL_REQUEST, IAS_ZONE_STATUS_CHANGE_NOTIFICATION};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub id: u16,
    pub name: String,
    /// Cluster library data type tag.
    pub data_type: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    pub id: u8,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInfo {
    pub id: u16,
    pub name: String,
    pub attributes: Vec<AttributeDescriptor>,
    pub commands: Vec<CommandInfo>,
}

impl ClusterInfo {
    pub fn new(id: u16, name: impl Into<String>) -> Self {
        ClusterInfo {
            id,
            name: name.into(),
            attributes: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, id: u16, name: impl Into<String>, data_type: u8) -> Self {
        self.attributes.push(AttributeDescriptor {
            id,
            name: name.into(),
            data_type,
        });
        self
    }

    pub fn with_command(mut self, id: u8, name: impl Into<String>) -> Self {
        self.commands.push(CommandInfo { id, name: name.into() });
        self
    }

    pub fn attribute(&self, id: u16) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.id == id)
    }

    pub fn attribute_by_name(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn command_by_name(&self, name: &str) -> Option<&CommandInfo> {
        self.commands.iter().find(|c| c.name == name)
    }
}

/// Read-only metadata source.
pub trait Catalog: Send + Sync {
    fn cluster(&self, id: u16) -> Option<&ClusterInfo>;

    fn data_type(&self, tag: u8) -> Option<DataTypeInfo> {
        data_types::descriptor(tag).copied()
    }

    fn data_type_by_name(&self, name: &str) -> Option<DataTypeInfo> {
        data_types::descriptor_by_name(name).copied()
    }
}

/// Catalog held in memory and filled programmatically.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    clusters: BTreeMap<u16, ClusterInfo>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cluster: ClusterInfo) {
        self.clusters.insert(cluster.id, cluster);
    }

    pub fn with_cluster(mut self, cluster: ClusterInfo) -> Self {
        self.insert(cluster);
        self
    }

    /// A handful of Home Automation clusters.
    pub fn home_automation() -> Self {
        use data_types::{BITMAP16, BOOLEAN, CHARACTER_STRING, ENUM16, ENUM8, IEEE_ADDRESS, INT16, UINT16, UINT8};

        MemoryCatalog::new()
            .with_cluster(
                ClusterInfo::new(cluster::BASIC, "Basic")
                    .with_attribute(0x0000, "ZCLVersion", UINT8)
                    .with_attribute(0x0001, "ApplicationVersion", UINT8)
                    .with_attribute(0x0003, "HWVersion", UINT8)
                    .with_attribute(0x0004, "ManufacturerName", CHARACTER_STRING)
                    .with_attribute(0x0005, "ModelIdentifier", CHARACTER_STRING)
                    .with_attribute(0x0007, "PowerSource", ENUM8)
                    .with_command(0x00, "ResetToFactoryDefaults"),
            )
            .with_cluster(
                ClusterInfo::new(cluster::POWER_CONFIG, "PowerConfiguration")
                    .with_attribute(0x0020, "BatteryVoltage", UINT8)
                    .with_attribute(0x0021, "BatteryPercentageRemaining", UINT8),
            )
            .with_cluster(
                ClusterInfo::new(cluster::IDENTIFY, "Identify")
                    .with_attribute(0x0000, "IdentifyTime", UINT16)
                    .with_command(0x00, "Identify")
                    .with_command(0x01, "IdentifyQuery"),
            )
            .with_cluster(
                ClusterInfo::new(cluster::ON_OFF, "OnOff")
                    .with_attribute(0x0000, "OnOff", BOOLEAN)
                    .with_command(0x00, "Off")
                    .with_command(0x01, "On")
                    .with_command(0x02, "Toggle"),
            )
            .with_cluster(
                ClusterInfo::new(cluster::LEVEL_CONTROL, "LevelControl")
                    .with_attribute(0x0000, "CurrentLevel", UINT8)
                    .with_command(0x04, "MoveToLevelWithOnOff"),
            )
            .with_cluster(
                ClusterInfo::new(cluster::TEMPERATURE_MEASUREMENT, "TemperatureMeasurement")
                    .with_attribute(0x0000, "MeasuredValue", INT16)
                    .with_attribute(0x0001, "MinMeasuredValue", INT16)
                    .with_attribute(0x0002, "MaxMeasuredValue", INT16),
            )
            .with_cluster(
                ClusterInfo::new(cluster::IAS_ZONE, "IASZone")
                    .with_attribute(0x0000, "ZoneState", ENUM8)
                    .with_attribute(0x0001, "ZoneType", ENUM16)
                    .with_attribute(0x0002, "ZoneStatus", BITMAP16)
                    .with_attribute(0x0010, "IAS_CIE_Address", IEEE_ADDRESS)
                    .with_command(IAS_ZONE_STATUS_CHANGE_NOTIFICATION, "ZoneStatusChangeNotification")
                    .with_command(IAS_ZONE_ENROLL_REQUEST, "ZoneEnrollRequest"),
            )
    }
}

impl Catalog for MemoryCatalog {
    fn cluster(&self, id: u16) -> Option<&ClusterInfo> {
        self.clusters.get(&id)
    }
}
