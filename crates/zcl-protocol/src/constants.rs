//! ZCL constants
//!
//! Cluster identifiers, general (profile-wide) command identifiers and the
//! frame control bit layout.

use zigbee_codec::EnumTable;

/// Home Automation profile identifier.
pub const PROFILE_HOME_AUTOMATION: u16 = 0x0104;

/// Common cluster identifiers.
pub mod cluster {
    pub const BASIC: u16 = 0x0000;
    pub const POWER_CONFIG: u16 = 0x0001;
    pub const IDENTIFY: u16 = 0x0003;
    pub const GROUPS: u16 = 0x0004;
    pub const SCENES: u16 = 0x0005;
    pub const ON_OFF: u16 = 0x0006;
    pub const LEVEL_CONTROL: u16 = 0x0008;
    pub const ALARMS: u16 = 0x0009;
    pub const POLL_CONTROL: u16 = 0x0020;
    pub const TEMPERATURE_MEASUREMENT: u16 = 0x0402;
    pub const OCCUPANCY_SENSING: u16 = 0x0406;
    pub const IAS_ZONE: u16 = 0x0500;
    pub const IAS_ACE: u16 = 0x0501;
    pub const IAS_WD: u16 = 0x0502;
}

// ============================================================================
// General commands (frame type "entire profile")
// ============================================================================

pub const READ_ATTRIBUTES: u8 = 0x00;
pub const READ_ATTRIBUTES_RESPONSE: u8 = 0x01;
pub const WRITE_ATTRIBUTES: u8 = 0x02;
pub const WRITE_ATTRIBUTES_UNDIVIDED: u8 = 0x03;
pub const WRITE_ATTRIBUTES_RESPONSE: u8 = 0x04;
pub const WRITE_ATTRIBUTES_NO_RESPONSE: u8 = 0x05;
pub const CONFIGURE_REPORTING: u8 = 0x06;
pub const CONFIGURE_REPORTING_RESPONSE: u8 = 0x07;
pub const READ_REPORTING_CONFIGURATION: u8 = 0x08;
pub const READ_REPORTING_CONFIGURATION_RESPONSE: u8 = 0x09;
pub const REPORT_ATTRIBUTES: u8 = 0x0A;
pub const DEFAULT_RESPONSE: u8 = 0x0B;
pub const DISCOVER_ATTRIBUTES: u8 = 0x0C;
pub const DISCOVER_ATTRIBUTES_RESPONSE: u8 = 0x0D;
pub const READ_ATTRIBUTES_STRUCTURED: u8 = 0x0E;
pub const WRITE_ATTRIBUTES_STRUCTURED: u8 = 0x0F;
pub const WRITE_ATTRIBUTES_STRUCTURED_RESPONSE: u8 = 0x10;

/// General command names by identifier.
pub static GENERAL_COMMANDS: EnumTable = EnumTable {
    name: "GeneralCommands",
    entries: &[
        ("ReadAttributes", 0x00),
        ("ReadAttributesResponse", 0x01),
        ("WriteAttributes", 0x02),
        ("WriteAttributesUndivided", 0x03),
        ("WriteAttributesResponse", 0x04),
        ("WriteAttributesNoResponse", 0x05),
        ("ConfigureReporting", 0x06),
        ("ConfigureReportingResponse", 0x07),
        ("ReadReportingConfiguration", 0x08),
        ("ReadReportingConfigurationResponse", 0x09),
        ("ReportAttributes", 0x0A),
        ("DefaultResponse", 0x0B),
        ("DiscoverAttributes", 0x0C),
        ("DiscoverAttributesResponse", 0x0D),
        ("ReadAttributesStructured", 0x0E),
        ("WriteAttributesStructured", 0x0F),
        ("WriteAttributesStructuredResponse", 0x10),
    ],
};

// ============================================================================
// Cluster-specific commands received from servers
// ============================================================================

/// IAS Zone: zone status change notification.
pub const IAS_ZONE_STATUS_CHANGE_NOTIFICATION: u8 = 0x00;
/// IAS Zone: zone enroll request.
pub const IAS_ZONE_ENROLL_REQUEST: u8 = 0x01;

/// (cluster, command, name) for server-to-client cluster commands.
pub static CLUSTER_COMMANDS: &[(u16, u8, &str)] = &[
    (cluster::IDENTIFY, 0x00, "IdentifyQueryResponse"),
    (cluster::GROUPS, 0x00, "AddGroupResponse"),
    (cluster::GROUPS, 0x01, "ViewGroupResponse"),
    (cluster::GROUPS, 0x02, "GetGroupMembershipResponse"),
    (cluster::GROUPS, 0x03, "RemoveGroupResponse"),
    (cluster::ALARMS, 0x00, "Alarm"),
    (cluster::POLL_CONTROL, 0x00, "CheckIn"),
    (cluster::IAS_ZONE, IAS_ZONE_STATUS_CHANGE_NOTIFICATION, "ZoneStatusChangeNotification"),
    (cluster::IAS_ZONE, IAS_ZONE_ENROLL_REQUEST, "ZoneEnrollRequest"),
];

/// Name used for commands with no table entry.
pub const UNKNOWN_COMMAND: &str = "UnknownCommand";

// ============================================================================
// Frame control
// ============================================================================

/// Bit positions of the frame control byte. Bit 1 belongs to the two-bit frame
/// type and is never set by this library.
pub static FRAME_CONTROL_MASK: &[Option<&str>] = &[
    Some("ClusterSpecific"),
    None,
    Some("ManufacturerSpecific"),
    Some("ServerToClientDirection"),
    Some("DisableDefaultResponse"),
];

/// Reporting direction: this device sends reports.
pub const DIRECTION_REPORTED: u8 = 0x00;
/// Reporting direction: this device expects to receive reports.
pub const DIRECTION_RECEIVED: u8 = 0x01;
