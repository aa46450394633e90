//! Link-level packet layouts and their typed views.

use once_cell::sync::Lazy;
use zigbee_codec::{
    FieldCtx, IeeeAddress, Prefix, Reader, Record, SchemaError, SchemaSet, TypeDef, Value, Writer,
};

use crate::constants::{
    address_mode, node_relation, BROADCAST_ROUTERS, DEFAULT_ENDPOINT, DEFAULT_RADIUS,
    DEFAULT_TRANSACTION_ID,
};
use crate::status::{ZdoState, ZnpStatus};

/// AF transmit option bits.
pub static AF_OPTIONS: &[Option<&str>] = &[
    None,
    Some("wildcardProfileId"),
    None,
    Some("ackRequest"),
    Some("discoverRoute"),
    Some("security"),
    Some("skipRouting"),
];

/// Device announce capability bits.
pub static CAPABILITIES: &[Option<&str>] = &[
    Some("alternatePanCoordinator"),
    Some("fullFunctionDevice"),
    Some("mainsPowered"),
    Some("receiverOnWhenIdle"),
    None,
    None,
    Some("securityCapable"),
    Some("allocateAddress"),
];

static SCHEMAS: Lazy<Result<SchemaSet, SchemaError>> = Lazy::new(build);

/// The compiled link schema set, resolved on first use.
pub fn schemas() -> Result<&'static SchemaSet, SchemaError> {
    SCHEMAS.as_ref().map_err(Clone::clone)
}

fn build() -> Result<SchemaSet, SchemaError> {
    let types = [
        ("endpoint", TypeDef::of("uint8")),
        ("cluster", TypeDef::of("uint16le")),
        ("shortAddress", TypeDef::of("uint16le")),
        ("status", TypeDef::of("uint8")),
        ("ieee", TypeDef::custom(Some(read_ieee), Some(write_ieee))),
        ("address", TypeDef::custom(Some(read_address), Some(write_address))),
        ("clusterList", TypeDef::array("cluster")),
    ];

    let packets = [
        ("SYS_RESET_REQ", vec![("Type", TypeDef::of("uint8").with_default(0u8))]),
        (
            "SYS_VERSION_RSP",
            vec![
                ("TransportRev", TypeDef::of("uint8")),
                ("Product", TypeDef::of("uint8")),
                ("MajorRel", TypeDef::of("uint8")),
                ("MinorRel", TypeDef::of("uint8")),
                ("MaintRel", TypeDef::of("uint8")),
            ],
        ),
        (
            "AF_REGISTER",
            vec![
                ("EndPoint", TypeDef::of("endpoint").with_default(DEFAULT_ENDPOINT)),
                ("AppProfId", TypeDef::of("uint16le").with_default(0x0104u16)),
                ("AppDeviceId", TypeDef::of("uint16le").with_default(0u16)),
                ("AppDevVer", TypeDef::of("uint8").with_default(0u8)),
                ("LatencyReq", TypeDef::of("uint8").with_default(0u8)),
                ("AppNumInClusters", TypeDef::of("uint8").length_of("AppInClusterList")),
                ("AppInClusterList", TypeDef::of("clusterList").with_count("AppNumInClusters")),
                ("AppNumOutClusters", TypeDef::of("uint8").length_of("AppOutClusterList")),
                ("AppOutClusterList", TypeDef::of("clusterList").with_count("AppNumOutClusters")),
            ],
        ),
        (
            "AF_DATA_REQUEST_EXT",
            vec![
                ("DstAddr", TypeDef::of("address")),
                ("DstEndpoint", TypeDef::of("endpoint")),
                ("DstPanId", TypeDef::of("uint16le").with_default(0u16)),
                ("SrcEndpoint", TypeDef::of("endpoint").with_default(DEFAULT_ENDPOINT)),
                ("ClusterID", TypeDef::of("cluster")),
                ("TransID", TypeDef::of("uint8").with_default(DEFAULT_TRANSACTION_ID)),
                ("Options", TypeDef::of("uint8").with_mask(AF_OPTIONS).with_default(0u8)),
                ("Radius", TypeDef::of("uint8").with_default(DEFAULT_RADIUS)),
                ("Data", TypeDef::of("buffer").with_prefix(Prefix::U16)),
            ],
        ),
        (
            "AF_INCOMING_MSG",
            vec![
                ("GroupId", TypeDef::of("uint16le")),
                ("ClusterId", TypeDef::of("cluster")),
                ("SrcAddr", TypeDef::of("shortAddress")),
                ("SrcEndpoint", TypeDef::of("endpoint")),
                ("DstEndpoint", TypeDef::of("endpoint")),
                ("WasBroadcast", TypeDef::of("uint8")),
                ("LinkQuality", TypeDef::of("uint8")),
                ("SecurityUse", TypeDef::of("uint8")),
                ("Timestamp", TypeDef::of("uint32le")),
                ("TransSeqNumber", TypeDef::of("uint8")),
                ("Data", TypeDef::of("buffer").with_prefix(Prefix::U8)),
            ],
        ),
        (
            "ZDO_ACTIVE_EP_REQ",
            vec![
                ("DstAddr", TypeDef::of("shortAddress")),
                ("NwkAddrOfInterest", TypeDef::of("shortAddress")),
            ],
        ),
        (
            "ZDO_MATCH_DESC_REQ",
            vec![
                ("DstAddr", TypeDef::of("shortAddress")),
                ("NwkAddrOfInterest", TypeDef::of("shortAddress")),
                ("ProfileId", TypeDef::of("uint16le")),
                ("NumInClusters", TypeDef::of("uint8").length_of("InClusterList")),
                ("InClusterList", TypeDef::of("clusterList").with_count("NumInClusters")),
                ("NumOutClusters", TypeDef::of("uint8").length_of("OutClusterList")),
                ("OutClusterList", TypeDef::of("clusterList").with_count("NumOutClusters")),
            ],
        ),
        (
            "ZDO_SIMPLE_DESC_REQ",
            vec![
                ("DstAddr", TypeDef::of("shortAddress")),
                ("NwkAddrOfInterest", TypeDef::of("shortAddress")),
                ("Endpoint", TypeDef::of("endpoint")),
            ],
        ),
        (
            "ZDO_RSP_HEADER",
            vec![
                ("SrcAddr", TypeDef::of("shortAddress")),
                ("Status", TypeDef::of("status")),
                ("NwkAddr", TypeDef::of("shortAddress")),
            ],
        ),
        (
            "ZDO_ENDPOINT_LIST_RSP",
            vec![
                ("SrcAddr", TypeDef::of("shortAddress")),
                ("Status", TypeDef::of("status")),
                ("NwkAddr", TypeDef::of("shortAddress")),
                ("MatchLength", TypeDef::of("uint8")),
                ("MatchList", TypeDef::array("endpoint").with_count("MatchLength")),
            ],
        ),
        (
            "ZDO_SIMPLE_DESC_RSP",
            vec![
                ("SrcAddr", TypeDef::of("shortAddress")),
                ("Status", TypeDef::of("status")),
                ("NwkAddr", TypeDef::of("shortAddress")),
                ("Len", TypeDef::of("uint8")),
                ("Endpoint", TypeDef::of("endpoint")),
                ("ProfileId", TypeDef::of("uint16le")),
                ("DeviceId", TypeDef::of("uint16le")),
                ("DeviceVersion", TypeDef::of("uint8")),
                ("NumInClusters", TypeDef::of("uint8")),
                ("InClusterList", TypeDef::of("clusterList").with_count("NumInClusters")),
                ("NumOutClusters", TypeDef::of("uint8")),
                ("OutClusterList", TypeDef::of("clusterList").with_count("NumOutClusters")),
            ],
        ),
        (
            "ZDO_MGMT_PERMIT_JOIN_REQ",
            vec![
                ("AddrMode", TypeDef::of("uint8")),
                ("DstAddr", TypeDef::of("shortAddress").with_default(BROADCAST_ROUTERS)),
                ("Duration", TypeDef::of("uint8")),
                ("TCSignificance", TypeDef::of("uint8").with_default(1u8)),
            ],
        ),
        ("ZDO_MSG_CB_REGISTER", vec![("ClusterId", TypeDef::of("cluster"))]),
        ("ZDO_STARTUP_FROM_APP", vec![("StartDelay", TypeDef::of("uint16le").with_default(0u16))]),
        ("ZDO_STATE_CHANGE_IND", vec![("State", TypeDef::of("uint8"))]),
        (
            "ZDO_END_DEVICE_ANNCE_IND",
            vec![
                ("SrcAddr", TypeDef::of("shortAddress")),
                ("NwkAddr", TypeDef::of("shortAddress")),
                ("IEEEAddr", TypeDef::of("ieee")),
                ("Capabilities", TypeDef::of("uint8").with_mask(CAPABILITIES)),
            ],
        ),
        (
            "ZB_PERMIT_JOINING_REQUEST",
            vec![
                ("Destination", TypeDef::of("shortAddress").with_default(BROADCAST_ROUTERS)),
                ("Timeout", TypeDef::of("uint8")),
            ],
        ),
        (
            "ZB_WRITE_CONFIGURATION",
            vec![
                ("ConfigId", TypeDef::of("uint8")),
                ("Value", TypeDef::of("buffer").with_prefix(Prefix::U8)),
            ],
        ),
        (
            "UTIL_ASSOC_COUNT",
            vec![
                ("StartRelation", TypeDef::of("uint8").with_default(node_relation::PARENT)),
                ("EndRelation", TypeDef::of("uint8").with_default(node_relation::OTHER)),
            ],
        ),
        ("UTIL_ASSOC_COUNT_RSP", vec![("Count", TypeDef::of("uint8"))]),
        ("UTIL_ASSOC_FIND_DEVICE", vec![("Number", TypeDef::of("uint8"))]),
        (
            "UTIL_ASSOC_GET_WITH_ADDRESS",
            vec![
                ("ExtAddr", TypeDef::of("buffer").with_length(8).with_default(vec![0u8; 8])),
                ("NwkAddr", TypeDef::of("shortAddress")),
            ],
        ),
        (
            "DEVICE_INFO",
            vec![
                ("ShortAddr", TypeDef::of("shortAddress")),
                ("AddrIdx", TypeDef::of("uint16le")),
                ("NodeRelation", TypeDef::of("uint8")),
                ("DevStatus", TypeDef::of("uint8")),
                ("AssocCnt", TypeDef::of("uint8")),
                ("Age", TypeDef::of("uint8")),
                ("TxCounter", TypeDef::of("uint8")),
                ("TxCost", TypeDef::of("uint8")),
                ("RxLqi", TypeDef::of("uint8")),
                ("InKeySeqNum", TypeDef::of("uint8")),
                ("InFrmCntr", TypeDef::of("uint32le")),
                ("TxFailure", TypeDef::of("uint16le")),
            ],
        ),
        ("UTIL_ADDRMGR_NWK_ADDR_LOOKUP", vec![("NwkAddr", TypeDef::of("shortAddress"))]),
        ("UTIL_ADDRMGR_NWK_ADDR_LOOKUP_RSP", vec![("ExtAddr", TypeDef::of("ieee"))]),
    ];

    SchemaSet::build(&types, &packets)
}

fn read_ieee(reader: &mut Reader<'_>, ctx: &FieldCtx<'_>, _: &Record) -> Result<Option<Value>, SchemaError> {
    let bytes = reader.take(8)?;
    IeeeAddress::from_slice(bytes)
        .map(|addr| Some(Value::Ieee(addr)))
        .ok_or_else(|| SchemaError::violation(ctx.name, "expected 8 bytes"))
}

fn write_ieee(
    writer: &mut Writer,
    ctx: &FieldCtx<'_>,
    value: Option<&Value>,
    _: &Record,
) -> Result<(), SchemaError> {
    let addr = value
        .and_then(Value::as_ieee)
        .ok_or_else(|| SchemaError::violation(ctx.name, "expected an IEEE address"))?;
    writer.put_slice(addr.as_bytes());
    Ok(())
}

/// Mode byte followed by eight address bytes; short addresses are zero padded.
fn read_address(reader: &mut Reader<'_>, ctx: &FieldCtx<'_>, _: &Record) -> Result<Option<Value>, SchemaError> {
    let mode = reader.read_u8()?;
    let bytes = reader.take(8)?;
    if mode == address_mode::ADDR_64_BIT {
        return read_ieee(&mut Reader::new(bytes), ctx, &Record::new());
    }
    Ok(Some(Value::UInt(u64::from(u16::from_le_bytes([bytes[0], bytes[1]])))))
}

fn write_address(
    writer: &mut Writer,
    ctx: &FieldCtx<'_>,
    value: Option<&Value>,
    _: &Record,
) -> Result<(), SchemaError> {
    match value {
        Some(Value::Ieee(addr)) => {
            writer.put_u8(address_mode::ADDR_64_BIT);
            writer.put_slice(addr.as_bytes());
        }
        Some(other) => {
            let short = other
                .as_u64()
                .and_then(|v| u16::try_from(v).ok())
                .ok_or_else(|| SchemaError::violation(ctx.name, "expected a 16-bit address"))?;
            writer.put_u8(address_mode::ADDR_16_BIT);
            writer.put_u16_le(short);
            writer.put_slice(&[0; 6]);
        }
        None => return Err(SchemaError::MissingField(ctx.name.to_string())),
    }
    Ok(())
}

// ============================================================================
// Typed views
// ============================================================================

/// AF transmit options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AfOptions {
    pub wildcard_profile_id: bool,
    pub ack_request: bool,
    pub discover_route: bool,
    pub security: bool,
    pub skip_routing: bool,
}

impl AfOptions {
    fn to_record(self) -> Record {
        Record::new()
            .with("wildcardProfileId", self.wildcard_profile_id)
            .with("ackRequest", self.ack_request)
            .with("discoverRoute", self.discover_route)
            .with("security", self.security)
            .with("skipRouting", self.skip_routing)
    }
}

/// Payload of AF_DATA_REQUEST_EXT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AfDataRequest {
    pub dst_address: u16,
    pub dst_endpoint: u8,
    pub src_endpoint: u8,
    pub cluster_id: u16,
    pub transaction_id: u8,
    pub options: AfOptions,
    pub radius: u8,
    pub data: Vec<u8>,
}

impl AfDataRequest {
    pub fn new(dst_address: u16, dst_endpoint: u8, cluster_id: u16, data: Vec<u8>) -> Self {
        Self {
            dst_address,
            dst_endpoint,
            src_endpoint: DEFAULT_ENDPOINT,
            cluster_id,
            transaction_id: DEFAULT_TRANSACTION_ID,
            options: AfOptions::default(),
            radius: DEFAULT_RADIUS,
            data,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, SchemaError> {
        let values = Record::new()
            .with("DstAddr", self.dst_address)
            .with("DstEndpoint", self.dst_endpoint)
            .with("SrcEndpoint", self.src_endpoint)
            .with("ClusterID", self.cluster_id)
            .with("TransID", self.transaction_id)
            .with("Options", self.options.to_record())
            .with("Radius", self.radius)
            .with("Data", self.data.clone());
        schemas()?.write("AF_DATA_REQUEST_EXT", &values)
    }
}

/// AF_INCOMING_MSG indication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub group_id: u16,
    pub cluster_id: u16,
    pub src_address: u16,
    pub src_endpoint: u8,
    pub dst_endpoint: u8,
    pub was_broadcast: bool,
    pub link_quality: u8,
    pub security_use: bool,
    pub timestamp: u32,
    pub transaction_sequence: u8,
    pub data: Vec<u8>,
}

impl IncomingMessage {
    pub fn decode(payload: &[u8]) -> Result<Self, SchemaError> {
        let r = schemas()?.read("AF_INCOMING_MSG", payload)?;
        Ok(Self {
            group_id: r.u16("GroupId")?,
            cluster_id: r.u16("ClusterId")?,
            src_address: r.u16("SrcAddr")?,
            src_endpoint: r.u8("SrcEndpoint")?,
            dst_endpoint: r.u8("DstEndpoint")?,
            was_broadcast: r.u8("WasBroadcast")? != 0,
            link_quality: r.u8("LinkQuality")?,
            security_use: r.u8("SecurityUse")? != 0,
            timestamp: r.u32("Timestamp")?,
            transaction_sequence: r.u8("TransSeqNumber")?,
            data: r.bytes("Data")?.to_vec(),
        })
    }

    /// Encode as the radio would; used by simulated radios in tests.
    pub fn encode(&self) -> Result<Vec<u8>, SchemaError> {
        let values = Record::new()
            .with("GroupId", self.group_id)
            .with("ClusterId", self.cluster_id)
            .with("SrcAddr", self.src_address)
            .with("SrcEndpoint", self.src_endpoint)
            .with("DstEndpoint", self.dst_endpoint)
            .with("WasBroadcast", u8::from(self.was_broadcast))
            .with("LinkQuality", self.link_quality)
            .with("SecurityUse", u8::from(self.security_use))
            .with("Timestamp", self.timestamp)
            .with("TransSeqNumber", self.transaction_sequence)
            .with("Data", self.data.clone());
        schemas()?.write("AF_INCOMING_MSG", &values)
    }
}

/// Association table entry returned by the UTIL_ASSOC_* commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    pub short_address: u16,
    pub index: u16,
    pub node_relation: u8,
    pub status: u8,
    pub assoc_count: u8,
    pub age: u8,
    pub tx_counter: u8,
    pub tx_cost: u8,
    pub rx_lqi: u8,
    pub in_key_seq_num: u8,
    pub in_frame_counter: u32,
    pub tx_failure: u16,
}

impl DeviceInfo {
    pub fn decode(payload: &[u8]) -> Result<Self, SchemaError> {
        let r = schemas()?.read("DEVICE_INFO", payload)?;
        Ok(Self {
            short_address: r.u16("ShortAddr")?,
            index: r.u16("AddrIdx")?,
            node_relation: r.u8("NodeRelation")?,
            status: r.u8("DevStatus")?,
            assoc_count: r.u8("AssocCnt")?,
            age: r.u8("Age")?,
            tx_counter: r.u8("TxCounter")?,
            tx_cost: r.u8("TxCost")?,
            rx_lqi: r.u8("RxLqi")?,
            in_key_seq_num: r.u8("InKeySeqNum")?,
            in_frame_counter: r.u32("InFrmCntr")?,
            tx_failure: r.u16("TxFailure")?,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, SchemaError> {
        let values = Record::new()
            .with("ShortAddr", self.short_address)
            .with("AddrIdx", self.index)
            .with("NodeRelation", self.node_relation)
            .with("DevStatus", self.status)
            .with("AssocCnt", self.assoc_count)
            .with("Age", self.age)
            .with("TxCounter", self.tx_counter)
            .with("TxCost", self.tx_cost)
            .with("RxLqi", self.rx_lqi)
            .with("InKeySeqNum", self.in_key_seq_num)
            .with("InFrmCntr", self.in_frame_counter)
            .with("TxFailure", self.tx_failure);
        schemas()?.write("DEVICE_INFO", &values)
    }
}

/// ZDO_END_DEVICE_ANNCE_IND.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceAnnounce {
    pub src_address: u16,
    pub nwk_address: u16,
    pub ieee_address: IeeeAddress,
    pub mains_powered: bool,
    pub receiver_on_when_idle: bool,
}

impl DeviceAnnounce {
    pub fn decode(payload: &[u8]) -> Result<Self, SchemaError> {
        let r = schemas()?.read("ZDO_END_DEVICE_ANNCE_IND", payload)?;
        let capabilities = r.record("Capabilities")?;
        Ok(Self {
            src_address: r.u16("SrcAddr")?,
            nwk_address: r.u16("NwkAddr")?,
            ieee_address: r.ieee("IEEEAddr")?,
            mains_powered: capabilities.flag("mainsPowered")?,
            receiver_on_when_idle: capabilities.flag("receiverOnWhenIdle")?,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, SchemaError> {
        let capabilities = Record::new()
            .with("mainsPowered", self.mains_powered)
            .with("receiverOnWhenIdle", self.receiver_on_when_idle);
        let values = Record::new()
            .with("SrcAddr", self.src_address)
            .with("NwkAddr", self.nwk_address)
            .with("IEEEAddr", self.ieee_address)
            .with("Capabilities", capabilities);
        schemas()?.write("ZDO_END_DEVICE_ANNCE_IND", &values)
    }
}

/// Active endpoint or match descriptor response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointList {
    pub src_address: u16,
    pub status: ZnpStatus,
    pub nwk_address: u16,
    /// Empty unless `status` is success.
    pub endpoints: Vec<u8>,
}

impl EndpointList {
    pub fn decode(payload: &[u8]) -> Result<Self, SchemaError> {
        let set = schemas()?;
        let header = set.read("ZDO_RSP_HEADER", payload)?;
        let status = ZnpStatus::from(header.u8("Status")?);
        let endpoints = if status.is_success() {
            set.read("ZDO_ENDPOINT_LIST_RSP", payload)?.u8_list("MatchList")?
        } else {
            Vec::new()
        };
        Ok(Self {
            src_address: header.u16("SrcAddr")?,
            status,
            nwk_address: header.u16("NwkAddr")?,
            endpoints,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, SchemaError> {
        let values = Record::new()
            .with("SrcAddr", self.src_address)
            .with("Status", u8::from(self.status))
            .with("NwkAddr", self.nwk_address)
            .with("MatchLength", self.endpoints.len() as u8)
            .with("MatchList", Value::List(self.endpoints.iter().map(|e| Value::from(*e)).collect()));
        schemas()?.write("ZDO_ENDPOINT_LIST_RSP", &values)
    }
}

/// Simple descriptor of one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleDescriptor {
    pub src_address: u16,
    pub status: ZnpStatus,
    pub nwk_address: u16,
    pub endpoint: u8,
    pub profile_id: u16,
    pub device_id: u16,
    pub device_version: u8,
    pub in_clusters: Vec<u16>,
    pub out_clusters: Vec<u16>,
}

impl SimpleDescriptor {
    pub fn decode(payload: &[u8]) -> Result<Self, SchemaError> {
        let set = schemas()?;
        let header = set.read("ZDO_RSP_HEADER", payload)?;
        let status = ZnpStatus::from(header.u8("Status")?);
        let mut descriptor = Self {
            src_address: header.u16("SrcAddr")?,
            status,
            nwk_address: header.u16("NwkAddr")?,
            endpoint: 0,
            profile_id: 0,
            device_id: 0,
            device_version: 0,
            in_clusters: Vec::new(),
            out_clusters: Vec::new(),
        };
        if status.is_success() {
            let r = set.read("ZDO_SIMPLE_DESC_RSP", payload)?;
            descriptor.endpoint = r.u8("Endpoint")?;
            descriptor.profile_id = r.u16("ProfileId")?;
            descriptor.device_id = r.u16("DeviceId")?;
            descriptor.device_version = r.u8("DeviceVersion")?;
            descriptor.in_clusters = r.u16_list("InClusterList")?;
            descriptor.out_clusters = r.u16_list("OutClusterList")?;
        }
        Ok(descriptor)
    }

    pub fn encode(&self) -> Result<Vec<u8>, SchemaError> {
        let len = 8 + 2 * (self.in_clusters.len() + self.out_clusters.len());
        let values = Record::new()
            .with("SrcAddr", self.src_address)
            .with("Status", u8::from(self.status))
            .with("NwkAddr", self.nwk_address)
            .with("Len", len as u64)
            .with("Endpoint", self.endpoint)
            .with("ProfileId", self.profile_id)
            .with("DeviceId", self.device_id)
            .with("DeviceVersion", self.device_version)
            .with("NumInClusters", self.in_clusters.len() as u64)
            .with("InClusterList", self.in_clusters.clone())
            .with("NumOutClusters", self.out_clusters.len() as u64)
            .with("OutClusterList", self.out_clusters.clone());
        schemas()?.write("ZDO_SIMPLE_DESC_RSP", &values)
    }
}

/// SYS_VERSION reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    pub transport_rev: u8,
    pub product: u8,
    pub major: u8,
    pub minor: u8,
    pub maintenance: u8,
}

impl VersionInfo {
    pub fn decode(payload: &[u8]) -> Result<Self, SchemaError> {
        let r = schemas()?.read("SYS_VERSION_RSP", payload)?;
        Ok(Self {
            transport_rev: r.u8("TransportRev")?,
            product: r.u8("Product")?,
            major: r.u8("MajorRel")?,
            minor: r.u8("MinorRel")?,
            maintenance: r.u8("MaintRel")?,
        })
    }
}

/// Endpoint registration sent with AF_REGISTER.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRegistration {
    pub endpoint: u8,
    pub profile_id: u16,
    pub device_id: u16,
    pub device_version: u8,
    pub in_clusters: Vec<u16>,
    pub out_clusters: Vec<u16>,
}

impl EndpointRegistration {
    pub fn encode(&self) -> Result<Vec<u8>, SchemaError> {
        let values = Record::new()
            .with("EndPoint", self.endpoint)
            .with("AppProfId", self.profile_id)
            .with("AppDeviceId", self.device_id)
            .with("AppDevVer", self.device_version)
            .with("AppInClusterList", self.in_clusters.clone())
            .with("AppOutClusterList", self.out_clusters.clone());
        schemas()?.write("AF_REGISTER", &values)
    }
}

// ============================================================================
// Simple requests
// ============================================================================

pub fn encode_reset_request(reset_type: u8) -> Result<Vec<u8>, SchemaError> {
    schemas()?.write("SYS_RESET_REQ", &Record::new().with("Type", reset_type))
}

pub fn encode_assoc_count() -> Result<Vec<u8>, SchemaError> {
    schemas()?.write("UTIL_ASSOC_COUNT", &Record::new())
}

pub fn decode_assoc_count(payload: &[u8]) -> Result<u8, SchemaError> {
    schemas()?.read("UTIL_ASSOC_COUNT_RSP", payload)?.u8("Count")
}

pub fn encode_assoc_find_device(index: u8) -> Result<Vec<u8>, SchemaError> {
    schemas()?.write("UTIL_ASSOC_FIND_DEVICE", &Record::new().with("Number", index))
}

pub fn encode_assoc_get_with_address(short_address: u16) -> Result<Vec<u8>, SchemaError> {
    schemas()?.write("UTIL_ASSOC_GET_WITH_ADDRESS", &Record::new().with("NwkAddr", short_address))
}

pub fn encode_address_lookup(short_address: u16) -> Result<Vec<u8>, SchemaError> {
    schemas()?.write("UTIL_ADDRMGR_NWK_ADDR_LOOKUP", &Record::new().with("NwkAddr", short_address))
}

pub fn decode_address_lookup(payload: &[u8]) -> Result<IeeeAddress, SchemaError> {
    schemas()?.read("UTIL_ADDRMGR_NWK_ADDR_LOOKUP_RSP", payload)?.ieee("ExtAddr")
}

pub fn encode_active_endpoints_request(dst_address: u16, nwk_address: u16) -> Result<Vec<u8>, SchemaError> {
    let values = Record::new()
        .with("DstAddr", dst_address)
        .with("NwkAddrOfInterest", nwk_address);
    schemas()?.write("ZDO_ACTIVE_EP_REQ", &values)
}

pub fn encode_match_descriptor_request(
    dst_address: u16,
    nwk_address: u16,
    profile_id: u16,
    in_clusters: &[u16],
    out_clusters: &[u16],
) -> Result<Vec<u8>, SchemaError> {
    let values = Record::new()
        .with("DstAddr", dst_address)
        .with("NwkAddrOfInterest", nwk_address)
        .with("ProfileId", profile_id)
        .with("InClusterList", in_clusters.to_vec())
        .with("OutClusterList", out_clusters.to_vec());
    schemas()?.write("ZDO_MATCH_DESC_REQ", &values)
}

pub fn encode_simple_descriptor_request(
    dst_address: u16,
    nwk_address: u16,
    endpoint: u8,
) -> Result<Vec<u8>, SchemaError> {
    let values = Record::new()
        .with("DstAddr", dst_address)
        .with("NwkAddrOfInterest", nwk_address)
        .with("Endpoint", endpoint);
    schemas()?.write("ZDO_SIMPLE_DESC_REQ", &values)
}

/// Permit joining through `dst_address` for `duration` seconds (0 closes, 0xFF forever).
pub fn encode_permit_join_request(dst_address: u16, duration: u8) -> Result<Vec<u8>, SchemaError> {
    let mode = if dst_address >= 0xFFF8 {
        address_mode::BROADCAST
    } else {
        address_mode::ADDR_16_BIT
    };
    let values = Record::new()
        .with("AddrMode", mode)
        .with("DstAddr", dst_address)
        .with("Duration", duration);
    schemas()?.write("ZDO_MGMT_PERMIT_JOIN_REQ", &values)
}

pub fn encode_write_configuration(config_id: u8, value: &[u8]) -> Result<Vec<u8>, SchemaError> {
    let values = Record::new().with("ConfigId", config_id).with("Value", value);
    schemas()?.write("ZB_WRITE_CONFIGURATION", &values)
}

pub fn encode_startup_from_app(start_delay: u16) -> Result<Vec<u8>, SchemaError> {
    schemas()?.write("ZDO_STARTUP_FROM_APP", &Record::new().with("StartDelay", start_delay))
}

pub fn encode_msg_callback_register(cluster_id: u16) -> Result<Vec<u8>, SchemaError> {
    schemas()?.write("ZDO_MSG_CB_REGISTER", &Record::new().with("ClusterId", cluster_id))
}

pub fn decode_state_change(payload: &[u8]) -> Result<ZdoState, SchemaError> {
    Ok(ZdoState::from(schemas()?.read("ZDO_STATE_CHANGE_IND", payload)?.u8("State")?))
}

pub fn encode_state_change(state: ZdoState) -> Result<Vec<u8>, SchemaError> {
    schemas()?.write("ZDO_STATE_CHANGE_IND", &Record::new().with("State", u8::from(state)))
}
