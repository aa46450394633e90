//! Cached view of the radio's association table.

use std::collections::BTreeMap;
use std::fmt;

use zigbee_codec::IeeeAddress;
use znp_protocol::packets::{DeviceInfo, SimpleDescriptor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub short_address: u16,
    /// Resolved on demand; `None` until looked up or announced.
    pub long_address: Option<IeeeAddress>,
    /// Association table index, once the radio has reported it.
    pub index: Option<u16>,
    pub node_relation: u8,
    pub status: u8,
    pub endpoints: BTreeMap<u8, Endpoint>,
}

impl Device {
    pub fn new(short_address: u16) -> Self {
        Device {
            short_address,
            long_address: None,
            index: None,
            node_relation: 0,
            status: 0,
            endpoints: BTreeMap::new(),
        }
    }

    pub fn endpoint(&self, id: u8) -> Option<&Endpoint> {
        self.endpoints.get(&id)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.short_address)?;
        if let Some(index) = self.index {
            write!(f, " [{index}]")?;
        }
        match self.long_address {
            Some(long) => write!(f, " {long}"),
            None => write!(f, " (long address unknown)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Short address of the owning device.
    pub device: u16,
    pub id: u8,
    pub profile_id: u16,
    pub device_id: u16,
    pub device_version: u8,
    pub in_clusters: Vec<u16>,
    pub out_clusters: Vec<u16>,
    /// Set once a simple descriptor has filled in the cluster lists.
    pub described: bool,
}

impl Endpoint {
    pub fn new(device: u16, id: u8) -> Self {
        Endpoint {
            device,
            id,
            profile_id: 0,
            device_id: 0,
            device_version: 0,
            in_clusters: Vec::new(),
            out_clusters: Vec::new(),
            described: false,
        }
    }

    pub fn has_in_cluster(&self, cluster_id: u16) -> bool {
        self.in_clusters.contains(&cluster_id)
    }
}

/// Devices keyed by short address, plus an index → address map.
#[derive(Debug, Default)]
pub struct DeviceTable {
    devices: BTreeMap<u16, Device>,
    by_index: BTreeMap<u16, u16>,
}

impl DeviceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge an association table entry; long address and endpoints survive.
    pub fn store(&mut self, info: &DeviceInfo) -> Device {
        let device = self
            .devices
            .entry(info.short_address)
            .or_insert_with(|| Device::new(info.short_address));
        device.index = Some(info.index);
        device.node_relation = info.node_relation;
        device.status = info.status;
        self.by_index.insert(info.index, info.short_address);
        device.clone()
    }

    /// Record an announce; returns the device and whether it was already indexed.
    pub fn announce(&mut self, short_address: u16, long_address: IeeeAddress) -> (Device, bool) {
        let device = self.entry(short_address);
        device.long_address = Some(long_address);
        let indexed = device.index.is_some();
        (device.clone(), indexed)
    }

    pub fn set_long_address(&mut self, short_address: u16, long_address: IeeeAddress) -> Device {
        let device = self.entry(short_address);
        device.long_address = Some(long_address);
        device.clone()
    }

    pub fn by_short_address(&self, short_address: u16) -> Option<&Device> {
        self.devices.get(&short_address)
    }

    pub fn by_index(&self, index: u16) -> Option<&Device> {
        self.by_index.get(&index).and_then(|short| self.devices.get(short))
    }

    pub fn by_long_address(&self, long_address: &IeeeAddress) -> Option<&Device> {
        self.devices.values().find(|d| d.long_address.as_ref() == Some(long_address))
    }

    /// Add endpoint ids without descriptors; existing ids are untouched.
    pub fn add_endpoints(&mut self, short_address: u16, ids: &[u8]) -> Vec<Endpoint> {
        let device = self.entry(short_address);
        ids.iter()
            .map(|&id| {
                device
                    .endpoints
                    .entry(id)
                    .or_insert_with(|| Endpoint::new(short_address, id))
                    .clone()
            })
            .collect()
    }

    /// Fill an endpoint from its descriptor.
    ///
    /// Returns the endpoint and whether this was its first descriptor.
    pub fn describe(&mut self, descriptor: &SimpleDescriptor) -> (Endpoint, bool) {
        let device = self.entry(descriptor.nwk_address);
        let endpoint = device
            .endpoints
            .entry(descriptor.endpoint)
            .or_insert_with(|| Endpoint::new(descriptor.nwk_address, descriptor.endpoint));
        let first = !endpoint.described;
        endpoint.profile_id = descriptor.profile_id;
        endpoint.device_id = descriptor.device_id;
        endpoint.device_version = descriptor.device_version;
        endpoint.in_clusters = descriptor.in_clusters.clone();
        endpoint.out_clusters = descriptor.out_clusters.clone();
        endpoint.described = true;
        (endpoint.clone(), first)
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    fn entry(&mut self, short_address: u16) -> &mut Device {
        self.devices
            .entry(short_address)
            .or_insert_with(|| Device::new(short_address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use znp_protocol::ZnpStatus;

    fn info(short_address: u16, index: u16) -> DeviceInfo {
        DeviceInfo {
            short_address,
            index,
            node_relation: 1,
            status: 0,
            assoc_count: 0,
            age: 0,
            tx_counter: 0,
            tx_cost: 0,
            rx_lqi: 0,
            in_key_seq_num: 0,
            in_frame_counter: 0,
            tx_failure: 0,
        }
    }

    fn descriptor(nwk_address: u16, endpoint: u8) -> SimpleDescriptor {
        SimpleDescriptor {
            src_address: nwk_address,
            status: ZnpStatus::Success,
            nwk_address,
            endpoint,
            profile_id: 0x0104,
            device_id: 0x0402,
            device_version: 0,
            in_clusters: vec![0x0000, 0x0500],
            out_clusters: vec![],
        }
    }

    #[test]
    fn test_store_and_lookup() {
        let mut table = DeviceTable::new();
        table.store(&info(0x4f2a, 3));
        assert_eq!(table.by_index(3).unwrap().short_address, 0x4f2a);
        assert_eq!(table.by_short_address(0x4f2a).unwrap().index, Some(3));
        assert!(table.by_index(4).is_none());
    }

    #[test]
    fn test_store_keeps_long_address() {
        let mut table = DeviceTable::new();
        let ieee = IeeeAddress::new([1, 2, 3, 4, 5, 6, 7, 8]);
        let (_, indexed) = table.announce(0x4f2a, ieee);
        assert!(!indexed);

        let device = table.store(&info(0x4f2a, 0));
        assert_eq!(device.long_address, Some(ieee));
        assert_eq!(table.by_long_address(&ieee).unwrap().short_address, 0x4f2a);
        assert!(table.announce(0x4f2a, ieee).1);
    }

    #[test]
    fn test_endpoint_ids_idempotent() {
        let mut table = DeviceTable::new();
        table.add_endpoints(0x4f2a, &[1, 2]);
        table.add_endpoints(0x4f2a, &[1]);
        assert_eq!(table.by_short_address(0x4f2a).unwrap().endpoints.len(), 2);
    }

    #[test]
    fn test_descriptor_replay_yields_one_endpoint() {
        let mut table = DeviceTable::new();
        let (endpoint, first) = table.describe(&descriptor(0x4f2a, 1));
        assert!(first);
        assert!(endpoint.has_in_cluster(0x0500));

        let (_, first) = table.describe(&descriptor(0x4f2a, 1));
        assert!(!first);
        assert_eq!(table.by_short_address(0x4f2a).unwrap().endpoints.len(), 1);
    }

    #[test]
    fn test_display() {
        let mut table = DeviceTable::new();
        let device = table.store(&info(0x4f2a, 2));
        assert_eq!(device.to_string(), "0x4f2a [2] (long address unknown)");
    }
}
