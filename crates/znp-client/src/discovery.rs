//! Device and endpoint discovery.
//!
//! Association table lookups go through the synchronous request path and
//! are cached by index and short address. Endpoint queries are ZDO
//! exchanges: the radio acknowledges the request with a status reply, and
//! the data arrives later as a callback naming the device it describes.

use tracing::debug;
use zigbee_codec::IeeeAddress;
use znp_protocol::packets::{self, DeviceInfo, EndpointList, SimpleDescriptor};
use znp_protocol::INVALID_ADDRESS;

use crate::client::Client;
use crate::device::{Device, Endpoint};
use crate::error::{ClientError, Result};
use crate::events::Event;
use crate::session::ZdoKey;

impl Client {
    /// Number of devices in the radio's association table.
    pub async fn device_count(&self) -> Result<u8> {
        let reply = self.request("UTIL_ASSOC_COUNT", packets::encode_assoc_count()?).await?;
        Ok(packets::decode_assoc_count(&reply.payload)?)
    }

    /// Every associated device, fetched one index at a time.
    pub async fn devices(&self) -> Result<Vec<Device>> {
        let count = self.device_count().await?;
        let mut devices = Vec::with_capacity(count as usize);
        for index in 0..count {
            devices.push(self.device_by_index(index).await?);
        }
        Ok(devices)
    }

    pub async fn device_by_index(&self, index: u8) -> Result<Device> {
        let cached = self
            .with_table(move |table| table.by_index(u16::from(index)).cloned())
            .await?;
        if let Some(device) = cached {
            return Ok(device);
        }
        let reply = self
            .request("UTIL_ASSOC_FIND_DEVICE", packets::encode_assoc_find_device(index)?)
            .await?;
        self.store(&reply.payload, || format!("index {index}")).await
    }

    pub async fn device_by_short_address(&self, short_address: u16) -> Result<Device> {
        let cached = self
            .with_table(move |table| {
                table
                    .by_short_address(short_address)
                    .filter(|d| d.index.is_some())
                    .cloned()
            })
            .await?;
        if let Some(device) = cached {
            return Ok(device);
        }
        let reply = self
            .request(
                "UTIL_ASSOC_GET_WITH_ADDRESS",
                packets::encode_assoc_get_with_address(short_address)?,
            )
            .await?;
        self.store(&reply.payload, || format!("0x{short_address:04x}")).await
    }

    async fn store(&self, payload: &[u8], describe: impl FnOnce() -> String) -> Result<Device> {
        let info = DeviceInfo::decode(payload)?;
        if info.short_address == INVALID_ADDRESS {
            return Err(ClientError::DeviceNotFound(describe()));
        }
        self.with_table(move |table| table.store(&info)).await
    }

    /// Long address of a device, looked up once and cached.
    pub async fn long_address(&self, short_address: u16) -> Result<IeeeAddress> {
        let cached = self
            .with_table(move |table| table.by_short_address(short_address).and_then(|d| d.long_address))
            .await?;
        if let Some(long) = cached {
            return Ok(long);
        }
        let reply = self
            .request(
                "UTIL_ADDRMGR_NWK_ADDR_LOOKUP",
                packets::encode_address_lookup(short_address)?,
            )
            .await?;
        let long = packets::decode_address_lookup(&reply.payload)?;
        self.with_table(move |table| table.set_long_address(short_address, long))
            .await?;
        Ok(long)
    }

    /// Active endpoint ids of a device, without descriptors.
    pub async fn active_endpoints(&self, short_address: u16) -> Result<Vec<Endpoint>> {
        let frame = self
            .zdo_exchange(
                ZdoKey::ActiveEndpoints(short_address),
                "ZDO_ACTIVE_EP_REQ",
                packets::encode_active_endpoints_request(short_address, short_address)?,
                "ZDO_ACTIVE_EP_RSP",
            )
            .await?;
        self.add_endpoints("ZDO_ACTIVE_EP_RSP", &frame.payload).await
    }

    /// Endpoints of a device with a matching profile and any of the given clusters.
    pub async fn match_endpoints(
        &self,
        short_address: u16,
        profile_id: u16,
        in_clusters: &[u16],
        out_clusters: &[u16],
    ) -> Result<Vec<Endpoint>> {
        let payload = packets::encode_match_descriptor_request(
            short_address,
            short_address,
            profile_id,
            in_clusters,
            out_clusters,
        )?;
        let frame = self
            .zdo_exchange(
                ZdoKey::MatchDescriptor(short_address),
                "ZDO_MATCH_DESC_REQ",
                payload,
                "ZDO_MATCH_DESC_RSP",
            )
            .await?;
        self.add_endpoints("ZDO_MATCH_DESC_RSP", &frame.payload).await
    }

    async fn add_endpoints(&self, command: &'static str, payload: &[u8]) -> Result<Vec<Endpoint>> {
        let list = EndpointList::decode(payload)?;
        if !list.status.is_success() {
            return Err(ClientError::RadioStatus {
                command,
                status: list.status,
            });
        }
        debug!("discovery: 0x{:04x} endpoints {:?}", list.nwk_address, list.endpoints);
        self.with_table(move |table| table.add_endpoints(list.nwk_address, &list.endpoints))
            .await
    }

    /// Fetch an endpoint's simple descriptor and cache its cluster lists.
    pub async fn simple_descriptor(&self, short_address: u16, endpoint: u8) -> Result<Endpoint> {
        let frame = self
            .zdo_exchange(
                ZdoKey::SimpleDescriptor(short_address, Some(endpoint)),
                "ZDO_SIMPLE_DESC_REQ",
                packets::encode_simple_descriptor_request(short_address, short_address, endpoint)?,
                "ZDO_SIMPLE_DESC_RSP",
            )
            .await?;
        let descriptor = SimpleDescriptor::decode(&frame.payload)?;
        if !descriptor.status.is_success() {
            return Err(ClientError::RadioStatus {
                command: "ZDO_SIMPLE_DESC_RSP",
                status: descriptor.status,
            });
        }
        let (endpoint, first) = self.with_table(move |table| table.describe(&descriptor)).await?;
        if first {
            self.emit(Event::EndpointDiscovered(endpoint.clone()));
        }
        Ok(endpoint)
    }

    /// Active endpoints of a device, each with its descriptor.
    pub async fn discover_endpoints(&self, short_address: u16) -> Result<Vec<Endpoint>> {
        let ids: Vec<u8> = self
            .active_endpoints(short_address)
            .await?
            .iter()
            .map(|e| e.id)
            .collect();
        let mut endpoints = Vec::with_capacity(ids.len());
        for id in ids {
            endpoints.push(self.simple_descriptor(short_address, id).await?);
        }
        Ok(endpoints)
    }

    /// Described endpoints of a device carrying `cluster_id` as an input cluster.
    pub async fn clusters(&self, short_address: u16, profile_id: u16, cluster_id: u16) -> Result<Vec<Endpoint>> {
        let matched = self
            .match_endpoints(short_address, profile_id, &[cluster_id], &[])
            .await?;
        let mut endpoints = Vec::with_capacity(matched.len());
        for endpoint in matched {
            endpoints.push(self.simple_descriptor(short_address, endpoint.id).await?);
        }
        Ok(endpoints)
    }
}
