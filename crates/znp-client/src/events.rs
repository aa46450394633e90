//! Notifications broadcast to subscribers.

use zcl_protocol::ZclFrame;
use zigbee_codec::Value;
use znp_protocol::ZdoState;

use crate::device::{Device, Endpoint};

/// Originating device and endpoint of an application message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Source {
    pub address: u16,
    pub endpoint: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The radio answered the link ping.
    Connected,
    StateChanged(ZdoState),
    DeviceAnnounced(Device),
    /// First simple descriptor seen for an endpoint.
    EndpointDiscovered(Endpoint),
    AttributeReport {
        source: Source,
        cluster_id: u16,
        attribute_id: u16,
        value: Value,
    },
    /// Unsolicited cluster library command, named by cluster and command id.
    ClusterCommand {
        name: &'static str,
        source: Source,
        cluster_id: u16,
        message: ZclFrame,
    },
}
