//! Radio management: firmware version, network configuration, coordinator
//! start-up, reset and permit join.

use std::fmt;

use tokio::sync::broadcast;
use tracing::{debug, info};
use zcl_protocol::{cluster, PROFILE_HOME_AUTOMATION};
use znp_protocol::packets::{self, EndpointRegistration, VersionInfo};
use znp_protocol::{config_id, logical_type, reset_type, startup_option, ZdoState, ZnpStatus, BROADCAST_ROUTERS};

use crate::client::Client;
use crate::config::CoordinatorConfig;
use crate::error::{ClientError, Result};
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub transport_revision: u8,
    pub product_id: u8,
    pub major: u8,
    pub minor: u8,
    pub maintenance: u8,
}

impl From<VersionInfo> for FirmwareVersion {
    fn from(info: VersionInfo) -> Self {
        FirmwareVersion {
            transport_revision: info.transport_rev,
            product_id: info.product,
            major: info.major,
            minor: info.minor,
            maintenance: info.maintenance,
        }
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{} (product {}, transport rev {})",
            self.major, self.minor, self.maintenance, self.product_id, self.transport_revision
        )
    }
}

/// Wait for a state change notification reporting `desired`.
async fn state_reached(events: &mut broadcast::Receiver<Event>, desired: ZdoState) -> Result<()> {
    loop {
        match events.recv().await {
            Ok(Event::StateChanged(state)) if state == desired => return Ok(()),
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => return Err(ClientError::Closed),
        }
    }
}

impl Client {
    pub async fn firmware_version(&self) -> Result<FirmwareVersion> {
        let reply = self.request("SYS_VERSION", Vec::new()).await?;
        Ok(VersionInfo::decode(&reply.payload)?.into())
    }

    /// Write one non-volatile configuration item.
    pub async fn write_configuration(&self, id: u8, value: &[u8]) -> Result<()> {
        debug!("coordinator: config 0x{id:02x} = {}", hex::encode(value));
        self.request_ok("ZB_WRITE_CONFIGURATION", packets::encode_write_configuration(id, value)?)
            .await?;
        Ok(())
    }

    /// Configure the radio, form the network as coordinator and register the
    /// host application endpoint.
    pub async fn start_coordinator(&self, config: &CoordinatorConfig) -> Result<()> {
        let mut events = self.subscribe();

        let startup = if config.clear_on_startup {
            startup_option::CLEAR_CONFIG | startup_option::CLEAR_STATE
        } else {
            0
        };
        self.write_configuration(config_id::STARTUP_OPTION, &[startup]).await?;
        self.write_configuration(config_id::ZDO_DIRECT_CB, &[1]).await?;
        if let Some(key) = config.network_key()? {
            self.write_configuration(config_id::PRECFGKEY, &key).await?;
            self.write_configuration(config_id::PRECFGKEYS_ENABLE, &[1]).await?;
        }
        self.write_configuration(config_id::SECURITY_MODE, &[config.security_mode])
            .await?;
        self.write_configuration(config_id::LOGICAL_TYPE, &[logical_type::COORDINATOR])
            .await?;
        self.write_configuration(config_id::PANID, &config.pan_id.to_le_bytes())
            .await?;
        self.write_configuration(config_id::CHANLIST, &config.channel_mask.to_le_bytes())
            .await?;

        let reply = self.request("ZB_START_REQUEST", Vec::new()).await?;
        if !reply.payload.is_empty() {
            return Err(ClientError::UnexpectedReply {
                command: "ZB_START_REQUEST",
                message: format!("start failed: {}", hex::encode(&reply.payload)),
            });
        }

        tokio::time::timeout(
            self.config().zdo_timeout(),
            state_reached(&mut events, ZdoState::DevZbCoord),
        )
        .await
        .map_err(|_| ClientError::LinkRequestTimeout {
            command: "ZDO_STATE_CHANGE_IND",
        })??;
        info!("coordinator: network formed on PAN 0x{:04x}", config.pan_id);

        self.register_endpoint().await?;
        self.startup_from_app().await?;
        self.request_ok("ZDO_MSG_CB_REGISTER", packets::encode_msg_callback_register(cluster::IAS_ZONE)?)
            .await?;
        Ok(())
    }

    async fn register_endpoint(&self) -> Result<()> {
        let registration = EndpointRegistration {
            endpoint: self.config().source_endpoint,
            profile_id: PROFILE_HOME_AUTOMATION,
            device_id: 0,
            device_version: 0,
            in_clusters: vec![cluster::BASIC],
            out_clusters: vec![cluster::IAS_ZONE],
        };
        match self.request_ok("AF_REGISTER", registration.encode()?).await {
            Ok(_) => Ok(()),
            Err(ClientError::RadioStatus {
                status: ZnpStatus::ApsDuplicateEntry,
                ..
            }) => {
                debug!("coordinator: endpoint {} already registered", registration.endpoint);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// 0 restores the previous network, 1 started a new one; anything else
    /// means the radio left without starting.
    async fn startup_from_app(&self) -> Result<()> {
        let reply = self
            .request("ZDO_STARTUP_FROM_APP", packets::encode_startup_from_app(0)?)
            .await?;
        match reply.status_byte()? {
            0 => debug!("coordinator: restored network state"),
            1 => debug!("coordinator: new network state"),
            status => {
                return Err(ClientError::RadioStatus {
                    command: "ZDO_STARTUP_FROM_APP",
                    status: ZnpStatus::from(status),
                })
            }
        }
        Ok(())
    }

    /// Reset the radio and wait for the link to come back.
    ///
    /// With `clear_network` the radio forgets its network and configuration.
    pub async fn reset_device(&self, clear_network: bool) -> Result<()> {
        if clear_network {
            self.write_configuration(
                config_id::STARTUP_OPTION,
                &[startup_option::CLEAR_CONFIG | startup_option::CLEAR_STATE],
            )
            .await?;
        }
        let mut events = self.subscribe();
        self.notify("SYS_RESET_REQ", packets::encode_reset_request(reset_type::HARD)?)
            .await?;
        self.transport().force_close();

        let reconnected = async {
            loop {
                match events.recv().await {
                    Ok(Event::Connected) => return Ok(()),
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => return Err(ClientError::Closed),
                }
            }
        };
        let limit = self.config().reconnect_delay() + self.config().zdo_timeout();
        tokio::time::timeout(limit, reconnected)
            .await
            .map_err(|_| ClientError::LinkRequestTimeout { command: "SYS_PING" })??;
        info!("coordinator: radio reset");
        Ok(())
    }

    /// Allow joining for `duration` seconds (0 closes, 255 leaves it open)
    /// through `destination`, or every router when none is given.
    pub async fn permit_join(&self, duration: u8, destination: Option<u16>) -> Result<()> {
        let destination = destination.unwrap_or(BROADCAST_ROUTERS);
        debug!("coordinator: permit join {duration}s via 0x{destination:04x}");
        self.request_ok(
            "ZDO_MGMT_PERMIT_JOIN_REQ",
            packets::encode_permit_join_request(destination, duration)?,
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_firmware_version_display() {
        let version = FirmwareVersion::from(VersionInfo {
            transport_rev: 2,
            product: 0,
            major: 2,
            minor: 6,
            maintenance: 3,
        });
        assert_eq!(version.to_string(), "2.6.3 (product 0, transport rev 2)");
    }

    #[tokio::test]
    async fn test_state_reached_skips_other_events() {
        let (tx, mut rx) = broadcast::channel(8);
        tx.send(Event::Connected).unwrap();
        tx.send(Event::StateChanged(ZdoState::from(8))).unwrap();
        tx.send(Event::StateChanged(ZdoState::DevZbCoord)).unwrap();
        state_reached(&mut rx, ZdoState::DevZbCoord).await.unwrap();

        drop(tx);
        assert!(matches!(
            state_reached(&mut rx, ZdoState::DevZbCoord).await,
            Err(ClientError::Closed)
        ));
    }
}
