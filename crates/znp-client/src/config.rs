//! Client configuration.
//!
//! Every field has a default, so a YAML file only needs the values that
//! differ:
//!
//! ```yaml
//! port: /dev/ttyACM0
//! coordinator:
//!   pan_id: 0x1a62
//!   precfg_key: 01030507090b0d0f00020406080a0c0d
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use znp_protocol::{CHANNEL_11, DEFAULT_ENDPOINT, DEFAULT_RADIUS};

use crate::error::{ClientError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Serial device path.
    pub port: String,
    pub baud_rate: u32,
    /// Pause between a disconnect and the next open attempt.
    pub reconnect_delay_ms: u64,
    /// Upper bound on a synchronous link reply.
    pub link_timeout_ms: u64,
    /// Upper bound on an application (cluster library) reply.
    pub zcl_timeout_ms: u64,
    /// Upper bound on an asynchronous ZDO reply.
    pub zdo_timeout_ms: u64,
    /// Endpoint the host registers and sends from.
    pub source_endpoint: u8,
    pub radius: u8,
    pub coordinator: CoordinatorConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 115_200,
            reconnect_delay_ms: 1_000,
            link_timeout_ms: 5_000,
            zcl_timeout_ms: 20_000,
            zdo_timeout_ms: 20_000,
            source_endpoint: DEFAULT_ENDPOINT,
            radius: DEFAULT_RADIUS,
            coordinator: CoordinatorConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| ClientError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&text)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn link_timeout(&self) -> Duration {
        Duration::from_millis(self.link_timeout_ms)
    }

    pub fn zcl_timeout(&self) -> Duration {
        Duration::from_millis(self.zcl_timeout_ms)
    }

    pub fn zdo_timeout(&self) -> Duration {
        Duration::from_millis(self.zdo_timeout_ms)
    }
}

/// Network parameters written to the radio before it forms a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub pan_id: u16,
    /// Bit n set allows channel n.
    pub channel_mask: u32,
    pub security_mode: u8,
    /// Pre-configured network key, 16 bytes as hex.
    pub precfg_key: Option<String>,
    /// Wipe network state and configuration on the next start.
    pub clear_on_startup: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            pan_id: 0xBEEF,
            channel_mask: CHANNEL_11,
            security_mode: 1,
            precfg_key: None,
            clear_on_startup: false,
        }
    }
}

impl CoordinatorConfig {
    /// Decoded network key, if one is configured.
    pub fn network_key(&self) -> Result<Option<[u8; 16]>> {
        let Some(text) = &self.precfg_key else {
            return Ok(None);
        };
        let bytes = hex::decode(text.trim()).map_err(|e| ClientError::Config(format!("precfg_key: {e}")))?;
        let key: [u8; 16] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| ClientError::Config(format!("precfg_key: expected 16 bytes, got {}", b.len())))?;
        Ok(Some(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.zcl_timeout(), Duration::from_secs(20));
        assert_eq!(config.reconnect_delay(), Duration::from_secs(1));
        assert_eq!(config.source_endpoint, 20);
        assert_eq!(config.coordinator.pan_id, 0xBEEF);
        assert_eq!(config.coordinator.channel_mask, 0x800);
    }

    #[test]
    fn test_partial_yaml() {
        let config = ClientConfig::from_yaml_str(
            "port: /dev/ttyUSB1\ncoordinator:\n  pan_id: 4660\n  clear_on_startup: true\n",
        )
        .unwrap();
        assert_eq!(config.port, "/dev/ttyUSB1");
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.coordinator.pan_id, 0x1234);
        assert!(config.coordinator.clear_on_startup);
        assert_eq!(config.coordinator.security_mode, 1);
    }

    #[test]
    fn test_network_key() {
        let mut coordinator = CoordinatorConfig::default();
        assert_eq!(coordinator.network_key().unwrap(), None);

        coordinator.precfg_key = Some("01030507090b0d0f00020406080a0c0d".into());
        let key = coordinator.network_key().unwrap().unwrap();
        assert_eq!(key[0], 0x01);
        assert_eq!(key[15], 0x0d);

        coordinator.precfg_key = Some("0102".into());
        assert!(matches!(coordinator.network_key(), Err(ClientError::Config(_))));
    }

    #[test]
    fn test_bad_yaml() {
        assert!(matches!(
            ClientConfig::from_yaml_str("baud_rate: fast"),
            Err(ClientError::Config(_))
        ));
    }
}
