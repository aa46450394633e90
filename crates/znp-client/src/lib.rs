//! Host runtime for ZNP coordinator radios
//!
//! Drives a radio over a serial link: keeps the link up, correlates
//! synchronous replies with their requests, numbers cluster library
//! transactions, caches the devices and endpoints it learns about and
//! broadcasts unsolicited traffic as [`Event`]s.
//!
//! # Architecture
//!
//! ```text
//!  Client (clone per caller)
//!     |  Command
//!     v
//!  session task  <---- TransportEvent ----  transport task  <--> serial port
//!     |  Event (broadcast)
//!     v
//!  subscribers
//! ```
//!
//! The transport task owns the byte stream and the reconnect loop. The
//! session task owns every piece of protocol state; callers never lock
//! anything.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use znp_client::{Client, ClientConfig, MemoryCatalog};
//!
//! let config = ClientConfig::load("znp.yaml")?;
//! let client = Client::open(config, Arc::new(MemoryCatalog::home_automation()));
//! client.connect().await?;
//! for device in client.devices().await? {
//!     println!("{device}");
//! }
//! ```

mod catalog;
mod client;
mod cluster;
mod config;
mod coordinator;
mod device;
mod discovery;
mod error;
mod events;
mod link;
mod session;
mod transactions;
mod transport;

pub use catalog::{AttributeDescriptor, Catalog, ClusterInfo, CommandInfo, MemoryCatalog};
pub use client::{Client, Target};
pub use cluster::{read_attribute, AttributeRef, AttributeValue, AttributeValues, ClusterBinding, CommandRef};
pub use config::{ClientConfig, CoordinatorConfig};
pub use coordinator::FirmwareVersion;
pub use device::{Device, DeviceTable, Endpoint};
pub use error::{ClientError, Result};
pub use events::{Event, Source};
pub use transactions::ApplicationReply;
pub use transport::{Connector, SerialConnector, TransportHandle, TransportState};
