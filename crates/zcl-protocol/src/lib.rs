//! ZigBee Cluster Library
//!
//! Application-layer frames exchanged with end devices, tunnelled through the
//! radio's AF data request / incoming message commands.
//!
//! # Frame Overview
//!
//! Every frame starts with a frame control byte, an optional manufacturer code,
//! a transaction sequence number and a command identifier. The command is either
//! **general** (the same meaning for every cluster, e.g. read attributes) or
//! **cluster specific** (meaning depends on the cluster id carried by the AF
//! layer, e.g. an IAS zone enroll request).
//!
//! Attribute values are tagged with a one-byte data type; see [`data_types`].
//!
//! # Example
//!
//! ```rust,ignore
//! use zcl_protocol::{encode_read_attributes, FrameControl, ZclFrame, READ_ATTRIBUTES};
//!
//! let payload = encode_read_attributes(&[0x0004, 0x0005])?;
//! let frame = ZclFrame::new(FrameControl::general(), READ_ATTRIBUTES, payload).with_sequence(1);
//! let bytes = frame.encode()?;
//! ```

mod commands;
mod constants;
pub mod data_types;
mod frame;
pub mod packets;
mod status;

pub use commands::*;
pub use constants::*;
pub use frame::*;
pub use status::*;
