//! ZNP serial link protocol
//!
//! Host side of the Z-Stack network processor interface: frame encoding and
//! resynchronizing decode, the command table, status codes and the payload
//! layouts of every command the host sends or handles.
//!
//! # Frame Overview
//!
//! Frames start with `0xFE`, carry a one-byte payload length, a two-byte
//! command identity and end with an XOR checksum. Synchronous requests
//! (`SREQ`) are answered in order by synchronous replies (`SRSP`) of the same
//! subsystem and id; asynchronous indications (`AREQ`) may arrive at any time.
//!
//! # Example
//!
//! ```rust,ignore
//! use znp_protocol::{command_by_name, FrameCodec, LinkFrame};
//!
//! let ping = command_by_name("SYS_PING").unwrap();
//! let bytes = LinkFrame::request(ping, vec![]).encode()?;
//!
//! let mut codec = FrameCodec::new();
//! codec.push(&bytes);
//! while let Some(frame) = codec.decode() {
//!     println!("{:?}", frame?.name());
//! }
//! ```

mod command;
mod constants;
mod error;
mod frame;
pub mod packets;
mod status;

pub use command::*;
pub use constants::*;
pub use error::*;
pub use frame::*;
pub use status::*;
