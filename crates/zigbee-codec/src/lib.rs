//! Declarative Binary Codec
//!
//! Packet layouts for the ZNP link and the ZigBee Cluster Library are described
//! as ordered lists of named fields. Each field names a type; types derive from
//! other types and ultimately from one of five core primitives
//! (`uint8`, `uint16le`, `uint32le`, `buffer`, `string`).
//!
//! # Field rules
//!
//! - **Mask**: an integer whose bit *i* is the boolean named at position *i*
//!   of the mask list. Reads produce a record of booleans; writes accept either
//!   that record or the raw integer.
//! - **Enumeration**: writes accept a name, a numeric code or an [`EnumValue`];
//!   the wire always carries the code.
//! - **Array**: repeated `subtype` elements, counted by an earlier field or
//!   read until the input is exhausted.
//! - **Length prefix**: a 1- or 2-byte count ahead of a buffer or string,
//!   discarded when reading.
//! - **Custom rules**: a type may replace either direction with a function,
//!   which is how conditional and tag-dependent fields are expressed.
//!
//! # Example
//!
//! ```rust,ignore
//! use zigbee_codec::{Record, SchemaSet, TypeDef};
//!
//! let set = SchemaSet::build(
//!     &[("endpoint", TypeDef::of("uint8"))],
//!     &[("PING", vec![("Endpoint", TypeDef::of("endpoint").with_default(20u8))])],
//! )?;
//! let bytes = set.write("PING", &Record::new())?;
//! assert_eq!(bytes, vec![20]);
//! ```

mod cursor;
mod error;
mod schema;
mod types;
mod value;

pub use cursor::*;
pub use error::*;
pub use schema::*;
pub use types::*;
pub use value::*;
