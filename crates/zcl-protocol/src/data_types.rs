//! Primitive ZCL data types.
//!
//! Attribute values travel with a one-byte type tag. Only the tags in
//! [`DATA_TYPES`] can be read or written; anything else is rejected with
//! [`SchemaError::UnsupportedDataType`].

use zigbee_codec::{IeeeAddress, Reader, SchemaError, Value, Writer};

pub const NO_DATA: u8 = 0x00;
pub const DATA8: u8 = 0x08;
pub const DATA64: u8 = 0x0f;
pub const BOOLEAN: u8 = 0x10;
pub const BITMAP8: u8 = 0x18;
pub const BITMAP16: u8 = 0x19;
pub const BITMAP64: u8 = 0x1f;
pub const UINT8: u8 = 0x20;
pub const UINT16: u8 = 0x21;
pub const UINT24: u8 = 0x22;
pub const UINT32: u8 = 0x23;
pub const UINT48: u8 = 0x25;
pub const INT8: u8 = 0x28;
pub const INT16: u8 = 0x29;
pub const INT24: u8 = 0x2a;
pub const INT32: u8 = 0x2b;
pub const ENUM8: u8 = 0x30;
pub const ENUM16: u8 = 0x31;
pub const OCTET_STRING: u8 = 0x41;
pub const CHARACTER_STRING: u8 = 0x42;
pub const LONG_OCTET_STRING: u8 = 0x43;
pub const LONG_CHARACTER_STRING: u8 = 0x44;
pub const IEEE_ADDRESS: u8 = 0xf0;

/// Name and reporting class of a supported tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataTypeInfo {
    pub tag: u8,
    pub name: &'static str,
    /// Analog types carry a reportable change in reporting configuration.
    pub analog: bool,
}

const fn info(tag: u8, name: &'static str, analog: bool) -> DataTypeInfo {
    DataTypeInfo { tag, name, analog }
}

/// Every supported tag.
pub static DATA_TYPES: &[DataTypeInfo] = &[
    info(NO_DATA, "noData", false),
    info(0x08, "data8", false),
    info(0x09, "data16", false),
    info(0x0a, "data24", false),
    info(0x0b, "data32", false),
    info(0x0c, "data40", false),
    info(0x0d, "data48", false),
    info(0x0e, "data56", false),
    info(0x0f, "data64", false),
    info(BOOLEAN, "boolean", false),
    info(0x18, "bitmap8", false),
    info(BITMAP16, "bitmap16", false),
    info(0x1a, "bitmap24", false),
    info(0x1b, "bitmap32", false),
    info(0x1c, "bitmap40", false),
    info(0x1d, "bitmap48", false),
    info(0x1e, "bitmap56", false),
    info(0x1f, "bitmap64", false),
    info(UINT8, "uint8", true),
    info(UINT16, "uint16", true),
    info(UINT24, "uint24", true),
    info(UINT32, "uint32", true),
    info(UINT48, "uint48", true),
    info(INT8, "int8", true),
    info(INT16, "int16", true),
    info(INT24, "int24", true),
    info(INT32, "int32", true),
    info(ENUM8, "enum8", false),
    info(ENUM16, "enum16", false),
    info(OCTET_STRING, "octetString", false),
    info(CHARACTER_STRING, "characterString", false),
    info(LONG_OCTET_STRING, "longOctetString", false),
    info(LONG_CHARACTER_STRING, "longCharacterString", false),
    info(IEEE_ADDRESS, "ieeeAddress", false),
];

/// Look up a tag.
pub fn descriptor(tag: u8) -> Option<&'static DataTypeInfo> {
    DATA_TYPES.iter().find(|t| t.tag == tag)
}

/// Look up a tag by its name.
pub fn descriptor_by_name(name: &str) -> Option<&'static DataTypeInfo> {
    DATA_TYPES.iter().find(|t| t.name == name)
}

/// Whether reporting configuration for this tag carries a reportable change.
pub fn is_analog(tag: u8) -> bool {
    descriptor(tag).is_some_and(|t| t.analog)
}

/// Read one value of type `tag`. `field` names the record field for errors.
pub fn read_value(reader: &mut Reader<'_>, tag: u8, field: &str) -> Result<Value, SchemaError> {
    let value = match tag {
        NO_DATA => Value::Null,
        DATA8..=DATA64 => Value::Bytes(reader.take(usize::from(tag - 7))?.to_vec()),
        BOOLEAN => Value::Bool(reader.read_u8()? != 0),
        BITMAP8..=BITMAP64 => Value::Bytes(reader.take(usize::from(tag - 23))?.to_vec()),
        UINT8 | ENUM8 => Value::UInt(u64::from(reader.read_u8()?)),
        UINT16 | ENUM16 => Value::UInt(u64::from(reader.read_u16_le()?)),
        UINT24 => Value::UInt(u64::from(reader.read_u24_le()?)),
        UINT32 => Value::UInt(u64::from(reader.read_u32_le()?)),
        UINT48 => Value::UInt(reader.read_u48_le()?),
        INT8 => Value::Int(i64::from(reader.read_u8()? as i8)),
        INT16 => Value::Int(i64::from(reader.read_u16_le()? as i16)),
        INT24 => {
            let raw = reader.read_u24_le()?;
            Value::Int(i64::from(((raw << 8) as i32) >> 8))
        }
        INT32 => Value::Int(i64::from(reader.read_u32_le()? as i32)),
        OCTET_STRING => {
            let len = usize::from(reader.read_u8()?);
            Value::Bytes(reader.take(len)?.to_vec())
        }
        LONG_OCTET_STRING => {
            let len = usize::from(reader.read_u16_le()?);
            Value::Bytes(reader.take(len)?.to_vec())
        }
        CHARACTER_STRING => {
            let len = usize::from(reader.read_u8()?);
            Value::Str(String::from_utf8_lossy(reader.take(len)?).into_owned())
        }
        LONG_CHARACTER_STRING => {
            let len = usize::from(reader.read_u16_le()?);
            Value::Str(String::from_utf8_lossy(reader.take(len)?).into_owned())
        }
        IEEE_ADDRESS => {
            let bytes = reader.take(8)?;
            match IeeeAddress::from_slice(bytes) {
                Some(addr) => Value::Ieee(addr),
                None => return Err(SchemaError::violation(field, "IEEE address must be 8 bytes")),
            }
        }
        other => {
            log::debug!("zcl: no reader for data type 0x{other:02x} ({field})");
            return Err(SchemaError::UnsupportedDataType {
                tag: other,
                field: Some(field.to_string()),
            })
        }
    };
    Ok(value)
}

fn unsigned(value: &Value, max: u64, tag: u8) -> Result<u64, SchemaError> {
    let raw = value.as_u64().ok_or_else(|| mismatch(tag, "unsigned integer", value))?;
    if raw > max {
        return Err(out_of_range(tag, value));
    }
    Ok(raw)
}

fn signed(value: &Value, min: i64, max: i64, tag: u8) -> Result<i64, SchemaError> {
    let raw = value.as_i64().ok_or_else(|| mismatch(tag, "signed integer", value))?;
    if raw < min || raw > max {
        return Err(out_of_range(tag, value));
    }
    Ok(raw)
}

fn fixed_bytes<'v>(value: &'v Value, len: usize, tag: u8) -> Result<&'v [u8], SchemaError> {
    let bytes = value.as_bytes().ok_or_else(|| mismatch(tag, "bytes", value))?;
    if bytes.len() != len {
        return Err(SchemaError::violation(
            type_label(tag),
            format!("expected {len} bytes, got {}", bytes.len()),
        ));
    }
    Ok(bytes)
}

fn type_label(tag: u8) -> String {
    descriptor(tag)
        .map(|t| t.name.to_string())
        .unwrap_or_else(|| format!("0x{tag:02x}"))
}

fn mismatch(tag: u8, expected: &'static str, actual: &Value) -> SchemaError {
    SchemaError::TypeMismatch {
        field: type_label(tag),
        expected,
        actual: actual.kind(),
    }
}

fn out_of_range(tag: u8, value: &Value) -> SchemaError {
    SchemaError::violation(type_label(tag), format!("value {value} out of range"))
}

/// Write one value of type `tag`.
pub fn write_value(writer: &mut Writer, tag: u8, value: &Value) -> Result<(), SchemaError> {
    match tag {
        NO_DATA => {}
        DATA8..=DATA64 => writer.put_slice(fixed_bytes(value, usize::from(tag - 7), tag)?),
        BOOLEAN => {
            let flag = match value {
                Value::Bool(b) => *b,
                other => unsigned(other, 1, tag)? == 1,
            };
            writer.put_u8(u8::from(flag));
        }
        BITMAP8..=BITMAP64 => writer.put_slice(fixed_bytes(value, usize::from(tag - 23), tag)?),
        UINT8 | ENUM8 => writer.put_u8(unsigned(value, 0xff, tag)? as u8),
        UINT16 | ENUM16 => writer.put_u16_le(unsigned(value, 0xffff, tag)? as u16),
        UINT24 => writer.put_u24_le(unsigned(value, 0xff_ffff, tag)? as u32),
        UINT32 => writer.put_u32_le(unsigned(value, 0xffff_ffff, tag)? as u32),
        UINT48 => writer.put_u48_le(unsigned(value, 0xffff_ffff_ffff, tag)?),
        INT8 => writer.put_u8(signed(value, i8::MIN.into(), i8::MAX.into(), tag)? as i8 as u8),
        INT16 => writer.put_u16_le(signed(value, i16::MIN.into(), i16::MAX.into(), tag)? as i16 as u16),
        INT24 => writer.put_u24_le(signed(value, -0x80_0000, 0x7f_ffff, tag)? as i32 as u32),
        INT32 => writer.put_u32_le(signed(value, i32::MIN.into(), i32::MAX.into(), tag)? as i32 as u32),
        OCTET_STRING | CHARACTER_STRING => {
            let bytes = value.as_bytes().ok_or_else(|| mismatch(tag, "bytes", value))?;
            let len = u8::try_from(bytes.len()).map_err(|_| out_of_range(tag, value))?;
            writer.put_u8(len);
            writer.put_slice(bytes);
        }
        LONG_OCTET_STRING | LONG_CHARACTER_STRING => {
            let bytes = value.as_bytes().ok_or_else(|| mismatch(tag, "bytes", value))?;
            let len = u16::try_from(bytes.len()).map_err(|_| out_of_range(tag, value))?;
            writer.put_u16_le(len);
            writer.put_slice(bytes);
        }
        IEEE_ADDRESS => {
            let addr = value.as_ieee().ok_or_else(|| mismatch(tag, "IEEE address", value))?;
            writer.put_slice(addr.as_bytes());
        }
        other => return Err(SchemaError::UnsupportedDataType { tag: other, field: None }),
    }
    Ok(())
}
