//! ZCL frame and general command layouts.
//!
//! Record types whose shape depends on earlier bytes (a status that gates the
//! rest of the record, a type tag that decides the value width) are custom
//! read/write rules built on [`crate::data_types`].

use once_cell::sync::Lazy;
use zigbee_codec::{FieldCtx, Reader, Record, SchemaError, SchemaSet, TypeDef, Value, Writer};

use crate::constants::{DIRECTION_REPORTED, FRAME_CONTROL_MASK, GENERAL_COMMANDS};
use crate::data_types::{is_analog, read_value, write_value};
use crate::status::ZclStatus;

pub const ZCL_FRAME: &str = "ZCL_FRAME";
pub const READ_ATTRIBUTES: &str = "ZCL_READ_ATTRIBUTES";
pub const READ_ATTRIBUTES_RESPONSE: &str = "ZCL_READ_ATTRIBUTES_RESPONSE";
pub const WRITE_ATTRIBUTES: &str = "ZCL_WRITE_ATTRIBUTES";
pub const WRITE_ATTRIBUTES_RESPONSE: &str = "ZCL_WRITE_ATTRIBUTES_RESPONSE";
pub const CONFIGURE_REPORTING: &str = "ZCL_CONFIGURE_REPORTING";
pub const CONFIGURE_REPORTING_RESPONSE: &str = "ZCL_CONFIGURE_REPORTING_RESPONSE";
pub const READ_REPORTING_CONFIGURATION: &str = "ZCL_READ_REPORTING_CONFIGURATION";
pub const READ_REPORTING_CONFIGURATION_RESPONSE: &str = "ZCL_READ_REPORTING_CONFIGURATION_RESPONSE";
pub const DISCOVER_ATTRIBUTES: &str = "ZCL_DISCOVER_ATTRIBUTES";
pub const DISCOVER_ATTRIBUTES_RESPONSE: &str = "ZCL_DISCOVER_ATTRIBUTES_RESPONSE";
pub const REPORT_ATTRIBUTES: &str = "ZCL_REPORT_ATTRIBUTES";
pub const DEFAULT_RESPONSE: &str = "ZCL_DEFAULT_RESPONSE";

static SCHEMAS: Lazy<Result<SchemaSet, SchemaError>> = Lazy::new(build);

/// The compiled ZCL schema set, resolved on first use.
pub fn schemas() -> Result<&'static SchemaSet, SchemaError> {
    SCHEMAS.as_ref().map_err(Clone::clone)
}

fn build() -> Result<SchemaSet, SchemaError> {
    let types = [
        ("transaction", TypeDef::of("uint8")),
        ("attribute", TypeDef::of("uint16le")),
        ("payload", TypeDef::of("buffer")),
        ("frameControl", TypeDef::of("uint8").with_mask(FRAME_CONTROL_MASK)),
        (
            "manufacturerCode",
            TypeDef::custom(Some(read_manufacturer_code), Some(write_manufacturer_code)),
        ),
        ("readAttributeRecord", TypeDef::custom(Some(read_attribute_record), None)),
        ("writeAttributeRecord", TypeDef::custom(None, Some(write_attribute_record))),
        ("writeStatusRecord", TypeDef::custom(Some(read_write_status), None)),
        ("configureStatusRecord", TypeDef::custom(Some(read_configure_status), None)),
        ("reportingConfiguration", TypeDef::custom(Some(read_reporting_configuration), Some(write_reporting_configuration))),
        ("reportingConfigurationRef", TypeDef::custom(None, Some(write_reporting_reference))),
        ("discoveredAttribute", TypeDef::custom(Some(read_discovered_attribute), None)),
        ("attributeReport", TypeDef::custom(Some(read_attribute_report), Some(write_attribute_report))),
    ];

    let packets = [
        (
            ZCL_FRAME,
            vec![
                ("FrameControl", TypeDef::of("frameControl")),
                ("ManufacturerCode", TypeDef::of("manufacturerCode")),
                ("TransactionSequenceNumber", TypeDef::of("transaction")),
                ("CommandIdentifier", TypeDef::of("uint8").with_enum(&GENERAL_COMMANDS)),
                ("Payload", TypeDef::of("payload")),
            ],
        ),
        (READ_ATTRIBUTES, vec![("Attributes", TypeDef::array("attribute"))]),
        (READ_ATTRIBUTES_RESPONSE, vec![("Attributes", TypeDef::array("readAttributeRecord"))]),
        (WRITE_ATTRIBUTES, vec![("Attributes", TypeDef::array("writeAttributeRecord"))]),
        (WRITE_ATTRIBUTES_RESPONSE, vec![("Records", TypeDef::array("writeStatusRecord"))]),
        (CONFIGURE_REPORTING, vec![("Attributes", TypeDef::array("reportingConfiguration"))]),
        (CONFIGURE_REPORTING_RESPONSE, vec![("Records", TypeDef::array("configureStatusRecord"))]),
        (READ_REPORTING_CONFIGURATION, vec![("Attributes", TypeDef::array("reportingConfigurationRef"))]),
        (READ_REPORTING_CONFIGURATION_RESPONSE, vec![("Records", TypeDef::array("reportingConfiguration"))]),
        (
            DISCOVER_ATTRIBUTES,
            vec![
                ("StartAttribute", TypeDef::of("attribute").with_default(0u16)),
                ("MaxAttributes", TypeDef::of("uint8").with_default(0xffu8)),
            ],
        ),
        (
            DISCOVER_ATTRIBUTES_RESPONSE,
            vec![
                ("DiscoveryComplete", TypeDef::of("uint8")),
                ("Attributes", TypeDef::array("discoveredAttribute")),
            ],
        ),
        (REPORT_ATTRIBUTES, vec![("Reports", TypeDef::array("attributeReport"))]),
        (
            DEFAULT_RESPONSE,
            vec![
                ("CommandIdentifier", TypeDef::of("uint8")),
                ("Status", TypeDef::of("uint8")),
            ],
        ),
    ];

    SchemaSet::build(&types, &packets)
}

/// Read a frame control flag whether the field holds flags or a raw byte.
fn frame_control_flag(record: &Record, flag: &str) -> Result<bool, SchemaError> {
    let control = record.require("FrameControl")?;
    if let Some(flags) = control.as_record() {
        return Ok(flags.get(flag).and_then(Value::as_bool).unwrap_or(false));
    }
    let raw = control.as_u64().ok_or_else(|| SchemaError::TypeMismatch {
        field: "FrameControl".into(),
        expected: "record",
        actual: control.kind(),
    })?;
    let bit = FRAME_CONTROL_MASK
        .iter()
        .position(|slot| *slot == Some(flag))
        .ok_or_else(|| SchemaError::violation("FrameControl", format!("no flag named {flag}")))?;
    Ok(raw & (1 << bit) != 0)
}

fn read_manufacturer_code(
    reader: &mut Reader<'_>,
    _: &FieldCtx<'_>,
    record: &Record,
) -> Result<Option<Value>, SchemaError> {
    if frame_control_flag(record, "ManufacturerSpecific")? {
        Ok(Some(Value::UInt(u64::from(reader.read_u16_le()?))))
    } else {
        Ok(None)
    }
}

fn write_manufacturer_code(
    writer: &mut Writer,
    ctx: &FieldCtx<'_>,
    value: Option<&Value>,
    record: &Record,
) -> Result<(), SchemaError> {
    if !frame_control_flag(record, "ManufacturerSpecific")? {
        return Ok(());
    }
    let value = value.ok_or_else(|| SchemaError::MissingField(ctx.name.to_string()))?;
    let code = value
        .as_u64()
        .and_then(|c| u16::try_from(c).ok())
        .ok_or_else(|| SchemaError::violation(ctx.name, "manufacturer code must be a u16"))?;
    writer.put_u16_le(code);
    Ok(())
}

fn element<'v>(ctx: &FieldCtx<'_>, value: Option<&'v Value>) -> Result<&'v Record, SchemaError> {
    let value = value.ok_or_else(|| SchemaError::MissingField(ctx.name.to_string()))?;
    value.as_record().ok_or_else(|| SchemaError::TypeMismatch {
        field: ctx.name.to_string(),
        expected: "record",
        actual: value.kind(),
    })
}

fn read_attribute_record(
    reader: &mut Reader<'_>,
    ctx: &FieldCtx<'_>,
    _: &Record,
) -> Result<Option<Value>, SchemaError> {
    let id = reader.read_u16_le()?;
    let status = reader.read_u8()?;
    let mut record = Record::new().with("AttributeId", id).with("Status", status);
    if ZclStatus::from(status).is_success() {
        let tag = reader.read_u8()?;
        record.insert("DataType", tag);
        record.insert("Value", read_value(reader, tag, ctx.name)?);
    }
    Ok(Some(Value::Record(record)))
}

fn write_attribute_record(
    writer: &mut Writer,
    ctx: &FieldCtx<'_>,
    value: Option<&Value>,
    _: &Record,
) -> Result<(), SchemaError> {
    let record = element(ctx, value)?;
    let tag = record.u8("DataType")?;
    writer.put_u16_le(record.u16("AttributeId")?);
    writer.put_u8(tag);
    write_value(writer, tag, record.require("Value")?)
}

/// Status records omit the attribute when a single SUCCESS covers every attribute.
fn read_status_record(reader: &mut Reader<'_>, with_direction: bool) -> Result<Option<Value>, SchemaError> {
    let status = reader.read_u8()?;
    let mut record = Record::new().with("Status", status);
    if reader.is_empty() && ZclStatus::from(status).is_success() {
        return Ok(Some(Value::Record(record)));
    }
    if with_direction {
        record.insert("Direction", reader.read_u8()?);
    }
    record.insert("AttributeId", reader.read_u16_le()?);
    Ok(Some(Value::Record(record)))
}

fn read_write_status(
    reader: &mut Reader<'_>,
    _: &FieldCtx<'_>,
    _: &Record,
) -> Result<Option<Value>, SchemaError> {
    read_status_record(reader, false)
}

fn read_configure_status(
    reader: &mut Reader<'_>,
    _: &FieldCtx<'_>,
    _: &Record,
) -> Result<Option<Value>, SchemaError> {
    read_status_record(reader, true)
}

fn read_reporting_configuration(
    reader: &mut Reader<'_>,
    ctx: &FieldCtx<'_>,
    _: &Record,
) -> Result<Option<Value>, SchemaError> {
    let status = reader.read_u8()?;
    let direction = reader.read_u8()?;
    let id = reader.read_u16_le()?;
    let mut record = Record::new()
        .with("Status", status)
        .with("Direction", direction)
        .with("AttributeId", id);
    if !ZclStatus::from(status).is_success() {
        return Ok(Some(Value::Record(record)));
    }
    if direction == DIRECTION_REPORTED {
        let tag = reader.read_u8()?;
        record.insert("DataType", tag);
        record.insert("MinInterval", reader.read_u16_le()?);
        record.insert("MaxInterval", reader.read_u16_le()?);
        if is_analog(tag) {
            record.insert("ReportableChange", read_value(reader, tag, ctx.name)?);
        }
    } else {
        record.insert("Timeout", reader.read_u16_le()?);
    }
    Ok(Some(Value::Record(record)))
}

fn write_reporting_configuration(
    writer: &mut Writer,
    ctx: &FieldCtx<'_>,
    value: Option<&Value>,
    _: &Record,
) -> Result<(), SchemaError> {
    let record = element(ctx, value)?;
    let direction = match record.get("Direction") {
        Some(_) => record.u8("Direction")?,
        None => DIRECTION_REPORTED,
    };
    writer.put_u8(direction);
    writer.put_u16_le(record.u16("AttributeId")?);
    if direction == DIRECTION_REPORTED {
        let tag = record.u8("DataType")?;
        writer.put_u8(tag);
        writer.put_u16_le(record.u16("MinInterval")?);
        writer.put_u16_le(record.u16("MaxInterval")?);
        if is_analog(tag) {
            write_value(writer, tag, record.require("ReportableChange")?)?;
        }
    } else {
        writer.put_u16_le(record.u16("Timeout")?);
    }
    Ok(())
}

fn write_reporting_reference(
    writer: &mut Writer,
    ctx: &FieldCtx<'_>,
    value: Option<&Value>,
    _: &Record,
) -> Result<(), SchemaError> {
    let record = element(ctx, value)?;
    let direction = match record.get("Direction") {
        Some(_) => record.u8("Direction")?,
        None => DIRECTION_REPORTED,
    };
    writer.put_u8(direction);
    writer.put_u16_le(record.u16("AttributeId")?);
    Ok(())
}

fn read_discovered_attribute(
    reader: &mut Reader<'_>,
    _: &FieldCtx<'_>,
    _: &Record,
) -> Result<Option<Value>, SchemaError> {
    let id = reader.read_u16_le()?;
    let tag = reader.read_u8()?;
    Ok(Some(Value::Record(
        Record::new().with("AttributeId", id).with("DataType", tag),
    )))
}

fn read_attribute_report(
    reader: &mut Reader<'_>,
    ctx: &FieldCtx<'_>,
    _: &Record,
) -> Result<Option<Value>, SchemaError> {
    let id = reader.read_u16_le()?;
    let tag = reader.read_u8()?;
    let value = read_value(reader, tag, ctx.name)?;
    Ok(Some(Value::Record(
        Record::new()
            .with("AttributeId", id)
            .with("DataType", tag)
            .with("Value", value),
    )))
}

fn write_attribute_report(
    writer: &mut Writer,
    ctx: &FieldCtx<'_>,
    value: Option<&Value>,
    record: &Record,
) -> Result<(), SchemaError> {
    write_attribute_record(writer, ctx, value, record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schemas_resolve() {
        let set = schemas().unwrap();
        for name in [ZCL_FRAME, READ_ATTRIBUTES_RESPONSE, REPORT_ATTRIBUTES, DEFAULT_RESPONSE] {
            assert!(set.get(name).is_ok(), "{name} missing");
        }
    }

    #[test]
    fn test_manufacturer_code_gated_by_flag() {
        let set = schemas().unwrap();
        let plain = Record::new()
            .with("FrameControl", Record::new())
            .with("ManufacturerCode", 0x1234u16)
            .with("TransactionSequenceNumber", 5u8)
            .with("CommandIdentifier", "ReadAttributes")
            .with("Payload", vec![0x00u8, 0x00]);
        assert_eq!(set.write(ZCL_FRAME, &plain).unwrap(), vec![0x00, 5, 0x00, 0x00, 0x00]);

        let specific = plain
            .clone()
            .with("FrameControl", Record::new().with("ManufacturerSpecific", true));
        assert_eq!(
            set.write(ZCL_FRAME, &specific).unwrap(),
            vec![0x04, 0x34, 0x12, 5, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_read_attributes_response_mixed_status() {
        let payload = [
            0x00, 0x00, 0x00, 0x20, 0x03, // id 0, SUCCESS, uint8 3
            0x05, 0x00, 0x86, // id 5, UNSUPPORTED_ATTRIBUTE
        ];
        let record = schemas().unwrap().read(READ_ATTRIBUTES_RESPONSE, &payload).unwrap();
        let attributes = record.list("Attributes").unwrap();
        assert_eq!(attributes.len(), 2);

        let first = attributes[0].as_record().unwrap();
        assert_eq!(first.u8("Value").unwrap(), 3);
        let second = attributes[1].as_record().unwrap();
        assert_eq!(second.u8("Status").unwrap(), 0x86);
        assert!(!second.contains("Value"));
    }

    #[test]
    fn test_unsupported_tag_fails_batch() {
        let payload = [
            0x00, 0x00, 0x00, 0x20, 0x03, // valid
            0x01, 0x00, 0x00, 0x39, 0x00, 0x00, 0x00, 0x00, // float32 is not supported
        ];
        let err = schemas().unwrap().read(READ_ATTRIBUTES_RESPONSE, &payload).unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedDataType { tag: 0x39, field: Some(_) }));
    }
}
