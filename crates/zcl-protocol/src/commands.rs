//! Typed payloads for the general (profile-wide) commands.

use zigbee_codec::{Record, SchemaError, Value};

use crate::constants::DIRECTION_REPORTED;
use crate::packets::{self, schemas};
use crate::status::ZclStatus;

/// One entry of a read attributes response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRecord {
    pub attribute_id: u16,
    pub status: ZclStatus,
    /// Present when `status` is SUCCESS.
    pub data_type: Option<u8>,
    pub value: Option<Value>,
}

/// An attribute value to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteAttribute {
    pub attribute_id: u16,
    pub data_type: u8,
    pub value: Value,
}

/// Per-attribute outcome of a write or configure reporting command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeStatus {
    pub status: ZclStatus,
    pub direction: Option<u8>,
    /// Absent when a single SUCCESS record covers every attribute.
    pub attribute_id: Option<u16>,
}

/// Reporting configuration for one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportingConfiguration {
    pub direction: u8,
    pub attribute_id: u16,
    pub data_type: Option<u8>,
    pub min_interval: Option<u16>,
    pub max_interval: Option<u16>,
    /// Only carried for analog data types.
    pub reportable_change: Option<Value>,
    /// Only carried for the received direction.
    pub timeout: Option<u16>,
}

impl ReportingConfiguration {
    /// Ask the device to report `attribute_id` between the given intervals (seconds).
    pub fn reported(attribute_id: u16, data_type: u8, min_interval: u16, max_interval: u16) -> Self {
        Self {
            direction: DIRECTION_REPORTED,
            attribute_id,
            data_type: Some(data_type),
            min_interval: Some(min_interval),
            max_interval: Some(max_interval),
            reportable_change: None,
            timeout: None,
        }
    }

    pub fn with_reportable_change(mut self, change: impl Into<Value>) -> Self {
        self.reportable_change = Some(change.into());
        self
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new()
            .with("Direction", self.direction)
            .with("AttributeId", self.attribute_id);
        if let Some(tag) = self.data_type {
            record.insert("DataType", tag);
        }
        if let Some(min) = self.min_interval {
            record.insert("MinInterval", min);
        }
        if let Some(max) = self.max_interval {
            record.insert("MaxInterval", max);
        }
        if let Some(change) = &self.reportable_change {
            record.insert("ReportableChange", change.clone());
        }
        if let Some(timeout) = self.timeout {
            record.insert("Timeout", timeout);
        }
        record
    }
}

/// One entry of a read reporting configuration response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportingConfigurationRecord {
    pub status: ZclStatus,
    /// Present when `status` is SUCCESS.
    pub configuration: ReportingConfiguration,
}

/// Attributes returned by attribute discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredAttributes {
    /// No further attributes remain past the last one returned.
    pub complete: bool,
    /// (attribute id, data type) pairs.
    pub attributes: Vec<(u16, u8)>,
}

/// One attribute of an unsolicited report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeReport {
    pub attribute_id: u16,
    pub data_type: u8,
    pub value: Value,
}

/// Body of a default response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultResponse {
    pub command_id: u8,
    pub status: ZclStatus,
}

fn optional_u8(record: &Record, name: &str) -> Result<Option<u8>, SchemaError> {
    match record.get(name) {
        Some(_) => record.u8(name).map(Some),
        None => Ok(None),
    }
}

fn optional_u16(record: &Record, name: &str) -> Result<Option<u16>, SchemaError> {
    match record.get(name) {
        Some(_) => record.u16(name).map(Some),
        None => Ok(None),
    }
}

fn records<'r>(record: &'r Record, list: &str) -> Result<Vec<&'r Record>, SchemaError> {
    record
        .list(list)?
        .iter()
        .map(|item| {
            item.as_record().ok_or_else(|| SchemaError::TypeMismatch {
                field: list.to_string(),
                expected: "record",
                actual: item.kind(),
            })
        })
        .collect()
}

pub fn encode_read_attributes(attribute_ids: &[u16]) -> Result<Vec<u8>, SchemaError> {
    let values = Record::new().with("Attributes", attribute_ids.to_vec());
    schemas()?.write(packets::READ_ATTRIBUTES, &values)
}

pub fn decode_read_attributes_response(payload: &[u8]) -> Result<Vec<AttributeRecord>, SchemaError> {
    let record = schemas()?.read(packets::READ_ATTRIBUTES_RESPONSE, payload)?;
    records(&record, "Attributes")?
        .into_iter()
        .map(|r| {
            Ok(AttributeRecord {
                attribute_id: r.u16("AttributeId")?,
                status: ZclStatus::from(r.u8("Status")?),
                data_type: optional_u8(r, "DataType")?,
                value: r.get("Value").cloned(),
            })
        })
        .collect()
}

pub fn encode_write_attributes(attributes: &[WriteAttribute]) -> Result<Vec<u8>, SchemaError> {
    let list: Vec<Record> = attributes
        .iter()
        .map(|a| {
            Record::new()
                .with("AttributeId", a.attribute_id)
                .with("DataType", a.data_type)
                .with("Value", a.value.clone())
        })
        .collect();
    schemas()?.write(packets::WRITE_ATTRIBUTES, &Record::new().with("Attributes", list))
}

fn decode_status_records(schema: &str, payload: &[u8]) -> Result<Vec<AttributeStatus>, SchemaError> {
    let record = schemas()?.read(schema, payload)?;
    records(&record, "Records")?
        .into_iter()
        .map(|r| {
            Ok(AttributeStatus {
                status: ZclStatus::from(r.u8("Status")?),
                direction: optional_u8(r, "Direction")?,
                attribute_id: optional_u16(r, "AttributeId")?,
            })
        })
        .collect()
}

pub fn decode_write_attributes_response(payload: &[u8]) -> Result<Vec<AttributeStatus>, SchemaError> {
    decode_status_records(packets::WRITE_ATTRIBUTES_RESPONSE, payload)
}

pub fn encode_configure_reporting(configurations: &[ReportingConfiguration]) -> Result<Vec<u8>, SchemaError> {
    let list: Vec<Record> = configurations.iter().map(ReportingConfiguration::to_record).collect();
    schemas()?.write(packets::CONFIGURE_REPORTING, &Record::new().with("Attributes", list))
}

pub fn decode_configure_reporting_response(payload: &[u8]) -> Result<Vec<AttributeStatus>, SchemaError> {
    decode_status_records(packets::CONFIGURE_REPORTING_RESPONSE, payload)
}

/// Request the reported-direction configuration of each attribute.
pub fn encode_read_reporting_configuration(attribute_ids: &[u16]) -> Result<Vec<u8>, SchemaError> {
    let list: Vec<Record> = attribute_ids
        .iter()
        .map(|id| {
            Record::new()
                .with("Direction", DIRECTION_REPORTED)
                .with("AttributeId", *id)
        })
        .collect();
    schemas()?.write(packets::READ_REPORTING_CONFIGURATION, &Record::new().with("Attributes", list))
}

pub fn decode_read_reporting_configuration_response(
    payload: &[u8],
) -> Result<Vec<ReportingConfigurationRecord>, SchemaError> {
    let record = schemas()?.read(packets::READ_REPORTING_CONFIGURATION_RESPONSE, payload)?;
    records(&record, "Records")?
        .into_iter()
        .map(|r| {
            Ok(ReportingConfigurationRecord {
                status: ZclStatus::from(r.u8("Status")?),
                configuration: ReportingConfiguration {
                    direction: r.u8("Direction")?,
                    attribute_id: r.u16("AttributeId")?,
                    data_type: optional_u8(r, "DataType")?,
                    min_interval: optional_u16(r, "MinInterval")?,
                    max_interval: optional_u16(r, "MaxInterval")?,
                    reportable_change: r.get("ReportableChange").cloned(),
                    timeout: optional_u16(r, "Timeout")?,
                },
            })
        })
        .collect()
}

pub fn encode_discover_attributes(start: u16, max_attributes: u8) -> Result<Vec<u8>, SchemaError> {
    let values = Record::new()
        .with("StartAttribute", start)
        .with("MaxAttributes", max_attributes);
    schemas()?.write(packets::DISCOVER_ATTRIBUTES, &values)
}

pub fn decode_discover_attributes_response(payload: &[u8]) -> Result<DiscoveredAttributes, SchemaError> {
    let record = schemas()?.read(packets::DISCOVER_ATTRIBUTES_RESPONSE, payload)?;
    let attributes = records(&record, "Attributes")?
        .into_iter()
        .map(|r| Ok((r.u16("AttributeId")?, r.u8("DataType")?)))
        .collect::<Result<Vec<_>, SchemaError>>()?;
    Ok(DiscoveredAttributes {
        complete: record.u8("DiscoveryComplete")? != 0,
        attributes,
    })
}

pub fn encode_report_attributes(reports: &[AttributeReport]) -> Result<Vec<u8>, SchemaError> {
    let list: Vec<Record> = reports
        .iter()
        .map(|r| {
            Record::new()
                .with("AttributeId", r.attribute_id)
                .with("DataType", r.data_type)
                .with("Value", r.value.clone())
        })
        .collect();
    schemas()?.write(packets::REPORT_ATTRIBUTES, &Record::new().with("Reports", list))
}

pub fn decode_report_attributes(payload: &[u8]) -> Result<Vec<AttributeReport>, SchemaError> {
    let record = schemas()?.read(packets::REPORT_ATTRIBUTES, payload)?;
    records(&record, "Reports")?
        .into_iter()
        .map(|r| {
            Ok(AttributeReport {
                attribute_id: r.u16("AttributeId")?,
                data_type: r.u8("DataType")?,
                value: r.require("Value")?.clone(),
            })
        })
        .collect()
}

pub fn encode_default_response(response: &DefaultResponse) -> Result<Vec<u8>, SchemaError> {
    let values = Record::new()
        .with("CommandIdentifier", response.command_id)
        .with("Status", u8::from(response.status));
    schemas()?.write(packets::DEFAULT_RESPONSE, &values)
}

pub fn decode_default_response(payload: &[u8]) -> Result<DefaultResponse, SchemaError> {
    let record = schemas()?.read(packets::DEFAULT_RESPONSE, payload)?;
    Ok(DefaultResponse {
        command_id: record.u8("CommandIdentifier")?,
        status: ZclStatus::from(record.u8("Status")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::{CHARACTER_STRING, INT16, UINT8};

    #[test]
    fn test_read_attributes_request() {
        assert_eq!(
            encode_read_attributes(&[0x0004, 0x0005]).unwrap(),
            vec![0x04, 0x00, 0x05, 0x00]
        );
    }

    #[test]
    fn test_read_attributes_response() {
        let payload = [
            0x04, 0x00, 0x00, 0x42, 0x03, b'A', b'C', b'M', // ManufacturerName
            0x07, 0x00, 0x86, // PowerSource unsupported
        ];
        let records = decode_read_attributes_response(&payload).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].attribute_id, 4);
        assert_eq!(records[0].data_type, Some(CHARACTER_STRING));
        assert_eq!(records[0].value, Some(Value::Str("ACM".into())));
        assert_eq!(records[1].status, ZclStatus::UnsupportedAttribute);
        assert_eq!(records[1].value, None);
    }

    #[test]
    fn test_write_attributes_request() {
        let bytes = encode_write_attributes(&[WriteAttribute {
            attribute_id: 0x0010,
            data_type: UINT8,
            value: Value::UInt(0x20),
        }])
        .unwrap();
        assert_eq!(bytes, vec![0x10, 0x00, UINT8, 0x20]);
    }

    #[test]
    fn test_write_attributes_response_forms() {
        let all_ok = decode_write_attributes_response(&[0x00]).unwrap();
        assert_eq!(all_ok.len(), 1);
        assert!(all_ok[0].status.is_success());
        assert_eq!(all_ok[0].attribute_id, None);

        let failures = decode_write_attributes_response(&[0x88, 0x10, 0x00, 0x87, 0x11, 0x00]).unwrap();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].status, ZclStatus::ReadOnly);
        assert_eq!(failures[0].attribute_id, Some(0x0010));
        assert_eq!(failures[1].attribute_id, Some(0x0011));
    }

    #[test]
    fn test_configure_reporting_analog_change() {
        let config = ReportingConfiguration::reported(0x0000, INT16, 10, 300).with_reportable_change(-5i16);
        let bytes = encode_configure_reporting(&[config]).unwrap();
        assert_eq!(
            bytes,
            vec![0x00, 0x00, 0x00, INT16, 10, 0, 0x2c, 0x01, 0xfb, 0xff]
        );
    }

    #[test]
    fn test_configure_reporting_discrete_has_no_change() {
        let config = ReportingConfiguration::reported(0x0000, crate::data_types::BOOLEAN, 0, 60);
        let bytes = encode_configure_reporting(&[config]).unwrap();
        assert_eq!(bytes, vec![0x00, 0x00, 0x00, 0x10, 0, 0, 60, 0]);
    }

    #[test]
    fn test_configure_reporting_response_with_direction() {
        let statuses = decode_configure_reporting_response(&[0x8c, 0x00, 0x05, 0x00]).unwrap();
        assert_eq!(statuses[0].status, ZclStatus::UnreportableAttribute);
        assert_eq!(statuses[0].direction, Some(0));
        assert_eq!(statuses[0].attribute_id, Some(5));
    }

    #[test]
    fn test_read_reporting_configuration_roundtrip() {
        assert_eq!(
            encode_read_reporting_configuration(&[0x0000]).unwrap(),
            vec![0x00, 0x00, 0x00]
        );

        let payload = [
            0x00, 0x00, 0x00, 0x00, INT16, 1, 0, 0x10, 0x0e, 0x32, 0x00, // success with change 50
            0x8b, 0x00, 0x01, 0x00, // NOT_FOUND for attribute 1
        ];
        let records = decode_read_reporting_configuration_response(&payload).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].configuration.max_interval, Some(3600));
        assert_eq!(records[0].configuration.reportable_change, Some(Value::Int(50)));
        assert_eq!(records[1].status, ZclStatus::NotFound);
        assert_eq!(records[1].configuration.data_type, None);
    }

    #[test]
    fn test_discover_attributes() {
        assert_eq!(encode_discover_attributes(0, 100).unwrap(), vec![0, 0, 100]);

        let found = decode_discover_attributes_response(&[0x01, 0x00, 0x00, 0x10, 0x01, 0x00, 0x20]).unwrap();
        assert!(found.complete);
        assert_eq!(found.attributes, vec![(0x0000, 0x10), (0x0001, 0x20)]);
    }

    #[test]
    fn test_report_attributes() {
        let reports = vec![AttributeReport {
            attribute_id: 0x0000,
            data_type: INT16,
            value: Value::Int(2150),
        }];
        let bytes = encode_report_attributes(&reports).unwrap();
        assert_eq!(decode_report_attributes(&bytes).unwrap(), reports);
    }

    #[test]
    fn test_default_response() {
        let bytes = encode_default_response(&DefaultResponse {
            command_id: 0x02,
            status: ZclStatus::Failure,
        })
        .unwrap();
        assert_eq!(bytes, vec![0x02, 0x02]);
        assert_eq!(decode_default_response(&bytes).unwrap().status, ZclStatus::Failure);
    }
}
