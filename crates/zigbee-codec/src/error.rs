//! Error types for zigbee-codec.

use thiserror::Error;

/// Errors raised while building or applying a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The input ended before a field could be read.
    #[error("Unexpected end of input at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Byte offset of the read.
        offset: usize,
        /// Bytes the read required.
        needed: usize,
        /// Bytes left in the input.
        remaining: usize,
    },

    /// A value does not satisfy the declaration of its field.
    #[error("Schema violation in field '{field}': {message}")]
    SchemaViolation {
        /// Field being read or written.
        field: String,
        /// Description of the violation.
        message: String,
    },

    /// A ZCL data type tag outside the supported table.
    #[error("Unsupported data type 0x{tag:02X}{}", for_field(.field))]
    UnsupportedDataType {
        /// The tag found on the wire or requested by the caller.
        tag: u8,
        /// Field name, known when reading.
        field: Option<String>,
    },

    /// A type name that is neither a core type nor declared.
    #[error("Unknown type '{name}' referenced by '{referenced_by}'")]
    UnknownType {
        /// The missing type name.
        name: String,
        /// Type or field that referenced it.
        referenced_by: String,
    },

    /// A type whose parent chain loops back onto itself.
    #[error("Cyclic type declaration involving '{0}'")]
    CyclicType(String),

    /// A schema name not present in a schema set.
    #[error("Unknown schema '{0}'")]
    UnknownSchema(String),

    /// A required value was not supplied.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A value has a different shape than the field expects.
    #[error("Field '{field}' expected {expected}, got {actual}")]
    TypeMismatch {
        /// Field being accessed.
        field: String,
        /// Expected value kind.
        expected: &'static str,
        /// Actual value kind.
        actual: &'static str,
    },

    /// An enumeration name with no entry in the field's table.
    #[error("Unknown value '{value}' for enumeration '{enumeration}'")]
    UnknownEnumValue {
        /// Enumeration table name.
        enumeration: &'static str,
        /// Offending name.
        value: String,
    },
}

fn for_field(field: &Option<String>) -> String {
    match field {
        Some(name) => format!(" in field '{name}'"),
        None => String::new(),
    }
}

impl SchemaError {
    /// Create a schema violation for a field.
    pub fn violation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError::SchemaViolation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an unknown type error.
    pub fn unknown_type(name: impl Into<String>, referenced_by: impl Into<String>) -> Self {
        SchemaError::UnknownType {
            name: name.into(),
            referenced_by: referenced_by.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SchemaError::UnsupportedDataType {
            tag: 0x39,
            field: Some("Value".into()),
        };
        assert_eq!(err.to_string(), "Unsupported data type 0x39 in field 'Value'");

        let err = SchemaError::UnsupportedDataType { tag: 0x39, field: None };
        assert_eq!(err.to_string(), "Unsupported data type 0x39");

        let err = SchemaError::violation("IEEEAddr", "expected 8 bytes");
        assert!(err.to_string().contains("IEEEAddr"));
    }
}
