//! Dynamic values produced and consumed by schemas.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::SchemaError;

/// A 64-bit IEEE (long) device address, stored in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct IeeeAddress(pub [u8; 8]);

impl IeeeAddress {
    /// Create an address from its wire bytes.
    pub fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Create from a slice; `None` unless exactly 8 bytes.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; 8] = slice.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Get the wire bytes.
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Interpret the address as a little-endian integer.
    pub fn as_u64(&self) -> u64 {
        u64::from_le_bytes(self.0)
    }
}

impl fmt::Display for IeeeAddress {
    /// Upper half then lower half, each as eight uppercase hex digits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let low = u32::from_le_bytes([self.0[0], self.0[1], self.0[2], self.0[3]]);
        let high = u32::from_le_bytes([self.0[4], self.0[5], self.0[6], self.0[7]]);
        write!(f, "{high:08X}{low:08X}")
    }
}

/// A named enumeration value that normalizes to its numeric code on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumValue {
    pub name: &'static str,
    pub code: u64,
}

/// Name/code pairs for an enumerated field.
#[derive(Debug)]
pub struct EnumTable {
    pub name: &'static str,
    pub entries: &'static [(&'static str, u64)],
}

impl EnumTable {
    pub fn by_name(&self, name: &str) -> Option<EnumValue> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(name, code)| EnumValue { name, code })
    }

    pub fn by_code(&self, code: u64) -> Option<EnumValue> {
        self.entries
            .iter()
            .find(|(_, c)| *c == code)
            .map(|&(name, code)| EnumValue { name, code })
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Explicit "no data".
    Null,
    Bool(bool),
    UInt(u64),
    Int(i64),
    Bytes(Vec<u8>),
    Str(String),
    Enum(EnumValue),
    Ieee(IeeeAddress),
    List(Vec<Value>),
    Record(Record),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::UInt(_) => "unsigned integer",
            Value::Int(_) => "signed integer",
            Value::Bytes(_) => "bytes",
            Value::Str(_) => "string",
            Value::Enum(_) => "enum",
            Value::Ieee(_) => "IEEE address",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }

    /// Unsigned view. Enums yield their code and non-negative signed values convert.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(v) => Some(*v),
            Value::Int(v) => u64::try_from(*v).ok(),
            Value::Enum(e) => Some(e.code),
            Value::Bool(b) => Some(u64::from(*b)),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::Str(s) => Some(s.as_bytes()),
            Value::Ieee(a) => Some(a.as_bytes()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_ieee(&self) -> Option<IeeeAddress> {
        match self {
            Value::Ieee(a) => Some(*a),
            Value::Bytes(b) => IeeeAddress::from_slice(b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Bytes(b) => {
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Enum(e) => write!(f, "{}", e.name),
            Value::Ieee(a) => write!(f, "{a}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Record(r) => write!(f, "{r}"),
        }
    }
}

macro_rules! value_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::UInt(u64::from(v))
            }
        })*
    };
}

macro_rules! value_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

value_from_unsigned!(u8, u16, u32, u64);
value_from_signed!(i8, i16, i32, i64);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<EnumValue> for Value {
    fn from(v: EnumValue) -> Self {
        Value::Enum(v)
    }
}

impl From<IeeeAddress> for Value {
    fn from(v: IeeeAddress) -> Self {
        Value::Ieee(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}

macro_rules! value_from_list {
    ($($t:ty),*) => {
        $(impl From<Vec<$t>> for Value {
            fn from(v: Vec<$t>) -> Self {
                Value::List(v.into_iter().map(Into::into).collect())
            }
        })*
    };
}

value_from_list!(u16, u32, Value, Record);

/// Named field values, in field-name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Get a field, failing with `MissingField` when absent.
    pub fn require(&self, name: &str) -> Result<&Value, SchemaError> {
        self.0
            .get(name)
            .ok_or_else(|| SchemaError::MissingField(name.to_string()))
    }

    pub fn u64(&self, name: &str) -> Result<u64, SchemaError> {
        let value = self.require(name)?;
        value.as_u64().ok_or_else(|| mismatch(name, "unsigned integer", value))
    }

    pub fn u8(&self, name: &str) -> Result<u8, SchemaError> {
        self.narrow(name)
    }

    pub fn u16(&self, name: &str) -> Result<u16, SchemaError> {
        self.narrow(name)
    }

    pub fn u32(&self, name: &str) -> Result<u32, SchemaError> {
        self.narrow(name)
    }

    fn narrow<T: TryFrom<u64>>(&self, name: &str) -> Result<T, SchemaError> {
        let raw = self.u64(name)?;
        T::try_from(raw).map_err(|_| {
            SchemaError::violation(name, format!("value {raw} out of range"))
        })
    }

    pub fn flag(&self, name: &str) -> Result<bool, SchemaError> {
        let value = self.require(name)?;
        value.as_bool().ok_or_else(|| mismatch(name, "bool", value))
    }

    pub fn bytes(&self, name: &str) -> Result<&[u8], SchemaError> {
        let value = self.require(name)?;
        value.as_bytes().ok_or_else(|| mismatch(name, "bytes", value))
    }

    pub fn list(&self, name: &str) -> Result<&[Value], SchemaError> {
        let value = self.require(name)?;
        value.as_list().ok_or_else(|| mismatch(name, "list", value))
    }

    pub fn record(&self, name: &str) -> Result<&Record, SchemaError> {
        let value = self.require(name)?;
        value.as_record().ok_or_else(|| mismatch(name, "record", value))
    }

    pub fn ieee(&self, name: &str) -> Result<IeeeAddress, SchemaError> {
        let value = self.require(name)?;
        value.as_ieee().ok_or_else(|| mismatch(name, "IEEE address", value))
    }

    /// Every element of a list field as `u16`.
    pub fn u16_list(&self, name: &str) -> Result<Vec<u16>, SchemaError> {
        self.list(name)?
            .iter()
            .map(|v| {
                v.as_u64()
                    .and_then(|n| u16::try_from(n).ok())
                    .ok_or_else(|| mismatch(name, "list of u16", v))
            })
            .collect()
    }

    /// Every element of a list field as `u8`.
    pub fn u8_list(&self, name: &str) -> Result<Vec<u8>, SchemaError> {
        self.list(name)?
            .iter()
            .map(|v| {
                v.as_u64()
                    .and_then(|n| u8::try_from(n).ok())
                    .ok_or_else(|| mismatch(name, "list of u8", v))
            })
            .collect()
    }
}

fn mismatch(field: &str, expected: &'static str, actual: &Value) -> SchemaError {
    SchemaError::TypeMismatch {
        field: field.to_string(),
        expected,
        actual: actual.kind(),
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        write!(f, "}}")
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
