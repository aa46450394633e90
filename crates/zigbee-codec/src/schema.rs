//! Ordered field layouts and the read/write engine.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cursor::{Reader, Writer};
use crate::error::SchemaError;
use crate::types::{FieldCtx, Prefix, Primitive, ResolvedType, TypeDef, TypeRegistry};
use crate::value::{Record, Value};

/// One named field with its resolved type.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub ty: ResolvedType,
}

/// A compiled packet layout.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
    registry: Arc<TypeRegistry>,
}

impl Schema {
    fn compile(
        registry: &mut TypeRegistry,
        name: &str,
        fields: &[(&'static str, TypeDef)],
    ) -> Result<Vec<Field>, SchemaError> {
        fields
            .iter()
            .map(|(field_name, decl)| {
                let ty = registry.resolve_field(field_name, decl).map_err(|e| match e {
                    SchemaError::UnknownType { name: missing, .. } => {
                        SchemaError::unknown_type(missing, format!("{name}.{field_name}"))
                    }
                    other => other,
                })?;
                Ok(Field { name: *field_name, ty })
            })
            .collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Encode `values` field by field. Absent fields fall back to declared defaults.
    pub fn write(&self, values: &Record) -> Result<Vec<u8>, SchemaError> {
        let mut writer = Writer::new();
        self.write_into(&mut writer, values)?;
        Ok(writer.into_vec())
    }

    pub fn write_into(&self, writer: &mut Writer, values: &Record) -> Result<(), SchemaError> {
        for field in &self.fields {
            let supplied = values.get(field.name);
            let derived = match (supplied, field.ty.props.length_of) {
                (None, Some(other)) => Some(Value::UInt(length_of(values.get(other)) as u64)),
                _ => None,
            };
            let value = supplied.or(derived.as_ref()).or(field.ty.props.default.as_ref());
            write_field(&self.registry, writer, field.name, &field.ty, value, values)?;
        }
        Ok(())
    }

    /// Decode a payload. Trailing bytes after the last field are ignored.
    pub fn read(&self, data: &[u8]) -> Result<Record, SchemaError> {
        let mut reader = Reader::new(data);
        self.read_from(&mut reader)
    }

    pub fn read_from(&self, reader: &mut Reader<'_>) -> Result<Record, SchemaError> {
        let mut record = Record::new();
        for field in &self.fields {
            if let Some(value) = read_field(&self.registry, reader, field.name, &field.ty, &record)? {
                record.insert(field.name, value);
            }
        }
        Ok(record)
    }
}

fn length_of(value: Option<&Value>) -> usize {
    match value {
        Some(Value::List(items)) => items.len(),
        Some(Value::Bytes(bytes)) => bytes.len(),
        Some(Value::Str(s)) => s.len(),
        _ => 0,
    }
}

fn read_field(
    registry: &TypeRegistry,
    reader: &mut Reader<'_>,
    name: &str,
    ty: &ResolvedType,
    record: &Record,
) -> Result<Option<Value>, SchemaError> {
    if let Some(read) = ty.props.read {
        return read(reader, &FieldCtx { name, ty }, record);
    }
    if ty.is_array {
        return read_array(registry, reader, name, ty, record).map(Some);
    }
    match ty.core {
        Some(core) => read_primitive(reader, name, ty, core, record).map(Some),
        None => Err(SchemaError::violation(name, format!("type '{}' has no read rule", ty.name))),
    }
}

fn read_array(
    registry: &TypeRegistry,
    reader: &mut Reader<'_>,
    name: &str,
    ty: &ResolvedType,
    record: &Record,
) -> Result<Value, SchemaError> {
    let element = match ty.subtype {
        Some(id) => registry.get(id),
        None => return Err(SchemaError::violation(name, "array has no subtype")),
    };
    let count = match ty.props.count {
        Some(count_field) => Some(record.u64(count_field)? as usize),
        None => None,
    };

    let mut items = Vec::new();
    loop {
        match count {
            Some(n) if items.len() >= n => break,
            None if reader.is_empty() => break,
            _ => {}
        }
        let before = reader.position();
        match read_field(registry, reader, name, element, record)? {
            Some(item) => items.push(item),
            None => break,
        }
        if count.is_none() && reader.position() == before {
            return Err(SchemaError::violation(name, "array element consumed no input"));
        }
    }
    Ok(Value::List(items))
}

fn read_length(
    reader: &mut Reader<'_>,
    ty: &ResolvedType,
    record: &Record,
) -> Result<Option<usize>, SchemaError> {
    if let Some(prefix) = ty.props.prefix {
        let len = match prefix {
            Prefix::U8 => usize::from(reader.read_u8()?),
            Prefix::U16 => usize::from(reader.read_u16_le()?),
        };
        return Ok(Some(len));
    }
    if let Some(count_field) = ty.props.count {
        return Ok(Some(record.u64(count_field)? as usize));
    }
    Ok(ty.props.length)
}

fn read_primitive(
    reader: &mut Reader<'_>,
    name: &str,
    ty: &ResolvedType,
    core: Primitive,
    record: &Record,
) -> Result<Value, SchemaError> {
    let raw = match core {
        Primitive::U8 => u64::from(reader.read_u8()?),
        Primitive::U16Le => u64::from(reader.read_u16_le()?),
        Primitive::U32Le => u64::from(reader.read_u32_le()?),
        Primitive::Buffer | Primitive::String => {
            let bytes = match read_length(reader, ty, record)? {
                Some(len) => reader.take(len)?,
                None => reader.rest(),
            };
            return Ok(match core {
                Primitive::String => Value::Str(String::from_utf8_lossy(bytes).into_owned()),
                _ => Value::Bytes(bytes.to_vec()),
            });
        }
    };

    match ty.props.mask {
        Some(mask) => {
            let mut flags = Record::new();
            for (bit, slot) in mask.iter().enumerate() {
                if let Some(flag) = slot {
                    flags.insert(*flag, raw & (1 << bit) != 0);
                }
            }
            Ok(Value::Record(flags))
        }
        None => Ok(Value::UInt(raw)),
    }
}

fn write_field(
    registry: &TypeRegistry,
    writer: &mut Writer,
    name: &str,
    ty: &ResolvedType,
    value: Option<&Value>,
    record: &Record,
) -> Result<(), SchemaError> {
    if let Some(write) = ty.props.write {
        return write(writer, &FieldCtx { name, ty }, value, record);
    }
    let value = value.ok_or_else(|| SchemaError::MissingField(name.to_string()))?;

    if ty.is_array {
        let element = match ty.subtype {
            Some(id) => registry.get(id),
            None => return Err(SchemaError::violation(name, "array has no subtype")),
        };
        let items = value.as_list().ok_or_else(|| SchemaError::TypeMismatch {
            field: name.to_string(),
            expected: "list",
            actual: value.kind(),
        })?;
        for item in items {
            write_field(registry, writer, name, element, Some(item), record)?;
        }
        return Ok(());
    }

    match ty.core {
        Some(core) => write_primitive(writer, name, ty, core, value),
        None => Err(SchemaError::violation(name, format!("type '{}' has no write rule", ty.name))),
    }
}

/// Reduce a value to the integer carried on the wire, applying mask and enum rules.
fn integer_for(name: &str, ty: &ResolvedType, value: &Value) -> Result<u64, SchemaError> {
    if let (Some(mask), Value::Record(flags)) = (ty.props.mask, value) {
        let mut raw = 0u64;
        for (bit, slot) in mask.iter().enumerate() {
            if let Some(flag) = slot {
                if flags.get(flag).and_then(Value::as_bool).unwrap_or(false) {
                    raw |= 1 << bit;
                }
            }
        }
        return Ok(raw);
    }
    if let (Some(table), Value::Str(label)) = (ty.props.enumeration, value) {
        return table
            .by_name(label)
            .map(|e| e.code)
            .ok_or_else(|| SchemaError::UnknownEnumValue {
                enumeration: table.name,
                value: label.clone(),
            });
    }
    value.as_u64().ok_or_else(|| SchemaError::TypeMismatch {
        field: name.to_string(),
        expected: "unsigned integer",
        actual: value.kind(),
    })
}

fn write_primitive(
    writer: &mut Writer,
    name: &str,
    ty: &ResolvedType,
    core: Primitive,
    value: &Value,
) -> Result<(), SchemaError> {
    match core {
        Primitive::U8 | Primitive::U16Le | Primitive::U32Le => {
            let raw = integer_for(name, ty, value)?;
            let max = core.max_value().unwrap_or(u64::MAX);
            if raw > max {
                return Err(SchemaError::violation(
                    name,
                    format!("value {raw} does not fit in {}", core.name()),
                ));
            }
            match core {
                Primitive::U8 => writer.put_u8(raw as u8),
                Primitive::U16Le => writer.put_u16_le(raw as u16),
                _ => writer.put_u32_le(raw as u32),
            }
            Ok(())
        }
        Primitive::Buffer | Primitive::String => {
            let bytes = value.as_bytes().ok_or_else(|| SchemaError::TypeMismatch {
                field: name.to_string(),
                expected: "bytes",
                actual: value.kind(),
            })?;
            if let Some(length) = ty.props.length {
                if bytes.len() != length {
                    return Err(SchemaError::violation(
                        name,
                        format!("expected {length} bytes, got {}", bytes.len()),
                    ));
                }
            }
            match ty.props.prefix {
                Some(Prefix::U8) => {
                    let len = u8::try_from(bytes.len()).map_err(|_| {
                        SchemaError::violation(name, format!("{} bytes exceed a 1-byte length prefix", bytes.len()))
                    })?;
                    writer.put_u8(len);
                }
                Some(Prefix::U16) => {
                    let len = u16::try_from(bytes.len()).map_err(|_| {
                        SchemaError::violation(name, format!("{} bytes exceed a 2-byte length prefix", bytes.len()))
                    })?;
                    writer.put_u16_le(len);
                }
                None => {}
            }
            writer.put_slice(bytes);
            Ok(())
        }
    }
}

/// A registry plus the packet schemas compiled against it.
#[derive(Debug)]
pub struct SchemaSet {
    registry: Arc<TypeRegistry>,
    schemas: HashMap<String, Schema>,
}

impl SchemaSet {
    /// Resolve `types`, then compile every packet layout against them.
    pub fn build(
        types: &[(&'static str, TypeDef)],
        packets: &[(&'static str, Vec<(&'static str, TypeDef)>)],
    ) -> Result<Self, SchemaError> {
        let mut registry = TypeRegistry::new(types)?;
        let mut compiled = Vec::with_capacity(packets.len());
        for (name, fields) in packets {
            compiled.push((*name, Schema::compile(&mut registry, name, fields)?));
        }

        let registry = Arc::new(registry);
        let schemas = compiled
            .into_iter()
            .map(|(name, fields)| {
                let schema = Schema {
                    name: name.to_string(),
                    fields,
                    registry: Arc::clone(&registry),
                };
                (name.to_string(), schema)
            })
            .collect();
        Ok(Self { registry, schemas })
    }

    pub fn get(&self, name: &str) -> Result<&Schema, SchemaError> {
        self.schemas
            .get(name)
            .ok_or_else(|| SchemaError::UnknownSchema(name.to_string()))
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn write(&self, name: &str, values: &Record) -> Result<Vec<u8>, SchemaError> {
        self.get(name)?.write(values)
    }

    pub fn read(&self, name: &str, data: &[u8]) -> Result<Record, SchemaError> {
        self.get(name)?.read(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::EnumTable;

    static FLAGS: &[Option<&str>] = &[Some("A"), Some("B"), Some("C")];
    static STATES: EnumTable = EnumTable {
        name: "State",
        entries: &[("Idle", 0), ("Busy", 7)],
    };

    fn one(fields: Vec<(&'static str, TypeDef)>) -> SchemaSet {
        SchemaSet::build(&[], &[("T", fields)]).unwrap()
    }

    #[test]
    fn test_mask_all_combinations() {
        let set = one(vec![("Flags", TypeDef::of("uint8").with_mask(FLAGS))]);
        for raw in 0u8..8 {
            let flags = Record::new()
                .with("A", raw & 1 != 0)
                .with("B", raw & 2 != 0)
                .with("C", raw & 4 != 0);
            let encoded = set.write("T", &Record::new().with("Flags", flags.clone())).unwrap();
            assert_eq!(encoded, vec![raw]);

            let decoded = set.read("T", &encoded).unwrap();
            assert_eq!(decoded.record("Flags").unwrap(), &flags);
        }
    }

    #[test]
    fn test_mask_partial_record() {
        let set = one(vec![("Flags", TypeDef::of("uint8").with_mask(FLAGS))]);
        let encoded = set
            .write("T", &Record::new().with("Flags", Record::new().with("A", true).with("C", true)))
            .unwrap();
        assert_eq!(encoded, vec![0b101]);

        let decoded = set.read("T", &[0b101]).unwrap();
        let flags = decoded.record("Flags").unwrap();
        assert!(flags.flag("A").unwrap());
        assert!(!flags.flag("B").unwrap());
        assert!(flags.flag("C").unwrap());
    }

    #[test]
    fn test_mask_accepts_raw_integer() {
        let set = one(vec![("Flags", TypeDef::of("uint8").with_mask(FLAGS))]);
        assert_eq!(set.write("T", &Record::new().with("Flags", 6u8)).unwrap(), vec![6]);
    }

    #[test]
    fn test_enum_normalizes_to_code() {
        let set = one(vec![("State", TypeDef::of("uint8").with_enum(&STATES))]);
        let by_name = set.write("T", &Record::new().with("State", "Busy")).unwrap();
        let by_code = set.write("T", &Record::new().with("State", 7u8)).unwrap();
        let by_value = set
            .write("T", &Record::new().with("State", STATES.by_name("Busy").unwrap()))
            .unwrap();
        assert_eq!(by_name, vec![7]);
        assert_eq!(by_code, by_name);
        assert_eq!(by_value, by_name);

        let err = set.write("T", &Record::new().with("State", "Asleep")).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownEnumValue { enumeration: "State", .. }));
    }

    #[test]
    fn test_defaults_fill_absent_fields() {
        let set = one(vec![
            ("Endpoint", TypeDef::of("uint8").with_default(20u8)),
            ("Radius", TypeDef::of("uint8").with_default(32u8)),
        ]);
        let encoded = set.write("T", &Record::new().with("Radius", 5u8)).unwrap();
        assert_eq!(encoded, vec![20, 5]);
    }

    #[test]
    fn test_missing_value_without_default() {
        let set = one(vec![("Value", TypeDef::of("uint16le"))]);
        let err = set.write("T", &Record::new()).unwrap_err();
        assert_eq!(err, SchemaError::MissingField("Value".into()));
    }

    #[test]
    fn test_integer_range_checked() {
        let set = one(vec![("Value", TypeDef::of("uint8"))]);
        let err = set.write("T", &Record::new().with("Value", 256u16)).unwrap_err();
        assert!(matches!(err, SchemaError::SchemaViolation { .. }));
    }

    #[test]
    fn test_fixed_length_violation() {
        let set = one(vec![("Key", TypeDef::of("buffer").with_length(8))]);
        let err = set.write("T", &Record::new().with("Key", vec![1u8, 2, 3])).unwrap_err();
        match err {
            SchemaError::SchemaViolation { field, .. } => assert_eq!(field, "Key"),
            other => panic!("Expected SchemaViolation, got {other:?}"),
        }
        assert!(set.write("T", &Record::new().with("Key", vec![0u8; 8])).is_ok());
    }

    #[test]
    fn test_length_prefixed_buffer() {
        let set = one(vec![
            ("Short", TypeDef::of("buffer").with_prefix(Prefix::U8)),
            ("Long", TypeDef::of("buffer").with_prefix(Prefix::U16)),
        ]);
        let values = Record::new()
            .with("Short", vec![0xAAu8, 0xBB])
            .with("Long", vec![0xCCu8]);
        let encoded = set.write("T", &values).unwrap();
        assert_eq!(encoded, vec![2, 0xAA, 0xBB, 1, 0, 0xCC]);
        assert_eq!(set.read("T", &encoded).unwrap(), values);
    }

    #[test]
    fn test_counted_array_and_length_of() {
        let set = SchemaSet::build(
            &[("cluster", TypeDef::of("uint16le"))],
            &[(
                "T",
                vec![
                    ("Count", TypeDef::of("uint8").length_of("List")),
                    ("List", TypeDef::array("cluster").with_count("Count")),
                    ("Tail", TypeDef::of("uint8")),
                ],
            )],
        )
        .unwrap();

        let encoded = set
            .write("T", &Record::new().with("List", vec![6u16, 0x0500]).with("Tail", 9u8))
            .unwrap();
        assert_eq!(encoded, vec![2, 0x06, 0x00, 0x00, 0x05, 9]);

        let decoded = set.read("T", &encoded).unwrap();
        assert_eq!(decoded.u16_list("List").unwrap(), vec![6, 0x0500]);
        assert_eq!(decoded.u8("Tail").unwrap(), 9);
    }

    #[test]
    fn test_uncounted_array_reads_to_end() {
        let set = one(vec![("Ids", TypeDef::array("uint16le"))]);
        let decoded = set.read("T", &[1, 0, 2, 0, 3, 0]).unwrap();
        assert_eq!(decoded.u16_list("Ids").unwrap(), vec![1, 2, 3]);

        // Odd trailing byte cannot form an element
        assert!(matches!(
            set.read("T", &[1, 0, 2]),
            Err(SchemaError::UnexpectedEof { offset: 2, .. })
        ));
    }

    #[test]
    fn test_conditional_field_via_custom_rules() {
        fn read_code(reader: &mut Reader<'_>, _: &FieldCtx<'_>, record: &Record) -> Result<Option<Value>, SchemaError> {
            let flags = record.record("Control")?;
            if flags.flag("A")? {
                Ok(Some(Value::UInt(u64::from(reader.read_u16_le()?))))
            } else {
                Ok(None)
            }
        }
        fn write_code(writer: &mut Writer, ctx: &FieldCtx<'_>, value: Option<&Value>, _: &Record) -> Result<(), SchemaError> {
            if let Some(value) = value {
                let code = value.as_u64().ok_or_else(|| SchemaError::violation(ctx.name, "not a number"))?;
                writer.put_u16_le(code as u16);
            }
            Ok(())
        }

        let set = one(vec![
            ("Control", TypeDef::of("uint8").with_mask(FLAGS)),
            ("Code", TypeDef::custom(Some(read_code), Some(write_code))),
            ("Seq", TypeDef::of("uint8")),
        ]);

        let with_code = set.read("T", &[0b001, 0x34, 0x12, 7]).unwrap();
        assert_eq!(with_code.u16("Code").unwrap(), 0x1234);
        assert_eq!(with_code.u8("Seq").unwrap(), 7);

        let without = set.read("T", &[0b000, 7]).unwrap();
        assert!(!without.contains("Code"));
        assert_eq!(without.u8("Seq").unwrap(), 7);

        let encoded = set
            .write("T", &Record::new().with("Control", Record::new()).with("Seq", 7u8))
            .unwrap();
        assert_eq!(encoded, vec![0, 7]);
    }

    #[test]
    fn test_unknown_field_type_names_schema() {
        let err = SchemaSet::build(&[], &[("Packet", vec![("Body", TypeDef::of("blob"))])]).unwrap_err();
        assert_eq!(err, SchemaError::unknown_type("blob", "Packet.Body"));
    }

    #[test]
    fn test_unknown_schema_name() {
        let set = one(vec![("A", TypeDef::of("uint8"))]);
        assert!(matches!(set.get("Other"), Err(SchemaError::UnknownSchema(_))));
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let set = one(vec![("A", TypeDef::of("uint8"))]);
        assert_eq!(set.read("T", &[1, 2, 3]).unwrap().u8("A").unwrap(), 1);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        static OPTIONS: &[Option<&str>] = &[
            None,
            Some("wildcardProfileId"),
            None,
            Some("ackRequest"),
            Some("discoverRoute"),
            Some("security"),
            Some("skipRouting"),
        ];

        proptest! {
            #[test]
            fn test_mask_preserves_named_bits(raw in any::<u8>()) {
                let set = one(vec![("Options", TypeDef::of("uint8").with_mask(OPTIONS))]);
                let decoded = set.read("T", &[raw]).unwrap();
                let encoded = set.write("T", &decoded).unwrap();
                // Unnamed positions (0, 2, 7) are dropped on the way through
                prop_assert_eq!(encoded, vec![raw & 0b0111_1010]);
            }
        }
    }
}
