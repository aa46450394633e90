//! Type declarations and their one-time resolution.
//!
//! A declaration names a parent type and optionally overrides properties
//! (default, mask, enumeration, subtype, lengths, custom read/write rules).
//! Resolution walks the parent chain until it reaches a core primitive, copying
//! every property the child has not set itself. Resolution happens once, when a
//! [`TypeRegistry`] is built, so encode/decode never re-walks the chain.

use std::collections::HashMap;
use std::fmt;

use crate::cursor::{Reader, Writer};
use crate::error::SchemaError;
use crate::value::{EnumTable, Record, Value};

/// Built-in wire representations every chain ends in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    U8,
    U16Le,
    U32Le,
    Buffer,
    String,
}

impl Primitive {
    pub const ALL: [Primitive; 5] = [
        Primitive::U8,
        Primitive::U16Le,
        Primitive::U32Le,
        Primitive::Buffer,
        Primitive::String,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Primitive::U8 => "uint8",
            Primitive::U16Le => "uint16le",
            Primitive::U32Le => "uint32le",
            Primitive::Buffer => "buffer",
            Primitive::String => "string",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Width in bytes for integer primitives.
    pub fn width(&self) -> Option<usize> {
        match self {
            Primitive::U8 => Some(1),
            Primitive::U16Le => Some(2),
            Primitive::U32Le => Some(4),
            Primitive::Buffer | Primitive::String => None,
        }
    }

    /// Largest encodable integer.
    pub fn max_value(&self) -> Option<u64> {
        self.width().map(|w| (1u64 << (w * 8)) - 1)
    }
}

/// Name of the built-in array type; requires a `subtype`.
pub const ARRAY: &str = "array";

/// Width of a length prefix ahead of a buffer or string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    U8,
    U16,
}

/// View of the field being processed, handed to custom rules.
#[derive(Debug, Clone, Copy)]
pub struct FieldCtx<'a> {
    pub name: &'a str,
    pub ty: &'a ResolvedType,
}

/// Custom read rule. `Ok(None)` leaves the field absent from the record.
pub type ReadFn = fn(&mut Reader<'_>, &FieldCtx<'_>, &Record) -> Result<Option<Value>, SchemaError>;

/// Custom write rule. Receives the supplied value (or default) for the field.
pub type WriteFn = fn(&mut Writer, &FieldCtx<'_>, Option<&Value>, &Record) -> Result<(), SchemaError>;

/// A type or field declaration. Unset properties inherit from the parent.
#[derive(Clone, Default)]
pub struct TypeDef {
    pub parent: Option<&'static str>,
    pub default: Option<Value>,
    pub mask: Option<&'static [Option<&'static str>]>,
    pub enumeration: Option<&'static EnumTable>,
    pub subtype: Option<&'static str>,
    pub length: Option<usize>,
    pub prefix: Option<Prefix>,
    pub count: Option<&'static str>,
    pub length_of: Option<&'static str>,
    pub read: Option<ReadFn>,
    pub write: Option<WriteFn>,
}

impl fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDef")
            .field("parent", &self.parent)
            .field("default", &self.default)
            .field("mask", &self.mask)
            .field("enumeration", &self.enumeration.map(|e| e.name))
            .field("subtype", &self.subtype)
            .field("length", &self.length)
            .field("prefix", &self.prefix)
            .field("count", &self.count)
            .field("length_of", &self.length_of)
            .field("read", &self.read.is_some())
            .field("write", &self.write.is_some())
            .finish()
    }
}

impl TypeDef {
    /// Declaration deriving from `parent`.
    pub fn of(parent: &'static str) -> Self {
        Self {
            parent: Some(parent),
            ..Self::default()
        }
    }

    /// Array of `subtype` elements.
    pub fn array(subtype: &'static str) -> Self {
        Self::of(ARRAY).with_subtype(subtype)
    }

    /// Type defined only by custom rules.
    pub fn custom(read: Option<ReadFn>, write: Option<WriteFn>) -> Self {
        Self {
            read,
            write,
            ..Self::default()
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_mask(mut self, mask: &'static [Option<&'static str>]) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_enum(mut self, table: &'static EnumTable) -> Self {
        self.enumeration = Some(table);
        self
    }

    pub fn with_subtype(mut self, subtype: &'static str) -> Self {
        self.subtype = Some(subtype);
        self
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Element count comes from an earlier field.
    pub fn with_count(mut self, field: &'static str) -> Self {
        self.count = Some(field);
        self
    }

    /// When writing, default this field to the length of another.
    pub fn length_of(mut self, field: &'static str) -> Self {
        self.length_of = Some(field);
        self
    }

    pub fn with_read(mut self, read: ReadFn) -> Self {
        self.read = Some(read);
        self
    }

    pub fn with_write(mut self, write: WriteFn) -> Self {
        self.write = Some(write);
        self
    }

    /// Copy every property this declaration has not set from `parent`.
    fn inherit(&mut self, parent: &TypeDef) {
        fn fill<T: Clone>(slot: &mut Option<T>, from: &Option<T>) {
            if slot.is_none() {
                slot.clone_from(from);
            }
        }
        fill(&mut self.default, &parent.default);
        fill(&mut self.mask, &parent.mask);
        fill(&mut self.enumeration, &parent.enumeration);
        fill(&mut self.subtype, &parent.subtype);
        fill(&mut self.length, &parent.length);
        fill(&mut self.prefix, &parent.prefix);
        fill(&mut self.count, &parent.count);
        fill(&mut self.length_of, &parent.length_of);
        fill(&mut self.read, &parent.read);
        fill(&mut self.write, &parent.write);
    }
}

/// Index of a resolved type in its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(usize);

/// A fully flattened type: all inherited properties plus the terminal primitive.
#[derive(Debug, Clone)]
pub struct ResolvedType {
    pub name: String,
    /// Core primitive at the end of the chain; `None` for array and custom types.
    pub core: Option<Primitive>,
    pub props: TypeDef,
    /// Resolved element type for arrays.
    pub subtype: Option<TypeId>,
    pub is_array: bool,
}

/// Arena of resolved types keyed by name.
#[derive(Debug)]
pub struct TypeRegistry {
    types: Vec<ResolvedType>,
    by_name: HashMap<String, TypeId>,
}

impl TypeRegistry {
    /// Resolve a set of declarations against the core types.
    pub fn new(declarations: &[(&'static str, TypeDef)]) -> Result<Self, SchemaError> {
        let mut registry = Self {
            types: Vec::new(),
            by_name: HashMap::new(),
        };

        for primitive in Primitive::ALL {
            registry.push(ResolvedType {
                name: primitive.name().to_string(),
                core: Some(primitive),
                props: TypeDef::default(),
                subtype: None,
                is_array: false,
            });
        }
        registry.push(ResolvedType {
            name: ARRAY.to_string(),
            core: None,
            props: TypeDef::default(),
            subtype: None,
            is_array: true,
        });

        let pending: HashMap<&str, &TypeDef> =
            declarations.iter().map(|(name, def)| (*name, def)).collect();
        for (name, _) in declarations {
            let mut visiting = Vec::new();
            registry.resolve_named(name, &pending, &mut visiting)?;
        }
        Ok(registry)
    }

    fn push(&mut self, ty: ResolvedType) -> TypeId {
        let id = TypeId(self.types.len());
        self.by_name.insert(ty.name.clone(), id);
        self.types.push(ty);
        id
    }

    fn resolve_named(
        &mut self,
        name: &str,
        pending: &HashMap<&str, &TypeDef>,
        visiting: &mut Vec<String>,
    ) -> Result<TypeId, SchemaError> {
        if let Some(id) = self.by_name.get(name) {
            return Ok(*id);
        }
        if visiting.iter().any(|v| v == name) {
            return Err(SchemaError::CyclicType(name.to_string()));
        }
        let declaration = pending.get(name).ok_or_else(|| {
            SchemaError::unknown_type(name, visiting.last().cloned().unwrap_or_default())
        })?;

        visiting.push(name.to_string());
        let resolved = self.flatten(name, declaration, pending, visiting)?;
        visiting.pop();
        Ok(self.push(resolved))
    }

    /// Merge a declaration with its resolved parent and resolve its subtype.
    fn flatten(
        &mut self,
        name: &str,
        declaration: &TypeDef,
        pending: &HashMap<&str, &TypeDef>,
        visiting: &mut Vec<String>,
    ) -> Result<ResolvedType, SchemaError> {
        let mut props = declaration.clone();
        let mut core = None;
        let mut is_array = false;

        if let Some(parent_name) = declaration.parent {
            let parent_id = self.resolve_named(parent_name, pending, visiting)?;
            let parent = &self.types[parent_id.0];
            props.inherit(&parent.props);
            core = parent.core;
            is_array = parent.is_array;
        }
        props.parent = None;

        let subtype = match props.subtype {
            Some(sub) => Some(self.resolve_named(sub, pending, visiting)?),
            None => None,
        };

        let has_rules = props.read.is_some() || props.write.is_some();
        if is_array && subtype.is_none() && !has_rules {
            return Err(SchemaError::violation(name, "array type requires a subtype"));
        }
        if core.is_none() && !is_array && !has_rules {
            return Err(SchemaError::violation(name, "type has no primitive and no custom rules"));
        }

        Ok(ResolvedType {
            name: name.to_string(),
            core,
            props,
            subtype,
            is_array,
        })
    }

    /// Resolve an anonymous field declaration (not added to the arena).
    pub fn resolve_field(&mut self, name: &str, declaration: &TypeDef) -> Result<ResolvedType, SchemaError> {
        let pending = HashMap::new();
        let mut visiting = vec![name.to_string()];
        self.flatten(name, declaration, &pending, &mut visiting)
    }

    pub fn get(&self, id: TypeId) -> &ResolvedType {
        &self.types[id.0]
    }

    pub fn lookup(&self, name: &str) -> Option<&ResolvedType> {
        self.by_name.get(name).map(|id| &self.types[id.0])
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static MODES: EnumTable = EnumTable {
        name: "Mode",
        entries: &[("Off", 0), ("On", 1)],
    };

    #[test]
    fn test_core_types_present() {
        let registry = TypeRegistry::new(&[]).unwrap();
        for primitive in Primitive::ALL {
            let ty = registry.lookup(primitive.name()).unwrap();
            assert_eq!(ty.core, Some(primitive));
        }
        assert!(registry.lookup(ARRAY).unwrap().is_array);
    }

    #[test]
    fn test_resolution_walks_chain() {
        let registry = TypeRegistry::new(&[
            ("mode", TypeDef::of("uint8").with_enum(&MODES).with_default(1u8)),
            ("deviceMode", TypeDef::of("mode")),
        ])
        .unwrap();

        let ty = registry.lookup("deviceMode").unwrap();
        assert_eq!(ty.core, Some(Primitive::U8));
        assert_eq!(ty.props.enumeration.map(|e| e.name), Some("Mode"));
        assert_eq!(ty.props.default, Some(Value::UInt(1)));
        assert!(ty.props.parent.is_none());
    }

    #[test]
    fn test_child_properties_win() {
        // Declared before its parent: resolution order must not matter
        let registry = TypeRegistry::new(&[
            ("narrow", TypeDef::of("wide").with_default(7u8).with_length(2)),
            ("wide", TypeDef::of("buffer").with_default(1u8).with_length(8)),
        ])
        .unwrap();

        let ty = registry.lookup("narrow").unwrap();
        assert_eq!(ty.props.default, Some(Value::UInt(7)));
        assert_eq!(ty.props.length, Some(2));
        assert_eq!(ty.core, Some(Primitive::Buffer));
    }

    #[test]
    fn test_unknown_parent() {
        let err = TypeRegistry::new(&[("thing", TypeDef::of("missing"))]).unwrap_err();
        assert_eq!(err, SchemaError::unknown_type("missing", "thing"));
    }

    #[test]
    fn test_unknown_subtype_fails_at_resolution() {
        let err = TypeRegistry::new(&[("list", TypeDef::array("nothing"))]).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnknownType { ref name, ref referenced_by } if name == "nothing" && referenced_by == "list"
        ));
    }

    #[test]
    fn test_cycle_detected() {
        let err = TypeRegistry::new(&[("a", TypeDef::of("b")), ("b", TypeDef::of("a"))]).unwrap_err();
        assert!(matches!(err, SchemaError::CyclicType(_)));
    }

    #[test]
    fn test_array_requires_subtype() {
        let err = TypeRegistry::new(&[("bare", TypeDef::of(ARRAY))]).unwrap_err();
        assert!(matches!(err, SchemaError::SchemaViolation { .. }));
    }
}
