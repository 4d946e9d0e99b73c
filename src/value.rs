//! The tagged value model (spec §3, §4.2), grounded on
//! `original_source/seabolt/src/bolt/values/struct_values.c`: any `Value`
//! slot can be reset to any variant in place via a `to_*` constructor; a
//! composite's children are themselves owned `Value` nodes (the "per-node
//! owning boxes" alternative from spec.md §9's design notes).

use crate::error::{Error, ProgrammerError};

pub type Result<T> = std::result::Result<T, Error>;

/// A single dictionary entry: a short UTF-8 key paired with a `Value`.
#[derive(Debug, Clone, PartialEq)]
pub struct DictEntry {
    pub key: String,
    pub value: Value,
}

/// The variant tag of a [`Value`], independent of payload (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Null,
    Bit,
    Byte,
    Int8,
    Int16,
    Int32,
    Int64,
    Float64,
    String,
    Char,
    ByteArray,
    List,
    Dictionary,
    Structure,
    StructureArray,
    Message,
    BitArray,
    Int8Array,
    Int16Array,
    Int32Array,
    Int64Array,
    Float64Array,
    StringArray,
    CharArray,
}

impl Type {
    pub fn name(self) -> &'static str {
        match self {
            Type::Null => "Null",
            Type::Bit => "Bit",
            Type::Byte => "Byte",
            Type::Int8 => "Int8",
            Type::Int16 => "Int16",
            Type::Int32 => "Int32",
            Type::Int64 => "Int64",
            Type::Float64 => "Float64",
            Type::String => "String",
            Type::Char => "Char",
            Type::ByteArray => "ByteArray",
            Type::List => "List",
            Type::Dictionary => "Dictionary",
            Type::Structure => "Structure",
            Type::StructureArray => "StructureArray",
            Type::Message => "Message",
            Type::BitArray => "BitArray",
            Type::Int8Array => "Int8Array",
            Type::Int16Array => "Int16Array",
            Type::Int32Array => "Int32Array",
            Type::Int64Array => "Int64Array",
            Type::Float64Array => "Float64Array",
            Type::StringArray => "StringArray",
            Type::CharArray => "CharArray",
        }
    }
}

/// A value in the protocol's recursive data model. Every composite variant
/// owns its children directly; resetting a `Value` to a new variant
/// releases whatever payload it held before (spec §3's exclusive-ownership
/// invariant).
#[derive(Clone, PartialEq)]
pub enum Value {
    Null,
    Bit(bool),
    Byte(i8),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    String(Vec<u8>),
    Char(char),
    ByteArray(Vec<u8>),
    List(Vec<Value>),
    Dictionary(Vec<DictEntry>),
    Structure { code: u16, fields: Vec<Value> },
    StructureArray { code: u16, rows: Vec<Vec<Value>> },
    Message { code: u16, fields: Vec<Value> },
    BitArray(Vec<bool>),
    Int8Array(Vec<i8>),
    Int16Array(Vec<i16>),
    Int32Array(Vec<i32>),
    Int64Array(Vec<i64>),
    Float64Array(Vec<f64>),
    StringArray(Vec<Vec<u8>>),
    CharArray(Vec<char>),
}

impl Default for Value {
    fn default() -> Value {
        Value::Null
    }
}

/// Renders `Structure`/`Message` codes by their protocol v1 name where one
/// is known (e.g. `Structure(N) { .. }` rather than `Structure { code: 78,
/// .. }`), falling back to the raw code for codes no adapter recognizes.
/// All other variants use the derived-style per-field layout.
impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bit(x) => f.debug_tuple("Bit").field(x).finish(),
            Value::Byte(x) => f.debug_tuple("Byte").field(x).finish(),
            Value::Int8(x) => f.debug_tuple("Int8").field(x).finish(),
            Value::Int16(x) => f.debug_tuple("Int16").field(x).finish(),
            Value::Int32(x) => f.debug_tuple("Int32").field(x).finish(),
            Value::Int64(x) => f.debug_tuple("Int64").field(x).finish(),
            Value::Float64(x) => f.debug_tuple("Float64").field(x).finish(),
            Value::String(b) => f.debug_tuple("String").field(b).finish(),
            Value::Char(x) => f.debug_tuple("Char").field(x).finish(),
            Value::ByteArray(b) => f.debug_tuple("ByteArray").field(b).finish(),
            Value::List(v) => f.debug_tuple("List").field(v).finish(),
            Value::Dictionary(v) => f.debug_tuple("Dictionary").field(v).finish(),
            Value::Structure { code, fields } => f
                .debug_struct(&struct_label("Structure", crate::protocol::v1::structure_name(*code as u8), *code))
                .field("fields", fields)
                .finish(),
            Value::StructureArray { code, rows } => f
                .debug_struct(&struct_label("StructureArray", crate::protocol::v1::structure_name(*code as u8), *code))
                .field("rows", rows)
                .finish(),
            Value::Message { code, fields } => f
                .debug_struct(&struct_label("Message", crate::protocol::v1::message_name(*code as u8), *code))
                .field("fields", fields)
                .finish(),
            Value::BitArray(v) => f.debug_tuple("BitArray").field(v).finish(),
            Value::Int8Array(v) => f.debug_tuple("Int8Array").field(v).finish(),
            Value::Int16Array(v) => f.debug_tuple("Int16Array").field(v).finish(),
            Value::Int32Array(v) => f.debug_tuple("Int32Array").field(v).finish(),
            Value::Int64Array(v) => f.debug_tuple("Int64Array").field(v).finish(),
            Value::Float64Array(v) => f.debug_tuple("Float64Array").field(v).finish(),
            Value::StringArray(v) => f.debug_tuple("StringArray").field(v).finish(),
            Value::CharArray(v) => f.debug_tuple("CharArray").field(v).finish(),
        }
    }
}

fn struct_label(kind: &str, name: Option<&'static str>, code: u16) -> String {
    match name {
        Some(name) => format!("{kind}({name})"),
        None => format!("{kind}(0x{code:02X})"),
    }
}

macro_rules! wrong_variant {
    ($self:expr, $expected:expr) => {
        Err(Error::Programmer(ProgrammerError::WrongVariant {
            expected: $expected,
            found: $self.get_type().name(),
        }))
    };
}

impl Value {
    pub fn get_type(&self) -> Type {
        match self {
            Value::Null => Type::Null,
            Value::Bit(_) => Type::Bit,
            Value::Byte(_) => Type::Byte,
            Value::Int8(_) => Type::Int8,
            Value::Int16(_) => Type::Int16,
            Value::Int32(_) => Type::Int32,
            Value::Int64(_) => Type::Int64,
            Value::Float64(_) => Type::Float64,
            Value::String(_) => Type::String,
            Value::Char(_) => Type::Char,
            Value::ByteArray(_) => Type::ByteArray,
            Value::List(_) => Type::List,
            Value::Dictionary(_) => Type::Dictionary,
            Value::Structure { .. } => Type::Structure,
            Value::StructureArray { .. } => Type::StructureArray,
            Value::Message { .. } => Type::Message,
            Value::BitArray(_) => Type::BitArray,
            Value::Int8Array(_) => Type::Int8Array,
            Value::Int16Array(_) => Type::Int16Array,
            Value::Int32Array(_) => Type::Int32Array,
            Value::Int64Array(_) => Type::Int64Array,
            Value::Float64Array(_) => Type::Float64Array,
            Value::StringArray(_) => Type::StringArray,
            Value::CharArray(_) => Type::CharArray,
        }
    }

    /// The `size` observable from spec §3: element/field/entry count for
    /// composites, payload byte length for `String`, 0 for scalars.
    pub fn size(&self) -> usize {
        match self {
            Value::Null
            | Value::Bit(_)
            | Value::Byte(_)
            | Value::Int8(_)
            | Value::Int16(_)
            | Value::Int32(_)
            | Value::Int64(_)
            | Value::Float64(_)
            | Value::Char(_) => 0,
            Value::String(b) | Value::ByteArray(b) => b.len(),
            Value::List(v) => v.len(),
            Value::Dictionary(v) => v.len(),
            Value::Structure { fields, .. } => fields.len(),
            Value::StructureArray { rows, .. } => rows.len(),
            Value::Message { fields, .. } => fields.len(),
            Value::BitArray(v) => v.len(),
            Value::Int8Array(v) => v.len(),
            Value::Int16Array(v) => v.len(),
            Value::Int32Array(v) => v.len(),
            Value::Int64Array(v) => v.len(),
            Value::Float64Array(v) => v.len(),
            Value::StringArray(v) => v.len(),
            Value::CharArray(v) => v.len(),
        }
    }

    // ---- to_* constructors: reset this slot to a new variant in place ----

    pub fn to_null(&mut self) {
        *self = Value::Null;
    }

    pub fn to_bit(&mut self, x: bool) {
        *self = Value::Bit(x);
    }

    pub fn to_byte(&mut self, x: i8) {
        *self = Value::Byte(x);
    }

    pub fn to_int8(&mut self, x: i8) {
        *self = Value::Int8(x);
    }

    pub fn to_int16(&mut self, x: i16) {
        *self = Value::Int16(x);
    }

    pub fn to_int32(&mut self, x: i32) {
        *self = Value::Int32(x);
    }

    pub fn to_int64(&mut self, x: i64) {
        *self = Value::Int64(x);
    }

    pub fn to_float64(&mut self, x: f64) {
        *self = Value::Float64(x);
    }

    pub fn to_string(&mut self, bytes: impl Into<Vec<u8>>) {
        *self = Value::String(bytes.into());
    }

    pub fn to_char(&mut self, ch: char) {
        *self = Value::Char(ch);
    }

    pub fn to_byte_array(&mut self, bytes: impl Into<Vec<u8>>) {
        *self = Value::ByteArray(bytes.into());
    }

    /// Default-initializes `size` slots to `Null` so partial construction
    /// is observable, per spec §4.2.
    pub fn to_list(&mut self, size: usize) {
        *self = Value::List(vec![Value::Null; size]);
    }

    pub fn to_dictionary(&mut self, size: usize) {
        *self = Value::Dictionary(
            (0..size)
                .map(|_| DictEntry {
                    key: String::new(),
                    value: Value::Null,
                })
                .collect(),
        );
    }

    pub fn to_structure(&mut self, code: u16, size: usize) {
        *self = Value::Structure {
            code,
            fields: vec![Value::Null; size],
        };
    }

    pub fn to_structure_array(&mut self, code: u16, size: usize) {
        *self = Value::StructureArray {
            code,
            rows: vec![Vec::new(); size],
        };
    }

    pub fn to_message(&mut self, code: u16, size: usize) {
        *self = Value::Message {
            code,
            fields: vec![Value::Null; size],
        };
    }

    pub fn to_bit_array(&mut self, size: usize) {
        *self = Value::BitArray(vec![false; size]);
    }

    pub fn to_int8_array(&mut self, size: usize) {
        *self = Value::Int8Array(vec![0; size]);
    }

    pub fn to_int16_array(&mut self, size: usize) {
        *self = Value::Int16Array(vec![0; size]);
    }

    pub fn to_int32_array(&mut self, size: usize) {
        *self = Value::Int32Array(vec![0; size]);
    }

    pub fn to_int64_array(&mut self, size: usize) {
        *self = Value::Int64Array(vec![0; size]);
    }

    pub fn to_float64_array(&mut self, size: usize) {
        *self = Value::Float64Array(vec![0.0; size]);
    }

    /// Resizing an array zero-initializes new tail slots; for `String`,
    /// that means empty strings (spec §4.2).
    pub fn to_string_array(&mut self, size: usize) {
        *self = Value::StringArray(vec![Vec::new(); size]);
    }

    pub fn to_char_array(&mut self, size: usize) {
        *self = Value::CharArray(vec!['\0'; size]);
    }

    // ---- typed accessors (precondition: correct variant) ----

    pub fn as_bit(&self) -> Result<bool> {
        match self {
            Value::Bit(x) => Ok(*x),
            _ => wrong_variant!(self, "Bit"),
        }
    }

    pub fn as_int64(&self) -> Result<i64> {
        match self {
            Value::Byte(x) | Value::Int8(x) => Ok(*x as i64),
            Value::Int16(x) => Ok(*x as i64),
            Value::Int32(x) => Ok(*x as i64),
            Value::Int64(x) => Ok(*x),
            _ => wrong_variant!(self, "Int64"),
        }
    }

    pub fn as_float64(&self) -> Result<f64> {
        match self {
            Value::Float64(x) => Ok(*x),
            _ => wrong_variant!(self, "Float64"),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::String(b) => std::str::from_utf8(b).map_err(|_| {
                Error::Programmer(ProgrammerError::WrongVariant {
                    expected: "utf8 String",
                    found: "invalid utf8",
                })
            }),
            _ => wrong_variant!(self, "String"),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self {
            Value::String(b) | Value::ByteArray(b) => Ok(b),
            _ => wrong_variant!(self, "String|ByteArray"),
        }
    }

    pub fn as_list(&self) -> Result<&[Value]> {
        match self {
            Value::List(v) => Ok(v),
            _ => wrong_variant!(self, "List"),
        }
    }

    pub fn as_list_mut(&mut self) -> Result<&mut Vec<Value>> {
        match self {
            Value::List(v) => Ok(v),
            _ => wrong_variant!(self, "List"),
        }
    }

    pub fn structure_code(&self) -> Result<u16> {
        match self {
            Value::Structure { code, .. } | Value::StructureArray { code, .. } => Ok(*code),
            _ => wrong_variant!(self, "Structure|StructureArray"),
        }
    }

    pub fn message_code(&self) -> Result<u16> {
        match self {
            Value::Message { code, .. } => Ok(*code),
            _ => wrong_variant!(self, "Message"),
        }
    }

    pub fn structure_value(&self, index: usize) -> Result<&Value> {
        match self {
            Value::Structure { fields, .. } => fields.get(index).ok_or_else(|| {
                Error::Programmer(ProgrammerError::IndexOutOfBounds {
                    index,
                    len: fields.len(),
                })
            }),
            _ => wrong_variant!(self, "Structure"),
        }
    }

    pub fn message_value(&self, index: usize) -> Result<&Value> {
        match self {
            Value::Message { fields, .. } => fields.get(index).ok_or_else(|| {
                Error::Programmer(ProgrammerError::IndexOutOfBounds {
                    index,
                    len: fields.len(),
                })
            }),
            _ => wrong_variant!(self, "Message"),
        }
    }

    pub fn message_value_mut(&mut self, index: usize) -> Result<&mut Value> {
        match self {
            Value::Message { fields, .. } => {
                let len = fields.len();
                fields
                    .get_mut(index)
                    .ok_or(Error::Programmer(ProgrammerError::IndexOutOfBounds { index, len }))
            }
            _ => wrong_variant!(self, "Message"),
        }
    }

    // ---- Dictionary: position addressing, spec §4.2 ----

    pub fn set_key(&mut self, index: usize, name: &str) -> Result<()> {
        match self {
            Value::Dictionary(entries) => {
                let len = entries.len();
                if index >= len {
                    return Err(Error::Programmer(ProgrammerError::IndexOutOfBounds { index, len }));
                }
                if entries_have_key(entries_excluding(&*entries, index), name) {
                    return Err(Error::Programmer(ProgrammerError::DuplicateKey(name.to_string())));
                }
                entries[index].key = name.to_string();
                Ok(())
            }
            _ => wrong_variant!(self, "Dictionary"),
        }
    }

    pub fn get_key(&self, index: usize) -> Result<&str> {
        match self {
            Value::Dictionary(entries) => {
                let len = entries.len();
                entries
                    .get(index)
                    .map(|e| e.key.as_str())
                    .ok_or(Error::Programmer(ProgrammerError::IndexOutOfBounds { index, len }))
            }
            _ => wrong_variant!(self, "Dictionary"),
        }
    }

    pub fn dict_value(&self, index: usize) -> Result<&Value> {
        match self {
            Value::Dictionary(entries) => {
                let len = entries.len();
                entries
                    .get(index)
                    .map(|e| &e.value)
                    .ok_or(Error::Programmer(ProgrammerError::IndexOutOfBounds { index, len }))
            }
            _ => wrong_variant!(self, "Dictionary"),
        }
    }

    pub fn dict_value_mut(&mut self, index: usize) -> Result<&mut Value> {
        match self {
            Value::Dictionary(entries) => {
                let len = entries.len();
                entries
                    .get_mut(index)
                    .map(|e| &mut e.value)
                    .ok_or(Error::Programmer(ProgrammerError::IndexOutOfBounds { index, len }))
            }
            _ => wrong_variant!(self, "Dictionary"),
        }
    }

    /// Resizes a Dictionary in place. New tail entries default to an empty
    /// key and `Null` value (spec §4.2's array-resize zero-initialization,
    /// applied here to the connection's parameters dictionary).
    pub fn dictionary_resize(&mut self, size: usize) -> Result<()> {
        match self {
            Value::Dictionary(entries) => {
                if size < entries.len() {
                    entries.truncate(size);
                } else {
                    entries.resize_with(size, || DictEntry {
                        key: String::new(),
                        value: Value::Null,
                    });
                }
                Ok(())
            }
            _ => wrong_variant!(self, "Dictionary"),
        }
    }

    pub fn dict_entries(&self) -> Result<&[DictEntry]> {
        match self {
            Value::Dictionary(entries) => Ok(entries),
            _ => wrong_variant!(self, "Dictionary"),
        }
    }

    /// Looks up a dictionary value by key (byte equality, spec §3).
    pub fn dict_get(&self, key: &str) -> Result<Option<&Value>> {
        match self {
            Value::Dictionary(entries) => Ok(entries.iter().find(|e| e.key == key).map(|e| &e.value)),
            _ => wrong_variant!(self, "Dictionary"),
        }
    }

    /// Convenience constructor: builds a `Dictionary` directly from
    /// `(key, value)` pairs in insertion order. Errors if keys repeat.
    pub fn dictionary_from(pairs: Vec<(String, Value)>) -> Result<Value> {
        let mut seen = std::collections::HashSet::with_capacity(pairs.len());
        for (key, _) in &pairs {
            if !seen.insert(key.clone()) {
                return Err(Error::Programmer(ProgrammerError::DuplicateKey(key.clone())));
            }
        }
        Ok(Value::Dictionary(
            pairs
                .into_iter()
                .map(|(key, value)| DictEntry { key, value })
                .collect(),
        ))
    }
}

fn entries_excluding(entries: &[DictEntry], skip: usize) -> impl Iterator<Item = &DictEntry> {
    entries.iter().enumerate().filter_map(move |(i, e)| if i == skip { None } else { Some(e) })
}

fn entries_have_key<'a>(mut entries: impl Iterator<Item = &'a DictEntry>, name: &str) -> bool {
    entries.any(|e| e.key == name)
}
