//! The packed codec (spec §4.3): serializes the [`Value`] model into the
//! protocol's self-describing "PackStream" binary form and back.
//!
//! Grounded on the streaming tag-dispatch shape of
//! `colinmarc-pulseaudio-rs`'s `protocol/serde.rs` (`TagStructReader`), but
//! working directly against a [`ByteBuffer`] instead of a `BufRead`, since
//! this crate's buffers already provide the cursor discipline spec §4.1
//! requires.

use crate::buffer::ByteBuffer;
use crate::error::{Error, ProgrammerError, ProtocolViolation};
use crate::value::{DictEntry, Value};

pub type Result<T> = std::result::Result<T, Error>;

mod marker {
    pub const NULL: u8 = 0xC0;
    pub const FALSE: u8 = 0xC2;
    pub const TRUE: u8 = 0xC3;
    pub const FLOAT_64: u8 = 0xC1;

    pub const INT_8: u8 = 0xC8;
    pub const INT_16: u8 = 0xC9;
    pub const INT_32: u8 = 0xCA;
    pub const INT_64: u8 = 0xCB;

    pub const BYTES_8: u8 = 0xCC;
    pub const BYTES_16: u8 = 0xCD;
    pub const BYTES_32: u8 = 0xCE;

    pub const TINY_STRING: u8 = 0x80;
    pub const STRING_8: u8 = 0xD0;
    pub const STRING_16: u8 = 0xD1;
    pub const STRING_32: u8 = 0xD2;

    pub const TINY_LIST: u8 = 0x90;
    pub const LIST_8: u8 = 0xD4;
    pub const LIST_16: u8 = 0xD5;
    pub const LIST_32: u8 = 0xD6;

    pub const TINY_MAP: u8 = 0xA0;
    pub const MAP_8: u8 = 0xD8;
    pub const MAP_16: u8 = 0xD9;
    pub const MAP_32: u8 = 0xDA;

    pub const TINY_STRUCT: u8 = 0xB0;
    pub const STRUCT_8: u8 = 0xDC;
    pub const STRUCT_16: u8 = 0xDD;

    pub const TINY_INT_MAX: i64 = 127;
    pub const TINY_INT_MIN: i64 = -16;
}

/// The maximum total byte extent a single size field may claim, guarding
/// against a hostile or corrupt length field allocating unbounded memory
/// (spec §4.3 `Overflow`).
const MAX_SIZE_FIELD: usize = 64 * 1024 * 1024;

/// A version-parameterised packed encoder/decoder. Only protocol version 1
/// is implemented; the marker table is fixed PackStream (spec §4.3).
#[derive(Debug, Clone, Copy)]
pub struct PackedCodec {
    version: u32,
}

impl PackedCodec {
    pub fn new(version: u32) -> PackedCodec {
        PackedCodec { version }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn encode(&self, value: &Value, out: &mut ByteBuffer) -> Result<()> {
        encode_value(value, out)
    }

    pub fn decode(&self, input: &mut ByteBuffer) -> Result<Value> {
        decode_value(input)
    }
}

fn encode_value(value: &Value, out: &mut ByteBuffer) -> Result<()> {
    match value {
        Value::Null => {
            out.load_uint8(marker::NULL);
        }
        Value::Bit(b) => out.load_uint8(if *b { marker::TRUE } else { marker::FALSE }),
        Value::Byte(x) | Value::Int8(x) => encode_int(*x as i64, out)?,
        Value::Int16(x) => encode_int(*x as i64, out)?,
        Value::Int32(x) => encode_int(*x as i64, out)?,
        Value::Int64(x) => encode_int(*x, out)?,
        Value::Float64(x) => {
            out.load_uint8(marker::FLOAT_64);
            out.load_double_be(*x);
        }
        Value::String(bytes) => encode_string(bytes, out)?,
        Value::Char(ch) => {
            let mut buf = [0u8; 4];
            let s = ch.encode_utf8(&mut buf);
            encode_string(s.as_bytes(), out)?;
        }
        Value::ByteArray(bytes) => encode_byte_array(bytes, out)?,
        Value::List(items) => {
            encode_length(marker::TINY_LIST, marker::LIST_8, marker::LIST_16, marker::LIST_32, items.len(), out)?;
            for item in items {
                encode_value(item, out)?;
            }
        }
        Value::Dictionary(entries) => {
            encode_length(marker::TINY_MAP, marker::MAP_8, marker::MAP_16, marker::MAP_32, entries.len(), out)?;
            for DictEntry { key, value } in entries {
                encode_string(key.as_bytes(), out)?;
                encode_value(value, out)?;
            }
        }
        Value::Structure { code, fields } => encode_structure(*code, fields, out)?,
        Value::Message { code, fields } => encode_structure(*code, fields, out)?,
        Value::StructureArray { code, rows } => {
            // Not itself a wire form (spec §4.3 has no StructureArray
            // marker); encodes as the List of Structures it logically
            // represents, each row becoming one Structure's fields.
            encode_length(marker::TINY_LIST, marker::LIST_8, marker::LIST_16, marker::LIST_32, rows.len(), out)?;
            for row in rows {
                encode_structure(*code, row, out)?;
            }
        }
        Value::BitArray(items) => encode_scalar_array(items.iter().map(|b| Value::Bit(*b)), items.len(), out)?,
        Value::Int8Array(items) => encode_scalar_array(items.iter().map(|x| Value::Int8(*x)), items.len(), out)?,
        Value::Int16Array(items) => encode_scalar_array(items.iter().map(|x| Value::Int16(*x)), items.len(), out)?,
        Value::Int32Array(items) => encode_scalar_array(items.iter().map(|x| Value::Int32(*x)), items.len(), out)?,
        Value::Int64Array(items) => encode_scalar_array(items.iter().map(|x| Value::Int64(*x)), items.len(), out)?,
        Value::Float64Array(items) => {
            encode_scalar_array(items.iter().map(|x| Value::Float64(*x)), items.len(), out)?
        }
        Value::StringArray(items) => {
            encode_scalar_array(items.iter().map(|b| Value::String(b.clone())), items.len(), out)?
        }
        Value::CharArray(items) => encode_scalar_array(items.iter().map(|c| Value::Char(*c)), items.len(), out)?,
    }
    Ok(())
}

fn encode_scalar_array(items: impl Iterator<Item = Value>, len: usize, out: &mut ByteBuffer) -> Result<()> {
    encode_length(marker::TINY_LIST, marker::LIST_8, marker::LIST_16, marker::LIST_32, len, out)?;
    for item in items {
        encode_value(&item, out)?;
    }
    Ok(())
}

fn encode_int(x: i64, out: &mut ByteBuffer) -> Result<()> {
    if (marker::TINY_INT_MIN..=marker::TINY_INT_MAX).contains(&x) {
        out.load_int8(x as i8);
    } else if let Ok(x8) = i8::try_from(x) {
        out.load_uint8(marker::INT_8);
        out.load_int8(x8);
    } else if let Ok(x16) = i16::try_from(x) {
        out.load_uint8(marker::INT_16);
        out.load_int16_be(x16);
    } else if let Ok(x32) = i32::try_from(x) {
        out.load_uint8(marker::INT_32);
        out.load_int32_be(x32);
    } else {
        out.load_uint8(marker::INT_64);
        out.load_int64_be(x);
    }
    Ok(())
}

fn encode_string(bytes: &[u8], out: &mut ByteBuffer) -> Result<()> {
    encode_length(marker::TINY_STRING, marker::STRING_8, marker::STRING_16, marker::STRING_32, bytes.len(), out)?;
    out.load(bytes);
    Ok(())
}

fn encode_byte_array(bytes: &[u8], out: &mut ByteBuffer) -> Result<()> {
    let len = bytes.len();
    if let Ok(n) = u8::try_from(len) {
        out.load_uint8(marker::BYTES_8);
        out.load_uint8(n);
    } else if let Ok(n) = u16::try_from(len) {
        out.load_uint8(marker::BYTES_16);
        out.load_uint16_be(n);
    } else if u32::try_from(len).is_ok() {
        out.load_uint8(marker::BYTES_32);
        out.load_int32_be(len as i32);
    } else {
        return Err(Error::Programmer(ProgrammerError::SizeOverflow(len)));
    }
    out.load(bytes);
    Ok(())
}

/// Shared narrowest-length-marker logic for String/List/Dictionary.
fn encode_length(tiny: u8, m8: u8, m16: u8, m32: u8, len: usize, out: &mut ByteBuffer) -> Result<()> {
    if len <= 15 {
        out.load_uint8(tiny | len as u8);
    } else if let Ok(n) = u8::try_from(len) {
        out.load_uint8(m8);
        out.load_uint8(n);
    } else if let Ok(n) = u16::try_from(len) {
        out.load_uint8(m16);
        out.load_uint16_be(n);
    } else if u32::try_from(len).is_ok() {
        out.load_uint8(m32);
        out.load_int32_be(len as i32);
    } else {
        return Err(Error::Programmer(ProgrammerError::SizeOverflow(len)));
    }
    Ok(())
}

fn encode_structure(code: u16, fields: &[Value], out: &mut ByteBuffer) -> Result<()> {
    let len = fields.len();
    if len <= 15 {
        out.load_uint8(marker::TINY_STRUCT | len as u8);
    } else if let Ok(n) = u8::try_from(len) {
        out.load_uint8(marker::STRUCT_8);
        out.load_uint8(n);
    } else if let Ok(n) = u16::try_from(len) {
        out.load_uint8(marker::STRUCT_16);
        out.load_uint16_be(n);
    } else {
        return Err(Error::Programmer(ProgrammerError::SizeOverflow(len)));
    }
    // Protocol v1 structure/message type codes are one byte on the wire
    // (spec §4.3); the in-memory Value model keeps a wider u16 (spec §3).
    out.load_uint8(code as u8);
    for field in fields {
        encode_value(field, out)?;
    }
    Ok(())
}

fn decode_value(input: &mut ByteBuffer) -> Result<Value> {
    let marker = input.unload_uint8()?;
    decode_marker(marker, input)
}

fn decode_marker(marker: u8, input: &mut ByteBuffer) -> Result<Value> {
    match marker {
        0x00..=0x7F => Ok(Value::Int64(marker as i64)),
        0xF0..=0xFF => Ok(Value::Int64((marker as i8) as i64)),
        self::marker::NULL => Ok(Value::Null),
        self::marker::FALSE => Ok(Value::Bit(false)),
        self::marker::TRUE => Ok(Value::Bit(true)),
        self::marker::FLOAT_64 => Ok(Value::Float64(input.unload_double_be()?)),
        self::marker::INT_8 => Ok(Value::Int64(input.unload_int8()? as i64)),
        self::marker::INT_16 => Ok(Value::Int64(input.unload_int16_be()? as i64)),
        self::marker::INT_32 => Ok(Value::Int64(input.unload_int32_be()? as i64)),
        self::marker::INT_64 => Ok(Value::Int64(input.unload_int64_be()?)),
        self::marker::BYTES_8 => {
            let len = input.unload_uint8()? as usize;
            Ok(Value::ByteArray(decode_raw(input, len)?))
        }
        self::marker::BYTES_16 => {
            let len = input.unload_uint16_be()? as usize;
            Ok(Value::ByteArray(decode_raw(input, len)?))
        }
        self::marker::BYTES_32 => {
            let len = decode_u32_len(input)?;
            Ok(Value::ByteArray(decode_raw(input, len)?))
        }
        0x80..=0x8F => {
            let len = (marker & 0x0F) as usize;
            Ok(Value::String(decode_raw(input, len)?))
        }
        self::marker::STRING_8 => {
            let len = input.unload_uint8()? as usize;
            Ok(Value::String(decode_raw(input, len)?))
        }
        self::marker::STRING_16 => {
            let len = input.unload_uint16_be()? as usize;
            Ok(Value::String(decode_raw(input, len)?))
        }
        self::marker::STRING_32 => {
            let len = decode_u32_len(input)?;
            Ok(Value::String(decode_raw(input, len)?))
        }
        0x90..=0x9F => decode_list((marker & 0x0F) as usize, input),
        self::marker::LIST_8 => {
            let len = input.unload_uint8()? as usize;
            decode_list(len, input)
        }
        self::marker::LIST_16 => {
            let len = input.unload_uint16_be()? as usize;
            decode_list(len, input)
        }
        self::marker::LIST_32 => {
            let len = decode_u32_len(input)?;
            decode_list(len, input)
        }
        0xA0..=0xAF => decode_dictionary((marker & 0x0F) as usize, input),
        self::marker::MAP_8 => {
            let len = input.unload_uint8()? as usize;
            decode_dictionary(len, input)
        }
        self::marker::MAP_16 => {
            let len = input.unload_uint16_be()? as usize;
            decode_dictionary(len, input)
        }
        self::marker::MAP_32 => {
            let len = decode_u32_len(input)?;
            decode_dictionary(len, input)
        }
        0xB0..=0xBF => decode_structure((marker & 0x0F) as usize, input),
        self::marker::STRUCT_8 => {
            let len = input.unload_uint8()? as usize;
            decode_structure(len, input)
        }
        self::marker::STRUCT_16 => {
            let len = input.unload_uint16_be()? as usize;
            decode_structure(len, input)
        }
        other => Err(Error::Protocol(ProtocolViolation::UnknownMarker(other))),
    }
}

fn check_size(len: usize) -> Result<()> {
    if len > MAX_SIZE_FIELD {
        return Err(Error::Protocol(ProtocolViolation::Overflow {
            size: len,
            limit: MAX_SIZE_FIELD,
        }));
    }
    Ok(())
}

fn decode_u32_len(input: &mut ByteBuffer) -> Result<usize> {
    let len = input.unload_int32_be()? as u32 as usize;
    check_size(len)?;
    Ok(len)
}

fn decode_raw(input: &mut ByteBuffer, len: usize) -> Result<Vec<u8>> {
    check_size(len)?;
    Ok(input.unload_target(len)?.to_vec())
}

fn decode_list(len: usize, input: &mut ByteBuffer) -> Result<Value> {
    check_size(len)?;
    let mut items = Vec::with_capacity(len.min(4096));
    for _ in 0..len {
        items.push(decode_value(input)?);
    }
    Ok(Value::List(items))
}

fn decode_dictionary(len: usize, input: &mut ByteBuffer) -> Result<Value> {
    check_size(len)?;
    let mut entries = Vec::with_capacity(len.min(4096));
    for _ in 0..len {
        let key_value = decode_value(input)?;
        let key = match key_value {
            Value::String(bytes) => String::from_utf8(bytes)
                .map_err(|_| Error::Protocol(ProtocolViolation::UnknownMarker(0)))?,
            _ => {
                return Err(Error::Programmer(ProgrammerError::WrongVariant {
                    expected: "String",
                    found: key_value.get_type().name(),
                }))
            }
        };
        let value = decode_value(input)?;
        entries.push(DictEntry { key, value });
    }
    Ok(Value::Dictionary(entries))
}

fn decode_structure(len: usize, input: &mut ByteBuffer) -> Result<Value> {
    check_size(len)?;
    let code = input.unload_uint8()? as u16;
    let mut fields = Vec::with_capacity(len.min(4096));
    for _ in 0..len {
        fields.push(decode_value(input)?);
    }
    Ok(Value::Structure { code, fields })
}
