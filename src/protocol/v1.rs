//! Protocol v1 adapter (spec §4.7, §6): handshake magic, message/structure
//! codes, and the human-readable name tables used for diagnostics.
//!
//! Grounded on spec.md §6's wire format table and
//! `original_source/seabolt/src/bolt/values/struct_values.c`'s
//! `BoltProtocolV1_structure_name`/`_message_name` tables.

/// The 4-byte magic prefixing every handshake (spec §4.6, §6).
pub const HANDSHAKE_MAGIC: [u8; 4] = [0x60, 0x60, 0xB0, 0x17];

/// This adapter's protocol version number, sent as one of the four
/// candidate versions during handshake.
pub const VERSION: u32 = 1;

pub mod message {
    pub const INIT: u8 = 0x01;
    pub const RUN: u8 = 0x10;
    pub const DISCARD_ALL: u8 = 0x2F;
    pub const PULL_ALL: u8 = 0x3F;
    pub const ACK_FAILURE: u8 = 0x0E;
    pub const RESET: u8 = 0x0F;
    pub const RECORD: u8 = 0x71;
    pub const SUCCESS: u8 = 0x70;
    pub const IGNORED: u8 = 0x7E;
    pub const FAILURE: u8 = 0x7F;
}

pub mod structure {
    /// Node.
    pub const NODE: u8 = 0x4E;
    /// Relationship.
    pub const RELATIONSHIP: u8 = 0x52;
    /// Path.
    pub const PATH: u8 = 0x50;
}

/// `true` if `code` denotes a non-terminal record frame (spec §4.6).
pub fn is_record(code: u8) -> bool {
    code == message::RECORD
}

/// `true` if `code` denotes one of the three terminal summary codes
/// (spec §6, GLOSSARY).
pub fn is_summary(code: u8) -> bool {
    matches!(code, message::SUCCESS | message::IGNORED | message::FAILURE)
}

/// Human-readable name for a message code, for diagnostics (`Debug` on
/// [`crate::value::Value::Message`]).
pub fn message_name(code: u8) -> Option<&'static str> {
    use message::*;
    Some(match code {
        INIT => "INIT",
        RUN => "RUN",
        DISCARD_ALL => "DISCARD_ALL",
        PULL_ALL => "PULL_ALL",
        ACK_FAILURE => "ACK_FAILURE",
        RESET => "RESET",
        RECORD => "RECORD",
        SUCCESS => "SUCCESS",
        IGNORED => "IGNORED",
        FAILURE => "FAILURE",
        _ => return None,
    })
}

/// Human-readable name for a structure type code, for diagnostics.
pub fn structure_name(code: u8) -> Option<&'static str> {
    use structure::*;
    Some(match code {
        NODE => "N",
        RELATIONSHIP => "R",
        PATH => "P",
        _ => return None,
    })
}
