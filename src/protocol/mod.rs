//! Version-specific protocol adapters. Only version 1 is implemented
//! (spec §4.7, §6).

pub mod v1;
