//! Protocol core for a native client driver over a framed, versioned,
//! binary graph database wire protocol.
//!
//! This crate implements the wire-level plumbing only: the byte buffer,
//! the tagged value model, the packed codec, chunked framing, a transport
//! abstraction, and the connection state machine that correlates queued
//! requests with streamed records and summaries. It deliberately stops
//! short of query-language parsing, result-object mapping, connection
//! pooling/routing, and transport establishment (DNS, socket creation, TLS
//! handshake primitives) — those are external collaborators. See
//! [`connection::Connection`] for the entry point.

pub mod buffer;
pub mod chunking;
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod value;

pub use error::{Error, Result};
pub use value::Value;
