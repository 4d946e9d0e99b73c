//! Error taxonomy for the protocol core (spec §7).
//!
//! Transport and protocol errors drive a [`crate::connection::Connection`]
//! to `Defunct`; server failures drive it to `Failed`. Programmer errors are
//! preconditions and never mutate connection status.

use std::io;

use crate::value::Value;

/// Top-level error type returned by every fallible operation in this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("TLS error: {0}")]
    Tls(#[from] TlsError),

    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    #[error("programmer error: {0}")]
    Programmer(#[from] ProgrammerError),

    #[error("server failure: {code}")]
    Server(ServerFailure),
}

impl Error {
    pub fn server(code: impl Into<String>, metadata: Value) -> Error {
        Error::Server(ServerFailure {
            code: code.into(),
            metadata,
        })
    }
}

/// A failure reported by the server via a `FAILURE` summary message.
///
/// Recoverable by `ACK_FAILURE` or `RESET` (spec §3, §7).
#[derive(Debug, Clone)]
pub struct ServerFailure {
    pub code: String,
    pub metadata: Value,
}

impl std::fmt::Display for ServerFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code)
    }
}

/// Errors surfaced by the transport adapter (spec §4.5, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransportErrorKind {
    #[error("permission denied")]
    PermissionDenied,
    #[error("address family or protocol unsupported")]
    AddressUnsupported,
    #[error("out of file descriptors")]
    OutOfFiles,
    #[error("out of memory")]
    OutOfMemory,
    #[error("connection refused")]
    ConnectionRefused,
    #[error("network unreachable")]
    NetworkUnreachable,
    #[error("operation timed out")]
    TimedOut,
    #[error("interrupted")]
    Interrupted,
    #[error("unknown transport error")]
    Unknown,
}

#[derive(Debug, thiserror::Error)]
#[error("{kind}: {source}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    #[source]
    pub source: io::Error,
}

impl TransportError {
    /// Maps a platform I/O error into the transport error taxonomy.
    ///
    /// Mirrors `seabolt`'s `connect.c` `_open_b` errno switch, expressed
    /// over `std::io::ErrorKind` so one mapping is exhaustive across
    /// platforms (see DESIGN.md, Open Question 2).
    pub fn from_io(source: io::Error) -> TransportError {
        use io::ErrorKind::*;
        let kind = match source.kind() {
            PermissionDenied => TransportErrorKind::PermissionDenied,
            ConnectionRefused => TransportErrorKind::ConnectionRefused,
            TimedOut => TransportErrorKind::TimedOut,
            Interrupted => TransportErrorKind::Interrupted,
            OutOfMemory => TransportErrorKind::OutOfMemory,
            AddrNotAvailable | Unsupported => TransportErrorKind::AddressUnsupported,
            _ => match source.raw_os_error() {
                Some(errno) if is_out_of_files(errno) => TransportErrorKind::OutOfFiles,
                Some(errno) if is_network_unreachable(errno) => TransportErrorKind::NetworkUnreachable,
                _ => TransportErrorKind::Unknown,
            },
        };
        TransportError { kind, source }
    }
}

#[cfg(unix)]
fn is_out_of_files(errno: i32) -> bool {
    errno == libc_like::EMFILE || errno == libc_like::ENFILE
}

#[cfg(not(unix))]
fn is_out_of_files(_errno: i32) -> bool {
    false
}

#[cfg(unix)]
fn is_network_unreachable(errno: i32) -> bool {
    errno == libc_like::ENETUNREACH
}

#[cfg(not(unix))]
fn is_network_unreachable(_errno: i32) -> bool {
    false
}

/// A handful of POSIX errno constants we care about, kept local so this
/// crate does not need a `libc` dependency solely for two constants.
#[cfg(unix)]
mod libc_like {
    pub const EMFILE: i32 = 24;
    pub const ENFILE: i32 = 23;
    pub const ENETUNREACH: i32 = 101;
}

/// Errors from establishing or operating a TLS session (spec §7).
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("failed to create TLS context: {0}")]
    ContextCreation(String),
    #[error("certificate verification failed: {0}")]
    Verification(String),
    #[error("TLS handshake failed: {0}")]
    Handshake(String),
    #[error("TLS read error: {0}")]
    Read(#[source] io::Error),
    #[error("TLS write error: {0}")]
    Write(#[source] io::Error),
}

/// Violations of the wire protocol (spec §7).
#[derive(Debug, thiserror::Error)]
pub enum ProtocolViolation {
    #[error("unknown marker byte 0x{0:02X}")]
    UnknownMarker(u8),
    #[error("truncated input: expected {expected} more byte(s)")]
    TruncatedInput { expected: usize },
    #[error("summary message received in an unexpected position")]
    UnexpectedSummary,
    #[error("chunk header could not be read")]
    UnreadableChunkHeader,
    #[error("version negotiation failed: server proposed {0:#010x}")]
    VersionNegotiationFailed(u32),
    #[error("size field {size} exceeds the allowed buffer extent of {limit}")]
    Overflow { size: usize, limit: usize },
    #[error("unexpected message code 0x{0:02X}")]
    UnexpectedMessageCode(u8),
}

/// Precondition violations: wrong-variant access, size overflow on encode,
/// or an operation unsupported by the negotiated protocol version
/// (spec §7, §9).
#[derive(Debug, thiserror::Error)]
pub enum ProgrammerError {
    #[error("wrong variant: expected {expected}, found {found}")]
    WrongVariant {
        expected: &'static str,
        found: &'static str,
    },
    #[error("size {0} overflows the encoding's length field")]
    SizeOverflow(usize),
    #[error("operation unsupported by protocol version {version}: {detail}")]
    Unsupported { version: u32, detail: &'static str },
    #[error("index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("duplicate dictionary key: {0}")]
    DuplicateKey(String),
}

pub type Result<T> = std::result::Result<T, Error>;
