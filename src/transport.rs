//! The transport adapter (spec §4.5): a narrow `send`/`recv` abstraction
//! over either a cleartext socket or a TLS session. Never interprets
//! bytes.
//!
//! Grounded on the teacher's `TargetStream: Read + Write + fmt::Debug`
//! trait-object pattern (`conn.rs`) and
//! `original_source/seabolt/src/connect.c` (`_open_b`/`_secure_b`): one
//! socket, optionally wrapped in a TLS session, both satisfying the same
//! blocking send/recv contract.

use std::io::{self, Read, Write};
use std::net::TcpStream;

use crate::error::{Error, TransportError};

pub type Result<T> = std::result::Result<T, Error>;

/// A bidirectional byte stream the connection state machine drives. `send`
/// transmits all bytes or fails; `recv` fills `buf[..n]` with between 1 and
/// `buf.len()` bytes, or returns `Ok(0)` on orderly close.
pub trait Transport: std::fmt::Debug {
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Reads at least 1 and at most `buf.len()` bytes into `buf`, returning
    /// the count, or `Ok(0)` to signal orderly close.
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Plain TCP transport: no interpretation, direct pass-through to the
/// socket (spec §4.5, §6).
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    pub fn connect(addr: impl std::net::ToSocketAddrs) -> Result<TcpTransport> {
        let stream = TcpStream::connect(addr).map_err(map_io_err)?;
        stream.set_nodelay(true).map_err(map_io_err)?;
        Ok(TcpTransport { stream })
    }

    pub fn from_stream(stream: TcpStream) -> TcpTransport {
        TcpTransport { stream }
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).map_err(map_io_err)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.stream.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => self.recv(buf),
            Err(e) => Err(map_io_err(e)),
        }
    }
}

fn map_io_err(e: io::Error) -> Error {
    Error::Transport(TransportError::from_io(e))
}

#[cfg(feature = "native-tls")]
pub mod native_tls_transport {
    use super::*;
    use crate::error::TlsError;
    use native_tls::{TlsConnector, TlsStream};

    /// TLS 1.2+ transport wrapping a [`TcpStream`] with `native-tls`
    /// (spec §4.5, §6). Swapped in from the teacher's async
    /// `async-native-tls` dependency since spec §5 mandates a synchronous
    /// core (see DESIGN.md).
    #[derive(Debug)]
    pub struct TlsTransport {
        stream: TlsStream<TcpStream>,
    }

    impl TlsTransport {
        pub fn connect(domain: &str, tcp: TcpStream) -> Result<TlsTransport> {
            let connector = TlsConnector::new()
                .map_err(|e| Error::Tls(TlsError::ContextCreation(e.to_string())))?;
            let stream = connector
                .connect(domain, tcp)
                .map_err(|e| Error::Tls(TlsError::Handshake(e.to_string())))?;
            Ok(TlsTransport { stream })
        }
    }

    impl Transport for TlsTransport {
        fn send(&mut self, bytes: &[u8]) -> Result<()> {
            self.stream
                .write_all(bytes)
                .map_err(|e| Error::Tls(TlsError::Write(e)))
        }

        fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
            match self.stream.read(buf) {
                Ok(n) => Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => self.recv(buf),
                Err(e) => Err(Error::Tls(TlsError::Read(e))),
            }
        }
    }
}

#[cfg(feature = "native-tls")]
pub use native_tls_transport::TlsTransport;
