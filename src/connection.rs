//! The connection state machine (spec §4.6, §6): owns the four buffers,
//! the codec, the prepared `run`/`pull`/`discard` requests, and drives
//! handshake, INIT, request queuing, transmission, and response
//! consumption.
//!
//! Grounded on the teacher's `Connection`/`InternalConnection` split in
//! `conn.rs` for the overall shape (one owning type driving a byte
//! stream through explicit phases), and on
//! `original_source/seabolt/src/bolt/connections.c`'s `_transmit_b`/
//! `_receive_b`/`_set_status` for the buffer pipeline and status-logging
//! behavior this crate's `tracing` calls stand in for.

use crate::buffer::ByteBuffer;
use crate::chunking::{self, MAX_CHUNK_SIZE};
use crate::codec::PackedCodec;
use crate::config::ConnectionConfig;
use crate::error::{Error, ProgrammerError, ProtocolViolation};
use crate::protocol::v1;
use crate::transport::Transport;
use crate::value::Value;

pub type Result<T> = std::result::Result<T, Error>;

/// Connection lifecycle, replacing the source's integer status/error pair
/// with a single sum type (spec §9 design note). `Defunct` is terminal
/// except for the explicit transition to `Disconnected` on [`Connection::close`].
#[derive(Debug)]
pub enum Status {
    Disconnected,
    Connected,
    Ready,
    Failed { metadata: Value },
    Defunct { cause: String },
}

impl Status {
    pub fn is_defunct(&self) -> bool {
        matches!(self, Status::Defunct { .. })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Status::Ready)
    }
}

/// What [`Connection::fetch`] (and [`Connection::receive_value`]) found on
/// the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetched {
    Record,
    Summary,
}

/// A single-owner, synchronous connection to a protocol v1 server (spec
/// §4.6, §5: no internal threading, one caller at a time).
pub struct Connection {
    transport: Box<dyn Transport>,
    codec: PackedCodec,

    // tx raw / tx chunked (spec §3's "two pairs of byte buffers")
    tx_packed: ByteBuffer,
    tx_chunked: ByteBuffer,
    // rx raw / rx chunked
    rx_raw: ByteBuffer,

    run: Value,
    pull: Value,
    discard: Value,
    received: Value,

    requests_queued: u64,
    requests_running: u64,
    next_request_id: u64,

    protocol_version: u32,
    status: Status,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("protocol_version", &self.protocol_version)
            .field("status", &self.status)
            .field("requests_queued", &self.requests_queued)
            .field("requests_running", &self.requests_running)
            .finish()
    }
}

fn prepared_run() -> Value {
    let mut run = Value::Null;
    run.to_message(v1::message::RUN as u16, 2);
    *run.message_value_mut(0).unwrap() = Value::String(Vec::new());
    *run.message_value_mut(1).unwrap() = Value::Dictionary(Vec::new());
    run
}

fn prepared_standing(code: u8) -> Value {
    let mut v = Value::Null;
    v.to_message(code as u16, 0);
    v
}

impl Connection {
    /// Drives the handshake over an already-open `transport` (spec §1: DNS
    /// resolution, socket creation, and TLS handshake are out of scope —
    /// `transport` arrives already connected). `address` is carried only
    /// for diagnostics.
    pub fn open(transport: Box<dyn Transport>, address: impl Into<String>) -> Result<Connection> {
        let address = address.into();
        let mut conn = Connection {
            transport,
            codec: PackedCodec::new(0),
            tx_packed: ByteBuffer::with_capacity(512),
            tx_chunked: ByteBuffer::with_capacity(512),
            rx_raw: ByteBuffer::with_capacity(512),
            run: prepared_run(),
            pull: prepared_standing(v1::message::PULL_ALL),
            discard: prepared_standing(v1::message::DISCARD_ALL),
            received: Value::Null,
            requests_queued: 0,
            requests_running: 0,
            next_request_id: 0,
            protocol_version: 0,
            status: Status::Disconnected,
        };
        conn.set_status(Status::Connected);
        tracing::info!(address = %address, "transport opened");
        conn.handshake()?;
        Ok(conn)
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn protocol_version(&self) -> u32 {
        self.protocol_version
    }

    pub fn received(&self) -> &Value {
        &self.received
    }

    pub fn last_request_id(&self) -> u64 {
        self.next_request_id
    }

    fn set_status(&mut self, new: Status) {
        if self.status.is_defunct() && !matches!(new, Status::Disconnected) {
            // Monotonicity (spec §8 property 5): Defunct never transitions
            // back, except the explicit shutdown path.
            return;
        }
        match &new {
            Status::Defunct { cause } => tracing::error!(cause = %cause, "connection defunct"),
            other => tracing::info!(?other, "connection status transition"),
        }
        self.status = new;
    }

    /// Routes a transport/protocol error through the Defunct transition and
    /// returns it, so every fallible I/O path can be written
    /// `self.transport.send(..).map_err(...)?` in one line at the call site.
    fn defunct<T>(&mut self, err: Error) -> Result<T> {
        let cause = err.to_string();
        self.set_status(Status::Defunct { cause });
        Err(err)
    }

    fn send_all(&mut self, bytes: &[u8]) -> Result<()> {
        match self.transport.send(bytes) {
            Ok(()) => Ok(()),
            Err(e) => self.defunct(e),
        }
    }

    fn recv_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            match self.transport.recv(&mut buf[filled..]) {
                Ok(0) => {
                    return self.defunct(Error::Protocol(ProtocolViolation::TruncatedInput {
                        expected: n - filled,
                    }))
                }
                Ok(k) => filled += k,
                Err(e) => return self.defunct(e),
            }
        }
        Ok(buf)
    }

    fn handshake(&mut self) -> Result<()> {
        let mut out = Vec::with_capacity(4 + 4 * 4);
        out.extend_from_slice(&v1::HANDSHAKE_MAGIC);
        for version in [v1::VERSION, 0, 0, 0] {
            out.extend_from_slice(&version.to_be_bytes());
        }
        self.send_all(&out)?;

        let reply = self.recv_exact(4)?;
        let selected = u32::from_be_bytes([reply[0], reply[1], reply[2], reply[3]]);
        if selected == 0 || selected != v1::VERSION {
            tracing::error!(reply = %pretty_hex::pretty_hex(&reply), "handshake rejected");
            return self.defunct(Error::Protocol(ProtocolViolation::VersionNegotiationFailed(selected)));
        }
        self.protocol_version = selected;
        self.codec = PackedCodec::new(selected);
        tracing::info!(version = selected, "handshake complete");
        Ok(())
    }

    /// Packs-and-frames `init_msg` or a standing message directly into the
    /// chunked outbound buffer and increments `requests_queued`, mirroring
    /// `load_run`/`load_pull`/`load_discard` (spec §4.6).
    fn queue_message(&mut self, msg: &Value) -> Result<u64> {
        self.tx_packed.clear();
        if let Err(e) = self.codec.encode(msg, &mut self.tx_packed) {
            return self.defunct(e);
        }
        let n = self.tx_packed.unloadable();
        let bytes = self.tx_packed.unload_target(n)?.to_vec();
        chunking::chunk_into(&bytes, MAX_CHUNK_SIZE, &mut self.tx_chunked);
        self.requests_queued += 1;
        self.next_request_id += 1;
        Ok(self.next_request_id)
    }

    pub fn set_statement(&mut self, text: &str) -> Result<()> {
        *self.run.message_value_mut(0)? = Value::String(text.as_bytes().to_vec());
        Ok(())
    }

    pub fn resize_parameters(&mut self, n: usize) -> Result<()> {
        self.run.message_value_mut(1)?.dictionary_resize(n)
    }

    /// A handle to the value slot of parameter `i`; pair with
    /// [`Connection::set_parameter_key`] to also name it.
    pub fn parameter(&mut self, i: usize) -> Result<&mut Value> {
        self.run.message_value_mut(1)?.dict_value_mut(i)
    }

    pub fn set_parameter_key(&mut self, i: usize, name: &str) -> Result<()> {
        self.run.message_value_mut(1)?.set_key(i, name)
    }

    pub fn load_run(&mut self) -> Result<u64> {
        let msg = self.run.clone();
        self.queue_message(&msg)
    }

    /// `n` must be `-1` (the standing `PULL_ALL`); positive `n` (a
    /// partial-fetch count) has no v1 wire encoding (spec §4.6, §9 Open
    /// Question 1 — resolved as a hard `Unsupported`, see DESIGN.md).
    pub fn load_pull(&mut self, n: i64) -> Result<u64> {
        if n != -1 {
            return Err(Error::Programmer(ProgrammerError::Unsupported {
                version: self.protocol_version,
                detail: "positive n to PULL_ALL",
            }));
        }
        let msg = self.pull.clone();
        self.queue_message(&msg)
    }

    pub fn load_discard(&mut self, n: i64) -> Result<u64> {
        if n != -1 {
            return Err(Error::Programmer(ProgrammerError::Unsupported {
                version: self.protocol_version,
                detail: "positive n to DISCARD_ALL",
            }));
        }
        let msg = self.discard.clone();
        self.queue_message(&msg)
    }

    /// Moves the entire unloadable range of the chunked outbound buffer
    /// through the transport, compacts it, and shifts
    /// `requests_queued → requests_running` (spec §4.6).
    pub fn transmit(&mut self) -> Result<()> {
        let n = self.tx_chunked.unloadable();
        if n == 0 {
            return Ok(());
        }
        let bytes = self.tx_chunked.unload_target(n)?.to_vec();
        self.send_all(&bytes)?;
        self.tx_chunked.compact();
        self.requests_running += self.requests_queued;
        self.requests_queued = 0;
        Ok(())
    }

    fn fill_rx_from_transport(&mut self) -> Result<()> {
        let slot = self.rx_raw.reserve(4096);
        match self.transport.recv(slot) {
            Ok(0) => self.defunct(Error::Protocol(ProtocolViolation::TruncatedInput { expected: 1 })),
            Ok(n) => {
                self.rx_raw.commit(n);
                Ok(())
            }
            Err(e) => self.defunct(e),
        }
    }

    /// Reassembles the next framed message (reading from the transport as
    /// needed) and unpacks it, recording its wire code. The message is
    /// left in `received`.
    fn next_message(&mut self) -> Result<u8> {
        loop {
            match chunking::dechunk_from(&mut self.rx_raw) {
                Ok(Some(bytes)) => {
                    self.rx_raw.compact();
                    let mut scratch = ByteBuffer::with_capacity(bytes.len().max(16));
                    scratch.load(&bytes);
                    let value = match self.codec.decode(&mut scratch) {
                        Ok(v) => v,
                        Err(e) => return self.defunct(e),
                    };
                    return match &value {
                        Value::Structure { code, .. } => {
                            let code = *code as u8;
                            self.received = value;
                            Ok(code)
                        }
                        _ => self.defunct(Error::Protocol(ProtocolViolation::UnexpectedSummary)),
                    };
                }
                Ok(None) => self.fill_rx_from_transport()?,
                Err(e) => return self.defunct(e),
            }
        }
    }

    /// Reassembles the next framed message into `received`. Returns
    /// `Ok(true)` for a record (caller should keep reading), `Ok(false)`
    /// once a summary has been consumed (spec §4.6).
    pub fn receive_value(&mut self) -> Result<bool> {
        let code = self.next_message()?;
        if v1::is_record(code) {
            return Ok(true);
        }
        match code {
            v1::message::SUCCESS => {
                self.requests_running = self.requests_running.saturating_sub(1);
                Ok(false)
            }
            v1::message::IGNORED => {
                self.requests_running = self.requests_running.saturating_sub(1);
                Ok(false)
            }
            v1::message::FAILURE => {
                self.requests_running = self.requests_running.saturating_sub(1);
                let metadata = self.received.structure_value(0).ok().cloned().unwrap_or(Value::Null);
                self.set_status(Status::Failed { metadata });
                Ok(false)
            }
            other => self.defunct(Error::Protocol(ProtocolViolation::UnexpectedMessageCode(other))),
        }
    }

    /// Repeats [`Connection::receive_value`] until a summary arrives.
    pub fn receive_summary(&mut self) -> Result<()> {
        while self.receive_value()? {}
        Ok(())
    }

    /// Drains every outstanding (transmitted but not yet summarized)
    /// request.
    pub fn receive(&mut self) -> Result<()> {
        while self.requests_running > 0 {
            self.receive_summary()?;
        }
        Ok(())
    }

    /// Reads one unit of response for `request_id`: a record, or the
    /// request's terminal summary. FIFO ordering (spec §5) means the core
    /// does not need `request_id` to locate the right response — it is
    /// validated as a sanity check against requests actually issued.
    pub fn fetch(&mut self, request_id: u64) -> Result<Fetched> {
        if request_id == 0 || request_id > self.next_request_id {
            return Err(Error::Programmer(ProgrammerError::IndexOutOfBounds {
                index: request_id as usize,
                len: self.next_request_id as usize,
            }));
        }
        if self.receive_value()? {
            Ok(Fetched::Record)
        } else {
            Ok(Fetched::Summary)
        }
    }

    /// Sends `INIT` with `config`'s fields and consumes the response.
    /// `SUCCESS` → `Ready`; `FAILURE` → `Defunct` (spec §4.6 — note this
    /// differs from [`Connection::receive_value`]'s `FAILURE` → `Failed`,
    /// since a connection that never completed INIT has nothing to
    /// acknowledge its way back from).
    pub fn init(&mut self, config: &ConnectionConfig) -> Result<()> {
        let auth = Value::dictionary_from(vec![
            ("scheme".to_string(), Value::String(config.scheme.as_str().as_bytes().to_vec())),
            ("principal".to_string(), Value::String(config.principal.as_bytes().to_vec())),
            ("credentials".to_string(), Value::String(config.credentials.as_bytes().to_vec())),
        ])?;
        let mut init_msg = Value::Null;
        init_msg.to_message(v1::message::INIT as u16, 2);
        *init_msg.message_value_mut(0)? = Value::String(config.user_agent.as_bytes().to_vec());
        *init_msg.message_value_mut(1)? = auth;

        self.queue_message(&init_msg)?;
        self.transmit()?;

        let code = self.next_message()?;
        match code {
            v1::message::SUCCESS => {
                self.requests_running = self.requests_running.saturating_sub(1);
                self.set_status(Status::Ready);
                Ok(())
            }
            v1::message::FAILURE => {
                self.requests_running = self.requests_running.saturating_sub(1);
                let metadata = self.received.structure_value(0).ok().cloned().unwrap_or(Value::Null);
                self.set_status(Status::Defunct {
                    cause: "INIT rejected by server".to_string(),
                });
                Err(Error::server("INIT", metadata))
            }
            other => self.defunct(Error::Protocol(ProtocolViolation::UnexpectedMessageCode(other))),
        }
    }

    /// `RESET`/`ACK_FAILURE` round trip (spec §3/§7's "recoverable via
    /// ACK_FAILURE/RESET", wire codes from spec §6). On `SUCCESS`, returns
    /// the connection from `Failed` to `Ready`.
    fn ack_like(&mut self, code: u8) -> Result<()> {
        let msg = prepared_standing(code);
        self.queue_message(&msg)?;
        self.transmit()?;

        let resp = self.next_message()?;
        match resp {
            v1::message::SUCCESS => {
                self.requests_running = self.requests_running.saturating_sub(1);
                self.set_status(Status::Ready);
                Ok(())
            }
            v1::message::IGNORED => {
                self.requests_running = self.requests_running.saturating_sub(1);
                Ok(())
            }
            v1::message::FAILURE => {
                self.requests_running = self.requests_running.saturating_sub(1);
                let metadata = self.received.structure_value(0).ok().cloned().unwrap_or(Value::Null);
                self.set_status(Status::Failed { metadata });
                Ok(())
            }
            other => self.defunct(Error::Protocol(ProtocolViolation::UnexpectedMessageCode(other))),
        }
    }

    pub fn reset(&mut self) -> Result<()> {
        self.ack_like(v1::message::RESET)
    }

    pub fn ack_failure(&mut self) -> Result<()> {
        self.ack_like(v1::message::ACK_FAILURE)
    }

    /// Transitions to `Disconnected`. Owned buffers and Values are released
    /// when `Connection` drops (spec §3: "closing a Connection destroys all
    /// owned Values and buffers").
    pub fn close(&mut self) {
        self.requests_queued = 0;
        self.requests_running = 0;
        self.status = Status::Disconnected;
        tracing::info!("connection closed");
    }
}
