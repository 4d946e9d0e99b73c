//! End-to-end scenarios S1-S6, FIFO ordering, and status monotonicity,
//! driven over the in-memory duplex transport in `support/mod.rs` instead
//! of a real socket.

mod support;

use bolt_core::buffer::ByteBuffer;
use bolt_core::chunking::{self, MAX_CHUNK_SIZE};
use bolt_core::codec::PackedCodec;
use bolt_core::config::ConnectionConfig;
use bolt_core::connection::{Connection, Fetched, Status};
use bolt_core::protocol::v1;
use bolt_core::value::Value;

use support::MemoryTransport;

fn framed(version: u32, msg: &Value) -> Vec<u8> {
    let codec = PackedCodec::new(version);
    let mut packed = ByteBuffer::with_capacity(256);
    codec.encode(msg, &mut packed).unwrap();
    let n = packed.unloadable();
    let bytes = packed.unload_target(n).unwrap().to_vec();

    let mut chunked = ByteBuffer::with_capacity(bytes.len() + 16);
    chunking::chunk_into(&bytes, MAX_CHUNK_SIZE, &mut chunked);
    let n2 = chunked.unloadable();
    chunked.unload_target(n2).unwrap().to_vec()
}

fn record(fields: Vec<Value>) -> Value {
    Value::Structure { code: v1::message::RECORD as u16, fields }
}

fn success(metadata: Value) -> Value {
    Value::Structure { code: v1::message::SUCCESS as u16, fields: vec![metadata] }
}

fn failure(metadata: Value) -> Value {
    Value::Structure { code: v1::message::FAILURE as u16, fields: vec![metadata] }
}

fn empty_metadata() -> Value {
    Value::dictionary_from(vec![]).unwrap()
}

/// Stages `messages`, each framed independently, onto `server`.
fn stage(server: &MemoryTransport, messages: Vec<Value>) {
    for msg in messages {
        server.push_inbound(&framed(v1::VERSION, &msg));
    }
}

fn field0(v: &Value) -> &Value {
    match v {
        Value::Structure { fields, .. } => &fields[0],
        other => panic!("expected a record Structure, got {other:?}"),
    }
}

/// Opens a connection over a fresh `MemoryTransport`, completing the
/// handshake and INIT, and returns both the connection and the server-side
/// handle for staging further responses.
fn ready_connection() -> (Connection, MemoryTransport) {
    support::init_logging();
    let server = MemoryTransport::new();
    server.push_inbound(&v1::VERSION.to_be_bytes());
    stage(&server, vec![success(empty_metadata())]);

    let mut conn = Connection::open(Box::new(server.clone()), "memory:0").unwrap();
    conn.init(&ConnectionConfig::builder().user_agent("bolt-core-tests/0.1").build()).unwrap();
    assert!(conn.status().is_ready());
    (conn, server)
}

#[test]
fn scenario_s1_null_echo() {
    let (mut conn, server) = ready_connection();

    conn.set_statement("RETURN $x").unwrap();
    conn.resize_parameters(1).unwrap();
    conn.set_parameter_key(0, "x").unwrap();
    *conn.parameter(0).unwrap() = Value::Null;

    let run_id = conn.load_run().unwrap();
    conn.transmit().unwrap();
    stage(&server, vec![success(empty_metadata())]);
    assert_eq!(conn.fetch(run_id).unwrap(), Fetched::Summary);

    let pull_id = conn.load_pull(-1).unwrap();
    conn.transmit().unwrap();
    stage(&server, vec![record(vec![Value::Null]), success(empty_metadata())]);

    assert_eq!(conn.fetch(pull_id).unwrap(), Fetched::Record);
    assert_eq!(field0(conn.received()), &Value::Null);
    assert_eq!(conn.fetch(pull_id).unwrap(), Fetched::Summary);
}

#[test]
fn scenario_s2_unicode_string_echo() {
    let (mut conn, server) = ready_connection();

    let ch = '\u{1D400}';
    conn.set_statement("RETURN $x").unwrap();
    conn.resize_parameters(1).unwrap();
    conn.set_parameter_key(0, "x").unwrap();
    *conn.parameter(0).unwrap() = Value::Char(ch);

    let run_id = conn.load_run().unwrap();
    conn.transmit().unwrap();
    stage(&server, vec![success(empty_metadata())]);
    conn.fetch(run_id).unwrap();

    let pull_id = conn.load_pull(-1).unwrap();
    conn.transmit().unwrap();
    let expected = Value::String(vec![0xF0, 0x9D, 0x90, 0x80]);
    stage(&server, vec![record(vec![expected]), success(empty_metadata())]);

    assert_eq!(conn.fetch(pull_id).unwrap(), Fetched::Record);
    let value = field0(conn.received());
    assert_eq!(value.as_bytes().unwrap(), &[0xF0, 0x9D, 0x90, 0x80]);
    assert_eq!(value.size(), 4);
    assert_eq!(conn.fetch(pull_id).unwrap(), Fetched::Summary);
}

#[test]
fn scenario_s3_dictionary_round_trip() {
    let (mut conn, server) = ready_connection();

    conn.set_statement("RETURN $x").unwrap();
    let run_id = conn.load_run().unwrap();
    conn.transmit().unwrap();
    stage(&server, vec![success(empty_metadata())]);
    conn.fetch(run_id).unwrap();

    let pull_id = conn.load_pull(-1).unwrap();
    conn.transmit().unwrap();
    let dict = Value::dictionary_from(vec![
        ("name".to_string(), Value::String(b"Alice".to_vec())),
        ("age".to_string(), Value::Int64(33)),
    ])
    .unwrap();
    stage(&server, vec![record(vec![dict]), success(empty_metadata())]);

    conn.fetch(pull_id).unwrap();
    let value = field0(conn.received());
    assert_eq!(value.dict_entries().unwrap().len(), 2);
    assert_eq!(value.dict_get("name").unwrap().unwrap().as_bytes().unwrap(), b"Alice");
    assert_eq!(value.dict_get("age").unwrap().unwrap().as_int64().unwrap(), 33);
    conn.fetch(pull_id).unwrap();
}

#[test]
fn scenario_s4_node_structure() {
    let (mut conn, server) = ready_connection();

    conn.set_statement("CREATE (a:Person {name:'Alice'}) RETURN a").unwrap();
    let run_id = conn.load_run().unwrap();
    conn.transmit().unwrap();
    stage(&server, vec![success(empty_metadata())]);
    conn.fetch(run_id).unwrap();

    let pull_id = conn.load_pull(-1).unwrap();
    conn.transmit().unwrap();
    let node = Value::Structure {
        code: v1::structure::NODE as u16,
        fields: vec![
            Value::Int64(1),
            Value::List(vec![Value::String(b"Person".to_vec())]),
            Value::dictionary_from(vec![("name".to_string(), Value::String(b"Alice".to_vec()))]).unwrap(),
        ],
    };
    stage(&server, vec![record(vec![node]), success(empty_metadata())]);

    conn.fetch(pull_id).unwrap();
    let value = field0(conn.received());
    assert_eq!(value.structure_code().unwrap(), v1::structure::NODE as u16);
    assert_eq!(value.size(), 3);
    conn.fetch(pull_id).unwrap();
}

#[test]
fn scenario_s5_integer_widening_and_minimal_encoding() {
    let (mut conn, server) = ready_connection();

    conn.set_statement("RETURN $x").unwrap();
    let run_id = conn.load_run().unwrap();
    conn.transmit().unwrap();
    stage(&server, vec![success(empty_metadata())]);
    conn.fetch(run_id).unwrap();

    let pull_id = conn.load_pull(-1).unwrap();
    conn.transmit().unwrap();
    stage(&server, vec![record(vec![Value::Int64(123)]), success(empty_metadata())]);

    conn.fetch(pull_id).unwrap();
    assert_eq!(field0(conn.received()).as_int64().unwrap(), 123);
    conn.fetch(pull_id).unwrap();

    // Minimal encoding (spec §8 property 2): Int8(123) is in tiny-int
    // range, so it packs to a single byte equal to 0x7B.
    let codec = PackedCodec::new(1);
    let mut buf = ByteBuffer::with_capacity(8);
    codec.encode(&Value::Int8(123), &mut buf).unwrap();
    assert_eq!(buf.unloadable(), 1);
    assert_eq!(buf.unload_uint8().unwrap(), 0x7B);
}

#[test]
fn scenario_s6_chunk_split_across_multiple_chunks() {
    let (mut conn, server) = ready_connection();

    let statement: String = std::iter::repeat('a').take(70_000).collect();
    conn.set_statement(&statement).unwrap();
    let run_id = conn.load_run().unwrap();
    conn.transmit().unwrap();

    let outbound = server.outbound();
    // Two 0xFF,0xFF length-prefixed chunks plus a shorter tail plus the
    // terminator: more than one chunk boundary must appear in the bytes
    // the connection actually wrote to the transport.
    let chunk_headers = outbound.windows(2).filter(|w| w[0] == 0xFF && w[1] == 0xFF).count();
    assert!(chunk_headers >= 1, "expected at least one full 65535-byte chunk");

    stage(&server, vec![success(empty_metadata())]);
    assert_eq!(conn.fetch(run_id).unwrap(), Fetched::Summary);
}

#[test]
fn fifo_ordering_across_multiple_queued_requests() {
    let (mut conn, server) = ready_connection();

    conn.set_statement("RETURN 1").unwrap();
    let run_id = conn.load_run().unwrap();
    let pull_id = conn.load_pull(-1).unwrap();
    conn.transmit().unwrap();

    stage(
        &server,
        vec![success(empty_metadata()), record(vec![Value::Int64(1)]), success(empty_metadata())],
    );

    // Records for a request precede its own summary, and responses to
    // requests queued earlier are drained before later ones (spec §5, §8
    // property 4).
    assert_eq!(conn.fetch(run_id).unwrap(), Fetched::Summary);
    assert_eq!(conn.fetch(pull_id).unwrap(), Fetched::Record);
    assert_eq!(field0(conn.received()).as_int64().unwrap(), 1);
    assert_eq!(conn.fetch(pull_id).unwrap(), Fetched::Summary);
}

#[test]
fn init_failure_carries_server_metadata_into_defunct_error() {
    support::init_logging();
    let server = MemoryTransport::new();
    server.push_inbound(&v1::VERSION.to_be_bytes());
    let meta =
        Value::dictionary_from(vec![("code".to_string(), Value::String(b"Neo.ClientError.Security.Unauthorized".to_vec()))])
            .unwrap();
    stage(&server, vec![failure(meta.clone())]);

    let mut conn = Connection::open(Box::new(server), "memory:0").unwrap();
    let err = conn.init(&ConnectionConfig::builder().user_agent("t").build()).unwrap_err();
    assert!(conn.status().is_defunct());
    match err {
        bolt_core::Error::Server(failure) => assert_eq!(failure.metadata, meta),
        other => panic!("expected a server failure, got {other:?}"),
    }
}

#[test]
fn status_is_defunct_when_handshake_fails_to_negotiate() {
    let server = MemoryTransport::new();
    server.push_inbound(&0u32.to_be_bytes()); // server refuses to agree on a version
    let err = Connection::open(Box::new(server), "memory:0").unwrap_err();
    assert!(err.to_string().contains("version negotiation"));
}

#[test]
fn server_failure_transitions_to_failed_then_ready_after_reset() {
    let (mut conn, server) = ready_connection();

    conn.set_statement("RETURN invalid").unwrap();
    let run_id = conn.load_run().unwrap();
    conn.transmit().unwrap();

    let meta = Value::dictionary_from(vec![(
        "code".to_string(),
        Value::String(b"Neo.ClientError.Statement.SyntaxError".to_vec()),
    )])
    .unwrap();
    stage(&server, vec![failure(meta.clone())]);
    assert_eq!(conn.fetch(run_id).unwrap(), Fetched::Summary);
    match conn.status() {
        Status::Failed { metadata } => assert_eq!(metadata, &meta),
        other => panic!("expected Failed, got {other:?}"),
    }

    stage(&server, vec![success(empty_metadata())]);
    conn.reset().unwrap();
    assert!(conn.status().is_ready());
}

#[test]
fn status_never_leaves_defunct_once_entered() {
    let server = MemoryTransport::new();
    server.push_inbound(&v1::VERSION.to_be_bytes());
    // No INIT response staged, so reading for INIT's summary hits an
    // orderly close (empty inbound => Transport::recv returns 0), driving
    // the connection to Defunct via a transport-level TruncatedInput.
    let mut conn = Connection::open(Box::new(server.clone()), "memory:0").unwrap();
    let err = conn.init(&ConnectionConfig::builder().user_agent("t").build());
    assert!(err.is_err());
    assert!(conn.status().is_defunct());

    // Staging a belated SUCCESS and retrying must not resurrect the
    // connection (spec §8 property 5).
    stage(&server, vec![success(empty_metadata())]);
    let _ = conn.init(&ConnectionConfig::builder().user_agent("t").build());
    assert!(conn.status().is_defunct());
}
