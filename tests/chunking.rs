//! Framing exercised against a codec-produced packed message, rather than
//! arbitrary byte strings (already covered in `src/chunking.rs`'s own unit
//! tests).

use bolt_core::buffer::ByteBuffer;
use bolt_core::chunking::{chunk_into, dechunk_from, MAX_CHUNK_SIZE};
use bolt_core::codec::PackedCodec;
use bolt_core::value::Value;

#[test]
fn a_packed_message_reassembles_identically_after_chunking() {
    let codec = PackedCodec::new(1);
    let message = Value::Structure {
        code: 0x10,
        fields: vec![
            Value::String(b"RETURN 1".to_vec()),
            Value::Dictionary(Vec::new()),
        ],
    };

    let mut packed = ByteBuffer::with_capacity(64);
    codec.encode(&message, &mut packed).unwrap();
    let n = packed.unloadable();
    let bytes = packed.unload_target(n).unwrap().to_vec();

    let mut chunked = ByteBuffer::with_capacity(bytes.len() + 8);
    chunk_into(&bytes, MAX_CHUNK_SIZE, &mut chunked);

    let reassembled = dechunk_from(&mut chunked).unwrap().expect("complete message");
    assert_eq!(reassembled, bytes);

    let mut scratch = ByteBuffer::with_capacity(reassembled.len());
    scratch.load(&reassembled);
    assert_eq!(codec.decode(&mut scratch).unwrap(), message);
}

#[test]
fn reader_can_arrive_byte_by_byte() {
    let mut input = ByteBuffer::with_capacity(4);
    chunk_into(b"graph", 65535, &mut input);
    let n = input.unloadable();
    let framed = input.unload_target(n).unwrap().to_vec();

    let mut incoming = ByteBuffer::with_capacity(1);
    let mut result = None;
    for byte in framed {
        incoming.load_uint8(byte);
        if let Some(bytes) = dechunk_from(&mut incoming).unwrap() {
            result = Some(bytes);
            break;
        }
    }
    assert_eq!(result.unwrap(), b"graph");
}
