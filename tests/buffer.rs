//! Buffer behavior exercised the way the codec and connection actually use
//! it: interleaved loads/unloads across a growth boundary, and compaction
//! mid-stream.

use bolt_core::buffer::ByteBuffer;

#[test]
fn fifo_discipline_survives_growth_and_compaction() {
    let mut buf = ByteBuffer::with_capacity(4);

    buf.load_uint8(1);
    buf.load_int32_be(1_000_000);
    assert_eq!(buf.unload_uint8().unwrap(), 1);
    buf.compact();

    buf.load_int64_be(-7);
    assert_eq!(buf.unload_int32_be().unwrap(), 1_000_000);
    assert_eq!(buf.unload_int64_be().unwrap(), -7);
    assert!(buf.is_drained());
}

#[test]
fn reserve_and_commit_model_a_partial_socket_read() {
    let mut buf = ByteBuffer::with_capacity(8);
    let wire = [0xDE, 0xAD, 0xBE, 0xEF];
    buf.reserve(wire.len())[..].copy_from_slice(&wire);
    buf.commit(wire.len());

    assert_eq!(buf.unloadable(), 4);
    assert_eq!(buf.unload_target(4).unwrap(), &wire);
}
