//! Chunked framing (spec §4.4): wraps a packed byte run into
//! length-prefixed chunks terminated by a zero-length chunk, and the
//! reverse.

use crate::buffer::ByteBuffer;
use crate::error::{Error, ProtocolViolation};

pub type Result<T> = std::result::Result<T, Error>;

/// Largest payload a single chunk may carry (spec §4.4: 16-bit length).
pub const MAX_CHUNK_SIZE: usize = 0xFFFF;

/// Splits `message` into `len16_be || payload` chunks of up to
/// `max_chunk_size` bytes each, appended to `out`, followed by the `00 00`
/// end-of-message marker. `max_chunk_size` is clamped to
/// `[1, MAX_CHUNK_SIZE]`.
pub fn chunk_into(message: &[u8], max_chunk_size: usize, out: &mut ByteBuffer) {
    let max_chunk_size = max_chunk_size.clamp(1, MAX_CHUNK_SIZE);
    if message.is_empty() {
        out.load_uint16_be(0);
        return;
    }
    for piece in message.chunks(max_chunk_size) {
        out.load_uint16_be(piece.len() as u16);
        out.load(piece);
    }
    out.load_uint16_be(0);
}

/// Reassembles chunks from `input` into a single message. Returns `Ok(None)`
/// if `input` does not yet contain a complete message (caller should read
/// more bytes from the transport and retry); returns `Ok(Some(bytes))` once
/// the terminating zero-length chunk has been consumed.
pub fn dechunk_from(input: &mut ByteBuffer) -> Result<Option<Vec<u8>>> {
    let mut message = Vec::new();
    loop {
        if input.unloadable() < 2 {
            return Ok(None);
        }
        let len = input.peek_uint16_be()?;
        if input.unloadable() < 2 + len as usize {
            return Ok(None);
        }
        input.unload_uint16_be()?; // consume the length we just peeked
        if len == 0 {
            return Ok(Some(message));
        }
        message.extend_from_slice(input.unload_target(len as usize)?);
    }
}

impl ByteBuffer {
    /// Reads the next two bytes as a big-endian u16 without advancing the
    /// cursor. Used by the framer to check chunk completeness before
    /// committing to consume the header.
    pub fn peek_uint16_be(&self) -> Result<u16> {
        if self.unloadable() < 2 {
            return Err(Error::Protocol(ProtocolViolation::UnreadableChunkHeader));
        }
        let hi = self.peek_uint8()? as u16;
        // SAFETY-free peek at offset+1: reuse unload_target semantics via a
        // tiny local copy rather than mutating cursor state.
        let lo = self.peek_at(1)? as u16;
        Ok((hi << 8) | lo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dechunk_all(bytes: &[u8]) -> Vec<u8> {
        let mut buf = ByteBuffer::with_capacity(bytes.len().max(16));
        buf.load(bytes);
        dechunk_from(&mut buf).unwrap().expect("complete message")
    }

    #[test]
    fn single_chunk_round_trip() {
        let mut out = ByteBuffer::with_capacity(32);
        chunk_into(b"hello", 65535, &mut out);
        let mut raw = vec![0u8; out.unloadable()];
        out.unload(&mut raw).unwrap();
        assert_eq!(raw, [0x00, 0x05, b'h', b'e', b'l', b'l', b'o', 0x00, 0x00]);
        assert_eq!(dechunk_all(&raw), b"hello");
    }

    #[test]
    fn empty_message_is_single_terminator() {
        let mut out = ByteBuffer::with_capacity(8);
        chunk_into(b"", 65535, &mut out);
        let mut raw = vec![0u8; out.unloadable()];
        out.unload(&mut raw).unwrap();
        assert_eq!(raw, [0x00, 0x00]);
        assert_eq!(dechunk_all(&raw), b"");
    }

    #[test]
    fn splits_across_multiple_chunks() {
        let message = vec![0xABu8; 70_000];
        let mut out = ByteBuffer::with_capacity(message.len() + 16);
        chunk_into(&message, MAX_CHUNK_SIZE, &mut out);
        let mut raw = vec![0u8; out.unloadable()];
        out.unload(&mut raw).unwrap();
        // two payload chunks (65535 + 4465) plus their headers and the terminator
        assert_eq!(raw.len(), 2 + 65535 + 2 + 4465 + 2);
        assert_eq!(dechunk_all(&raw), message);
    }

    #[test]
    fn incomplete_input_yields_none() {
        let mut buf = ByteBuffer::with_capacity(8);
        buf.load(&[0x00, 0x05, b'h', b'i']); // header promises 5, only 2 present
        assert_eq!(dechunk_from(&mut buf).unwrap(), None);
    }

    #[test]
    fn framing_idempotent_for_varied_chunk_sizes() {
        for max_chunk_size in [1usize, 2, 3, 7, 255, 256, 65535] {
            let message: Vec<u8> = (0..500u32).map(|i| (i % 256) as u8).collect();
            let mut out = ByteBuffer::with_capacity(message.len() * 2 + 32);
            chunk_into(&message, max_chunk_size, &mut out);
            let mut raw = vec![0u8; out.unloadable()];
            out.unload(&mut raw).unwrap();
            assert_eq!(dechunk_all(&raw), message, "max_chunk_size={max_chunk_size}");
        }
    }
}
