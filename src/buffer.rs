//! A growable FIFO byte buffer with independent load/unload cursors
//! (spec §4.1), grounded on `original_source/seabolt/include/bolt/buffering.h`.

use byteorder::{BigEndian, ByteOrder};
use bytes::BytesMut;

use crate::error::{Error, ProtocolViolation};

/// A byte buffer with a load cursor (`extent`, the append point) and an
/// unload cursor (`cursor`, the consume point). `cursor <= extent <=
/// capacity()` at all times.
#[derive(Debug, Default)]
pub struct ByteBuffer {
    data: BytesMut,
    extent: usize,
    cursor: usize,
}

impl ByteBuffer {
    pub fn with_capacity(capacity: usize) -> ByteBuffer {
        ByteBuffer {
            data: BytesMut::zeroed(capacity),
            extent: 0,
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn extent(&self) -> usize {
        self.extent
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Bytes of spare room before the buffer must grow.
    pub fn loadable(&self) -> usize {
        self.capacity() - self.extent
    }

    /// Bytes available to read without growing or reloading.
    pub fn unloadable(&self) -> usize {
        self.extent - self.cursor
    }

    fn ensure_capacity(&mut self, additional: usize) {
        if self.loadable() < additional {
            let grow_to = (self.extent + additional).max(self.capacity() * 2).max(64);
            self.data.resize(grow_to, 0);
        }
    }

    /// Returns a mutable slice of length `size` positioned at the current
    /// load point, advancing `extent` by `size`. Growing the buffer if
    /// necessary.
    pub fn load_target(&mut self, size: usize) -> &mut [u8] {
        self.ensure_capacity(size);
        let start = self.extent;
        self.extent += size;
        &mut self.data[start..self.extent]
    }

    pub fn load(&mut self, bytes: &[u8]) {
        self.load_target(bytes.len()).copy_from_slice(bytes);
    }

    pub fn load_uint8(&mut self, x: u8) {
        self.load_target(1)[0] = x;
    }

    pub fn load_int8(&mut self, x: i8) {
        self.load_uint8(x as u8);
    }

    pub fn load_uint16_be(&mut self, x: u16) {
        BigEndian::write_u16(self.load_target(2), x);
    }

    pub fn load_int16_be(&mut self, x: i16) {
        BigEndian::write_i16(self.load_target(2), x);
    }

    pub fn load_int32_be(&mut self, x: i32) {
        BigEndian::write_i32(self.load_target(4), x);
    }

    pub fn load_int64_be(&mut self, x: i64) {
        BigEndian::write_i64(self.load_target(8), x);
    }

    pub fn load_double_be(&mut self, x: f64) {
        BigEndian::write_f64(self.load_target(8), x);
    }

    /// Number of UTF-8 bytes needed to encode `ch`.
    pub fn sizeof_utf8_char(ch: char) -> usize {
        ch.len_utf8()
    }

    pub fn load_utf8_char(&mut self, ch: char) {
        let len = ch.len_utf8();
        ch.encode_utf8(self.load_target(len));
    }

    /// Returns a slice of length `size` at the current unload point,
    /// advancing `cursor` by `size`.
    pub fn unload_target(&mut self, size: usize) -> Result<&[u8], Error> {
        if size > self.unloadable() {
            return Err(insufficient_data(size, self.unloadable()));
        }
        let start = self.cursor;
        self.cursor += size;
        Ok(&self.data[start..self.cursor])
    }

    pub fn unload(&mut self, out: &mut [u8]) -> Result<(), Error> {
        let slice = self.unload_target(out.len())?;
        out.copy_from_slice(slice);
        Ok(())
    }

    pub fn peek_uint8(&self) -> Result<u8, Error> {
        self.peek_at(0)
    }

    /// Reads the byte `offset` bytes past the cursor without advancing it.
    pub fn peek_at(&self, offset: usize) -> Result<u8, Error> {
        if offset >= self.unloadable() {
            return Err(insufficient_data(offset + 1, self.unloadable()));
        }
        Ok(self.data[self.cursor + offset])
    }

    pub fn unload_uint8(&mut self) -> Result<u8, Error> {
        Ok(self.unload_target(1)?[0])
    }

    pub fn unload_int8(&mut self) -> Result<i8, Error> {
        Ok(self.unload_uint8()? as i8)
    }

    pub fn unload_uint16_be(&mut self) -> Result<u16, Error> {
        Ok(BigEndian::read_u16(self.unload_target(2)?))
    }

    pub fn unload_int16_be(&mut self) -> Result<i16, Error> {
        Ok(BigEndian::read_i16(self.unload_target(2)?))
    }

    pub fn unload_int32_be(&mut self) -> Result<i32, Error> {
        Ok(BigEndian::read_i32(self.unload_target(4)?))
    }

    pub fn unload_int64_be(&mut self) -> Result<i64, Error> {
        Ok(BigEndian::read_i64(self.unload_target(8)?))
    }

    pub fn unload_double_be(&mut self) -> Result<f64, Error> {
        Ok(BigEndian::read_f64(self.unload_target(8)?))
    }

    /// Shifts the unconsumed tail (`[cursor, extent)`) to offset 0,
    /// resetting `cursor` to 0 and `extent` to the tail's length. The
    /// byte sequence `unloadable()` would yield is unchanged by this call.
    pub fn compact(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let tail_len = self.unloadable();
        self.data.copy_within(self.cursor..self.extent, 0);
        self.cursor = 0;
        self.extent = tail_len;
    }

    /// True once every loaded byte has been unloaded.
    pub fn is_drained(&self) -> bool {
        self.cursor == self.extent
    }

    /// Resets both cursors to 0, discarding any loaded-but-unconsumed
    /// content. Used between successive `load_run`/`load_pull` packs, which
    /// each own a fresh top-level Value rather than appending to the last.
    pub fn clear(&mut self) {
        self.extent = 0;
        self.cursor = 0;
    }

    /// Reserves `additional` writable bytes past `extent` without advancing
    /// it, growing the buffer if needed. Pair with [`commit`](Self::commit)
    /// once the actual number of bytes written (which, for a `recv()` into
    /// this slice, may be less than `additional`) is known.
    pub fn reserve(&mut self, additional: usize) -> &mut [u8] {
        self.ensure_capacity(additional);
        &mut self.data[self.extent..self.extent + additional]
    }

    /// Advances `extent` by `n` bytes previously written into the slice
    /// returned by [`reserve`](Self::reserve).
    pub fn commit(&mut self, n: usize) {
        self.extent += n;
    }
}

fn insufficient_data(requested: usize, available: usize) -> Error {
    // Surfaced as a protocol violation: callers of this buffer only ever
    // ask for exactly the bytes a framed message promised.
    Error::Protocol(ProtocolViolation::TruncatedInput {
        expected: requested - available,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_unload_round_trip() {
        let mut buf = ByteBuffer::with_capacity(16);
        buf.load_uint8(0x42);
        buf.load_int16_be(-1);
        buf.load_int32_be(100_000);
        buf.load_double_be(3.5);

        assert_eq!(buf.unload_uint8().unwrap(), 0x42);
        assert_eq!(buf.unload_int16_be().unwrap(), -1);
        assert_eq!(buf.unload_int32_be().unwrap(), 100_000);
        assert_eq!(buf.unload_double_be().unwrap(), 3.5);
        assert!(buf.is_drained());
    }

    #[test]
    fn unloadable_shrinks_as_bytes_are_consumed() {
        let mut buf = ByteBuffer::with_capacity(8);
        buf.load(&[1, 2, 3, 4]);
        assert_eq!(buf.unloadable(), 4);
        buf.unload_uint8().unwrap();
        assert_eq!(buf.unloadable(), 3);
    }

    #[test]
    fn insufficient_data_errors() {
        let mut buf = ByteBuffer::with_capacity(8);
        buf.load_uint8(1);
        let err = buf.unload_int32_be().unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolViolation::TruncatedInput { .. })
        ));
    }

    #[test]
    fn compact_preserves_unloaded_content() {
        let mut buf = ByteBuffer::with_capacity(8);
        buf.load(&[1, 2, 3, 4, 5]);
        buf.unload_uint8().unwrap();
        buf.unload_uint8().unwrap();
        let before = buf.unloadable();
        let mut snapshot = vec![0u8; before];
        {
            let start = buf.cursor();
            let end = buf.extent();
            snapshot.copy_from_slice(&buf.data[start..end]);
        }
        buf.compact();
        assert_eq!(buf.unloadable(), before);
        assert_eq!(buf.cursor(), 0);
        assert_eq!(&buf.data[0..buf.extent()], &snapshot[..]);
    }

    #[test]
    fn utf8_char_length_and_encode() {
        let mut buf = ByteBuffer::with_capacity(8);
        let ch = '\u{1D400}'; // MATHEMATICAL BOLD CAPITAL A, 4-byte UTF-8
        assert_eq!(ByteBuffer::sizeof_utf8_char(ch), 4);
        buf.load_utf8_char(ch);
        assert_eq!(buf.unloadable(), 4);
        let bytes = buf.unload_target(4).unwrap();
        assert_eq!(bytes, &[0xF0, 0x9D, 0x90, 0x80]);
    }

    #[test]
    fn reserve_commit_allows_partial_fill() {
        let mut buf = ByteBuffer::with_capacity(4);
        {
            let slot = buf.reserve(10);
            slot[..3].copy_from_slice(&[9, 8, 7]);
        }
        buf.commit(3);
        assert_eq!(buf.unloadable(), 3);
        assert_eq!(buf.unload_target(3).unwrap(), &[9, 8, 7]);
    }

    #[test]
    fn clear_resets_both_cursors() {
        let mut buf = ByteBuffer::with_capacity(8);
        buf.load(&[1, 2, 3]);
        buf.unload_uint8().unwrap();
        buf.clear();
        assert_eq!(buf.extent(), 0);
        assert_eq!(buf.cursor(), 0);
        assert_eq!(buf.unloadable(), 0);
    }

    #[test]
    fn growth_preserves_already_loaded_bytes() {
        let mut buf = ByteBuffer::with_capacity(2);
        for i in 0..20u8 {
            buf.load_uint8(i);
        }
        for i in 0..20u8 {
            assert_eq!(buf.unload_uint8().unwrap(), i);
        }
    }
}
