use crate::error::{Error, Result};
use crate::fourcc::FourCC;
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Forward-seekable reader over a fixed-length byte slice.
///
/// Every read consumes exactly the number of bytes it returns and advances
/// the offset; a read that would pass the end fails with
/// [`Error::TruncatedInput`] and leaves the offset untouched.
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Seek to an absolute offset. Seeking past the end is an error; this
    /// cursor never grows its source.
    pub fn set_offset(&mut self, pos: usize) -> Result<()> {
        if pos > self.buf.len() {
            return Err(Error::InvalidOffset {
                offset: pos,
                len: self.buf.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::TruncatedInput {
                offset: self.pos,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(BigEndian::read_u64(self.take(8)?))
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    /// Read `n` raw bytes. Type codes and text payloads come through here;
    /// the bytes are not assumed to be UTF-8.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    pub fn read_fourcc(&mut self) -> Result<FourCC> {
        let b = self.take(4)?;
        Ok(FourCC([b[0], b[1], b[2], b[3]]))
    }

    /// Read a 16-byte GUID in its on-disk byte order.
    pub fn read_guid(&mut self) -> Result<[u8; 16]> {
        let b = self.take(16)?;
        let mut g = [0u8; 16];
        g.copy_from_slice(b);
        Ok(g)
    }
}
