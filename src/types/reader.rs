//! Bounds-checked cursor over an ASDU payload.

use crate::config::FloatByteOrder;
use crate::error::CodecError;

/// Little-endian reader that fails with [`CodecError::TruncatedBuffer`]
/// instead of panicking.
#[derive(Debug)]
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.buf.len() < n {
            return Err(CodecError::TruncatedBuffer {
                needed: n,
                remaining: self.buf.len(),
            });
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16, CodecError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn i16(&mut self) -> Result<i16, CodecError> {
        Ok(self.u16()? as i16)
    }

    pub(crate) fn u32(&mut self) -> Result<u32, CodecError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn i32(&mut self) -> Result<i32, CodecError> {
        Ok(self.u32()? as i32)
    }

    pub(crate) fn f32(&mut self, order: FloatByteOrder) -> Result<f32, CodecError> {
        let b = self.take(4)?;
        let raw = [b[0], b[1], b[2], b[3]];
        Ok(match order {
            FloatByteOrder::LittleEndian => f32::from_le_bytes(raw),
            FloatByteOrder::BigEndian => f32::from_be_bytes(raw),
        })
    }

    /// Unsigned little-endian integer of 1 to 4 bytes.
    pub(crate) fn uint(&mut self, width: u8) -> Result<u32, CodecError> {
        let b = self.take(usize::from(width))?;
        Ok(b.iter().rev().fold(0u32, |acc, &byte| (acc << 8) | u32::from(byte)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_sequence() {
        let data = [0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0x07, 0x11, 0x00];
        let mut r = Reader::new(&data);
        assert_eq!(r.u8().unwrap(), 0x01);
        assert_eq!(r.u16().unwrap(), 0x1234);
        assert_eq!(r.u32().unwrap(), 0x1234_5678);
        assert_eq!(r.uint(3).unwrap(), 0x0011_07);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_reader_truncated() {
        let mut r = Reader::new(&[0x01, 0x02]);
        assert_eq!(
            r.u32(),
            Err(CodecError::TruncatedBuffer {
                needed: 4,
                remaining: 2
            })
        );
    }

    #[test]
    fn test_reader_float_order() {
        let le = [0x33, 0x33, 0xA3, 0xC0];
        assert_eq!(Reader::new(&le).f32(FloatByteOrder::LittleEndian).unwrap(), -5.1);
        let be = [0xC0, 0xA3, 0x33, 0x33];
        assert_eq!(Reader::new(&be).f32(FloatByteOrder::BigEndian).unwrap(), -5.1);
    }
}
