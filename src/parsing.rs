//! Parsing helpers for in-memory packet bodies, built on [`Buf`].

use bytes::{Buf, Bytes};

use crate::errors::{Error, Result};

pub trait BufParsing: Buf + Sized {
    fn read_u8(&mut self) -> Result<u8> {
        self.ensure_remaining(1)?;
        Ok(self.get_u8())
    }

    fn read_be_u16(&mut self) -> Result<u16> {
        self.ensure_remaining(2)?;
        Ok(self.get_u16())
    }

    fn read_be_u32(&mut self) -> Result<u32> {
        self.ensure_remaining(4)?;
        Ok(self.get_u32())
    }

    fn read_be_u64(&mut self) -> Result<u64> {
        self.ensure_remaining(8)?;
        Ok(self.get_u64())
    }

    fn read_array<const C: usize>(&mut self) -> Result<[u8; C]> {
        self.ensure_remaining(C)?;
        let mut arr = [0u8; C];
        self.copy_to_slice(&mut arr);
        Ok(arr)
    }

    fn read_take(&mut self, size: usize) -> Result<Bytes> {
        self.ensure_remaining(size)?;
        Ok(self.copy_to_bytes(size))
    }

    fn rest(&mut self) -> Bytes {
        let len = self.remaining();
        self.copy_to_bytes(len)
    }

    fn ensure_remaining(&self, size: usize) -> Result<()> {
        if self.remaining() < size {
            return Err(Error::ReadFailed {
                wanted: size,
                got: self.remaining(),
            });
        }

        Ok(())
    }
}

impl<B: Buf> BufParsing for B {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_scalars() {
        let mut buf = &[0x01, 0x02, 0x03, 0x04, 0x05][..];
        assert_eq!(buf.read_u8().unwrap(), 1);
        assert_eq!(buf.read_be_u16().unwrap(), 0x0203);
        assert!(buf.read_be_u32().is_err());
    }

    #[test]
    fn read_take_and_rest() {
        let mut buf = &b"hello world"[..];
        assert_eq!(buf.read_take(5).unwrap().as_ref(), b"hello");
        assert_eq!(buf.rest().as_ref(), b" world");
    }
}
