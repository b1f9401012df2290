//! Transparent coalescing of partial body lengths.
//!
//! New format packets may arrive as a chain of length-prefixed chunks.
//! This filter owns the chunk bookkeeping and exposes the chunks as
//! one contiguous body, so content decoders never see the seams.

use byteorder::{BigEndian, ByteOrder};

use crate::errors::{Error, Result};
use crate::reader::{read_u8, ReadFilter, Source};

pub struct PartialBodyFilter {
    /// Bytes left in the current chunk.
    chunk_remaining: usize,
    /// Set once the final, fixed length chunk has been entered.
    last_chunk: bool,
    consumed: usize,
}

impl PartialBodyFilter {
    /// `first_chunk` is the length from the packet header that
    /// announced the partial body.
    pub fn new(first_chunk: usize) -> Self {
        PartialBodyFilter {
            chunk_remaining: first_chunk,
            last_chunk: false,
            consumed: 0,
        }
    }

    fn next_chunk(&mut self, below: &mut dyn Source) -> Result<()> {
        let Some(olen) = read_u8(below)? else {
            return Err(Error::PacketIncomplete);
        };
        self.consumed += 1;

        match olen {
            0..=191 => {
                self.chunk_remaining = olen as usize;
                self.last_chunk = true;
            }
            192..=223 => {
                let Some(second) = read_u8(below)? else {
                    return Err(Error::PacketIncomplete);
                };
                self.consumed += 1;
                self.chunk_remaining = ((olen as usize - 192) << 8) + 192 + second as usize;
                self.last_chunk = true;
            }
            224..=254 => {
                self.chunk_remaining = 1 << (olen as usize & 0x1F);
            }
            255 => {
                let mut len = [0u8; 4];
                let n = below.read_all(&mut len)?;
                if n != 4 {
                    return Err(Error::PacketIncomplete);
                }
                self.consumed += 4;
                self.chunk_remaining = BigEndian::read_u32(&len) as usize;
                self.last_chunk = true;
            }
        }

        Ok(())
    }
}

impl ReadFilter for PartialBodyFilter {
    fn read(&mut self, below: &mut dyn Source, buf: &mut [u8]) -> Result<usize> {
        if self.chunk_remaining == 0 {
            if self.last_chunk {
                return Ok(0);
            }
            self.next_chunk(below)?;
            if self.chunk_remaining == 0 {
                // a final zero length chunk is valid
                return Ok(0);
            }
        }

        let want = buf.len().min(self.chunk_remaining);
        let n = below.read(&mut buf[..want])?;
        if n == 0 {
            return Err(Error::PacketIncomplete);
        }
        self.chunk_remaining -= n;
        self.consumed += n;
        Ok(n)
    }

    fn consumed_below(&self) -> usize {
        self.consumed
    }

    fn name(&self) -> &'static str {
        "partial-body"
    }
}
