//! Decompressing reader filter for compressed data packets.
//!
//! The decompressed bytes form a nested packet stream; the driver
//! recurses into this filter exactly as into any other byte source.

use flate2::{Decompress, FlushDecompress};

use crate::errors::{Error, Result};
use crate::reader::{ReadFilter, Source};
use crate::types::CompressionAlgorithm;
use crate::unsupported_err;

const IN_BUF_SIZE: usize = 8 * 1024;

enum Inner {
    Deflate(Box<Decompress>),
    Bzip2(Box<bzip2::Decompress>),
}

pub struct DecompressFilter {
    inner: Inner,
    in_buf: Vec<u8>,
    in_pos: usize,
    in_len: usize,
    /// Remaining compressed input budget, `None` when bounded by EOF.
    budget: Option<usize>,
    in_eof: bool,
    done: bool,
    consumed: usize,
}

impl DecompressFilter {
    pub fn new(alg: CompressionAlgorithm, budget: Option<usize>) -> Result<Self> {
        let inner = match alg {
            CompressionAlgorithm::ZIP => Inner::Deflate(Box::new(Decompress::new(false))),
            CompressionAlgorithm::ZLIB => Inner::Deflate(Box::new(Decompress::new(true))),
            CompressionAlgorithm::BZip2 => Inner::Bzip2(Box::new(bzip2::Decompress::new(false))),
            CompressionAlgorithm::Uncompressed => {
                unsupported_err!("uncompressed data needs no decompression filter")
            }
        };

        Ok(DecompressFilter {
            inner,
            in_buf: vec![0u8; IN_BUF_SIZE],
            in_pos: 0,
            in_len: 0,
            budget,
            in_eof: false,
            done: false,
            consumed: 0,
        })
    }

    fn fill(&mut self, below: &mut dyn Source) -> Result<()> {
        if self.in_pos < self.in_len || self.in_eof {
            return Ok(());
        }
        let want = match self.budget {
            Some(b) => self.in_buf.len().min(b),
            None => self.in_buf.len(),
        };
        if want == 0 {
            self.in_eof = true;
            return Ok(());
        }
        let n = below.read(&mut self.in_buf[..want])?;
        if n == 0 {
            self.in_eof = true;
        }
        if let Some(ref mut b) = self.budget {
            *b -= n;
        }
        self.consumed += n;
        self.in_pos = 0;
        self.in_len = n;
        Ok(())
    }
}

impl ReadFilter for DecompressFilter {
    fn read(&mut self, below: &mut dyn Source, buf: &mut [u8]) -> Result<usize> {
        if self.done || buf.is_empty() {
            return Ok(0);
        }

        loop {
            self.fill(below)?;
            let input = &self.in_buf[self.in_pos..self.in_len];

            match self.inner {
                Inner::Deflate(ref mut d) => {
                    let before_in = d.total_in();
                    let before_out = d.total_out();
                    let flush = if self.in_eof {
                        FlushDecompress::Finish
                    } else {
                        FlushDecompress::None
                    };
                    let status = d
                        .decompress(input, buf, flush)
                        .map_err(|e| Error::Message {
                            message: format!("deflate error: {e}"),
                        })?;
                    self.in_pos += (d.total_in() - before_in) as usize;
                    let written = (d.total_out() - before_out) as usize;

                    if status == flate2::Status::StreamEnd {
                        self.done = true;
                        return Ok(written);
                    }
                    if written > 0 {
                        return Ok(written);
                    }
                    if self.in_eof {
                        return Err(Error::PacketIncomplete);
                    }
                }
                Inner::Bzip2(ref mut d) => {
                    let before_in = d.total_in();
                    let before_out = d.total_out();
                    let status = d.decompress(input, buf).map_err(|e| Error::Message {
                        message: format!("bzip2 error: {e}"),
                    })?;
                    self.in_pos += (d.total_in() - before_in) as usize;
                    let written = (d.total_out() - before_out) as usize;

                    if status == bzip2::Status::StreamEnd {
                        self.done = true;
                        return Ok(written);
                    }
                    if written > 0 {
                        return Ok(written);
                    }
                    if self.in_eof {
                        return Err(Error::PacketIncomplete);
                    }
                }
            }
        }
    }

    fn consumed_below(&self) -> usize {
        self.consumed
    }

    fn name(&self) -> &'static str {
        "decompress"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ReaderStack;
    use flate2::{Compress, Compression, FlushCompress};

    fn deflate(data: &[u8], zlib: bool) -> Vec<u8> {
        let mut c = Compress::new(Compression::default(), zlib);
        let mut out = vec![0u8; data.len() + 1024];
        let status = c
            .compress(data, &mut out, FlushCompress::Finish)
            .unwrap();
        assert_eq!(status, flate2::Status::StreamEnd);
        out.truncate(c.total_out() as usize);
        out
    }

    #[test]
    fn inflate_zlib_roundtrip() {
        let plain = b"hello hello hello compression".repeat(50);
        let compressed = deflate(&plain, true);

        let mut stack = ReaderStack::new(&compressed[..]);
        stack.push(Box::new(
            DecompressFilter::new(CompressionAlgorithm::ZLIB, Some(compressed.len())).unwrap(),
        ));

        let mut out = vec![0u8; plain.len()];
        assert_eq!(stack.read_all(&mut out).unwrap(), plain.len());
        assert_eq!(out, plain);

        let mut tail = [0u8; 16];
        assert_eq!(stack.read(&mut tail).unwrap(), 0);
    }

    #[test]
    fn inflate_raw_deflate_roundtrip() {
        let plain = b"raw deflate stream".repeat(20);
        let compressed = deflate(&plain, false);

        let mut stack = ReaderStack::new(&compressed[..]);
        stack.push(Box::new(
            DecompressFilter::new(CompressionAlgorithm::ZIP, None).unwrap(),
        ));

        let mut out = vec![0u8; plain.len()];
        assert_eq!(stack.read_all(&mut out).unwrap(), plain.len());
        assert_eq!(out, plain);
    }

    #[test]
    fn truncated_stream_fails() {
        let plain = b"some data to compress".repeat(10);
        let mut compressed = deflate(&plain, true);
        compressed.truncate(compressed.len() / 2);

        let mut stack = ReaderStack::new(&compressed[..]);
        stack.push(Box::new(
            DecompressFilter::new(CompressionAlgorithm::ZLIB, Some(compressed.len())).unwrap(),
        ));

        let mut out = vec![0u8; plain.len()];
        assert!(stack.read_all(&mut out).is_err());
    }
}
