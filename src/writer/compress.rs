//! Compressing writer filter.
//!
//! Buffers the compressed stream and emits a complete compressed data
//! packet when finalized.

use flate2::{Compress, Compression, FlushCompress};

use crate::errors::{Error, Result};
use crate::packet::write_packet_header;
use crate::types::{CompressionAlgorithm, Tag};
use crate::writer::{Sink, WriteFilter};

enum Inner {
    Passthrough,
    Deflate(Box<Compress>),
    Bzip2(Box<bzip2::Compress>),
}

pub struct CompressFilter {
    algorithm: CompressionAlgorithm,
    inner: Inner,
    out: Vec<u8>,
}

impl CompressFilter {
    pub fn new(algorithm: CompressionAlgorithm) -> Self {
        let inner = match algorithm {
            CompressionAlgorithm::Uncompressed => Inner::Passthrough,
            CompressionAlgorithm::ZIP => {
                Inner::Deflate(Box::new(Compress::new(Compression::default(), false)))
            }
            CompressionAlgorithm::ZLIB => {
                Inner::Deflate(Box::new(Compress::new(Compression::default(), true)))
            }
            CompressionAlgorithm::BZip2 => Inner::Bzip2(Box::new(bzip2::Compress::new(
                bzip2::Compression::default(),
                30,
            ))),
        };
        CompressFilter {
            algorithm,
            inner,
            out: Vec::new(),
        }
    }

    fn push(&mut self, data: &[u8], finish: bool) -> Result<()> {
        match self.inner {
            Inner::Passthrough => {
                self.out.extend_from_slice(data);
            }
            Inner::Deflate(ref mut c) => {
                let flush = if finish {
                    FlushCompress::Finish
                } else {
                    FlushCompress::None
                };
                let mut pos = 0;
                let mut chunk = [0u8; 4096];
                loop {
                    let before_in = c.total_in();
                    let before_out = c.total_out();
                    let status = c
                        .compress(&data[pos..], &mut chunk, flush)
                        .map_err(|e| Error::Message {
                            message: format!("deflate error: {e}"),
                        })?;
                    pos += (c.total_in() - before_in) as usize;
                    let written = (c.total_out() - before_out) as usize;
                    self.out.extend_from_slice(&chunk[..written]);

                    if finish {
                        if status == flate2::Status::StreamEnd {
                            break;
                        }
                    } else if pos == data.len() && written == 0 {
                        break;
                    }
                }
            }
            Inner::Bzip2(ref mut c) => {
                let action = if finish {
                    bzip2::Action::Finish
                } else {
                    bzip2::Action::Run
                };
                let mut pos = 0;
                let mut chunk = [0u8; 4096];
                loop {
                    let before_in = c.total_in();
                    let before_out = c.total_out();
                    let status = c
                        .compress(&data[pos..], &mut chunk, action)
                        .map_err(|e| Error::Message {
                            message: format!("bzip2 error: {e}"),
                        })?;
                    pos += (c.total_in() - before_in) as usize;
                    let written = (c.total_out() - before_out) as usize;
                    self.out.extend_from_slice(&chunk[..written]);

                    if finish {
                        if status == bzip2::Status::StreamEnd {
                            break;
                        }
                    } else if pos == data.len() && written == 0 {
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

impl WriteFilter for CompressFilter {
    fn write(&mut self, _below: &mut dyn Sink, buf: &[u8]) -> Result<()> {
        self.push(buf, false)
    }

    fn finish(&mut self, below: &mut dyn Sink) -> Result<()> {
        self.push(&[], true)?;

        let mut framed = Vec::with_capacity(self.out.len() + 8);
        write_packet_header(&mut framed, Tag::CompressedData, 1 + self.out.len())?;
        framed.push(self.algorithm.into());
        framed.extend_from_slice(&self.out);
        below.write_all(&framed)
    }

    fn name(&self) -> &'static str {
        "compress"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{read_packet_header, PacketHeader};
    use crate::reader::{DecompressFilter, ReaderStack, Source};
    use crate::types::PacketLength;
    use crate::writer::WriterStack;

    fn compress(alg: CompressionAlgorithm, data: &[u8]) -> Vec<u8> {
        let mut stack = WriterStack::new(Vec::new());
        stack.push(Box::new(CompressFilter::new(alg)));
        stack.write_all(data).unwrap();
        stack.finish_all().unwrap()
    }

    #[test]
    fn zlib_packet_roundtrip() {
        let plain = b"compress me, twice over, compress me".repeat(40);
        let out = compress(CompressionAlgorithm::ZLIB, &plain);

        let mut stack = ReaderStack::new(&out[..]);
        let PacketHeader { tag, length, .. } =
            read_packet_header(&mut stack).unwrap().unwrap();
        assert_eq!(tag, Tag::CompressedData);
        let PacketLength::Fixed(body_len) = length else {
            panic!("expected fixed length");
        };

        let mut alg = [0u8; 1];
        stack.read_all(&mut alg).unwrap();
        assert_eq!(alg[0], u8::from(CompressionAlgorithm::ZLIB));

        stack.push(Box::new(
            DecompressFilter::new(CompressionAlgorithm::ZLIB, Some(body_len - 1)).unwrap(),
        ));
        let mut back = vec![0u8; plain.len()];
        assert_eq!(stack.read_all(&mut back).unwrap(), plain.len());
        assert_eq!(back, plain);
    }

    #[test]
    fn uncompressed_passthrough() {
        let out = compress(CompressionAlgorithm::Uncompressed, b"plain");
        // header + alg octet + body
        assert_eq!(out[0], 0b1100_0000 | 8);
        assert_eq!(out[1], 6);
        assert_eq!(out[2], 0);
        assert_eq!(&out[3..], b"plain");
    }
}
