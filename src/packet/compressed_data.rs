//! Compressed Data Packet
//!
//! During parsing the compressed stream is inflated through a reader
//! filter and never materialized as this type; this buffered form is
//! what the writer emits.
//!
//! Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.6>

use std::io;

use bytes::{Buf, Bytes};

use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{CompressionAlgorithm, Tag};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedData {
    pub algorithm: CompressionAlgorithm,
    pub compressed: Bytes,
}

impl CompressedData {
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let algorithm = i.read_u8()?;
        let algorithm = CompressionAlgorithm::try_from(algorithm)
            .map_err(|_| crate::format_err!("invalid compression algorithm {}", algorithm))?;

        Ok(CompressedData {
            algorithm,
            compressed: i.rest(),
        })
    }

    pub fn tag(&self) -> Tag {
        Tag::CompressedData
    }
}

impl Serialize for CompressedData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[self.algorithm.into()])?;
        writer.write_all(&self.compressed)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        1 + self.compressed.len()
    }
}
