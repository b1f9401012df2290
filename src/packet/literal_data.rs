//! Literal Data Packet
//!
//! Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.9>

use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::{Buf, Bytes};
use chrono::{DateTime, TimeZone, Utc};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::Tag;

#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Copy, Clone, TryFromPrimitive, IntoPrimitive)]
pub enum DataMode {
    Binary = b'b',
    Text = b't',
    Utf8 = b'u',
    /// RFC 1991 "local" mode.
    Local = b'l',
    Mime = b'm',
}

/// The fixed leading fields of a literal data packet. The body itself
/// streams behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralDataHeader {
    pub mode: DataMode,
    pub file_name: Bytes,
    pub created: DateTime<Utc>,
}

impl LiteralDataHeader {
    pub fn new(mode: DataMode) -> Self {
        LiteralDataHeader {
            mode,
            file_name: Bytes::new(),
            created: Utc.timestamp_opt(0, 0).single().expect("valid timestamp"),
        }
    }

    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let mode = i.read_u8()?;
        let mode = DataMode::try_from(mode)
            .map_err(|_| crate::format_err!("invalid literal data mode {}", mode))?;
        let name_len = i.read_u8()?;
        let file_name = i.read_take(name_len.into())?;
        let created = i.read_be_u32()?;
        let created = Utc
            .timestamp_opt(i64::from(created), 0)
            .single()
            .ok_or_else(|| crate::format_err!("invalid literal data timestamp {}", created))?;

        Ok(LiteralDataHeader {
            mode,
            file_name,
            created,
        })
    }
}

impl Serialize for LiteralDataHeader {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.mode.into())?;
        writer.write_u8(self.file_name.len() as u8)?;
        writer.write_all(&self.file_name)?;
        writer.write_u32::<BigEndian>(self.created.timestamp() as u32)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        1 + 1 + self.file_name.len() + 4
    }
}

/// A fully buffered literal data packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralData {
    pub header: LiteralDataHeader,
    pub data: Bytes,
}

impl LiteralData {
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        LiteralData {
            header: LiteralDataHeader::new(DataMode::Binary),
            data: data.into(),
        }
    }

    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let header = LiteralDataHeader::from_buf(&mut i)?;
        let data = i.rest();
        Ok(LiteralData { header, data })
    }

    pub fn tag(&self) -> Tag {
        Tag::LiteralData
    }
}

impl Serialize for LiteralData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        self.header.to_writer(writer)?;
        writer.write_all(&self.data)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.header.write_len() + self.data.len()
    }
}
