//! User Attribute Packet
//!
//! Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.12>

use std::io;

use bytes::{Buf, Bytes};

use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::Tag;

/// One attribute subpacket. Type 1 is the JPEG image attribute;
/// everything else is opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAttributeSubpacket {
    pub typ: u8,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAttribute {
    pub subpackets: Vec<UserAttributeSubpacket>,
}

impl UserAttribute {
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let mut subpackets = Vec::new();
        while i.has_remaining() {
            // same length encoding as signature subpackets
            let olen = i.read_u8()?;
            let len = match olen {
                0..=191 => olen as usize,
                192..=254 => {
                    let second = i.read_u8()?;
                    ((olen as usize - 192) << 8) + 192 + second as usize
                }
                255 => i.read_be_u32()? as usize,
            };
            crate::ensure!(len > 0, "empty user attribute subpacket");
            let typ = i.read_u8()?;
            let data = i.read_take(len - 1)?;
            subpackets.push(UserAttributeSubpacket { typ, data });
        }

        Ok(UserAttribute { subpackets })
    }

    pub fn tag(&self) -> Tag {
        Tag::UserAttribute
    }
}

impl Serialize for UserAttribute {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        for sp in &self.subpackets {
            super::header::write_body_len(writer, sp.data.len() + 1)?;
            writer.write_all(&[sp.typ])?;
            writer.write_all(&sp.data)?;
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.subpackets
            .iter()
            .map(|sp| super::header::body_len_len(sp.data.len() + 1) + 1 + sp.data.len())
            .sum()
    }
}
