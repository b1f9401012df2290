//! Modification Detection Code Packet
//!
//! Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.14>

use std::io;

use bytes::Buf;

use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::Tag;

/// The SHA1 digest trailing an integrity protected data packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModDetectionCode {
    pub hash: [u8; 20],
}

impl ModDetectionCode {
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        Ok(ModDetectionCode {
            hash: i.read_array::<20>()?,
        })
    }

    pub fn tag(&self) -> Tag {
        Tag::ModDetectionCode
    }
}

impl Serialize for ModDetectionCode {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.hash)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        20
    }
}
