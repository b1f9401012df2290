//! Trust Packet
//!
//! Implementation defined keyring data; carried opaquely.
//!
//! Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.10>

use std::io;

use bytes::{Buf, Bytes};

use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::Tag;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trust {
    pub data: Bytes,
}

impl Trust {
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        Ok(Trust { data: i.rest() })
    }

    pub fn tag(&self) -> Tag {
        Tag::Trust
    }
}

impl Serialize for Trust {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.data)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.data.len()
    }
}
