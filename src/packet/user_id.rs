//! User ID Packet
//!
//! Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.11>

use std::fmt;
use std::io;

use bytes::{Buf, Bytes};

use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::Tag;

/// By convention UTF-8 text, but not guaranteed to be; kept as raw
/// bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct UserId {
    pub id: Bytes,
}

impl UserId {
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        Ok(UserId { id: i.rest() })
    }

    pub fn from_str(id: &str) -> Self {
        UserId {
            id: id.as_bytes().to_vec().into(),
        }
    }

    pub fn tag(&self) -> Tag {
        Tag::UserId
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({:?})", String::from_utf8_lossy(&self.id))
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.id))
    }
}

impl Serialize for UserId {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.id)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.id.len()
    }
}
