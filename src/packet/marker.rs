//! Marker Packet
//!
//! Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.8>

use std::io;

use bytes::Buf;

use crate::errors::Result;
use crate::{bail, ensure_eq};
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::Tag;

const MARKER: &[u8; 3] = b"PGP";

/// Must be ignored when received; the body is the literal bytes "PGP".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Marker;

impl Marker {
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let body = i.read_array::<3>()?;
        ensure_eq!(&body, MARKER, "invalid marker packet body");
        Ok(Marker)
    }

    pub fn tag(&self) -> Tag {
        Tag::Marker
    }
}

impl Serialize for Marker {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(MARKER)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        MARKER.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_roundtrip() {
        let buf = Marker.to_bytes().unwrap();
        assert_eq!(&buf, b"PGP");
        Marker::from_buf(&mut &buf[..]).unwrap();
    }

    #[test]
    fn rejects_other_bodies() {
        assert!(Marker::from_buf(&mut &b"GPG"[..]).is_err());
    }
}
