//! Packet framing: tag and length octets, old and new format.
//!
//! Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-4.2>

use std::io;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use crate::errors::{Error, Result};
use crate::reader::{read_u8, Source};
use crate::types::{PacketLength, Tag};
use crate::{bail, ensure};

/// A decoded packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub tag: Tag,
    pub length: PacketLength,
    /// Octets the header itself occupied on the wire.
    pub header_len: usize,
}

/// Reads one packet header from `source`. Returns `None` on a clean
/// EOF before the tag octet.
pub fn read_packet_header(source: &mut dyn Source) -> Result<Option<PacketHeader>> {
    let Some(first) = read_u8(source)? else {
        return Ok(None);
    };

    ensure!(first & 0x80 != 0, "packet tag bit 7 must be set");

    let mut header_len = 1;
    let mut next = |source: &mut dyn Source| -> Result<u8> {
        let Some(b) = read_u8(source)? else {
            return Err(Error::PacketIncomplete);
        };
        header_len += 1;
        Ok(b)
    };

    let (tag, length) = if first & 0x40 != 0 {
        // new format: tag in the low six bits, self-describing length
        let tag = first & 0x3F;
        let olen = next(source)?;
        let length = match olen {
            0..=191 => PacketLength::Fixed(olen as usize),
            192..=223 => {
                let second = next(source)?;
                PacketLength::Fixed(((olen as usize - 192) << 8) + 192 + second as usize)
            }
            224..=254 => PacketLength::Partial(1 << (olen as usize & 0x1F)),
            255 => {
                let mut len = [0u8; 4];
                for b in len.iter_mut() {
                    *b = next(source)?;
                }
                PacketLength::Fixed(BigEndian::read_u32(&len) as usize)
            }
        };
        (tag, length)
    } else {
        // old format: tag in bits 2..6, length type in the low two bits
        let tag = (first & 0x3C) >> 2;
        let length = match first & 0x03 {
            0 => PacketLength::Fixed(next(source)? as usize),
            1 => {
                let mut len = [0u8; 2];
                for b in len.iter_mut() {
                    *b = next(source)?;
                }
                PacketLength::Fixed(BigEndian::read_u16(&len) as usize)
            }
            2 => {
                let mut len = [0u8; 4];
                for b in len.iter_mut() {
                    *b = next(source)?;
                }
                PacketLength::Fixed(BigEndian::read_u32(&len) as usize)
            }
            _ => PacketLength::Indeterminate,
        };
        (tag, length)
    };

    let tag = Tag::try_from(tag).map_err(|_| crate::format_err!("invalid packet tag {}", tag))?;

    Ok(Some(PacketHeader {
        tag,
        length,
        header_len,
    }))
}

/// Writes a new format packet header announcing a fixed length body.
pub fn write_packet_header<W: io::Write>(writer: &mut W, tag: Tag, len: usize) -> Result<()> {
    writer.write_u8(0b1100_0000 | u8::from(tag))?;
    write_body_len(writer, len)
}

/// Writes a new format body length (the fixed forms only).
pub fn write_body_len<W: io::Write>(writer: &mut W, len: usize) -> Result<()> {
    match len {
        0..=191 => writer.write_u8(len as u8)?,
        192..=8383 => {
            writer.write_u8((((len - 192) >> 8) + 192) as u8)?;
            writer.write_u8(((len - 192) & 0xFF) as u8)?;
        }
        _ => {
            ensure!(len <= u32::MAX as usize, "packet body too large");
            writer.write_u8(0xFF)?;
            writer.write_u32::<BigEndian>(len as u32)?;
        }
    }
    Ok(())
}

/// Writes a partial body length octet. `len` must be a power of two
/// between 1 and 2^30.
pub fn write_partial_len<W: io::Write>(writer: &mut W, len: usize) -> Result<()> {
    ensure!(
        len.is_power_of_two() && len <= 1 << 30,
        "partial chunk length must be a power of two"
    );
    let exp = len.trailing_zeros() as u8;
    writer.write_u8(0xE0 | exp)?;
    Ok(())
}

/// Octets a new format fixed body length occupies.
pub fn body_len_len(len: usize) -> usize {
    match len {
        0..=191 => 1,
        192..=8383 => 2,
        _ => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(data: &[u8]) -> PacketHeader {
        let mut stack = crate::reader::ReaderStack::new(data);
        read_packet_header(&mut stack).unwrap().unwrap()
    }

    #[test]
    fn new_format_one_octet() {
        let h = header(&[0b1100_1011, 5]);
        assert_eq!(h.tag, Tag::LiteralData);
        assert_eq!(h.length, PacketLength::Fixed(5));
        assert_eq!(h.header_len, 2);
    }

    #[test]
    fn new_format_two_octet() {
        // ((c1 - 192) << 8) + c2 + 192
        let h = header(&[0b1100_0010, 193, 10]);
        assert_eq!(h.tag, Tag::Signature);
        assert_eq!(h.length, PacketLength::Fixed(458));
        assert_eq!(h.header_len, 3);
    }

    #[test]
    fn new_format_partial() {
        let h = header(&[0b1101_0010, 0xE9]);
        assert_eq!(h.tag, Tag::SymEncryptedProtectedData);
        assert_eq!(h.length, PacketLength::Partial(512));
    }

    #[test]
    fn new_format_five_octet() {
        let h = header(&[0b1100_1011, 255, 0, 1, 0, 0]);
        assert_eq!(h.length, PacketLength::Fixed(65536));
        assert_eq!(h.header_len, 6);
    }

    #[test]
    fn old_format_lengths() {
        let h = header(&[0b1010_1100, 7]);
        assert_eq!(h.tag, Tag::LiteralData);
        assert_eq!(h.length, PacketLength::Fixed(7));

        let h = header(&[0b1010_1101, 1, 0]);
        assert_eq!(h.length, PacketLength::Fixed(256));

        let h = header(&[0b1010_0111]);
        assert_eq!(h.tag, Tag::SymEncryptedData);
        assert_eq!(h.length, PacketLength::Indeterminate);
        assert_eq!(h.header_len, 1);
    }

    #[test]
    fn rejects_missing_tag_bit() {
        let data = [0x3Fu8, 0];
        let mut stack = crate::reader::ReaderStack::new(&data[..]);
        assert!(read_packet_header(&mut stack).is_err());
    }

    #[test]
    fn eof_before_tag_is_clean() {
        let mut stack = crate::reader::ReaderStack::new(&[][..]);
        assert!(read_packet_header(&mut stack).unwrap().is_none());
    }

    #[test]
    fn length_write_matches_read() {
        for len in [0usize, 1, 191, 192, 200, 8383, 8384, 100_000] {
            let mut buf = Vec::new();
            write_packet_header(&mut buf, Tag::LiteralData, len).unwrap();
            assert_eq!(buf.len(), 1 + body_len_len(len));

            let h = header(&buf);
            assert_eq!(h.tag, Tag::LiteralData);
            assert_eq!(h.length, PacketLength::Fixed(len));
        }
    }

    #[test]
    fn partial_len_octet() {
        let mut buf = Vec::new();
        write_partial_len(&mut buf, 8192).unwrap();
        assert_eq!(buf, [0xE0 | 13]);
        assert!(write_partial_len(&mut Vec::new(), 300).is_err());
    }
}
