//! ASCII armor framing.
//!
//! Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-6>

mod reader;

pub use self::reader::DearmorFilter;

use std::collections::BTreeMap;
use std::fmt;
use std::io;

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::digit1;
use nom::combinator::{map, map_res, opt, value};
use nom::sequence::{delimited, pair, preceded};
use nom::IResult;

use crate::errors::Result;
use crate::ser::Serialize;

/// The number of base64 characters per armor body line.
pub const ARMOR_COLUMNS: usize = 76;

/// Armor block types.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum BlockType {
    Message,
    PublicKey,
    PrivateKey,
    Signature,
    /// Cleartext signed message framework
    CleartextMessage,
    /// Recognized but explicitly unsupported.
    MultiPartMessage(usize, usize),
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::Message => f.write_str("PGP MESSAGE"),
            BlockType::PublicKey => f.write_str("PGP PUBLIC KEY BLOCK"),
            BlockType::PrivateKey => f.write_str("PGP PRIVATE KEY BLOCK"),
            BlockType::Signature => f.write_str("PGP SIGNATURE"),
            BlockType::CleartextMessage => f.write_str("PGP SIGNED MESSAGE"),
            BlockType::MultiPartMessage(x, y) => write!(f, "PGP MESSAGE, PART {x}/{y}"),
        }
    }
}

impl Serialize for BlockType {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        write!(w, "{self}")?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        self.to_string().len()
    }
}

/// Armor Headers.
pub type Headers = BTreeMap<String, Vec<String>>;

/// The armor header keys a conforming implementation may emit.
pub(crate) fn is_allowed_header_key(key: &str) -> bool {
    matches!(key, "Version" | "Comment" | "MessageID" | "Hash" | "Charset")
}

fn parse_digit(x: &[u8]) -> Result<usize> {
    let s = std::str::from_utf8(x)?;
    let digit: usize = s.parse()?;
    Ok(digit)
}

/// Parses the type inside of an ascii armor header line.
fn armor_block_type(i: &[u8]) -> IResult<&[u8], BlockType> {
    alt((
        map(
            preceded(
                tag("PGP MESSAGE, PART "),
                pair(
                    map_res(digit1, parse_digit),
                    opt(preceded(tag("/"), map_res(digit1, parse_digit))),
                ),
            ),
            |(x, y)| BlockType::MultiPartMessage(x, y.unwrap_or(0)),
        ),
        value(BlockType::Message, tag("PGP MESSAGE")),
        value(BlockType::PublicKey, tag("PGP PUBLIC KEY BLOCK")),
        value(BlockType::PrivateKey, tag("PGP PRIVATE KEY BLOCK")),
        value(BlockType::Signature, tag("PGP SIGNATURE")),
        value(BlockType::CleartextMessage, tag("PGP SIGNED MESSAGE")),
    ))(i)
}

/// Parses a complete `-----BEGIN <type>-----` line (without the line
/// ending). Anything not matching this exact shape is not a header.
pub(crate) fn parse_begin_line(line: &[u8]) -> Option<BlockType> {
    let res: IResult<&[u8], BlockType> =
        delimited(tag("-----BEGIN "), armor_block_type, tag("-----"))(line);
    match res {
        Ok((rest, typ)) if rest.is_empty() => Some(typ),
        _ => None,
    }
}

/// Parses a complete `-----END <type>-----` line.
pub(crate) fn parse_end_line(line: &[u8]) -> Option<BlockType> {
    let res: IResult<&[u8], BlockType> =
        delimited(tag("-----END "), armor_block_type, tag("-----"))(line);
    match res {
        Ok((rest, typ)) if rest.is_empty() => Some(typ),
        _ => None,
    }
}
