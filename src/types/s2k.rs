use std::io;

use bytes::Buf;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::HashAlgorithm;
use crate::unsupported_err;

const EXPBIAS: u32 = 6;

/// String-to-Key specifier, describing how a passphrase is turned into
/// a symmetric key.
///
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-3.7>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringToKey {
    pub typ: StringToKeyType,
    pub hash: HashAlgorithm,
    pub salt: Option<[u8; 8]>,
    /// Coded iteration count, see [`StringToKey::count`].
    pub count: Option<u8>,
}

/// Available String-To-Key types
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Copy, Clone, TryFromPrimitive, IntoPrimitive)]
pub enum StringToKeyType {
    Simple = 0,
    Salted = 1,
    Reserved = 2,
    IteratedAndSalted = 3,
}

impl StringToKey {
    pub fn new_simple(hash: HashAlgorithm) -> Self {
        StringToKey {
            typ: StringToKeyType::Simple,
            hash,
            salt: None,
            count: None,
        }
    }

    pub fn new_iterated(hash: HashAlgorithm, salt: [u8; 8], count: u8) -> Self {
        StringToKey {
            typ: StringToKeyType::IteratedAndSalted,
            hash,
            salt: Some(salt),
            count: Some(count),
        }
    }

    /// Converts the coded count into the octet count.
    /// Ref: <https://tools.ietf.org/html/rfc4880#section-3.7.1.3>
    pub fn count(&self) -> Option<usize> {
        self.count
            .map(|c| ((16u32 + u32::from(c & 15)) << (u32::from(c >> 4) + EXPBIAS)) as usize)
    }

    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let typ = i.read_u8()?;
        let typ = StringToKeyType::try_from(typ)
            .map_err(|_| crate::format_err!("unknown s2k type {}", typ))?;
        let hash = i.read_u8()?;
        let hash = HashAlgorithm::try_from(hash)
            .map_err(|_| crate::format_err!("unknown s2k hash algorithm {}", hash))?;

        let salt = match typ {
            StringToKeyType::Salted | StringToKeyType::IteratedAndSalted => {
                Some(i.read_array::<8>()?)
            }
            _ => None,
        };
        let count = match typ {
            StringToKeyType::IteratedAndSalted => Some(i.read_u8()?),
            _ => None,
        };

        if typ == StringToKeyType::Reserved {
            unsupported_err!("reserved s2k type");
        }

        Ok(StringToKey {
            typ,
            hash,
            salt,
            count,
        })
    }
}

impl Serialize for StringToKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[self.typ.into(), self.hash.into()])?;
        if let Some(ref salt) = self.salt {
            writer.write_all(salt)?;
        }
        if let Some(count) = self.count {
            writer.write_all(&[count])?;
        }

        Ok(())
    }

    fn write_len(&self) -> usize {
        let mut sum = 2;
        if self.salt.is_some() {
            sum += 8;
        }
        if self.count.is_some() {
            sum += 1;
        }
        sum
    }
}
