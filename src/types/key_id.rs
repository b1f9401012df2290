use std::fmt;
use std::io;

use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;

/// An 8 byte key identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyId([u8; 8]);

/// The wildcard id, used when the recipient should stay anonymous.
pub const WILDCARD_KEY_ID: KeyId = KeyId([0u8; 8]);

impl KeyId {
    pub fn from_buf<B: bytes::Buf>(mut i: B) -> Result<Self> {
        Ok(KeyId(i.read_array::<8>()?))
    }

    pub fn is_wildcard(&self) -> bool {
        self.0 == [0u8; 8]
    }
}

impl From<[u8; 8]> for KeyId {
    fn from(raw: [u8; 8]) -> Self {
        KeyId(raw)
    }
}

impl AsRef<[u8]> for KeyId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", hex::encode(self.0))
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0).to_uppercase())
    }
}

impl Serialize for KeyId {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.0)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        8
    }
}
