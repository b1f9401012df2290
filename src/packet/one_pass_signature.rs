//! One-Pass Signature Packet
//!
//! Announces an upcoming signature so the literal data can be hashed
//! in a single pass.
//!
//! Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.4>

use std::io;

use bytes::Buf;

use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{HashAlgorithm, KeyId, PublicKeyAlgorithm, SignatureType, Tag};
use crate::{bail, ensure_eq};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnePassSignature {
    pub typ: SignatureType,
    pub hash_algorithm: HashAlgorithm,
    pub pub_algorithm: PublicKeyAlgorithm,
    pub key_id: KeyId,
    /// Zero when another one pass signature packet follows before the
    /// signed data.
    pub last: u8,
}

impl OnePassSignature {
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let version = i.read_u8()?;
        ensure_eq!(version, 3, "unsupported one pass signature version");

        let typ = i.read_u8()?;
        let typ = SignatureType::try_from(typ)
            .map_err(|_| crate::format_err!("invalid signature type {}", typ))?;
        let hash_algorithm = i.read_u8()?;
        let hash_algorithm = HashAlgorithm::try_from(hash_algorithm)
            .map_err(|_| crate::format_err!("invalid hash algorithm {}", hash_algorithm))?;
        let pub_algorithm = i.read_u8()?;
        let pub_algorithm = PublicKeyAlgorithm::try_from(pub_algorithm)
            .map_err(|_| crate::format_err!("invalid public key algorithm {}", pub_algorithm))?;
        let key_id = KeyId::from_buf(&mut i)?;
        let last = i.read_u8()?;

        Ok(OnePassSignature {
            typ,
            hash_algorithm,
            pub_algorithm,
            key_id,
            last,
        })
    }

    pub fn is_nested(&self) -> bool {
        self.last == 0
    }

    pub fn tag(&self) -> Tag {
        Tag::OnePassSignature
    }
}

impl Serialize for OnePassSignature {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[
            3,
            self.typ.into(),
            self.hash_algorithm.into(),
            self.pub_algorithm.into(),
        ])?;
        self.key_id.to_writer(writer)?;
        writer.write_all(&[self.last])?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        4 + self.key_id.write_len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let ops = OnePassSignature {
            typ: SignatureType::Binary,
            hash_algorithm: HashAlgorithm::SHA256,
            pub_algorithm: PublicKeyAlgorithm::RSA,
            key_id: [1, 2, 3, 4, 5, 6, 7, 8].into(),
            last: 1,
        };
        let buf = ops.to_bytes().unwrap();
        assert_eq!(buf.len(), ops.write_len());
        assert_eq!(buf.len(), 13);

        let back = OnePassSignature::from_buf(&mut &buf[..]).unwrap();
        assert_eq!(ops, back);
        assert!(!back.is_nested());
    }

    #[test]
    fn rejects_bad_version() {
        let raw = [4u8, 0, 8, 1, 0, 0, 0, 0, 0, 0, 0, 0, 1];
        assert!(OnePassSignature::from_buf(&mut &raw[..]).is_err());
    }
}
