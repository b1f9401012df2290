//! Public-Key Encrypted Session Key Packet
//!
//! Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.1>

use std::io;

use bytes::Buf;

use crate::crypto::{checksum, Crypto};
use crate::errors::{Error, Result};
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{
    KeyId, Mpi, PlainSecretParams, PublicKeyAlgorithm, PublicParams, SessionKey,
    SymmetricKeyAlgorithm, Tag,
};
use crate::{bail, ensure, ensure_eq};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyEncryptedSessionKey {
    pub id: KeyId,
    pub algorithm: PublicKeyAlgorithm,
    pub mpis: Vec<Mpi>,
}

impl PublicKeyEncryptedSessionKey {
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let version = i.read_u8()?;
        ensure_eq!(version, 3, "unsupported pkesk version");

        let id = KeyId::from_buf(&mut i)?;
        let algorithm = i.read_u8()?;
        let algorithm = PublicKeyAlgorithm::try_from(algorithm)
            .map_err(|_| Error::UnsupportedPublicKeyAlgorithm { alg: algorithm })?;

        let mpis = match algorithm {
            PublicKeyAlgorithm::RSA | PublicKeyAlgorithm::RSAEncrypt => {
                vec![Mpi::from_buf(&mut i)?]
            }
            PublicKeyAlgorithm::Elgamal => {
                vec![Mpi::from_buf(&mut i)?, Mpi::from_buf(&mut i)?]
            }
            _ => {
                return Err(Error::UnsupportedPublicKeyAlgorithm {
                    alg: algorithm.into(),
                })
            }
        };

        Ok(PublicKeyEncryptedSessionKey {
            id,
            algorithm,
            mpis,
        })
    }

    /// Decrypts the session key with the given secret key material.
    ///
    /// The decrypted block is `0x00 0x02 <padding> 0x00 <alg octet>
    /// <key> <2 octet checksum>`; both the padding shape and the
    /// checksum are verified before the key is released.
    pub fn decrypt(
        &self,
        crypto: &dyn Crypto,
        public: &PublicParams,
        secret: &PlainSecretParams,
    ) -> Result<SessionKey> {
        let decrypted = crypto.pk_decrypt(self.algorithm, public, secret, &self.mpis)?;

        // EME-PKCS1-v1_5 unpadding
        if decrypted.len() < 11 || decrypted[0] != 0x00 || decrypted[1] != 0x02 {
            return Err(Error::UnpadError);
        }
        let sep = decrypted[2..]
            .iter()
            .position(|b| *b == 0x00)
            .ok_or(Error::UnpadError)?;
        if sep < 8 {
            return Err(Error::UnpadError);
        }
        let message = &decrypted[2 + sep + 1..];

        let alg = *message.first().ok_or(Error::UnpadError)?;
        let alg = SymmetricKeyAlgorithm::try_from(alg)
            .map_err(|_| crate::format_err!("invalid symmetric algorithm {}", alg))?;

        ensure_eq!(
            message.len(),
            alg.key_size() + 3,
            "session key length mismatch"
        );

        let key = &message[1..message.len() - 2];
        let declared = u32::from(message[message.len() - 2]) << 8
            | u32::from(message[message.len() - 1]);
        if checksum::calc_simple(key) != declared {
            return Err(Error::SessionKeyChecksum);
        }

        Ok(SessionKey::new(alg, key.to_vec()))
    }

    pub fn tag(&self) -> Tag {
        Tag::PublicKeyEncryptedSessionKey
    }
}

impl Serialize for PublicKeyEncryptedSessionKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[3])?;
        self.id.to_writer(writer)?;
        writer.write_all(&[self.algorithm.into()])?;
        ensure!(!self.mpis.is_empty(), "pkesk without key material");
        for mpi in &self.mpis {
            mpi.to_writer(writer)?;
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        1 + self.id.write_len() + 1 + self.mpis.iter().map(Serialize::write_len).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let pkesk = PublicKeyEncryptedSessionKey {
            id: [9, 8, 7, 6, 5, 4, 3, 2].into(),
            algorithm: PublicKeyAlgorithm::RSA,
            mpis: vec![Mpi::from_slice(&[0x05, 0xFF, 0x11])],
        };
        let buf = pkesk.to_bytes().unwrap();
        assert_eq!(buf.len(), pkesk.write_len());

        let back = PublicKeyEncryptedSessionKey::from_buf(&mut &buf[..]).unwrap();
        assert_eq!(pkesk, back);
    }

    #[test]
    fn rejects_dsa() {
        // DSA cannot encrypt
        let mut raw = vec![3u8];
        raw.extend_from_slice(&[0u8; 8]);
        raw.push(17);
        assert!(matches!(
            PublicKeyEncryptedSessionKey::from_buf(&mut &raw[..]),
            Err(Error::UnsupportedPublicKeyAlgorithm { alg: 17 })
        ));
    }
}
