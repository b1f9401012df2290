//! Symmetric-Key Encrypted Session Key Packet
//!
//! Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.3>

use std::io;

use bytes::{Buf, Bytes};

use crate::crypto::{s2k_derive, CfbState, Crypto};
use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{SessionKey, StringToKey, SymmetricKeyAlgorithm, Tag};
use crate::{bail, ensure, ensure_eq};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymKeyEncryptedSessionKey {
    pub sym_algorithm: SymmetricKeyAlgorithm,
    pub s2k: StringToKey,
    /// When absent, the S2K output is the session key itself.
    pub encrypted_key: Option<Bytes>,
}

impl SymKeyEncryptedSessionKey {
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let version = i.read_u8()?;
        ensure_eq!(version, 4, "unsupported skesk version");

        let sym_algorithm = i.read_u8()?;
        let sym_algorithm = SymmetricKeyAlgorithm::try_from(sym_algorithm)
            .map_err(|_| crate::format_err!("invalid symmetric algorithm {}", sym_algorithm))?;
        let s2k = StringToKey::from_buf(&mut i)?;

        let encrypted_key = if i.has_remaining() {
            Some(i.rest())
        } else {
            None
        };

        Ok(SymKeyEncryptedSessionKey {
            sym_algorithm,
            s2k,
            encrypted_key,
        })
    }

    /// Recovers the session key from the passphrase.
    pub fn decrypt(&self, crypto: &dyn Crypto, passphrase: &[u8]) -> Result<SessionKey> {
        let derived = s2k_derive(
            crypto,
            &self.s2k,
            passphrase,
            self.sym_algorithm.key_size(),
        )?;

        match self.encrypted_key {
            None => Ok(SessionKey::new(self.sym_algorithm, derived.to_vec())),
            Some(ref encrypted) => {
                // decrypt with a zero IV; the first octet names the
                // algorithm of the wrapped key
                let enc = crypto.block_encryptor(self.sym_algorithm, &derived)?;
                let iv = vec![0u8; self.sym_algorithm.block_size()];
                let mut cfb = CfbState::new(enc, &iv);

                let mut plain = encrypted.to_vec();
                cfb.decrypt(&mut plain);

                ensure!(plain.len() > 1, "truncated wrapped session key");
                let alg = SymmetricKeyAlgorithm::try_from(plain[0])
                    .map_err(|_| crate::format_err!("invalid symmetric algorithm {}", plain[0]))?;
                ensure_eq!(plain.len() - 1, alg.key_size(), "session key length mismatch");

                Ok(SessionKey::new(alg, plain[1..].to_vec()))
            }
        }
    }

    pub fn tag(&self) -> Tag {
        Tag::SymKeyEncryptedSessionKey
    }
}

impl Serialize for SymKeyEncryptedSessionKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[4, self.sym_algorithm.into()])?;
        self.s2k.to_writer(writer)?;
        if let Some(ref encrypted) = self.encrypted_key {
            writer.write_all(encrypted)?;
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        2 + self.s2k.write_len() + self.encrypted_key.as_ref().map_or(0, |e| e.len())
    }
}
