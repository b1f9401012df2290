//! Public-Key and Public-Subkey Packets
//!
//! Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.5.2>

use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::Buf;
use chrono::{DateTime, TimeZone, Utc};
use md5::Md5;
use sha1::{Digest, Sha1};

use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{KeyId, PublicKeyAlgorithm, PublicParams, Tag};
use crate::{bail, ensure};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    packet_tag: Tag,
    pub version: u8,
    pub created_at: DateTime<Utc>,
    /// v2/v3 only.
    pub expiration_days: Option<u16>,
    pub algorithm: PublicKeyAlgorithm,
    pub public_params: PublicParams,
}

impl PublicKey {
    pub fn new(
        tag: Tag,
        version: u8,
        created_at: DateTime<Utc>,
        expiration_days: Option<u16>,
        algorithm: PublicKeyAlgorithm,
        public_params: PublicParams,
    ) -> Result<Self> {
        ensure!(
            matches!(tag, Tag::PublicKey | Tag::PublicSubkey),
            "not a public key tag: {:?}",
            tag
        );
        ensure!(
            matches!(version, 2..=4),
            "unsupported key version {}",
            version
        );
        Ok(PublicKey {
            packet_tag: tag,
            version,
            created_at,
            expiration_days,
            algorithm,
            public_params,
        })
    }

    /// `tag` distinguishes primary keys from subkeys; both share the
    /// same body format.
    pub fn from_buf<B: Buf>(tag: Tag, mut i: B) -> Result<Self> {
        ensure!(
            matches!(tag, Tag::PublicKey | Tag::PublicSubkey),
            "not a public key tag: {:?}",
            tag
        );

        let version = i.read_u8()?;
        let created_at = i.read_be_u32()?;
        let created_at = Utc
            .timestamp_opt(i64::from(created_at), 0)
            .single()
            .ok_or_else(|| crate::format_err!("invalid key timestamp {}", created_at))?;

        let expiration_days = match version {
            2 | 3 => Some(i.read_be_u16()?),
            4 => None,
            _ => bail!("unsupported key version {}", version),
        };

        let algorithm = i.read_u8()?;
        let algorithm = PublicKeyAlgorithm::try_from(algorithm)
            .map_err(|_| crate::errors::Error::UnsupportedPublicKeyAlgorithm { alg: algorithm })?;

        if version < 4 {
            // v2/v3 keys are RSA only
            ensure!(
                matches!(
                    algorithm,
                    PublicKeyAlgorithm::RSA
                        | PublicKeyAlgorithm::RSAEncrypt
                        | PublicKeyAlgorithm::RSASign
                ),
                "v{} keys must be RSA",
                version
            );
        }

        let public_params = PublicParams::from_buf(algorithm, &mut i)?;

        Ok(PublicKey {
            packet_tag: tag,
            version,
            created_at,
            expiration_days,
            algorithm,
            public_params,
        })
    }

    pub fn is_subkey(&self) -> bool {
        self.packet_tag == Tag::PublicSubkey
    }

    /// The fingerprint: MD5 over the RSA material for v3 keys, SHA1
    /// over the framed key body for v4.
    ///
    /// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-12.2>
    pub fn fingerprint(&self) -> Vec<u8> {
        match self.version {
            2 | 3 => {
                let mut h = Md5::new();
                if let PublicParams::Rsa { ref n, ref e } = self.public_params {
                    h.update(n.as_ref());
                    h.update(e.as_ref());
                }
                h.finalize().to_vec()
            }
            _ => {
                let body = self.body_bytes();
                let mut h = Sha1::new();
                h.update([0x99, (body.len() >> 8) as u8, body.len() as u8]);
                h.update(&body);
                h.finalize().to_vec()
            }
        }
    }

    /// The 8 octet key id: the low 64 bits of the modulus for v3 RSA
    /// keys, the low 64 bits of the fingerprint for v4.
    pub fn key_id(&self) -> KeyId {
        match self.version {
            2 | 3 => {
                let mut id = [0u8; 8];
                if let PublicParams::Rsa { ref n, .. } = self.public_params {
                    let bytes = n.as_ref();
                    let start = bytes.len().saturating_sub(8);
                    let tail = &bytes[start..];
                    id[8 - tail.len()..].copy_from_slice(tail);
                }
                id.into()
            }
            _ => {
                let fp = self.fingerprint();
                let mut id = [0u8; 8];
                id.copy_from_slice(&fp[fp.len() - 8..]);
                id.into()
            }
        }
    }

    fn body_bytes(&self) -> Vec<u8> {
        self.to_bytes().expect("writing to a vec never fails")
    }

    pub fn tag(&self) -> Tag {
        self.packet_tag
    }
}

impl Serialize for PublicKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.version)?;
        writer.write_u32::<BigEndian>(self.created_at.timestamp() as u32)?;
        if self.version < 4 {
            writer.write_u16::<BigEndian>(self.expiration_days.unwrap_or(0))?;
        }
        writer.write_u8(self.algorithm.into())?;
        self.public_params.to_writer(writer)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        let mut sum = 1 + 4 + 1;
        if self.version < 4 {
            sum += 2;
        }
        sum + self.public_params.write_len()
    }
}
