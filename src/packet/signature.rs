//! Signature Packet
//!
//! Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.2>

use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::{Buf, Bytes};
use chrono::{DateTime, TimeZone, Utc};
use digest::DynDigest;

use crate::crypto::Crypto;
use crate::errors::{Error, Result};
use crate::packet::subpacket::{read_subpackets, Subpacket, SubpacketData};
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{
    HashAlgorithm, KeyId, Mpi, PublicKeyAlgorithm, PublicParams, SignatureType, Tag,
};
use crate::{bail, ensure, ensure_eq};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub version: u8,
    pub typ: SignatureType,
    pub pub_alg: PublicKeyAlgorithm,
    pub hash_alg: HashAlgorithm,
    /// v3 direct fields; v4 carries these in subpackets.
    pub created: Option<DateTime<Utc>>,
    pub issuer_key_id: Option<KeyId>,
    pub hashed_subpackets: Vec<Subpacket>,
    pub unhashed_subpackets: Vec<Subpacket>,
    /// Leftmost two octets of the signed digest, for quick rejection.
    pub signed_hash_value: [u8; 2],
    pub sig: Vec<Mpi>,
    /// The exact octets covered by the digest: the five v3 fields, or
    /// everything from the version octet through the hashed subpacket
    /// area for v4, verbatim as parsed.
    hashed_area: Bytes,
}

fn read_sig_mpis<B: Buf>(alg: PublicKeyAlgorithm, mut i: B) -> Result<Vec<Mpi>> {
    match alg {
        PublicKeyAlgorithm::RSA | PublicKeyAlgorithm::RSAEncrypt | PublicKeyAlgorithm::RSASign => {
            Ok(vec![Mpi::from_buf(&mut i)?])
        }
        PublicKeyAlgorithm::DSA | PublicKeyAlgorithm::Elgamal => {
            Ok(vec![Mpi::from_buf(&mut i)?, Mpi::from_buf(&mut i)?])
        }
        _ => Err(Error::UnsupportedPublicKeyAlgorithm { alg: alg.into() }),
    }
}

impl Signature {
    /// Parses a complete signature packet body. The body must be fully
    /// buffered: v4 signatures keep a verbatim slice of their hashed
    /// area for later digest computation.
    pub fn from_buf(mut body: Bytes, raw_subpackets: bool) -> Result<Self> {
        let full = body.clone();
        let version = body.read_u8()?;

        match version {
            2 | 3 => Self::from_buf_v3(full, body, version, raw_subpackets),
            4 => Self::from_buf_v4(full, body, raw_subpackets),
            _ => bail!("unsupported signature version {}", version),
        }
    }

    fn from_buf_v3(
        full: Bytes,
        mut body: Bytes,
        version: u8,
        _raw_subpackets: bool,
    ) -> Result<Self> {
        let hashed_len = body.read_u8()?;
        ensure_eq!(hashed_len, 5, "invalid v3 signature hashed length");

        // the hashed material: type octet and creation time
        let hashed_area = full.slice(2..2 + 5);

        let typ = body.read_u8()?;
        let typ = SignatureType::try_from(typ)
            .map_err(|_| crate::format_err!("invalid signature type {}", typ))?;
        let created = body.read_be_u32()?;
        let created = Utc
            .timestamp_opt(i64::from(created), 0)
            .single()
            .ok_or_else(|| crate::format_err!("invalid signature timestamp {}", created))?;
        let issuer_key_id = KeyId::from_buf(&mut body)?;
        let pub_alg = body.read_u8()?;
        let pub_alg = PublicKeyAlgorithm::try_from(pub_alg)
            .map_err(|_| Error::UnsupportedPublicKeyAlgorithm { alg: pub_alg })?;
        let hash_alg = body.read_u8()?;
        let hash_alg = HashAlgorithm::try_from(hash_alg)
            .map_err(|_| crate::format_err!("invalid hash algorithm {}", hash_alg))?;
        let signed_hash_value = body.read_array::<2>()?;
        let sig = read_sig_mpis(pub_alg, &mut body)?;
        ensure!(!body.has_remaining(), "trailing bytes in signature packet");

        Ok(Signature {
            version,
            typ,
            pub_alg,
            hash_alg,
            created: Some(created),
            issuer_key_id: Some(issuer_key_id),
            hashed_subpackets: Vec::new(),
            unhashed_subpackets: Vec::new(),
            signed_hash_value,
            sig,
            hashed_area,
        })
    }

    fn from_buf_v4(full: Bytes, mut body: Bytes, raw_subpackets: bool) -> Result<Self> {
        let typ = body.read_u8()?;
        let typ = SignatureType::try_from(typ)
            .map_err(|_| crate::format_err!("invalid signature type {}", typ))?;
        let pub_alg = body.read_u8()?;
        let pub_alg = PublicKeyAlgorithm::try_from(pub_alg)
            .map_err(|_| Error::UnsupportedPublicKeyAlgorithm { alg: pub_alg })?;
        let hash_alg = body.read_u8()?;
        let hash_alg = HashAlgorithm::try_from(hash_alg)
            .map_err(|_| crate::format_err!("invalid hash algorithm {}", hash_alg))?;

        let hashed_len = usize::from(body.read_be_u16()?);
        let hashed_data = body.read_take(hashed_len)?;
        // version octet through the end of the hashed subpacket area
        let hashed_area = full.slice(..1 + 1 + 1 + 1 + 2 + hashed_len);
        let hashed_subpackets = read_subpackets(hashed_data, raw_subpackets)?;

        let unhashed_len = usize::from(body.read_be_u16()?);
        let unhashed_data = body.read_take(unhashed_len)?;
        let unhashed_subpackets = read_subpackets(unhashed_data, raw_subpackets)?;

        let signed_hash_value = body.read_array::<2>()?;
        let sig = read_sig_mpis(pub_alg, &mut body)?;
        ensure!(!body.has_remaining(), "trailing bytes in signature packet");

        Ok(Signature {
            version: 4,
            typ,
            pub_alg,
            hash_alg,
            created: None,
            issuer_key_id: None,
            hashed_subpackets,
            unhashed_subpackets,
            signed_hash_value,
            sig,
            hashed_area,
        })
    }

    /// The issuer, from the direct v3 field or the Issuer subpacket.
    pub fn issuer(&self) -> Option<KeyId> {
        if let Some(id) = self.issuer_key_id {
            return Some(id);
        }
        self.hashed_subpackets
            .iter()
            .chain(self.unhashed_subpackets.iter())
            .find_map(|sp| match sp.data {
                SubpacketData::Issuer(id) => Some(id),
                _ => None,
            })
    }

    /// The creation time, from the direct v3 field or the subpacket.
    pub fn created(&self) -> Option<DateTime<Utc>> {
        if let Some(ts) = self.created {
            return Some(ts);
        }
        self.hashed_subpackets.iter().find_map(|sp| match sp.data {
            SubpacketData::SignatureCreationTime(ts) => Some(ts),
            _ => None,
        })
    }

    /// Unrecognized subpackets with the critical bit set. The caller
    /// decides whether these invalidate the signature.
    pub fn critical_unknown_subpackets(&self) -> impl Iterator<Item = &Subpacket> {
        self.hashed_subpackets
            .iter()
            .chain(self.unhashed_subpackets.iter())
            .filter(|sp| sp.critical && sp.is_unknown())
    }

    /// Feeds the hashed material and the trailer into `hash`. The
    /// caller has already hashed the signed document itself.
    pub fn update_hash(&self, hash: &mut dyn DynDigest) {
        hash.update(&self.hashed_area);
        if self.version == 4 {
            let len = self.hashed_area.len() as u32;
            hash.update(&[0x04, 0xFF]);
            hash.update(&len.to_be_bytes());
        }
    }

    /// Finalizes `hash` and checks the signature against it: the two
    /// octet quick check first, then the public key operation.
    pub fn verify(
        &self,
        crypto: &dyn Crypto,
        public: &PublicParams,
        mut hash: Box<dyn DynDigest>,
    ) -> Result<()> {
        self.update_hash(&mut *hash);
        let digest = hash.finalize();

        ensure_eq!(
            &digest[..2],
            &self.signed_hash_value[..],
            "signature quick check failed"
        );

        let valid = crypto.pk_verify(self.pub_alg, public, self.hash_alg, &digest, &self.sig)?;
        ensure!(valid, "bad signature");
        Ok(())
    }

    pub fn tag(&self) -> Tag {
        Tag::Signature
    }
}

impl Serialize for Signature {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.version)?;
        match self.version {
            2 | 3 => {
                writer.write_u8(5)?;
                writer.write_u8(self.typ.into())?;
                let created = self
                    .created
                    .ok_or_else(|| crate::format_err!("v3 signature without creation time"))?;
                writer.write_u32::<BigEndian>(created.timestamp() as u32)?;
                let issuer = self
                    .issuer_key_id
                    .ok_or_else(|| crate::format_err!("v3 signature without issuer"))?;
                issuer.to_writer(writer)?;
                writer.write_u8(self.pub_alg.into())?;
                writer.write_u8(self.hash_alg.into())?;
            }
            _ => {
                writer.write_u8(self.typ.into())?;
                writer.write_u8(self.pub_alg.into())?;
                writer.write_u8(self.hash_alg.into())?;
                let hashed_len: usize = self
                    .hashed_subpackets
                    .iter()
                    .map(Serialize::write_len)
                    .sum();
                writer.write_u16::<BigEndian>(hashed_len as u16)?;
                for sp in &self.hashed_subpackets {
                    sp.to_writer(writer)?;
                }
                let unhashed_len: usize = self
                    .unhashed_subpackets
                    .iter()
                    .map(Serialize::write_len)
                    .sum();
                writer.write_u16::<BigEndian>(unhashed_len as u16)?;
                for sp in &self.unhashed_subpackets {
                    sp.to_writer(writer)?;
                }
            }
        }
        writer.write_all(&self.signed_hash_value)?;
        for mpi in &self.sig {
            mpi.to_writer(writer)?;
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        let mut sum = 1;
        match self.version {
            2 | 3 => {
                sum += 1 + 1 + 4 + 8 + 1 + 1;
            }
            _ => {
                sum += 3;
                sum += 2 + self
                    .hashed_subpackets
                    .iter()
                    .map(Serialize::write_len)
                    .sum::<usize>();
                sum += 2 + self
                    .unhashed_subpackets
                    .iter()
                    .map(Serialize::write_len)
                    .sum::<usize>();
            }
        }
        sum + 2 + self.sig.iter().map(Serialize::write_len).sum::<usize>()
    }
}
