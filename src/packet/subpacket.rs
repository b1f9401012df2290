//! Signature subpackets.
//!
//! Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.2.3.1>

use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::{Buf, Bytes};
use chrono::{DateTime, TimeZone, Utc};

use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{
    CompressionAlgorithm, HashAlgorithm, KeyId, PublicKeyAlgorithm, SymmetricKeyAlgorithm,
};
use crate::ensure;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subpacket {
    pub critical: bool,
    pub data: SubpacketData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubpacketData {
    SignatureCreationTime(DateTime<Utc>),
    /// Seconds after the creation time.
    SignatureExpirationTime(u32),
    ExportableCertification(bool),
    TrustSignature(u8, u8),
    RegularExpression(Bytes),
    Revocable(bool),
    /// Seconds after the key creation time.
    KeyExpirationTime(u32),
    PreferredSymmetricAlgorithms(Vec<SymmetricKeyAlgorithm>),
    RevocationKey {
        class: u8,
        algorithm: PublicKeyAlgorithm,
        fingerprint: [u8; 20],
    },
    Issuer(KeyId),
    Notation {
        readable: bool,
        name: Bytes,
        value: Bytes,
    },
    PreferredHashAlgorithms(Vec<HashAlgorithm>),
    PreferredCompressionAlgorithms(Vec<CompressionAlgorithm>),
    KeyServerPreferences(Bytes),
    PreferredKeyServer(Bytes),
    PrimaryUserId(bool),
    PolicyUri(Bytes),
    KeyFlags(Bytes),
    SignersUserId(Bytes),
    RevocationReason {
        code: u8,
        reason: Bytes,
    },
    Features(Bytes),
    SignatureTarget {
        pub_alg: PublicKeyAlgorithm,
        hash_alg: HashAlgorithm,
        digest: Bytes,
    },
    /// Kept unparsed to avoid recursing into a nested signature.
    EmbeddedSignature(Bytes),
    Unknown {
        typ: u8,
        data: Bytes,
    },
}

impl Subpacket {
    pub fn is_unknown(&self) -> bool {
        matches!(self.data, SubpacketData::Unknown { .. })
    }

    /// The raw type octet, without the critical bit.
    pub fn typ(&self) -> u8 {
        match self.data {
            SubpacketData::SignatureCreationTime(_) => 2,
            SubpacketData::SignatureExpirationTime(_) => 3,
            SubpacketData::ExportableCertification(_) => 4,
            SubpacketData::TrustSignature(..) => 5,
            SubpacketData::RegularExpression(_) => 6,
            SubpacketData::Revocable(_) => 7,
            SubpacketData::KeyExpirationTime(_) => 9,
            SubpacketData::PreferredSymmetricAlgorithms(_) => 11,
            SubpacketData::RevocationKey { .. } => 12,
            SubpacketData::Issuer(_) => 16,
            SubpacketData::Notation { .. } => 20,
            SubpacketData::PreferredHashAlgorithms(_) => 21,
            SubpacketData::PreferredCompressionAlgorithms(_) => 22,
            SubpacketData::KeyServerPreferences(_) => 23,
            SubpacketData::PreferredKeyServer(_) => 24,
            SubpacketData::PrimaryUserId(_) => 25,
            SubpacketData::PolicyUri(_) => 26,
            SubpacketData::KeyFlags(_) => 27,
            SubpacketData::SignersUserId(_) => 28,
            SubpacketData::RevocationReason { .. } => 29,
            SubpacketData::Features(_) => 30,
            SubpacketData::SignatureTarget { .. } => 31,
            SubpacketData::EmbeddedSignature(_) => 32,
            SubpacketData::Unknown { typ, .. } => typ,
        }
    }

    fn body_len(&self) -> usize {
        match self.data {
            SubpacketData::SignatureCreationTime(_)
            | SubpacketData::SignatureExpirationTime(_)
            | SubpacketData::KeyExpirationTime(_) => 4,
            SubpacketData::ExportableCertification(_)
            | SubpacketData::Revocable(_)
            | SubpacketData::PrimaryUserId(_) => 1,
            SubpacketData::TrustSignature(..) => 2,
            SubpacketData::RegularExpression(ref d)
            | SubpacketData::KeyServerPreferences(ref d)
            | SubpacketData::PreferredKeyServer(ref d)
            | SubpacketData::PolicyUri(ref d)
            | SubpacketData::KeyFlags(ref d)
            | SubpacketData::SignersUserId(ref d)
            | SubpacketData::Features(ref d)
            | SubpacketData::EmbeddedSignature(ref d) => d.len(),
            SubpacketData::PreferredSymmetricAlgorithms(ref v) => v.len(),
            SubpacketData::PreferredHashAlgorithms(ref v) => v.len(),
            SubpacketData::PreferredCompressionAlgorithms(ref v) => v.len(),
            SubpacketData::RevocationKey { .. } => 22,
            SubpacketData::Issuer(_) => 8,
            SubpacketData::Notation {
                ref name,
                ref value,
                ..
            } => 8 + name.len() + value.len(),
            SubpacketData::RevocationReason { ref reason, .. } => 1 + reason.len(),
            SubpacketData::SignatureTarget { ref digest, .. } => 2 + digest.len(),
            SubpacketData::Unknown { ref data, .. } => data.len(),
        }
    }
}

fn read_len<B: Buf>(i: &mut B) -> Result<usize> {
    let olen = i.read_u8()?;
    Ok(match olen {
        0..=191 => olen as usize,
        192..=254 => {
            let second = i.read_u8()?;
            ((olen as usize - 192) << 8) + 192 + second as usize
        }
        255 => i.read_be_u32()? as usize,
    })
}

fn write_len<W: io::Write>(writer: &mut W, len: usize) -> Result<()> {
    match len {
        0..=191 => writer.write_u8(len as u8)?,
        192..=16319 => {
            writer.write_u8((((len - 192) >> 8) + 192) as u8)?;
            writer.write_u8(((len - 192) & 0xFF) as u8)?;
        }
        _ => {
            writer.write_u8(255)?;
            writer.write_u32::<BigEndian>(len as u32)?;
        }
    }
    Ok(())
}

fn len_len(len: usize) -> usize {
    match len {
        0..=191 => 1,
        192..=16319 => 2,
        _ => 5,
    }
}

fn read_timestamp<B: Buf>(i: &mut B) -> Result<DateTime<Utc>> {
    let ts = i.read_be_u32()?;
    Utc.timestamp_opt(i64::from(ts), 0)
        .single()
        .ok_or_else(|| crate::format_err!("invalid subpacket timestamp {}", ts))
}

fn parse_body(typ: u8, mut body: Bytes) -> Result<SubpacketData> {
    let data = match typ {
        2 => SubpacketData::SignatureCreationTime(read_timestamp(&mut body)?),
        3 => SubpacketData::SignatureExpirationTime(body.read_be_u32()?),
        4 => SubpacketData::ExportableCertification(body.read_u8()? != 0),
        5 => SubpacketData::TrustSignature(body.read_u8()?, body.read_u8()?),
        6 => SubpacketData::RegularExpression(body.rest()),
        7 => SubpacketData::Revocable(body.read_u8()? != 0),
        9 => SubpacketData::KeyExpirationTime(body.read_be_u32()?),
        11 => {
            let mut algs = Vec::with_capacity(body.remaining());
            while body.has_remaining() {
                let a = body.read_u8()?;
                algs.push(
                    SymmetricKeyAlgorithm::try_from(a)
                        .map_err(|_| crate::format_err!("invalid symmetric algorithm {}", a))?,
                );
            }
            SubpacketData::PreferredSymmetricAlgorithms(algs)
        }
        12 => {
            let class = body.read_u8()?;
            let algorithm = body.read_u8()?;
            let algorithm = PublicKeyAlgorithm::try_from(algorithm).map_err(|_| {
                crate::format_err!("invalid public key algorithm {}", algorithm)
            })?;
            SubpacketData::RevocationKey {
                class,
                algorithm,
                fingerprint: body.read_array::<20>()?,
            }
        }
        16 => SubpacketData::Issuer(KeyId::from_buf(&mut body)?),
        20 => {
            let flags = body.read_array::<4>()?;
            let name_len = usize::from(body.read_be_u16()?);
            let value_len = usize::from(body.read_be_u16()?);
            let name = body.read_take(name_len)?;
            let value = body.read_take(value_len)?;
            SubpacketData::Notation {
                readable: flags[0] & 0x80 != 0,
                name,
                value,
            }
        }
        21 => {
            let mut algs = Vec::with_capacity(body.remaining());
            while body.has_remaining() {
                let a = body.read_u8()?;
                algs.push(
                    HashAlgorithm::try_from(a)
                        .map_err(|_| crate::format_err!("invalid hash algorithm {}", a))?,
                );
            }
            SubpacketData::PreferredHashAlgorithms(algs)
        }
        22 => {
            let mut algs = Vec::with_capacity(body.remaining());
            while body.has_remaining() {
                let a = body.read_u8()?;
                algs.push(
                    CompressionAlgorithm::try_from(a)
                        .map_err(|_| crate::format_err!("invalid compression algorithm {}", a))?,
                );
            }
            SubpacketData::PreferredCompressionAlgorithms(algs)
        }
        23 => SubpacketData::KeyServerPreferences(body.rest()),
        24 => SubpacketData::PreferredKeyServer(body.rest()),
        25 => SubpacketData::PrimaryUserId(body.read_u8()? != 0),
        26 => SubpacketData::PolicyUri(body.rest()),
        27 => SubpacketData::KeyFlags(body.rest()),
        28 => SubpacketData::SignersUserId(body.rest()),
        29 => SubpacketData::RevocationReason {
            code: body.read_u8()?,
            reason: body.rest(),
        },
        30 => SubpacketData::Features(body.rest()),
        31 => {
            let pub_alg = body.read_u8()?;
            let pub_alg = PublicKeyAlgorithm::try_from(pub_alg)
                .map_err(|_| crate::format_err!("invalid public key algorithm {}", pub_alg))?;
            let hash_alg = body.read_u8()?;
            let hash_alg = HashAlgorithm::try_from(hash_alg)
                .map_err(|_| crate::format_err!("invalid hash algorithm {}", hash_alg))?;
            SubpacketData::SignatureTarget {
                pub_alg,
                hash_alg,
                digest: body.rest(),
            }
        }
        32 => SubpacketData::EmbeddedSignature(body.rest()),
        _ => SubpacketData::Unknown {
            typ,
            data: body.rest(),
        },
    };
    ensure!(
        !body.has_remaining(),
        "trailing bytes in subpacket type {}",
        typ
    );
    Ok(data)
}

/// Parses a complete subpacket area. With `raw` set every subpacket is
/// kept as an unparsed blob.
pub fn read_subpackets<B: Buf>(mut i: B, raw: bool) -> Result<Vec<Subpacket>> {
    let mut subpackets = Vec::new();
    while i.has_remaining() {
        let len = read_len(&mut i)?;
        ensure!(len > 0, "empty signature subpacket");
        let typ_octet = i.read_u8()?;
        let critical = typ_octet & 0x80 != 0;
        let typ = typ_octet & 0x7F;
        let body = i.read_take(len - 1)?;

        let data = if raw {
            SubpacketData::Unknown { typ, data: body }
        } else {
            parse_body(typ, body)?
        };
        subpackets.push(Subpacket { critical, data });
    }
    Ok(subpackets)
}

impl Serialize for Subpacket {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        let body_len = self.body_len();
        write_len(writer, body_len + 1)?;
        let mut typ = self.typ();
        if self.critical {
            typ |= 0x80;
        }
        writer.write_u8(typ)?;

        match self.data {
            SubpacketData::SignatureCreationTime(ref ts) => {
                writer.write_u32::<BigEndian>(ts.timestamp() as u32)?;
            }
            SubpacketData::SignatureExpirationTime(secs)
            | SubpacketData::KeyExpirationTime(secs) => {
                writer.write_u32::<BigEndian>(secs)?;
            }
            SubpacketData::ExportableCertification(v)
            | SubpacketData::Revocable(v)
            | SubpacketData::PrimaryUserId(v) => {
                writer.write_u8(u8::from(v))?;
            }
            SubpacketData::TrustSignature(depth, amount) => {
                writer.write_all(&[depth, amount])?;
            }
            SubpacketData::RegularExpression(ref d)
            | SubpacketData::KeyServerPreferences(ref d)
            | SubpacketData::PreferredKeyServer(ref d)
            | SubpacketData::PolicyUri(ref d)
            | SubpacketData::KeyFlags(ref d)
            | SubpacketData::SignersUserId(ref d)
            | SubpacketData::Features(ref d)
            | SubpacketData::EmbeddedSignature(ref d) => {
                writer.write_all(d)?;
            }
            SubpacketData::PreferredSymmetricAlgorithms(ref v) => {
                for a in v {
                    writer.write_u8((*a).into())?;
                }
            }
            SubpacketData::PreferredHashAlgorithms(ref v) => {
                for a in v {
                    writer.write_u8((*a).into())?;
                }
            }
            SubpacketData::PreferredCompressionAlgorithms(ref v) => {
                for a in v {
                    writer.write_u8((*a).into())?;
                }
            }
            SubpacketData::RevocationKey {
                class,
                algorithm,
                ref fingerprint,
            } => {
                writer.write_all(&[class, algorithm.into()])?;
                writer.write_all(fingerprint)?;
            }
            SubpacketData::Issuer(ref id) => {
                id.to_writer(writer)?;
            }
            SubpacketData::Notation {
                readable,
                ref name,
                ref value,
            } => {
                writer.write_all(&[if readable { 0x80 } else { 0 }, 0, 0, 0])?;
                writer.write_u16::<BigEndian>(name.len() as u16)?;
                writer.write_u16::<BigEndian>(value.len() as u16)?;
                writer.write_all(name)?;
                writer.write_all(value)?;
            }
            SubpacketData::RevocationReason { code, ref reason } => {
                writer.write_u8(code)?;
                writer.write_all(reason)?;
            }
            SubpacketData::SignatureTarget {
                pub_alg,
                hash_alg,
                ref digest,
            } => {
                writer.write_all(&[pub_alg.into(), hash_alg.into()])?;
                writer.write_all(digest)?;
            }
            SubpacketData::Unknown { ref data, .. } => {
                writer.write_all(data)?;
            }
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        let body_len = self.body_len();
        len_len(body_len + 1) + 1 + body_len
    }
}
