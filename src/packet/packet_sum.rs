use std::io;

use bytes::Bytes;

use crate::errors::{Error, Result};
use crate::ser::Serialize;
use crate::types::Tag;

use super::{
    CompressedData, LiteralData, Marker, ModDetectionCode, OnePassSignature, PublicKey,
    PublicKeyEncryptedSessionKey, SecretKey, Signature, SymKeyEncryptedSessionKey, Trust,
    UserAttribute, UserId,
};

/// A fully parsed packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    CompressedData(CompressedData),
    PublicKey(PublicKey),
    PublicSubkey(PublicKey),
    SecretKey(SecretKey),
    SecretSubkey(SecretKey),
    LiteralData(LiteralData),
    Marker(Marker),
    ModDetectionCode(ModDetectionCode),
    OnePassSignature(OnePassSignature),
    PublicKeyEncryptedSessionKey(PublicKeyEncryptedSessionKey),
    Signature(Signature),
    SymKeyEncryptedSessionKey(SymKeyEncryptedSessionKey),
    Trust(Trust),
    UserAttribute(UserAttribute),
    UserId(UserId),
}

impl Packet {
    pub fn tag(&self) -> Tag {
        match self {
            Packet::CompressedData(p) => p.tag(),
            Packet::PublicKey(p) | Packet::PublicSubkey(p) => p.tag(),
            Packet::SecretKey(p) | Packet::SecretSubkey(p) => p.tag(),
            Packet::LiteralData(p) => p.tag(),
            Packet::Marker(p) => p.tag(),
            Packet::ModDetectionCode(p) => p.tag(),
            Packet::OnePassSignature(p) => p.tag(),
            Packet::PublicKeyEncryptedSessionKey(p) => p.tag(),
            Packet::Signature(p) => p.tag(),
            Packet::SymKeyEncryptedSessionKey(p) => p.tag(),
            Packet::Trust(p) => p.tag(),
            Packet::UserAttribute(p) => p.tag(),
            Packet::UserId(p) => p.tag(),
        }
    }
}

impl Serialize for Packet {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Packet::CompressedData(p) => p.to_writer(writer),
            Packet::PublicKey(p) | Packet::PublicSubkey(p) => p.to_writer(writer),
            Packet::SecretKey(p) | Packet::SecretSubkey(p) => p.to_writer(writer),
            Packet::LiteralData(p) => p.to_writer(writer),
            Packet::Marker(p) => p.to_writer(writer),
            Packet::ModDetectionCode(p) => p.to_writer(writer),
            Packet::OnePassSignature(p) => p.to_writer(writer),
            Packet::PublicKeyEncryptedSessionKey(p) => p.to_writer(writer),
            Packet::Signature(p) => p.to_writer(writer),
            Packet::SymKeyEncryptedSessionKey(p) => p.to_writer(writer),
            Packet::Trust(p) => p.to_writer(writer),
            Packet::UserAttribute(p) => p.to_writer(writer),
            Packet::UserId(p) => p.to_writer(writer),
        }
    }

    fn write_len(&self) -> usize {
        match self {
            Packet::CompressedData(p) => p.write_len(),
            Packet::PublicKey(p) | Packet::PublicSubkey(p) => p.write_len(),
            Packet::SecretKey(p) | Packet::SecretSubkey(p) => p.write_len(),
            Packet::LiteralData(p) => p.write_len(),
            Packet::Marker(p) => p.write_len(),
            Packet::ModDetectionCode(p) => p.write_len(),
            Packet::OnePassSignature(p) => p.write_len(),
            Packet::PublicKeyEncryptedSessionKey(p) => p.write_len(),
            Packet::Signature(p) => p.write_len(),
            Packet::SymKeyEncryptedSessionKey(p) => p.write_len(),
            Packet::Trust(p) => p.write_len(),
            Packet::UserAttribute(p) => p.write_len(),
            Packet::UserId(p) => p.write_len(),
        }
    }
}

/// Parses a fully buffered packet body. The stream transforming tags
/// (compressed and encrypted data) never come through here; the driver
/// recurses into them instead.
pub fn parse_body(tag: Tag, body: Bytes, raw_subpackets: bool) -> Result<Packet> {
    let res = match tag {
        Tag::PublicKeyEncryptedSessionKey => PublicKeyEncryptedSessionKey::from_buf(body)
            .map(Packet::PublicKeyEncryptedSessionKey),
        Tag::Signature => Signature::from_buf(body, raw_subpackets).map(Packet::Signature),
        Tag::SymKeyEncryptedSessionKey => {
            SymKeyEncryptedSessionKey::from_buf(body).map(Packet::SymKeyEncryptedSessionKey)
        }
        Tag::OnePassSignature => OnePassSignature::from_buf(body).map(Packet::OnePassSignature),
        Tag::SecretKey => SecretKey::from_buf(tag, body).map(Packet::SecretKey),
        Tag::SecretSubkey => SecretKey::from_buf(tag, body).map(Packet::SecretSubkey),
        Tag::PublicKey => PublicKey::from_buf(tag, body).map(Packet::PublicKey),
        Tag::PublicSubkey => PublicKey::from_buf(tag, body).map(Packet::PublicSubkey),
        Tag::Marker => Marker::from_buf(body).map(Packet::Marker),
        Tag::LiteralData => LiteralData::from_buf(body).map(Packet::LiteralData),
        Tag::Trust => Trust::from_buf(body).map(Packet::Trust),
        Tag::UserId => UserId::from_buf(body).map(Packet::UserId),
        Tag::UserAttribute => UserAttribute::from_buf(body).map(Packet::UserAttribute),
        Tag::ModDetectionCode => ModDetectionCode::from_buf(body).map(Packet::ModDetectionCode),
        Tag::CompressedData | Tag::SymEncryptedData | Tag::SymEncryptedProtectedData => {
            return Err(crate::format_err!(
                "tag {:?} must be parsed as a stream",
                tag
            ))
        }
    };

    res.map_err(|e| Error::InvalidPacketContent {
        source: Box::new(e),
    })
}
