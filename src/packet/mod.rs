//! Packet bodies and their wire framing.

mod compressed_data;
mod header;
mod literal_data;
mod marker;
mod mdc;
mod one_pass_signature;
mod packet_sum;
mod public_key;
mod public_key_encrypted_session_key;
mod secret_key;
mod signature;
pub mod subpacket;
pub mod sym_encrypted;
mod sym_key_encrypted_session_key;
mod trust;
mod user_attribute;
mod user_id;

pub use self::compressed_data::CompressedData;
pub use self::header::{
    body_len_len, read_packet_header, write_body_len, write_packet_header, write_partial_len,
    PacketHeader,
};
pub use self::literal_data::{DataMode, LiteralData, LiteralDataHeader};
pub use self::marker::Marker;
pub use self::mdc::ModDetectionCode;
pub use self::one_pass_signature::OnePassSignature;
pub use self::packet_sum::{parse_body, Packet};
pub use self::public_key::PublicKey;
pub use self::public_key_encrypted_session_key::PublicKeyEncryptedSessionKey;
pub use self::secret_key::{encrypt_secret_params, SecretKey};
pub use self::signature::Signature;
pub use self::subpacket::{Subpacket, SubpacketData};
pub use self::sym_key_encrypted_session_key::SymKeyEncryptedSessionKey;
pub use self::trust::Trust;
pub use self::user_attribute::{UserAttribute, UserAttributeSubpacket};
pub use self::user_id::UserId;

use std::io;

use crate::errors::Result;
use crate::ser::Serialize;
use crate::types::Tag;

/// A packet body that knows its own tag.
pub trait PacketTrait: Serialize {
    fn packet_tag(&self) -> Tag;
}

macro_rules! impl_packet_trait {
    ($($t:ty),+ $(,)?) => {
        $(
            impl PacketTrait for $t {
                fn packet_tag(&self) -> Tag {
                    self.tag()
                }
            }
        )+
    };
}

impl_packet_trait!(
    CompressedData,
    LiteralData,
    Marker,
    ModDetectionCode,
    OnePassSignature,
    Packet,
    PublicKey,
    PublicKeyEncryptedSessionKey,
    SecretKey,
    Signature,
    SymKeyEncryptedSessionKey,
    Trust,
    UserAttribute,
    UserId,
);

/// Writes `packet` framed with a new format header and a fixed length.
pub fn write_packet<W: io::Write>(writer: &mut W, packet: &impl PacketTrait) -> Result<()> {
    write_packet_header(writer, packet.packet_tag(), packet.write_len())?;
    packet.to_writer(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_packet_frames_body() {
        let mut out = Vec::new();
        write_packet(&mut out, &Marker).unwrap();
        assert_eq!(out, [0b1100_0000 | 10, 3, b'P', b'G', b'P']);
    }
}
