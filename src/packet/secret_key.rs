//! Secret-Key and Secret-Subkey Packets
//!
//! Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.5.3>

use std::io;

use bytes::{Buf, Bytes};

use crate::crypto::{checksum, s2k_derive, CfbState, Crypto};
use crate::errors::{Error, Result};
use crate::packet::PublicKey;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{
    EncryptedSecretParams, HashAlgorithm, PlainSecretParams, SecretParams, StringToKey,
    SymmetricKeyAlgorithm, Tag,
};
use crate::writer::{ChecksumFilter, Sink, WriterStack};
use crate::ensure;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretKey {
    packet_tag: Tag,
    pub details: PublicKey,
    pub secret_params: SecretParams,
}

impl SecretKey {
    pub fn from_buf<B: Buf>(tag: Tag, mut i: B) -> Result<Self> {
        ensure!(
            matches!(tag, Tag::SecretKey | Tag::SecretSubkey),
            "not a secret key tag: {:?}",
            tag
        );
        let public_tag = if tag == Tag::SecretKey {
            Tag::PublicKey
        } else {
            Tag::PublicSubkey
        };
        let details = PublicKey::from_buf(public_tag, &mut i)?;

        let usage = i.read_u8()?;
        let secret_params = match usage {
            0 => {
                // plaintext fields followed by a two octet checksum
                let data = i.rest();
                ensure!(data.len() > 2, "truncated secret key fields");
                let (body, check) = data.split_at(data.len() - 2);
                checksum::simple(check, body)?;

                let mut body = body;
                let params = PlainSecretParams::from_buf(details.algorithm, &mut body)?;
                ensure!(body.is_empty(), "trailing bytes after secret key fields");
                SecretParams::Plain(params)
            }
            254 | 255 => {
                let cipher = i.read_u8()?;
                let cipher = SymmetricKeyAlgorithm::try_from(cipher)
                    .map_err(|_| crate::format_err!("invalid symmetric algorithm {}", cipher))?;
                let s2k = StringToKey::from_buf(&mut i)?;
                let iv = i.read_take(cipher.block_size())?.to_vec();
                let data = i.rest();
                SecretParams::Encrypted(EncryptedSecretParams {
                    usage,
                    cipher,
                    s2k,
                    iv,
                    data,
                })
            }
            _ => {
                // legacy form: the usage octet is the cipher id and the
                // passphrase is hashed with MD5, no explicit S2K
                let cipher = SymmetricKeyAlgorithm::try_from(usage)
                    .map_err(|_| crate::format_err!("invalid s2k usage {}", usage))?;
                let iv = i.read_take(cipher.block_size())?.to_vec();
                let data = i.rest();
                SecretParams::Encrypted(EncryptedSecretParams {
                    usage,
                    cipher,
                    s2k: StringToKey::new_simple(HashAlgorithm::MD5),
                    iv,
                    data,
                })
            }
        };

        Ok(SecretKey {
            packet_tag: tag,
            details,
            secret_params,
        })
    }

    pub fn is_encrypted(&self) -> bool {
        self.secret_params.is_encrypted()
    }

    /// Decrypts the secret fields in place. A no-op when they are
    /// already plain.
    pub fn unlock(&mut self, crypto: &dyn Crypto, passphrase: &[u8]) -> Result<()> {
        let enc = match self.secret_params {
            SecretParams::Plain(_) => return Ok(()),
            SecretParams::Encrypted(ref enc) => enc,
        };

        let key = s2k_derive(crypto, &enc.s2k, passphrase, enc.cipher.key_size())?;
        let block = crypto.block_encryptor(enc.cipher, &key)?;
        let mut cfb = CfbState::new(block, &enc.iv);

        let plain = if enc.usage == 254 || enc.usage == 255 || self.details.version >= 4 {
            Self::decrypt_block(&mut cfb, enc, self.details.algorithm)?
        } else {
            Self::decrypt_legacy(&mut cfb, enc, self.details.algorithm)?
        };

        self.secret_params = SecretParams::Plain(plain);
        Ok(())
    }

    /// Modern form: all fields and the trailing check encrypted as one
    /// CFB stream.
    fn decrypt_block(
        cfb: &mut CfbState,
        enc: &EncryptedSecretParams,
        alg: crate::types::PublicKeyAlgorithm,
    ) -> Result<PlainSecretParams> {
        let mut plain = enc.data.to_vec();
        cfb.decrypt(&mut plain);

        let check_len = if enc.usage == 254 { 20 } else { 2 };
        ensure!(plain.len() > check_len, "truncated secret key fields");
        let (body, check) = plain.split_at(plain.len() - check_len);

        if enc.usage == 254 {
            checksum::sha1(check, body)?;
        } else {
            checksum::simple(check, body)?;
        }

        let mut body = body;
        let params = PlainSecretParams::from_buf(alg, &mut body)?;
        ensure!(body.is_empty(), "trailing bytes after secret key fields");
        Ok(params)
    }

    /// v3 form: each MPI body is encrypted separately, with the length
    /// prefixes and the trailing checksum in the clear, and the cipher
    /// resynchronized after every field.
    fn decrypt_legacy(
        cfb: &mut CfbState,
        enc: &EncryptedSecretParams,
        alg: crate::types::PublicKeyAlgorithm,
    ) -> Result<PlainSecretParams> {
        let mpi_count = match alg {
            crate::types::PublicKeyAlgorithm::RSA
            | crate::types::PublicKeyAlgorithm::RSAEncrypt
            | crate::types::PublicKeyAlgorithm::RSASign => 4,
            crate::types::PublicKeyAlgorithm::DSA | crate::types::PublicKeyAlgorithm::Elgamal => 1,
            _ => {
                return Err(Error::UnsupportedPublicKeyAlgorithm { alg: alg.into() });
            }
        };

        let bs = cfb.block_size();
        let mut input = enc.data.clone();
        let mut plain_fields = Vec::with_capacity(2 + enc.data.len());

        for _ in 0..mpi_count {
            let bits = input.read_be_u16()?;
            let len = usize::from((bits + 7) >> 3);
            let cipher_body = input.read_take(len)?;
            let mut body = cipher_body.to_vec();
            cfb.decrypt(&mut body);
            if cipher_body.len() >= bs {
                cfb.resync(&cipher_body[cipher_body.len() - bs..]);
            }
            plain_fields.extend_from_slice(&bits.to_be_bytes());
            plain_fields.extend_from_slice(&body);
        }

        // the checksum itself is stored in the clear
        let check = input.read_array::<2>()?;
        ensure!(!input.has_remaining(), "trailing bytes after secret key fields");
        checksum::simple(&check, &plain_fields)?;

        let mut body = &plain_fields[..];
        let params = PlainSecretParams::from_buf(alg, &mut body)?;
        ensure!(body.is_empty(), "trailing bytes after secret key fields");
        Ok(params)
    }

    pub fn tag(&self) -> Tag {
        self.packet_tag
    }
}

impl Serialize for SecretKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        self.details.to_writer(writer)?;
        match self.secret_params {
            SecretParams::Plain(ref params) => {
                writer.write_all(&[0])?;
                let body = params.to_bytes()?;
                writer.write_all(&body)?;
                let check = checksum::calc_simple(&body);
                writer.write_all(&[(check >> 8) as u8, check as u8])?;
            }
            SecretParams::Encrypted(ref enc) => {
                writer.write_all(&[enc.usage])?;
                if enc.usage == 254 || enc.usage == 255 {
                    writer.write_all(&[enc.cipher.into()])?;
                    enc.s2k.to_writer(writer)?;
                }
                writer.write_all(&enc.iv)?;
                writer.write_all(&enc.data)?;
            }
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        let mut sum = self.details.write_len() + 1;
        match self.secret_params {
            SecretParams::Plain(ref params) => sum += params.write_len() + 2,
            SecretParams::Encrypted(ref enc) => {
                if enc.usage == 254 || enc.usage == 255 {
                    sum += 1 + enc.s2k.write_len();
                }
                sum += enc.iv.len() + enc.data.len();
            }
        }
        sum
    }
}

/// Used by tests and the keygen-less write path: wraps plain fields in
/// the modern encrypted form.
pub fn encrypt_secret_params(
    crypto: &dyn Crypto,
    params: &PlainSecretParams,
    passphrase: &[u8],
    cipher: SymmetricKeyAlgorithm,
    s2k: StringToKey,
    iv: Vec<u8>,
) -> Result<EncryptedSecretParams> {
    ensure!(iv.len() == cipher.block_size(), "bad iv length");
    let key = s2k_derive(crypto, &s2k, passphrase, cipher.key_size())?;
    let block = crypto.block_encryptor(cipher, &key)?;
    let mut cfb = CfbState::new(block, &iv);

    let mut stack = WriterStack::new(Vec::new());
    stack.push(Box::new(ChecksumFilter::for_usage(254)));
    Sink::write_all(&mut stack, &params.to_bytes()?)?;
    let mut body = stack.finish_all()?;
    cfb.encrypt(&mut body);

    Ok(EncryptedSecretParams {
        usage: 254,
        cipher,
        s2k,
        iv,
        data: Bytes::from(body),
    })
}
