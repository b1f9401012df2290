//! End to end scenarios driven through the top level parser.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{TimeZone, Utc};
use digest::DynDigest;
use rand::rngs::StdRng;
use rand::SeedableRng;
use zeroize::Zeroizing;

use pgpstream::armor::BlockType;
use pgpstream::crypto::{checksum, BlockEncryptor, Crypto, DefaultCrypto};
use pgpstream::errors::{Error, Result};
use pgpstream::packet::{
    self, write_body_len, write_packet, LiteralData, Packet, PublicKey,
    PublicKeyEncryptedSessionKey, SecretKey, Signature, SymKeyEncryptedSessionKey,
};
use pgpstream::parse::{parse, Event, Handler, ParseConfig};
use pgpstream::ser::Serialize;
use pgpstream::types::{
    HashAlgorithm, KeyId, Mpi, PlainSecretParams, PublicKeyAlgorithm, PublicParams, SessionKey,
    StringToKey, SymmetricKeyAlgorithm, Tag,
};
use pgpstream::writer::{ArmorFilter, DashEscapeFilter, Sink, WriterStack};

#[derive(Default)]
struct Collector {
    packets: Vec<Packet>,
    literal: Vec<u8>,
    cleartext: Vec<u8>,
    armor_blocks: Vec<BlockType>,
    signatures: Vec<(Signature, bool)>,
    passphrase: Option<Vec<u8>>,
    secret_key: Option<SecretKey>,
}

impl Handler for Collector {
    fn event(&mut self, event: Event<'_>) -> Result<()> {
        match event {
            Event::Packet(p) => self.packets.push(p),
            Event::LiteralChunk(c) => self.literal.extend_from_slice(c),
            Event::CleartextBody(line) => self.cleartext.extend_from_slice(&line),
            Event::ArmorBegin { typ, .. } => self.armor_blocks.push(typ),
            Event::Signature { signature, hash } => {
                self.signatures.push((signature, hash.is_some()))
            }
            _ => {}
        }
        Ok(())
    }

    fn get_passphrase(&mut self) -> Option<Vec<u8>> {
        self.passphrase.clone()
    }

    fn get_secret_key(&mut self, _id: &KeyId) -> Option<SecretKey> {
        self.secret_key.clone()
    }
}

fn literal_packet(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    write_packet(&mut out, &LiteralData::from_bytes(data.to_vec())).unwrap();
    out
}

/// Frames a version 1 integrity protected data packet around
/// already-encrypted bytes.
fn seip_packet(encrypted: &[u8]) -> Vec<u8> {
    let mut out = vec![0b1100_0000 | 18];
    write_body_len(&mut out, 1 + encrypted.len()).unwrap();
    out.push(1);
    out.extend_from_slice(encrypted);
    out
}

#[test]
fn armored_message_roundtrip() {
    let mut stack = WriterStack::new(Vec::new());
    stack.push(Box::new(ArmorFilter::new(BlockType::Message)));
    stack.write_all(&literal_packet(b"hello armored")).unwrap();
    let armored = stack.finish_all().unwrap();

    let text = String::from_utf8(armored.clone()).unwrap();
    assert!(text.starts_with("-----BEGIN PGP MESSAGE-----\n"));
    assert!(text.ends_with("-----END PGP MESSAGE-----\n"));

    let mut collector = Collector::default();
    let config = ParseConfig {
        dearmor: true,
        ..Default::default()
    };
    let errors = parse(&armored[..], Arc::new(DefaultCrypto), config, &mut collector).unwrap();
    assert!(errors.is_empty(), "{errors:?}");
    assert_eq!(collector.armor_blocks, [BlockType::Message]);
    assert_eq!(collector.literal, b"hello armored");
}

#[test]
fn seip_bit_flip_is_fatal() {
    let crypto = DefaultCrypto;
    let skesk = SymKeyEncryptedSessionKey {
        sym_algorithm: SymmetricKeyAlgorithm::AES128,
        s2k: StringToKey::new_simple(HashAlgorithm::SHA256),
        encrypted_key: None,
    };
    let session_key = skesk.decrypt(&crypto, b"pw").unwrap();

    let mut rng = StdRng::seed_from_u64(11);
    let mut encrypted = packet::sym_encrypted::encrypt_protected(
        &crypto,
        &session_key,
        &mut rng,
        &literal_packet(b"tamper with me"),
    )
    .unwrap();
    // corrupt one ciphertext byte well past the random prefix
    let mid = encrypted.len() / 2;
    encrypted[mid] ^= 0x01;

    let mut data = Vec::new();
    write_packet(&mut data, &skesk).unwrap();
    data.extend_from_slice(&seip_packet(&encrypted));

    let mut collector = Collector::default();
    collector.passphrase = Some(b"pw".to_vec());
    let err = parse(
        &data[..],
        Arc::new(DefaultCrypto),
        ParseConfig::default(),
        &mut collector,
    )
    .unwrap_err();
    assert!(matches!(err, Error::MdcError));
    assert!(err.is_fatal());
    assert!(collector.literal.is_empty());
}

/// A crypto backend whose public key decryption returns a canned
/// padded block, standing in for the RSA math.
struct StubCrypto {
    decrypted: Vec<u8>,
}

impl Crypto for StubCrypto {
    fn hasher(&self, alg: HashAlgorithm) -> Result<Box<dyn DynDigest>> {
        DefaultCrypto.hasher(alg)
    }

    fn block_encryptor(
        &self,
        alg: SymmetricKeyAlgorithm,
        key: &[u8],
    ) -> Result<Box<dyn BlockEncryptor>> {
        DefaultCrypto.block_encryptor(alg, key)
    }

    fn pk_decrypt(
        &self,
        _alg: PublicKeyAlgorithm,
        _public: &PublicParams,
        _secret: &PlainSecretParams,
        _cipher_mpis: &[Mpi],
    ) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new(self.decrypted.clone()))
    }

    fn pk_verify(
        &self,
        _alg: PublicKeyAlgorithm,
        _public: &PublicParams,
        _hash_alg: HashAlgorithm,
        _hash: &[u8],
        _sig_mpis: &[Mpi],
    ) -> Result<bool> {
        Ok(true)
    }
}

fn rsa_secret_key() -> SecretKey {
    let public = PublicKey::new(
        Tag::PublicKey,
        4,
        Utc.timestamp_opt(1_600_000_000, 0).single().unwrap(),
        None,
        PublicKeyAlgorithm::RSA,
        PublicParams::Rsa {
            n: Mpi::from_slice(&[0xC5, 0x01, 0x02, 0x03]),
            e: Mpi::from_slice(&[0x01, 0x00, 0x01]),
        },
    )
    .unwrap();

    let mut body = public.to_bytes().unwrap();
    body.push(0); // plain secret fields
    let params = PlainSecretParams::Rsa {
        d: vec![0x21],
        p: vec![0x33],
        q: vec![0x55],
        u: vec![0x77],
    };
    let fields = params.to_bytes().unwrap();
    let sum = checksum::calc_simple(&fields);
    body.extend_from_slice(&fields);
    body.extend_from_slice(&[(sum >> 8) as u8, sum as u8]);
    SecretKey::from_buf(Tag::SecretKey, Bytes::from(body)).unwrap()
}

/// `0x00 0x02 <pad> 0x00 <alg> <key> <checksum>` as RSA decryption
/// would yield it.
fn padded_session_key(key: &[u8], checksum_ok: bool) -> Vec<u8> {
    let mut block = vec![0x00, 0x02];
    block.extend_from_slice(&[0x11; 8]);
    block.push(0x00);
    block.push(u8::from(SymmetricKeyAlgorithm::AES128));
    block.extend_from_slice(key);
    let mut sum = checksum::calc_simple(key);
    if !checksum_ok {
        sum ^= 0x01;
    }
    block.extend_from_slice(&[(sum >> 8) as u8, sum as u8]);
    block
}

fn pkesk_packet() -> Vec<u8> {
    let pkesk = PublicKeyEncryptedSessionKey {
        id: [9, 9, 9, 9, 9, 9, 9, 9].into(),
        algorithm: PublicKeyAlgorithm::RSA,
        mpis: vec![Mpi::from_slice(&[0x42])],
    };
    let mut out = Vec::new();
    write_packet(&mut out, &pkesk).unwrap();
    out
}

#[test]
fn session_key_checksum_mismatch_aborts() {
    let key = [0xAB; 16];
    let crypto = StubCrypto {
        decrypted: padded_session_key(&key, false),
    };

    let mut data = pkesk_packet();
    // bulk data that must never be decrypted with the unchecked key
    data.extend_from_slice(&literal_packet(b"unreached"));

    let mut collector = Collector::default();
    collector.secret_key = Some(rsa_secret_key());
    let err = parse(
        &data[..],
        Arc::new(crypto),
        ParseConfig::default(),
        &mut collector,
    )
    .unwrap_err();
    assert!(matches!(err, Error::SessionKeyChecksum));
    assert!(collector.literal.is_empty());
}

#[test]
fn pkesk_session_key_decrypts_protected_data() {
    let key = [0xAB; 16];
    let crypto = StubCrypto {
        decrypted: padded_session_key(&key, true),
    };
    let session_key = SessionKey::new(SymmetricKeyAlgorithm::AES128, key.to_vec());

    let mut rng = StdRng::seed_from_u64(3);
    let encrypted = packet::sym_encrypted::encrypt_protected(
        &DefaultCrypto,
        &session_key,
        &mut rng,
        &literal_packet(b"for your eyes only"),
    )
    .unwrap();

    let mut data = pkesk_packet();
    data.extend_from_slice(&seip_packet(&encrypted));

    let mut collector = Collector::default();
    collector.secret_key = Some(rsa_secret_key());
    let errors = parse(
        &data[..],
        Arc::new(crypto),
        ParseConfig::default(),
        &mut collector,
    )
    .unwrap();
    assert!(errors.is_empty(), "{errors:?}");
    assert_eq!(collector.literal, b"for your eyes only");
    assert!(collector
        .packets
        .iter()
        .any(|p| p.tag() == Tag::PublicKeyEncryptedSessionKey));
}

/// A v4 signature body with one critical subpacket from the
/// experimental range.
fn critical_subpacket_sig_body() -> Vec<u8> {
    let mut sig_body = vec![4u8, 0, 1, 8];
    sig_body.extend_from_slice(&[0, 3]); // hashed area length
    sig_body.extend_from_slice(&[2, 100 | 0x80, 0xAA]);
    sig_body.extend_from_slice(&[0, 0]); // no unhashed subpackets
    sig_body.extend_from_slice(&[0x12, 0x34]);
    sig_body.extend_from_slice(&[0, 1, 1]);
    sig_body
}

#[test]
fn critical_unknown_subpacket_is_reported_not_fatal() {
    let sig_body = critical_subpacket_sig_body();
    let mut data = vec![0b1100_0000 | 2, sig_body.len() as u8];
    data.extend_from_slice(&sig_body);
    data.extend_from_slice(&literal_packet(b"still here"));

    let mut collector = Collector::default();
    let errors = parse(
        &data[..],
        Arc::new(DefaultCrypto),
        ParseConfig::default(),
        &mut collector,
    )
    .unwrap();

    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0],
        Error::CriticalSubpacketIgnored { typ: 100 }
    ));
    assert_eq!(collector.signatures.len(), 1);
    assert_eq!(collector.literal, b"still here");
}

#[test]
fn critical_unknown_subpacket_aborts_when_configured() {
    let sig_body = critical_subpacket_sig_body();
    let mut data = vec![0b1100_0000 | 2, sig_body.len() as u8];
    data.extend_from_slice(&sig_body);

    let mut collector = Collector::default();
    let config = ParseConfig {
        critical_subpackets_fatal: true,
        ..Default::default()
    };
    let err = parse(&data[..], Arc::new(DefaultCrypto), config, &mut collector).unwrap_err();
    assert!(matches!(err, Error::CriticalSubpacketIgnored { typ: 100 }));
}

#[test]
fn cleartext_signature_quick_check_passes() {
    let crypto = DefaultCrypto;
    let hash = crypto.hasher(HashAlgorithm::SHA256).unwrap();
    let (filter, handle) = DashEscapeFilter::new(HashAlgorithm::SHA256, hash);

    let mut stack = WriterStack::new(Vec::new());
    stack.push(Box::new(filter));
    stack.write_all(b"first line\nsecond line").unwrap();
    let mut data = stack.finish_all().unwrap();
    let doc_hash = handle.take().unwrap();

    // v4 text signature whose quick check bytes match the document
    let hashed_area = [4u8, 1, 1, 8, 0, 0];
    let mut check = doc_hash.box_clone();
    check.update(&hashed_area);
    check.update(&[0x04, 0xFF, 0, 0, 0, 6]);
    let digest = check.finalize();

    let mut sig_body = hashed_area.to_vec();
    sig_body.extend_from_slice(&[0, 0]);
    sig_body.extend_from_slice(&digest[..2]);
    sig_body.extend_from_slice(&[0, 1, 1]);
    let mut sig_packet = vec![0b1100_0000 | 2, sig_body.len() as u8];
    sig_packet.extend_from_slice(&sig_body);

    let mut armor = WriterStack::new(Vec::new());
    armor.push(Box::new(ArmorFilter::new(BlockType::Signature)));
    armor.write_all(&sig_packet).unwrap();
    data.extend_from_slice(&armor.finish_all().unwrap());

    let mut collector = Collector::default();
    let config = ParseConfig {
        dearmor: true,
        ..Default::default()
    };
    let errors = parse(&data[..], Arc::new(DefaultCrypto), config, &mut collector).unwrap();
    assert!(errors.is_empty(), "{errors:?}");
    assert_eq!(collector.cleartext, b"first line\nsecond line\n");
    assert_eq!(collector.signatures.len(), 1);
    assert!(collector.signatures[0].1, "cleartext hash delivered");
}
