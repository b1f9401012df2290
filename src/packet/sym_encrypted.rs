//! Symmetrically Encrypted Data, with and without integrity
//! protection.
//!
//! The ciphertext itself streams through reader filters; this module
//! holds the whole-buffer transform for the integrity protected form,
//! whose MDC can only be checked once all bytes are present.
//!
//! Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.13>

use rand::{CryptoRng, Rng};
use sha1::{Digest, Sha1};

use crate::crypto::{CfbState, Crypto};
use crate::errors::{Error, Result};
use crate::types::{SessionKey, SymmetricKeyAlgorithm};
use crate::{bail, ensure};

/// The MDC trailer: packet header `0xD3 0x14` plus a SHA1 digest.
const MDC_LEN: usize = 2 + 20;

/// Decrypts the body of a version 1 integrity protected data packet
/// (everything after the version octet).
///
/// Returns the plaintext with the random prefix stripped but the
/// trailing MDC packet kept, so the nested packet stream still carries
/// it. Fails with [`Error::MdcError`] on any integrity mismatch.
pub fn decrypt_protected(
    crypto: &dyn Crypto,
    session_key: &SessionKey,
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let alg = session_key.alg;
    let bs = alg.block_size();
    ensure!(
        ciphertext.len() >= bs + 2 + MDC_LEN,
        "integrity protected packet too short"
    );

    let enc = crypto.block_encryptor(alg, &session_key.key)?;
    let iv = vec![0u8; bs];
    let mut cfb = CfbState::new(enc, &iv);

    let mut plain = ciphertext.to_vec();
    cfb.decrypt(&mut plain);

    if plain[bs - 2..bs] != plain[bs..bs + 2] {
        bail!("encrypted prefix repeat mismatch (wrong session key?)");
    }

    let mdc_start = plain.len() - MDC_LEN;
    if plain[mdc_start] != 0xD3 || plain[mdc_start + 1] != 0x14 {
        return Err(Error::MdcError);
    }

    // SHA1 over prefix, plaintext and the MDC packet header
    let digest = Sha1::digest(&plain[..mdc_start + 2]);
    if digest.as_slice() != &plain[mdc_start + 2..] {
        return Err(Error::MdcError);
    }

    Ok(plain.split_off(bs + 2))
}

/// Encrypts `plaintext` as the body of a version 1 integrity protected
/// data packet (the version octet is not included).
pub fn encrypt_protected<R: Rng + CryptoRng>(
    crypto: &dyn Crypto,
    session_key: &SessionKey,
    rng: &mut R,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let alg = session_key.alg;
    let bs = alg.block_size();

    let mut out = Vec::with_capacity(bs + 2 + plaintext.len() + MDC_LEN);
    let mut prefix = vec![0u8; bs + 2];
    rng.fill_bytes(&mut prefix[..bs]);
    let (head, tail) = prefix.split_at_mut(bs);
    tail.copy_from_slice(&head[bs - 2..]);
    out.extend_from_slice(&prefix);
    out.extend_from_slice(plaintext);
    out.extend_from_slice(&[0xD3, 0x14]);

    let digest = Sha1::digest(&out);
    out.extend_from_slice(&digest);

    let enc = crypto.block_encryptor(alg, &session_key.key)?;
    let iv = vec![0u8; bs];
    let mut cfb = CfbState::new(enc, &iv);
    cfb.encrypt(&mut out);

    Ok(out)
}

/// Encrypts `plaintext` as a legacy (unprotected) symmetrically
/// encrypted data packet body, with the historic resync after the
/// prefix.
pub fn encrypt_legacy<R: Rng + CryptoRng>(
    crypto: &dyn Crypto,
    session_key: &SessionKey,
    rng: &mut R,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let alg = session_key.alg;
    let bs = alg.block_size();

    let mut prefix = vec![0u8; bs + 2];
    rng.fill_bytes(&mut prefix[..bs]);
    let (head, tail) = prefix.split_at_mut(bs);
    tail.copy_from_slice(&head[bs - 2..]);

    let enc = crypto.block_encryptor(alg, &session_key.key)?;
    let iv = vec![0u8; bs];
    let mut cfb = CfbState::new(enc, &iv);

    cfb.encrypt(&mut prefix);
    let resync_tail = prefix[2..bs + 2].to_vec();
    cfb.resync(&resync_tail);

    let mut body = plaintext.to_vec();
    cfb.encrypt(&mut body);

    let mut out = prefix;
    out.extend_from_slice(&body);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::DefaultCrypto;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn key() -> SessionKey {
        SessionKey::new(SymmetricKeyAlgorithm::AES128, vec![0x11; 16])
    }

    #[test]
    fn protected_roundtrip() {
        let mut rng = StdRng::seed_from_u64(7);
        let cipher =
            encrypt_protected(&DefaultCrypto, &key(), &mut rng, b"top secret bytes").unwrap();

        let plain = decrypt_protected(&DefaultCrypto, &key(), &cipher).unwrap();
        // plaintext followed by the 22 byte MDC packet
        assert_eq!(&plain[..16], b"top secret bytes");
        assert_eq!(plain.len(), 16 + MDC_LEN);
        assert_eq!(&plain[16..18], &[0xD3, 0x14]);
    }

    #[test]
    fn bit_flip_detected() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut cipher =
            encrypt_protected(&DefaultCrypto, &key(), &mut rng, b"top secret bytes").unwrap();
        let mid = cipher.len() / 2;
        cipher[mid] ^= 0x20;

        let err = decrypt_protected(&DefaultCrypto, &key(), &cipher).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn wrong_key_rejected_before_mdc() {
        let mut rng = StdRng::seed_from_u64(7);
        let cipher = encrypt_protected(&DefaultCrypto, &key(), &mut rng, b"data").unwrap();

        let wrong = SessionKey::new(SymmetricKeyAlgorithm::AES128, vec![0x12; 16]);
        assert!(decrypt_protected(&DefaultCrypto, &wrong, &cipher).is_err());
    }

    #[test]
    fn legacy_roundtrip_via_filter() {
        use crate::reader::{DecryptFilter, ReaderStack, Source};

        let mut rng = StdRng::seed_from_u64(3);
        let cipher = encrypt_legacy(&DefaultCrypto, &key(), &mut rng, b"old style").unwrap();

        let enc = DefaultCrypto
            .block_encryptor(SymmetricKeyAlgorithm::AES128, &key().key)
            .unwrap();
        let cfb = CfbState::new(enc, &[0u8; 16]);

        let mut stack = ReaderStack::new(&cipher[..]);
        stack.push(Box::new(DecryptFilter::new(
            cfb,
            SymmetricKeyAlgorithm::AES128,
            Some(cipher.len()),
            true,
        )));

        let mut out = vec![0u8; 9];
        assert_eq!(stack.read_all(&mut out).unwrap(), 9);
        assert_eq!(&out, b"old style");
    }
}
