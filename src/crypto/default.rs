use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256};
use digest::{Digest, DynDigest};
use num_bigint::BigUint;
use num_traits::Zero;
use zeroize::Zeroizing;

use crate::errors::{Error, Result};
use crate::types::{
    HashAlgorithm, Mpi, PlainSecretParams, PublicKeyAlgorithm, PublicParams,
    SymmetricKeyAlgorithm,
};
use crate::{ensure, unsupported_err};

use super::{BlockEncryptor, Crypto};

/// Crypto backend over the RustCrypto crates plus `num-bigint` for the
/// raw RSA operations. Algorithms outside its coverage return
/// [`Error::Unsupported`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCrypto;

struct Aes128Enc(Aes128);
struct Aes192Enc(Aes192);
struct Aes256Enc(Aes256);

macro_rules! impl_block_encryptor {
    ($name:ident) => {
        impl BlockEncryptor for $name {
            fn block_size(&self) -> usize {
                16
            }

            fn encrypt_block(&self, block: &mut [u8]) {
                self.0
                    .encrypt_block(GenericArray::from_mut_slice(block));
            }
        }
    };
}

impl_block_encryptor!(Aes128Enc);
impl_block_encryptor!(Aes192Enc);
impl_block_encryptor!(Aes256Enc);

impl Crypto for DefaultCrypto {
    fn hasher(&self, alg: HashAlgorithm) -> Result<Box<dyn DynDigest>> {
        let h: Box<dyn DynDigest> = match alg {
            HashAlgorithm::MD5 => Box::new(md5::Md5::new()),
            HashAlgorithm::SHA1 => Box::new(sha1::Sha1::new()),
            HashAlgorithm::RIPEMD160 => Box::new(ripemd::Ripemd160::new()),
            HashAlgorithm::SHA224 => Box::new(sha2::Sha224::new()),
            HashAlgorithm::SHA256 => Box::new(sha2::Sha256::new()),
            HashAlgorithm::SHA384 => Box::new(sha2::Sha384::new()),
            HashAlgorithm::SHA512 => Box::new(sha2::Sha512::new()),
        };
        Ok(h)
    }

    fn block_encryptor(
        &self,
        alg: SymmetricKeyAlgorithm,
        key: &[u8],
    ) -> Result<Box<dyn BlockEncryptor>> {
        if key.len() != alg.key_size() {
            return Err(Error::InvalidKeyLength);
        }

        match alg {
            SymmetricKeyAlgorithm::AES128 => Ok(Box::new(Aes128Enc(
                Aes128::new_from_slice(key).map_err(|_| Error::InvalidKeyLength)?,
            ))),
            SymmetricKeyAlgorithm::AES192 => Ok(Box::new(Aes192Enc(
                Aes192::new_from_slice(key).map_err(|_| Error::InvalidKeyLength)?,
            ))),
            SymmetricKeyAlgorithm::AES256 => Ok(Box::new(Aes256Enc(
                Aes256::new_from_slice(key).map_err(|_| Error::InvalidKeyLength)?,
            ))),
            _ => unsupported_err!("symmetric algorithm {:?}", alg),
        }
    }

    fn pk_decrypt(
        &self,
        alg: PublicKeyAlgorithm,
        public: &PublicParams,
        secret: &PlainSecretParams,
        cipher_mpis: &[Mpi],
    ) -> Result<Zeroizing<Vec<u8>>> {
        match alg {
            PublicKeyAlgorithm::RSA | PublicKeyAlgorithm::RSAEncrypt => {
                let PublicParams::Rsa { n, .. } = public else {
                    unsupported_err!("mismatched RSA public params");
                };
                let PlainSecretParams::Rsa { d, .. } = secret else {
                    unsupported_err!("mismatched RSA secret params");
                };
                ensure!(!cipher_mpis.is_empty(), "missing RSA ciphertext MPI");

                let c = BigUint::from(&cipher_mpis[0]);
                let nn = BigUint::from_bytes_be(n.as_ref());
                ensure!(!c.is_zero() && c < nn, "RSA ciphertext out of range");
                let m = c.modpow(&BigUint::from_bytes_be(d), &nn);

                // restore the leading zeros the bignum dropped
                let k = n.len();
                let raw = m.to_bytes_be();
                let mut out = Zeroizing::new(vec![0u8; k]);
                let offset = k - raw.len();
                out[offset..].copy_from_slice(&raw);
                Ok(out)
            }
            _ => unsupported_err!("public key decryption with {:?}", alg),
        }
    }

    fn pk_verify(
        &self,
        alg: PublicKeyAlgorithm,
        public: &PublicParams,
        hash_alg: HashAlgorithm,
        hash: &[u8],
        sig_mpis: &[Mpi],
    ) -> Result<bool> {
        match alg {
            PublicKeyAlgorithm::RSA | PublicKeyAlgorithm::RSASign => {
                let PublicParams::Rsa { n, e } = public else {
                    unsupported_err!("mismatched RSA public params");
                };
                ensure!(!sig_mpis.is_empty(), "missing RSA signature MPI");

                let s = BigUint::from(&sig_mpis[0]);
                let nn = BigUint::from_bytes_be(n.as_ref());
                ensure!(!s.is_zero() && s < nn, "RSA signature out of range");
                let m = s.modpow(&BigUint::from_bytes_be(e.as_ref()), &nn);

                let k = n.len();
                let raw = m.to_bytes_be();
                if raw.len() + 1 > k {
                    return Ok(false);
                }
                let mut em = vec![0u8; k];
                em[k - raw.len()..].copy_from_slice(&raw);

                Ok(check_emsa_pkcs1(&em, hash_alg, hash))
            }
            _ => unsupported_err!("signature verification with {:?}", alg),
        }
    }
}

/// DigestInfo prefixes for EMSA-PKCS1-v1_5.
fn digest_info_prefix(alg: HashAlgorithm) -> &'static [u8] {
    match alg {
        HashAlgorithm::MD5 => &[
            0x30, 0x20, 0x30, 0x0c, 0x06, 0x08, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x02, 0x05,
            0x05, 0x00, 0x04, 0x10,
        ],
        HashAlgorithm::SHA1 => &[
            0x30, 0x21, 0x30, 0x09, 0x06, 0x05, 0x2b, 0x0e, 0x03, 0x02, 0x1a, 0x05, 0x00, 0x04,
            0x14,
        ],
        HashAlgorithm::RIPEMD160 => &[
            0x30, 0x21, 0x30, 0x09, 0x06, 0x05, 0x2b, 0x24, 0x03, 0x02, 0x01, 0x05, 0x00, 0x04,
            0x14,
        ],
        HashAlgorithm::SHA224 => &[
            0x30, 0x2d, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02,
            0x04, 0x05, 0x00, 0x04, 0x1c,
        ],
        HashAlgorithm::SHA256 => &[
            0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02,
            0x01, 0x05, 0x00, 0x04, 0x20,
        ],
        HashAlgorithm::SHA384 => &[
            0x30, 0x41, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02,
            0x02, 0x05, 0x00, 0x04, 0x30,
        ],
        HashAlgorithm::SHA512 => &[
            0x30, 0x51, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02,
            0x03, 0x05, 0x00, 0x04, 0x40,
        ],
    }
}

fn check_emsa_pkcs1(em: &[u8], hash_alg: HashAlgorithm, hash: &[u8]) -> bool {
    let prefix = digest_info_prefix(hash_alg);
    if em.len() < prefix.len() + hash.len() + 11 {
        return false;
    }
    if em[0] != 0x00 || em[1] != 0x01 {
        return false;
    }
    let t_len = prefix.len() + hash.len();
    let ps_end = em.len() - t_len - 1;
    if !em[2..ps_end].iter().all(|b| *b == 0xFF) {
        return false;
    }
    if em[ps_end] != 0x00 {
        return false;
    }
    em[ps_end + 1..ps_end + 1 + prefix.len()] == *prefix
        && em[ps_end + 1 + prefix.len()..] == *hash
}
