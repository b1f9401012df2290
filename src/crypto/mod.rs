//! The crypto capability consumed by the packet engine.
//!
//! The engine never implements the underlying math itself; it drives
//! hash contexts, block ciphers and public key operations through the
//! [`Crypto`] trait. [`DefaultCrypto`] provides a backend over the
//! RustCrypto crates for the common algorithms.

pub mod cfb;
pub mod checksum;
mod default;
mod kdf;

pub use self::cfb::CfbState;
pub use self::default::DefaultCrypto;
pub use self::kdf::s2k_derive;

use digest::DynDigest;
use zeroize::Zeroizing;

use crate::errors::Result;
use crate::types::{
    HashAlgorithm, Mpi, PlainSecretParams, PublicKeyAlgorithm, PublicParams,
    SymmetricKeyAlgorithm,
};

/// A block cipher in the forward direction. CFB mode never needs the
/// inverse.
pub trait BlockEncryptor {
    fn block_size(&self) -> usize;
    /// Encrypts one block, in place. `block` must be exactly
    /// `block_size` bytes.
    fn encrypt_block(&self, block: &mut [u8]);
}

/// The capability surface the engine requires from its crypto backend.
pub trait Crypto {
    /// Returns a fresh streaming hash context.
    fn hasher(&self, alg: HashAlgorithm) -> Result<Box<dyn DynDigest>>;

    /// Returns a keyed block encryptor for the given algorithm.
    fn block_encryptor(
        &self,
        alg: SymmetricKeyAlgorithm,
        key: &[u8],
    ) -> Result<Box<dyn BlockEncryptor>>;

    /// Raw public key decryption of `cipher_mpis`, returning the full
    /// padded message block (the engine removes the EME-PKCS1 padding).
    fn pk_decrypt(
        &self,
        alg: PublicKeyAlgorithm,
        public: &PublicParams,
        secret: &PlainSecretParams,
        cipher_mpis: &[Mpi],
    ) -> Result<Zeroizing<Vec<u8>>>;

    /// Verifies the signature values in `sig_mpis` over the digest
    /// `hash`.
    fn pk_verify(
        &self,
        alg: PublicKeyAlgorithm,
        public: &PublicParams,
        hash_alg: HashAlgorithm,
        hash: &[u8],
        sig_mpis: &[Mpi],
    ) -> Result<bool>;
}
