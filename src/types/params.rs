use std::io;

use bytes::{Buf, Bytes};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::errors::{Error, Result};
use crate::ser::Serialize;
use crate::types::{Mpi, PublicKeyAlgorithm, StringToKey, SymmetricKeyAlgorithm};

/// Algorithm specific public key parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicParams {
    Rsa { n: Mpi, e: Mpi },
    Dsa { p: Mpi, q: Mpi, g: Mpi, y: Mpi },
    Elgamal { p: Mpi, g: Mpi, y: Mpi },
}

impl PublicParams {
    pub fn from_buf<B: Buf>(alg: PublicKeyAlgorithm, mut i: B) -> Result<Self> {
        match alg {
            PublicKeyAlgorithm::RSA
            | PublicKeyAlgorithm::RSAEncrypt
            | PublicKeyAlgorithm::RSASign => {
                let n = Mpi::from_buf(&mut i)?;
                let e = Mpi::from_buf(&mut i)?;
                Ok(PublicParams::Rsa { n, e })
            }
            PublicKeyAlgorithm::DSA => {
                let p = Mpi::from_buf(&mut i)?;
                let q = Mpi::from_buf(&mut i)?;
                let g = Mpi::from_buf(&mut i)?;
                let y = Mpi::from_buf(&mut i)?;
                Ok(PublicParams::Dsa { p, q, g, y })
            }
            PublicKeyAlgorithm::Elgamal => {
                let p = Mpi::from_buf(&mut i)?;
                let g = Mpi::from_buf(&mut i)?;
                let y = Mpi::from_buf(&mut i)?;
                Ok(PublicParams::Elgamal { p, g, y })
            }
            _ => Err(Error::UnsupportedPublicKeyAlgorithm { alg: alg.into() }),
        }
    }
}

impl Serialize for PublicParams {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            PublicParams::Rsa { n, e } => {
                n.to_writer(writer)?;
                e.to_writer(writer)?;
            }
            PublicParams::Dsa { p, q, g, y } => {
                p.to_writer(writer)?;
                q.to_writer(writer)?;
                g.to_writer(writer)?;
                y.to_writer(writer)?;
            }
            PublicParams::Elgamal { p, g, y } => {
                p.to_writer(writer)?;
                g.to_writer(writer)?;
                y.to_writer(writer)?;
            }
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        match self {
            PublicParams::Rsa { n, e } => n.write_len() + e.write_len(),
            PublicParams::Dsa { p, q, g, y } => {
                p.write_len() + q.write_len() + g.write_len() + y.write_len()
            }
            PublicParams::Elgamal { p, g, y } => p.write_len() + g.write_len() + y.write_len(),
        }
    }
}

/// Decrypted, algorithm specific secret key parameters.
///
/// The magnitudes are owned plainly so they can be zeroed when the key
/// is released.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub enum PlainSecretParams {
    Rsa {
        d: Vec<u8>,
        p: Vec<u8>,
        q: Vec<u8>,
        u: Vec<u8>,
    },
    Dsa {
        x: Vec<u8>,
    },
    Elgamal {
        x: Vec<u8>,
    },
}

impl PlainSecretParams {
    pub fn from_buf<B: Buf>(alg: PublicKeyAlgorithm, mut i: B) -> Result<Self> {
        match alg {
            PublicKeyAlgorithm::RSA
            | PublicKeyAlgorithm::RSAEncrypt
            | PublicKeyAlgorithm::RSASign => {
                let d = Mpi::from_buf(&mut i)?.as_ref().to_vec();
                let p = Mpi::from_buf(&mut i)?.as_ref().to_vec();
                let q = Mpi::from_buf(&mut i)?.as_ref().to_vec();
                let u = Mpi::from_buf(&mut i)?.as_ref().to_vec();
                Ok(PlainSecretParams::Rsa { d, p, q, u })
            }
            PublicKeyAlgorithm::DSA => {
                let x = Mpi::from_buf(&mut i)?.as_ref().to_vec();
                Ok(PlainSecretParams::Dsa { x })
            }
            PublicKeyAlgorithm::Elgamal => {
                let x = Mpi::from_buf(&mut i)?.as_ref().to_vec();
                Ok(PlainSecretParams::Elgamal { x })
            }
            _ => Err(Error::UnsupportedPublicKeyAlgorithm { alg: alg.into() }),
        }
    }
}

impl Serialize for PlainSecretParams {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            PlainSecretParams::Rsa { d, p, q, u } => {
                Mpi::from_slice(d).to_writer(writer)?;
                Mpi::from_slice(p).to_writer(writer)?;
                Mpi::from_slice(q).to_writer(writer)?;
                Mpi::from_slice(u).to_writer(writer)?;
            }
            PlainSecretParams::Dsa { x } => {
                Mpi::from_slice(x).to_writer(writer)?;
            }
            PlainSecretParams::Elgamal { x } => {
                Mpi::from_slice(x).to_writer(writer)?;
            }
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        match self {
            PlainSecretParams::Rsa { d, p, q, u } => [d, p, q, u]
                .iter()
                .map(|v| Mpi::from_slice(v).write_len())
                .sum(),
            PlainSecretParams::Dsa { x } | PlainSecretParams::Elgamal { x } => {
                Mpi::from_slice(x).write_len()
            }
        }
    }
}

/// Still encrypted secret key parameters, as found on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedSecretParams {
    /// The S2K usage byte: 254 (sha1 checked), 255 (simple checksum) or
    /// a legacy v3 cipher algorithm id.
    pub usage: u8,
    pub cipher: SymmetricKeyAlgorithm,
    pub s2k: StringToKey,
    pub iv: Vec<u8>,
    /// The encrypted fields, including the trailing checksum or hash.
    pub data: Bytes,
}

/// The secret parameters of a secret key, either still wrapped or
/// decrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretParams {
    Plain(PlainSecretParams),
    Encrypted(EncryptedSecretParams),
}

impl SecretParams {
    pub fn is_encrypted(&self) -> bool {
        matches!(self, SecretParams::Encrypted(_))
    }
}

/// A decrypted symmetric session key, zeroed on release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey {
    pub alg: SymmetricKeyAlgorithm,
    pub key: Zeroizing<Vec<u8>>,
}

impl SessionKey {
    pub fn new(alg: SymmetricKeyAlgorithm, key: Vec<u8>) -> Self {
        SessionKey {
            alg,
            key: Zeroizing::new(key),
        }
    }
}
