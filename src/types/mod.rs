mod key_id;
mod mpi;
mod params;
mod s2k;
mod tag;

pub use self::key_id::{KeyId, WILDCARD_KEY_ID};
pub use self::mpi::Mpi;
pub use self::params::{
    EncryptedSecretParams, PlainSecretParams, PublicParams, SecretParams, SessionKey,
};
pub use self::s2k::{StringToKey, StringToKeyType};
pub use self::tag::{
    CompressionAlgorithm, HashAlgorithm, PacketLength, PublicKeyAlgorithm, SignatureType,
    SymmetricKeyAlgorithm, Tag,
};
