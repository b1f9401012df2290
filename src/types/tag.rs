use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Packet tags, the content type of a packet.
///
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-4.3>
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, TryFromPrimitive, IntoPrimitive, Hash)]
pub enum Tag {
    /// Public-Key Encrypted Session Key Packet
    PublicKeyEncryptedSessionKey = 1,
    /// Signature Packet
    Signature = 2,
    /// Symmetric-Key Encrypted Session Key Packet
    SymKeyEncryptedSessionKey = 3,
    /// One-Pass Signature Packet
    OnePassSignature = 4,
    /// Secret-Key Packet
    SecretKey = 5,
    /// Public-Key Packet
    PublicKey = 6,
    /// Secret-Subkey Packet
    SecretSubkey = 7,
    /// Compressed Data Packet
    CompressedData = 8,
    /// Symmetrically Encrypted Data Packet
    SymEncryptedData = 9,
    /// Marker Packet
    Marker = 10,
    /// Literal Data Packet
    LiteralData = 11,
    /// Trust Packet
    Trust = 12,
    /// User ID Packet
    UserId = 13,
    /// Public-Subkey Packet
    PublicSubkey = 14,
    /// User Attribute Packet
    UserAttribute = 17,
    /// Sym. Encrypted and Integrity Protected Data Packet
    SymEncryptedProtectedData = 18,
    /// Modification Detection Code Packet
    ModDetectionCode = 19,
}

/// The length of a packet body, as declared by its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketLength {
    Fixed(usize),
    /// The first chunk of a partial body; more length-prefixed chunks follow.
    Partial(usize),
    /// Old format "read until the parent boundary".
    Indeterminate,
}

/// Available public key algorithms.
///
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-9.1>
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, TryFromPrimitive, IntoPrimitive)]
pub enum PublicKeyAlgorithm {
    /// RSA (Encrypt and Sign)
    RSA = 1,
    /// RSA Encrypt-Only
    RSAEncrypt = 2,
    /// RSA Sign-Only
    RSASign = 3,
    /// Elgamal (Encrypt-Only)
    Elgamal = 16,
    /// DSA (Digital Signature Algorithm)
    DSA = 17,
    Private100 = 100,
    Private101 = 101,
    Private102 = 102,
    Private103 = 103,
    Private104 = 104,
    Private105 = 105,
    Private106 = 106,
    Private107 = 107,
    Private108 = 108,
    Private109 = 109,
    Private110 = 110,
}

/// Available symmetric key algorithms.
///
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-9.2>
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, TryFromPrimitive, IntoPrimitive)]
pub enum SymmetricKeyAlgorithm {
    /// Plaintext or unencrypted data
    Plaintext = 0,
    IDEA = 1,
    /// TripleDES (DES-EDE, 168 bit key derived from 192)
    TripleDES = 2,
    /// CAST5 (128 bit key, as per [RFC2144])
    CAST5 = 3,
    /// Blowfish (128 bit key, 16 rounds)
    Blowfish = 4,
    AES128 = 7,
    AES192 = 8,
    AES256 = 9,
    /// Twofish with 256-bit key [TWOFISH]
    Twofish = 10,
}

impl SymmetricKeyAlgorithm {
    /// The size of a single block in bytes.
    pub const fn block_size(self) -> usize {
        match self {
            SymmetricKeyAlgorithm::Plaintext => 0,
            SymmetricKeyAlgorithm::IDEA
            | SymmetricKeyAlgorithm::TripleDES
            | SymmetricKeyAlgorithm::CAST5
            | SymmetricKeyAlgorithm::Blowfish => 8,
            SymmetricKeyAlgorithm::AES128
            | SymmetricKeyAlgorithm::AES192
            | SymmetricKeyAlgorithm::AES256
            | SymmetricKeyAlgorithm::Twofish => 16,
        }
    }

    /// The size of a key in bytes.
    pub const fn key_size(self) -> usize {
        match self {
            SymmetricKeyAlgorithm::Plaintext => 0,
            SymmetricKeyAlgorithm::IDEA
            | SymmetricKeyAlgorithm::CAST5
            | SymmetricKeyAlgorithm::Blowfish
            | SymmetricKeyAlgorithm::AES128 => 16,
            SymmetricKeyAlgorithm::TripleDES | SymmetricKeyAlgorithm::AES192 => 24,
            SymmetricKeyAlgorithm::AES256 | SymmetricKeyAlgorithm::Twofish => 32,
        }
    }
}

/// Available hash algorithms.
///
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-9.4>
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, TryFromPrimitive, IntoPrimitive, Hash)]
pub enum HashAlgorithm {
    MD5 = 1,
    SHA1 = 2,
    RIPEMD160 = 3,
    SHA256 = 8,
    SHA384 = 9,
    SHA512 = 10,
    SHA224 = 11,
}

impl HashAlgorithm {
    /// The size of the hash digest in bytes.
    pub const fn digest_size(self) -> usize {
        match self {
            HashAlgorithm::MD5 => 16,
            HashAlgorithm::SHA1 | HashAlgorithm::RIPEMD160 => 20,
            HashAlgorithm::SHA224 => 28,
            HashAlgorithm::SHA256 => 32,
            HashAlgorithm::SHA384 => 48,
            HashAlgorithm::SHA512 => 64,
        }
    }

    /// Name as it appears in an armor `Hash:` header.
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::MD5 => "MD5",
            HashAlgorithm::SHA1 => "SHA1",
            HashAlgorithm::RIPEMD160 => "RIPEMD160",
            HashAlgorithm::SHA256 => "SHA256",
            HashAlgorithm::SHA384 => "SHA384",
            HashAlgorithm::SHA512 => "SHA512",
            HashAlgorithm::SHA224 => "SHA224",
        }
    }

    /// Parses the value of an armor `Hash:` header.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "MD5" => Some(HashAlgorithm::MD5),
            "SHA1" => Some(HashAlgorithm::SHA1),
            "RIPEMD160" => Some(HashAlgorithm::RIPEMD160),
            "SHA256" => Some(HashAlgorithm::SHA256),
            "SHA384" => Some(HashAlgorithm::SHA384),
            "SHA512" => Some(HashAlgorithm::SHA512),
            "SHA224" => Some(HashAlgorithm::SHA224),
            _ => None,
        }
    }
}

/// Available compression algorithms.
///
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-9.3>
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, TryFromPrimitive, IntoPrimitive)]
pub enum CompressionAlgorithm {
    Uncompressed = 0,
    /// DEFLATE, RFC 1951
    ZIP = 1,
    /// ZLIB, RFC 1950
    ZLIB = 2,
    BZip2 = 3,
}

/// Signature types.
///
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.2.1>
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, TryFromPrimitive, IntoPrimitive)]
pub enum SignatureType {
    /// Signature of a binary document
    Binary = 0x00,
    /// Signature of a canonical text document
    Text = 0x01,
    /// Standalone signature
    Standalone = 0x02,
    /// Generic certification of a User ID and Public-Key packet
    CertGeneric = 0x10,
    /// Persona certification of a User ID and Public-Key packet
    CertPersona = 0x11,
    /// Casual certification of a User ID and Public-Key packet
    CertCasual = 0x12,
    /// Positive certification of a User ID and Public-Key packet
    CertPositive = 0x13,
    /// Subkey Binding Signature
    SubkeyBinding = 0x18,
    /// Primary Key Binding Signature
    KeyBinding = 0x19,
    /// Signature directly on a key
    Key = 0x1F,
    /// Key revocation signature
    KeyRevocation = 0x20,
    /// Subkey revocation signature
    SubkeyRevocation = 0x28,
    /// Certification revocation signature
    CertRevocation = 0x30,
    /// Timestamp signature
    Timestamp = 0x40,
    /// Third-Party Confirmation signature
    ThirdParty = 0x50,
}
