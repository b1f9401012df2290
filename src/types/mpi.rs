use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::Bytes;
use num_bigint::BigUint;

use crate::errors::{Error, Result};
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::util::{bit_size, strip_leading_zeros};

/// Number of bits we accept when reading or writing MPIs.
/// The value is the same as gnupgs.
const MAX_EXTERN_MPI_BITS: u16 = 16384;

/// An owned multi-precision integer, OpenPGP's length-prefixed
/// big-endian bignum encoding. The inner value is normalized, without
/// leading zero bytes.
///
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-3.2>
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Mpi(Bytes);

impl Mpi {
    /// Parses the given buffer as a length-prefixed MPI.
    ///
    /// The declared bit length must match the position of the highest
    /// set bit of the leading byte exactly; anything else is rejected
    /// as malformed rather than silently renormalized.
    pub fn from_buf<B: bytes::Buf>(mut i: B) -> Result<Self> {
        let len_bits = i.read_be_u16()?;

        if len_bits == 0 {
            return Err(Error::MpiFormat {
                message: "zero bit length".into(),
            });
        }
        if len_bits > MAX_EXTERN_MPI_BITS {
            return Err(Error::MpiFormat {
                message: format!("{} bits exceeds the {} bit limit", len_bits, MAX_EXTERN_MPI_BITS),
            });
        }

        let len_bytes = usize::from((len_bits + 7) >> 3);
        let n = i.read_take(len_bytes)?;

        // the top byte's highest set bit must sit at ((bits - 1) mod 8)
        let expected_high = usize::from((len_bits - 1) % 8);
        if n[0] >> expected_high != 1 {
            return Err(Error::MpiFormat {
                message: format!(
                    "declared {} bits, but the leading byte is {:#04x}",
                    len_bits, n[0]
                ),
            });
        }

        Ok(Mpi(n))
    }

    /// Wraps the raw magnitude `raw` as an Mpi, stripping leading zeros.
    /// `raw` is not expected to be length-prefixed.
    pub fn from_slice(raw: &[u8]) -> Self {
        Mpi(strip_leading_zeros(raw).to_vec().into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for Mpi {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl std::fmt::Debug for Mpi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Mpi({})", hex::encode(&self.0))
    }
}

impl Serialize for Mpi {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        let size = bit_size(&self.0);
        w.write_u16::<BigEndian>(size as u16)?;
        w.write_all(&self.0)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        2 + self.0.len()
    }
}

impl From<BigUint> for Mpi {
    fn from(other: BigUint) -> Self {
        Mpi(other.to_bytes_be().into())
    }
}

impl From<&BigUint> for Mpi {
    fn from(other: &BigUint) -> Self {
        Mpi(other.to_bytes_be().into())
    }
}

impl From<Mpi> for BigUint {
    fn from(other: Mpi) -> Self {
        BigUint::from_bytes_be(other.as_ref())
    }
}

impl From<&Mpi> for BigUint {
    fn from(other: &Mpi) -> Self {
        BigUint::from_bytes_be(other.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    impl Arbitrary for Mpi {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
            proptest::collection::vec(any::<u8>(), 1..500)
                .prop_filter("must be non zero", |v| v.iter().any(|b| *b != 0))
                .prop_map(|v| Mpi::from_slice(&v))
                .boxed()
        }
    }

    #[test]
    fn test_mpi_known_values() {
        // Decode the number `511` (`0x1FF` in hex).
        assert_eq!(
            Mpi::from_buf(&mut &[0x00, 0x09, 0x01, 0xFF][..]).unwrap(),
            Mpi::from_slice(&[0x01, 0xFF][..])
        );

        // Decode the number `1`.
        assert_eq!(
            Mpi::from_buf(&mut &[0x00, 0x01, 0x01][..]).unwrap(),
            Mpi::from_slice(&[0x01][..])
        );
    }

    #[test]
    fn test_mpi_rejects_zero_length() {
        let err = Mpi::from_buf(&mut &[0x00, 0x00][..]).unwrap_err();
        assert!(matches!(err, Error::MpiFormat { .. }));
    }

    #[test]
    fn test_mpi_rejects_bad_leading_bits() {
        // Claims 9 bits but the leading byte has bit 2 set as well.
        let err = Mpi::from_buf(&mut &[0x00, 0x09, 0x03, 0xFF][..]).unwrap_err();
        assert!(matches!(err, Error::MpiFormat { .. }));

        // Claims 16 bits but the leading byte's high bit is clear.
        let err = Mpi::from_buf(&mut &[0x00, 0x10, 0x01, 0xFF][..]).unwrap_err();
        assert!(matches!(err, Error::MpiFormat { .. }));
    }

    #[test]
    fn test_mpi_rejects_too_long() {
        let err = Mpi::from_buf(&mut &[0xFF, 0xFF, 0x01][..]).unwrap_err();
        assert!(matches!(err, Error::MpiFormat { .. }));
    }

    #[test]
    fn test_mpi_short_body() {
        // 9 bits declared, only one byte present
        assert!(Mpi::from_buf(&mut &[0x00, 0x09, 0x01][..]).is_err());
    }

    proptest! {
        #[test]
        fn mpi_write_len(m: Mpi) {
            let mut buf = Vec::new();
            m.to_writer(&mut buf)?;

            prop_assert_eq!(m.write_len(), buf.len());
        }

        #[test]
        fn mpi_roundtrip(m: Mpi) {
            let mut buf = Vec::new();
            m.to_writer(&mut buf)?;

            let m_back = Mpi::from_buf(&mut &buf[..])?;
            prop_assert_eq!(m, m_back);
        }

        #[test]
        fn mpi_biguint_roundtrip(raw in proptest::collection::vec(any::<u8>(), 1..200)) {
            prop_assume!(raw.iter().any(|b| *b != 0));
            let n = BigUint::from_bytes_be(&raw);
            let m: Mpi = (&n).into();
            let mut buf = Vec::new();
            m.to_writer(&mut buf)?;
            let m_back = Mpi::from_buf(&mut &buf[..])?;
            prop_assert_eq!(BigUint::from(m_back), n);
        }
    }
}
