//! Wire serialization of packet bodies and nested structures.

use std::io;

use crate::errors::Result;

/// Anything that can be written in its OpenPGP wire form.
///
/// `write_len` must report exactly the number of bytes `to_writer`
/// produces; packet framing relies on it to declare body lengths
/// before the body is emitted.
pub trait Serialize {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()>;

    /// Exact serialized size in bytes.
    fn write_len(&self) -> usize;

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.write_len());
        self.to_writer(&mut out)?;
        Ok(out)
    }
}

impl<T: Serialize + ?Sized> Serialize for &T {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        (**self).to_writer(writer)
    }

    fn write_len(&self) -> usize {
        (**self).write_len()
    }
}

impl<T: Serialize> Serialize for [T] {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        for item in self {
            item.to_writer(writer)?;
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.iter().map(Serialize::write_len).sum()
    }
}

impl<T: Serialize> Serialize for Vec<T> {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        self.as_slice().to_writer(writer)
    }

    fn write_len(&self) -> usize {
        self.as_slice().write_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Mpi;

    #[test]
    fn vec_serializes_in_order() {
        let mpis = vec![Mpi::from_slice(&[0x01]), Mpi::from_slice(&[0x03, 0xFF])];
        let buf = mpis.to_bytes().unwrap();
        assert_eq!(buf, [0x00, 0x01, 0x01, 0x00, 0x0A, 0x03, 0xFF]);
        assert_eq!(mpis.write_len(), buf.len());
    }
}
