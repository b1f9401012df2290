use byteorder::{BigEndian, ReadBytesExt};
use sha1::{Digest, Sha1};

use crate::errors::Result;
use crate::{bail, ensure_eq};

/// Two octet checksum: sum of all octets mod 65536.
#[inline]
pub fn simple(actual: &[u8], data: &[u8]) -> Result<()> {
    let mut actual = actual;
    let checksum = u32::from(actual.read_u16::<BigEndian>()?);
    let expected_checksum = calc_simple(data);

    ensure_eq!(checksum, expected_checksum, "invalid simple checksum");

    Ok(())
}

/// Computes the two octet checksum over `data`.
#[inline]
pub fn calc_simple(data: &[u8]) -> u32 {
    data.iter().map(|v| u32::from(*v)).sum::<u32>() & 0xffff
}

/// SHA1 checksum, first 20 octets.
#[inline]
pub fn sha1(hash: &[u8], data: &[u8]) -> Result<()> {
    ensure_eq!(hash, &Sha1::digest(data)[0..20], "invalid SHA1 checksum");

    Ok(())
}
