/// Returns the bit length of a given slice, ignoring leading zeros.
#[inline]
pub fn bit_size(val: &[u8]) -> usize {
    match val.iter().position(|b| *b != 0) {
        Some(offset) => ((val.len() - offset) * 8) - val[offset].leading_zeros() as usize,
        None => 0,
    }
}

#[inline]
pub fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    bytes
        .iter()
        .position(|b| b != &0)
        .map_or(&[][..], |offset| &bytes[offset..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_size() {
        assert_eq!(bit_size(&[]), 0);
        assert_eq!(bit_size(&[0]), 0);
        assert_eq!(bit_size(&[1]), 1);
        assert_eq!(bit_size(&[0x01, 0xFF]), 9);
        assert_eq!(bit_size(&[0x00, 0x01, 0xFF]), 9);
        assert_eq!(bit_size(&[0x80]), 8);
    }

    #[test]
    fn test_strip_leading_zeros() {
        assert!(strip_leading_zeros(&[0, 0, 0]).is_empty());
        assert_eq!(strip_leading_zeros(&[0, 1, 2]), &[1, 2][..]);
        assert_eq!(strip_leading_zeros(&[3, 0, 1]), &[3, 0, 1][..]);
    }
}
