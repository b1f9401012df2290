//! Trailing checksum writers for secret key field serialization.
//!
//! The S2K usage octet selects the check: 254 appends a SHA1 digest
//! over the fields, everything else the simple 16 bit additive sum.

use sha1::{Digest, Sha1};

use crate::errors::Result;
use crate::writer::{Sink, WriteFilter};

enum Check {
    Simple(u32),
    Sha1(Sha1),
}

pub struct ChecksumFilter {
    check: Check,
}

impl ChecksumFilter {
    pub fn simple() -> Self {
        ChecksumFilter {
            check: Check::Simple(0),
        }
    }

    pub fn sha1() -> Self {
        ChecksumFilter {
            check: Check::Sha1(Sha1::new()),
        }
    }

    /// Selects the check the given S2K usage octet calls for.
    pub fn for_usage(usage: u8) -> Self {
        if usage == 254 {
            Self::sha1()
        } else {
            Self::simple()
        }
    }
}

impl WriteFilter for ChecksumFilter {
    fn write(&mut self, below: &mut dyn Sink, buf: &[u8]) -> Result<()> {
        match self.check {
            Check::Simple(ref mut sum) => {
                for b in buf {
                    *sum = (*sum + u32::from(*b)) & 0xFFFF;
                }
            }
            Check::Sha1(ref mut hash) => hash.update(buf),
        }
        below.write_all(buf)
    }

    fn finish(&mut self, below: &mut dyn Sink) -> Result<()> {
        match self.check {
            Check::Simple(sum) => below.write_all(&[(sum >> 8) as u8, sum as u8]),
            Check::Sha1(ref mut hash) => {
                let digest = std::mem::take(hash).finalize();
                below.write_all(&digest)
            }
        }
    }

    fn name(&self) -> &'static str {
        "checksum"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::checksum;
    use crate::writer::WriterStack;

    #[test]
    fn simple_sum_matches_whole_buffer_form() {
        let data = b"secret key fields";
        let mut stack = WriterStack::new(Vec::new());
        stack.push(Box::new(ChecksumFilter::for_usage(255)));
        stack.write_all(&data[..5]).unwrap();
        stack.write_all(&data[5..]).unwrap();
        let out = stack.finish_all().unwrap();

        let sum = checksum::calc_simple(data);
        assert_eq!(&out[..data.len()], data);
        assert_eq!(&out[data.len()..], &[(sum >> 8) as u8, sum as u8]);

        let (body, check) = out.split_at(data.len());
        checksum::simple(check, body).unwrap();
    }

    #[test]
    fn sha1_trailer() {
        let data = b"other fields";
        let mut stack = WriterStack::new(Vec::new());
        stack.push(Box::new(ChecksumFilter::for_usage(254)));
        stack.write_all(data).unwrap();
        let out = stack.finish_all().unwrap();

        assert_eq!(out.len(), data.len() + 20);
        let (body, check) = out.split_at(data.len());
        checksum::sha1(check, body).unwrap();
    }
}
