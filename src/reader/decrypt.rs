//! Streaming CFB decryption for the legacy symmetrically encrypted
//! data packet.

use crate::crypto::CfbState;
use crate::errors::{Error, Result};
use crate::reader::{ReadFilter, Source};
use crate::types::SymmetricKeyAlgorithm;

const BUF_SIZE: usize = 8 * 1024;

pub struct DecryptFilter {
    cfb: CfbState,
    alg: SymmetricKeyAlgorithm,
    /// Remaining ciphertext budget, `None` when bounded by EOF below.
    budget: Option<usize>,
    prefix_done: bool,
    /// Legacy packets resynchronize the cipher after the prefix.
    resync: bool,
    consumed: usize,
}

impl DecryptFilter {
    pub fn new(
        cfb: CfbState,
        alg: SymmetricKeyAlgorithm,
        budget: Option<usize>,
        resync: bool,
    ) -> Self {
        DecryptFilter {
            cfb,
            alg,
            budget,
            prefix_done: false,
            resync,
            consumed: 0,
        }
    }

    fn pull(&mut self, below: &mut dyn Source, buf: &mut [u8]) -> Result<usize> {
        let want = match self.budget {
            Some(b) => buf.len().min(b),
            None => buf.len(),
        };
        if want == 0 {
            return Ok(0);
        }
        let n = below.read(&mut buf[..want])?;
        if let Some(ref mut b) = self.budget {
            *b -= n;
        }
        self.consumed += n;
        Ok(n)
    }

    /// Reads and checks the random prefix: block-size random bytes
    /// followed by a repeat of the last two, detecting a wrong session
    /// key immediately.
    fn read_prefix(&mut self, below: &mut dyn Source) -> Result<()> {
        let bs = self.alg.block_size();
        let mut cipher_prefix = vec![0u8; bs + 2];
        let mut got = 0;
        while got < cipher_prefix.len() {
            let n = self.pull(below, &mut cipher_prefix[got..])?;
            if n == 0 {
                return Err(Error::PacketIncomplete);
            }
            got += n;
        }

        let mut prefix = cipher_prefix.clone();
        self.cfb.decrypt(&mut prefix);
        if prefix[bs - 2..bs] != prefix[bs..bs + 2] {
            return Err(Error::Message {
                message: "encrypted prefix repeat mismatch (wrong session key?)".into(),
            });
        }

        if self.resync {
            self.cfb.resync(&cipher_prefix[2..bs + 2]);
        }
        self.prefix_done = true;
        Ok(())
    }
}

impl ReadFilter for DecryptFilter {
    fn read(&mut self, below: &mut dyn Source, buf: &mut [u8]) -> Result<usize> {
        if !self.prefix_done {
            self.read_prefix(below)?;
        }

        let want = buf.len().min(BUF_SIZE);
        let n = self.pull(below, &mut buf[..want])?;
        self.cfb.decrypt(&mut buf[..n]);
        Ok(n)
    }

    fn consumed_below(&self) -> usize {
        self.consumed
    }

    fn name(&self) -> &'static str {
        "decrypt"
    }
}
