//! OpenPGP CFB mode, driven over a [`BlockEncryptor`] capability.
//!
//! Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-13.9>

use crate::crypto::BlockEncryptor;

/// Streaming CFB state. Byte granular, so filters can push any amount
/// of data through without block alignment.
pub struct CfbState {
    enc: Box<dyn BlockEncryptor>,
    /// Feedback register, filled with ciphertext as it streams through.
    fr: Vec<u8>,
    /// Encrypted feedback register, the current key stream block.
    fre: Vec<u8>,
    pos: usize,
}

impl CfbState {
    pub fn new(enc: Box<dyn BlockEncryptor>, iv: &[u8]) -> Self {
        let bs = enc.block_size();
        debug_assert_eq!(iv.len(), bs);

        let mut fre = iv.to_vec();
        enc.encrypt_block(&mut fre);
        CfbState {
            fr: iv.to_vec(),
            fre,
            pos: 0,
            enc,
        }
    }

    pub fn block_size(&self) -> usize {
        self.enc.block_size()
    }

    fn refill(&mut self) {
        if self.pos == self.fr.len() {
            self.fre.copy_from_slice(&self.fr);
            self.enc.encrypt_block(&mut self.fre);
            self.pos = 0;
        }
    }

    /// Encrypts `data` in place.
    pub fn encrypt(&mut self, data: &mut [u8]) {
        for b in data.iter_mut() {
            self.refill();
            *b ^= self.fre[self.pos];
            self.fr[self.pos] = *b;
            self.pos += 1;
        }
    }

    /// Decrypts `data` in place.
    pub fn decrypt(&mut self, data: &mut [u8]) {
        for b in data.iter_mut() {
            self.refill();
            let c = *b;
            *b ^= self.fre[self.pos];
            self.fr[self.pos] = c;
            self.pos += 1;
        }
    }

    /// Legacy resynchronization: restarts the feedback register from
    /// the given ciphertext tail (the last block-size ciphertext bytes
    /// seen). Used after the prefix of the old sym. encrypted data
    /// packet and between the MPIs of v3 secret keys.
    pub fn resync(&mut self, cipher_tail: &[u8]) {
        debug_assert_eq!(cipher_tail.len(), self.fr.len());
        self.fr.copy_from_slice(cipher_tail);
        self.fre.copy_from_slice(&self.fr);
        self.enc.encrypt_block(&mut self.fre);
        self.pos = 0;
    }
}
