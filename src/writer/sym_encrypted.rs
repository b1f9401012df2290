//! Encrypting writer filters for the symmetrically encrypted data
//! packets.

use rand::rngs::OsRng;
use rand::RngCore;
use sha1::{Digest, Sha1};

use crate::crypto::{CfbState, Crypto};
use crate::errors::Result;
use crate::packet::{write_body_len, write_packet_header, write_partial_len};
use crate::types::{SessionKey, Tag};
use crate::writer::{Sink, WriteFilter};
use crate::{ensure, packet};

/// Streaming writer for the integrity protected form. Emits partial
/// length chunks of `chunk_size` once enough plaintext has been
/// pushed, and always closes with a fixed length chunk carrying the
/// MDC.
pub struct SymEncryptedProtectedFilter {
    cfb: Option<CfbState>,
    hash: Sha1,
    chunk_size: usize,
    /// Encrypted bytes waiting for a full chunk.
    buffered: Vec<u8>,
    chunks_written: bool,
}

impl SymEncryptedProtectedFilter {
    /// `chunk_size` must be a power of two, at least 512.
    pub fn new(
        crypto: &dyn Crypto,
        session_key: SessionKey,
        chunk_size: usize,
    ) -> Result<Self> {
        ensure!(
            chunk_size.is_power_of_two() && chunk_size >= 512,
            "invalid partial chunk size {}",
            chunk_size
        );

        let bs = session_key.alg.block_size();
        let enc = crypto.block_encryptor(session_key.alg, &session_key.key)?;
        let iv = vec![0u8; bs];
        let mut cfb = CfbState::new(enc, &iv);

        let mut prefix = vec![0u8; bs + 2];
        OsRng.fill_bytes(&mut prefix[..bs]);
        let (head, tail) = prefix.split_at_mut(bs);
        tail.copy_from_slice(&head[bs - 2..]);

        let mut hash = Sha1::new();
        hash.update(&prefix);
        cfb.encrypt(&mut prefix);

        // first chunk content: version octet, then ciphertext
        let mut buffered = Vec::with_capacity(chunk_size);
        buffered.push(1);
        buffered.extend_from_slice(&prefix);

        Ok(SymEncryptedProtectedFilter {
            cfb: Some(cfb),
            hash,
            chunk_size,
            buffered,
            chunks_written: false,
        })
    }

    fn flush_full_chunks(&mut self, below: &mut dyn Sink) -> Result<()> {
        while self.buffered.len() >= self.chunk_size {
            let mut head = Vec::with_capacity(8);
            if !self.chunks_written {
                head.push(0b1100_0000 | u8::from(Tag::SymEncryptedProtectedData));
            }
            write_partial_len(&mut head, self.chunk_size)?;
            below.write_all(&head)?;

            let chunk: Vec<u8> = self.buffered.drain(..self.chunk_size).collect();
            below.write_all(&chunk)?;
            self.chunks_written = true;
        }
        Ok(())
    }
}

impl WriteFilter for SymEncryptedProtectedFilter {
    fn write(&mut self, below: &mut dyn Sink, buf: &[u8]) -> Result<()> {
        self.hash.update(buf);
        let cfb = self.cfb.as_mut().expect("cfb lives until finish");
        let mut cipher = buf.to_vec();
        cfb.encrypt(&mut cipher);
        self.buffered.extend_from_slice(&cipher);
        self.flush_full_chunks(below)
    }

    fn finish(&mut self, below: &mut dyn Sink) -> Result<()> {
        let mut cfb = self.cfb.take().expect("finish runs once");

        self.hash.update([0xD3, 0x14]);
        let digest = std::mem::take(&mut self.hash).finalize();
        let mut mdc = Vec::with_capacity(22);
        mdc.extend_from_slice(&[0xD3, 0x14]);
        mdc.extend_from_slice(&digest);
        cfb.encrypt(&mut mdc);
        self.buffered.extend_from_slice(&mdc);

        self.flush_full_chunks(below)?;

        // final fixed length chunk; when no partial chunk was needed
        // this is the whole packet
        let mut head = Vec::with_capacity(8);
        if !self.chunks_written {
            write_packet_header(
                &mut head,
                Tag::SymEncryptedProtectedData,
                self.buffered.len(),
            )?;
        } else {
            write_body_len(&mut head, self.buffered.len())?;
        }
        below.write_all(&head)?;
        below.write_all(&self.buffered)?;
        self.buffered.clear();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sym-encrypted-protected"
    }
}

/// Buffered writer for the legacy, unprotected form.
pub struct SymEncryptedLegacyFilter<'a> {
    crypto: &'a dyn Crypto,
    session_key: SessionKey,
    plaintext: Vec<u8>,
}

impl<'a> SymEncryptedLegacyFilter<'a> {
    pub fn new(crypto: &'a dyn Crypto, session_key: SessionKey) -> Self {
        SymEncryptedLegacyFilter {
            crypto,
            session_key,
            plaintext: Vec::new(),
        }
    }
}

impl WriteFilter for SymEncryptedLegacyFilter<'_> {
    fn write(&mut self, _below: &mut dyn Sink, buf: &[u8]) -> Result<()> {
        self.plaintext.extend_from_slice(buf);
        Ok(())
    }

    fn finish(&mut self, below: &mut dyn Sink) -> Result<()> {
        let body = packet::sym_encrypted::encrypt_legacy(
            self.crypto,
            &self.session_key,
            &mut OsRng,
            &self.plaintext,
        )?;
        use zeroize::Zeroize;
        self.plaintext.zeroize();

        let mut head = Vec::with_capacity(8);
        write_packet_header(&mut head, Tag::SymEncryptedData, body.len())?;
        below.write_all(&head)?;
        below.write_all(&body)
    }

    fn name(&self) -> &'static str {
        "sym-encrypted-legacy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::DefaultCrypto;
    use crate::packet::{read_packet_header, sym_encrypted};
    use crate::reader::{PartialBodyFilter, ReaderStack, Source};
    use crate::types::{PacketLength, SymmetricKeyAlgorithm};
    use crate::writer::WriterStack;

    fn key() -> SessionKey {
        SessionKey::new(SymmetricKeyAlgorithm::AES128, vec![0x33; 16])
    }

    fn decrypt_packet(out: &[u8]) -> Vec<u8> {
        let mut stack = ReaderStack::new(out);
        let header = read_packet_header(&mut stack).unwrap().unwrap();
        assert_eq!(header.tag, Tag::SymEncryptedProtectedData);

        let mut body = Vec::new();
        match header.length {
            PacketLength::Fixed(n) => {
                body.resize(n, 0);
                assert_eq!(stack.read_all(&mut body).unwrap(), n);
            }
            PacketLength::Partial(first) => {
                stack.push(Box::new(PartialBodyFilter::new(first)));
                let mut chunk = [0u8; 256];
                loop {
                    let n = stack.read(&mut chunk).unwrap();
                    if n == 0 {
                        break;
                    }
                    body.extend_from_slice(&chunk[..n]);
                }
            }
            PacketLength::Indeterminate => panic!("unexpected length"),
        }

        assert_eq!(body[0], 1);
        sym_encrypted::decrypt_protected(&DefaultCrypto, &key(), &body[1..]).unwrap()
    }

    #[test]
    fn small_payload_is_one_fixed_packet() {
        let mut stack = WriterStack::new(Vec::new());
        stack.push(Box::new(
            SymEncryptedProtectedFilter::new(&DefaultCrypto, key(), 512).unwrap(),
        ));
        stack.write_all(b"short").unwrap();
        let out = stack.finish_all().unwrap();

        // no partial length octet anywhere: single fixed chunk
        let plain = decrypt_packet(&out);
        assert_eq!(&plain[..5], b"short");
    }

    #[test]
    fn large_payload_streams_in_chunks() {
        let payload = vec![0x5Au8; 2000];
        let mut stack = WriterStack::new(Vec::new());
        stack.push(Box::new(
            SymEncryptedProtectedFilter::new(&DefaultCrypto, key(), 512).unwrap(),
        ));
        // push in uneven pieces
        stack.write_all(&payload[..700]).unwrap();
        stack.write_all(&payload[700..1500]).unwrap();
        stack.write_all(&payload[1500..]).unwrap();
        let out = stack.finish_all().unwrap();

        // header announces a partial first chunk
        assert_eq!(out[1] & 0xE0, 0xE0);

        let plain = decrypt_packet(&out);
        assert_eq!(&plain[..2000], &payload[..]);
    }

    #[test]
    fn legacy_filter_roundtrip() {
        let mut stack = WriterStack::new(Vec::new());
        stack.push(Box::new(SymEncryptedLegacyFilter::new(&DefaultCrypto, key())));
        stack.write_all(b"legacy body").unwrap();
        let out = stack.finish_all().unwrap();

        let mut reader = ReaderStack::new(&out[..]);
        let header = read_packet_header(&mut reader).unwrap().unwrap();
        assert_eq!(header.tag, Tag::SymEncryptedData);

        let enc = DefaultCrypto
            .block_encryptor(SymmetricKeyAlgorithm::AES128, &key().key)
            .unwrap();
        let cfb = CfbState::new(enc, &[0u8; 16]);
        let PacketLength::Fixed(n) = header.length else {
            panic!()
        };
        reader.push(Box::new(crate::reader::DecryptFilter::new(
            cfb,
            SymmetricKeyAlgorithm::AES128,
            Some(n),
            true,
        )));
        let mut plain = vec![0u8; 11];
        assert_eq!(reader.read_all(&mut plain).unwrap(), 11);
        assert_eq!(&plain, b"legacy body");
    }
}
