//! The top level parse driver.
//!
//! Pulls packets off a byte source until EOF, recursing into
//! compressed and encrypted layers through reader filters, and
//! dispatches one event per decoded packet to a caller supplied
//! [`Handler`]. Recoverable format errors are accumulated on the
//! session and returned at the end; integrity failures abort
//! immediately.

use std::io;
use std::sync::Arc;

use bytes::Bytes;
use digest::DynDigest;
use log::{debug, warn};
use zeroize::Zeroizing;

use crate::armor::{BlockType, DearmorFilter, Headers};
use crate::crypto::{CfbState, Crypto};
use crate::errors::{Error, Result};
use crate::packet::{
    self, parse_body, read_packet_header, LiteralDataHeader, Packet, PacketHeader, SecretKey,
    Signature,
};
use crate::reader::{
    BufferFilter, DecompressFilter, DecryptFilter, FilterEvent, PartialBodyFilter, ReaderStack,
    Source,
};
use crate::region::RegionStack;
use crate::types::{
    CompressionAlgorithm, HashAlgorithm, KeyId, PacketLength, SecretParams, SessionKey, Tag,
    WILDCARD_KEY_ID,
};
use crate::{bail, ensure_eq};

const CHUNK_SIZE: usize = 8 * 1024;

/// Nested compressed or encrypted layers beyond this depth are treated
/// as malformed input.
const MAX_NESTING_DEPTH: usize = 32;

/// Construction time configuration for one parse session.
#[derive(Debug, Clone)]
pub struct ParseConfig {
    /// Dearmor the input before packet parsing.
    pub dearmor: bool,
    /// Keep every signature subpacket raw instead of interpreting it.
    pub raw_subpackets: bool,
    /// Abort on a critical but unrecognized signature subpacket
    /// instead of recording the error and continuing.
    pub critical_subpackets_fatal: bool,
    /// Accept signatures over weak hash algorithms without recording
    /// an error.
    pub allow_weak_hash: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig {
            dearmor: false,
            raw_subpackets: false,
            critical_subpackets_fatal: false,
            allow_weak_hash: true,
        }
    }
}

/// One event per decoded packet, plus armor and cleartext
/// notifications from the dearmourer. Borrowed chunks are only valid
/// for the duration of the callback.
pub enum Event<'a> {
    Packet(Packet),
    /// The fixed fields of a literal data packet; the body follows in
    /// [`Event::LiteralChunk`] pieces.
    LiteralHeader(LiteralDataHeader),
    LiteralChunk(&'a [u8]),
    /// Entering the nested packet stream of a compressed data packet.
    CompressedBegin(CompressionAlgorithm),
    /// Raw ciphertext of an encrypted data packet no session key is
    /// available for.
    EncryptedChunk(&'a [u8]),
    /// A signature packet, along with the document hash context
    /// accumulated from one pass signature or cleartext processing.
    /// The caller finishes verification via [`Signature::verify`].
    Signature {
        signature: Signature,
        hash: Option<Box<dyn DynDigest>>,
    },
    ArmorBegin {
        typ: BlockType,
        headers: Headers,
    },
    ArmorEnd {
        typ: BlockType,
    },
    UnarmouredText(Vec<u8>),
    CleartextBody(Vec<u8>),
}

/// The caller's side of a parse session: packet events plus the pull
/// callbacks the engine uses when it needs secrets.
pub trait Handler {
    fn event(&mut self, event: Event<'_>) -> Result<()>;

    fn get_passphrase(&mut self) -> Option<Vec<u8>> {
        None
    }

    fn get_secret_key(&mut self, _id: &KeyId) -> Option<SecretKey> {
        None
    }
}

/// A document hash seeded by a one pass signature packet and fed by
/// the literal data that follows.
struct SigHash {
    key_id: KeyId,
    alg: HashAlgorithm,
    hash: Box<dyn DynDigest>,
}

/// Parses the whole packet stream from `source`, dispatching events to
/// `handler`. Returns the recoverable errors accumulated along the
/// way; fatal errors (integrity failures, I/O) abort with `Err`.
pub fn parse<R: io::Read>(
    source: R,
    crypto: Arc<dyn Crypto>,
    config: ParseConfig,
    handler: &mut dyn Handler,
) -> Result<Vec<Error>> {
    let mut readers = ReaderStack::new(source);
    if config.dearmor {
        readers.push(Box::new(DearmorFilter::new(crypto.clone())));
    }

    let mut session = Session {
        readers,
        regions: RegionStack::new(),
        config,
        crypto,
        errors: Vec::new(),
        sig_hashes: Vec::new(),
        cleartext_hash: None,
        session_key: None,
        halted: false,
    };
    session.parse_layer(handler, 0)?;
    session.forward_events(handler)?;
    Ok(session.errors)
}

struct Session<R: io::Read> {
    readers: ReaderStack<R>,
    regions: RegionStack,
    config: ParseConfig,
    crypto: Arc<dyn Crypto>,
    errors: Vec<Error>,
    sig_hashes: Vec<SigHash>,
    cleartext_hash: Option<Box<dyn DynDigest>>,
    session_key: Option<SessionKey>,
    /// Set when an error inside an indeterminate region leaves no
    /// resynchronization point.
    halted: bool,
}

impl<R: io::Read> Session<R> {
    /// Decodes packets from the current byte space until EOF.
    fn parse_layer(&mut self, handler: &mut dyn Handler, depth: usize) -> Result<()> {
        if depth > MAX_NESTING_DEPTH {
            self.errors
                .push(crate::format_err!("nesting deeper than {}", MAX_NESTING_DEPTH));
            self.halted = true;
            return Ok(());
        }

        loop {
            if self.halted {
                return Ok(());
            }
            self.forward_events(handler)?;

            let header = match read_packet_header(&mut self.readers) {
                Ok(Some(header)) => header,
                Ok(None) => return Ok(()),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    // a bad tag byte leaves no way to find the next
                    // packet boundary
                    warn!("unreadable packet header: {:?}", e);
                    self.errors.push(e);
                    self.halted = true;
                    return Ok(());
                }
            };
            debug!("packet {:?} {:?}", header.tag, header.length);
            self.regions.consume(header.header_len);
            // reading the header may have advanced the dearmourer over
            // cleartext, queueing events this packet depends on
            self.forward_events(handler)?;
            self.decode_packet(handler, header, depth)?;
        }
    }

    fn decode_packet(
        &mut self,
        handler: &mut dyn Handler,
        header: PacketHeader,
        depth: usize,
    ) -> Result<()> {
        match header.length {
            PacketLength::Fixed(len) => {
                self.regions.push_fixed(len);
                match self.decode_body(handler, header.tag, depth) {
                    Ok(()) => {
                        if let Some(remaining) = self.regions.remaining() {
                            if remaining > 0 {
                                warn!("{:?}: {} unconsumed bytes", header.tag, remaining);
                                self.errors.push(Error::PacketNotConsumed { remaining });
                                self.skip_remaining()?;
                            }
                        }
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!("skipping malformed {:?}: {:?}", header.tag, e);
                        self.errors.push(e);
                        self.skip_remaining()?;
                    }
                }
                self.regions.pop();
            }
            PacketLength::Partial(first) => {
                self.readers.push(Box::new(PartialBodyFilter::new(first)));
                self.regions.push_fenced();
                let res = self.decode_body(handler, header.tag, depth);
                match res {
                    Ok(()) => self.drain_to_eof()?,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!("skipping malformed {:?}: {:?}", header.tag, e);
                        self.errors.push(e);
                        self.drain_to_eof()?;
                    }
                }
                self.regions.pop();
                let filter = self.readers.pop().expect("partial body filter present");
                self.regions.consume_outer(filter.consumed_below());
            }
            PacketLength::Indeterminate => {
                self.regions.push_indeterminate();
                let res = self.decode_body(handler, header.tag, depth);
                self.regions.pop();
                match res {
                    Ok(()) => {}
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!("error in indeterminate {:?}, stopping: {:?}", header.tag, e);
                        self.errors.push(e);
                        self.halted = true;
                    }
                }
            }
        }
        Ok(())
    }

    fn decode_body(
        &mut self,
        handler: &mut dyn Handler,
        tag: Tag,
        depth: usize,
    ) -> Result<()> {
        match tag {
            Tag::LiteralData => self.decode_literal(handler),
            Tag::CompressedData => self.decode_compressed(handler, depth),
            Tag::SymEncryptedData | Tag::SymEncryptedProtectedData => {
                self.decode_encrypted(handler, tag, depth)
            }
            _ => {
                let body = self.read_body()?;
                let packet = parse_body(tag, Bytes::from(body), self.config.raw_subpackets)?;
                self.emit_packet(handler, packet)
            }
        }
    }

    fn decode_literal(&mut self, handler: &mut dyn Handler) -> Result<()> {
        // mode and file name length, then the name and the timestamp
        let mut fixed = self.read_exact(2)?;
        let name_len = usize::from(fixed[1]);
        fixed.extend_from_slice(&self.read_exact(name_len + 4)?);
        let lit_header = LiteralDataHeader::from_buf(&mut &fixed[..])?;
        handler.event(Event::LiteralHeader(lit_header))?;

        let mut chunk = [0u8; CHUNK_SIZE];
        loop {
            let want = match self.regions.remaining() {
                Some(0) => break,
                Some(r) => r.min(CHUNK_SIZE),
                None => CHUNK_SIZE,
            };
            let n = self.readers.read(&mut chunk[..want])?;
            if n == 0 {
                if self.regions.remaining().is_some_and(|r| r > 0) {
                    return Err(Error::PacketIncomplete);
                }
                break;
            }
            self.regions.consume(n);
            for sig_hash in self.sig_hashes.iter_mut() {
                sig_hash.hash.update(&chunk[..n]);
            }
            handler.event(Event::LiteralChunk(&chunk[..n]))?;
        }
        Ok(())
    }

    fn decode_compressed(&mut self, handler: &mut dyn Handler, depth: usize) -> Result<()> {
        let alg = self.read_exact(1)?[0];
        let alg = CompressionAlgorithm::try_from(alg)
            .map_err(|_| crate::format_err!("invalid compression algorithm {}", alg))?;
        handler.event(Event::CompressedBegin(alg))?;

        if alg == CompressionAlgorithm::Uncompressed {
            // the remainder is the nested stream, verbatim
            let data = self.read_body()?;
            return self.recurse_buffered(handler, data, depth);
        }

        let budget = self.regions.remaining();
        self.readers
            .push(Box::new(DecompressFilter::new(alg, budget)?));
        self.regions.push_fenced();
        let res = self.parse_layer(handler, depth + 1);
        self.regions.pop();
        let filter = self.readers.pop().expect("decompress filter present");
        self.regions.consume_outer(filter.consumed_below());
        res
    }

    fn decode_encrypted(
        &mut self,
        handler: &mut dyn Handler,
        tag: Tag,
        depth: usize,
    ) -> Result<()> {
        let protected = tag == Tag::SymEncryptedProtectedData;
        if protected {
            let version = self.read_exact(1)?[0];
            ensure_eq!(version, 1, "unsupported protected data version");
        }

        let Some(session_key) = self.session_key.clone() else {
            // no key: surface the raw ciphertext instead of failing
            return self.stream_raw(handler);
        };

        if protected {
            let ciphertext = self.read_body()?;
            let plaintext =
                packet::sym_encrypted::decrypt_protected(&*self.crypto, &session_key, &ciphertext)?;
            self.recurse_buffered(handler, plaintext, depth)
        } else {
            let enc = self
                .crypto
                .block_encryptor(session_key.alg, &session_key.key)?;
            let iv = vec![0u8; session_key.alg.block_size()];
            let cfb = CfbState::new(enc, &iv);
            let budget = self.regions.remaining();
            self.readers.push(Box::new(DecryptFilter::new(
                cfb,
                session_key.alg,
                budget,
                true,
            )));
            self.regions.push_fenced();
            let res = self.parse_layer(handler, depth + 1);
            self.regions.pop();
            let filter = self.readers.pop().expect("decrypt filter present");
            self.regions.consume_outer(filter.consumed_below());
            res
        }
    }

    /// Streams the rest of the region to the handler as raw
    /// ciphertext chunks.
    fn stream_raw(&mut self, handler: &mut dyn Handler) -> Result<()> {
        let mut chunk = [0u8; CHUNK_SIZE];
        loop {
            let want = match self.regions.remaining() {
                Some(0) => return Ok(()),
                Some(r) => r.min(CHUNK_SIZE),
                None => CHUNK_SIZE,
            };
            let n = self.readers.read(&mut chunk[..want])?;
            if n == 0 {
                if self.regions.remaining().is_some_and(|r| r > 0) {
                    return Err(Error::PacketIncomplete);
                }
                return Ok(());
            }
            self.regions.consume(n);
            handler.event(Event::EncryptedChunk(&chunk[..n]))?;
        }
    }

    /// Recurses into a fully buffered nested packet stream.
    fn recurse_buffered(
        &mut self,
        handler: &mut dyn Handler,
        data: Vec<u8>,
        depth: usize,
    ) -> Result<()> {
        self.readers.push(Box::new(BufferFilter::new(data)));
        self.regions.push_fenced();
        let res = self.parse_layer(handler, depth + 1);
        self.regions.pop();
        self.readers.pop();
        res
    }

    fn emit_packet(&mut self, handler: &mut dyn Handler, packet: Packet) -> Result<()> {
        match packet {
            Packet::OnePassSignature(ref ops) => {
                match self.crypto.hasher(ops.hash_algorithm) {
                    Ok(hash) => self.sig_hashes.push(SigHash {
                        key_id: ops.key_id,
                        alg: ops.hash_algorithm,
                        hash,
                    }),
                    Err(e) => self.errors.push(e),
                }
                handler.event(Event::Packet(packet))
            }
            Packet::Signature(signature) => self.emit_signature(handler, signature),
            Packet::PublicKeyEncryptedSessionKey(ref pkesk) => {
                if self.session_key.is_none() {
                    if let Some(mut secret_key) = handler.get_secret_key(&pkesk.id) {
                        if secret_key.is_encrypted() {
                            if let Some(passphrase) = handler.get_passphrase() {
                                let passphrase = Zeroizing::new(passphrase);
                                secret_key.unlock(&*self.crypto, &passphrase)?;
                            }
                        }
                        match secret_key.secret_params {
                            SecretParams::Plain(ref plain) => {
                                let key = pkesk.decrypt(
                                    &*self.crypto,
                                    &secret_key.details.public_params,
                                    plain,
                                )?;
                                self.session_key = Some(key);
                            }
                            SecretParams::Encrypted(_) => {
                                self.errors.push(Error::MissingKey);
                            }
                        }
                    }
                }
                handler.event(Event::Packet(packet))
            }
            Packet::SymKeyEncryptedSessionKey(ref skesk) => {
                if self.session_key.is_none() {
                    if let Some(passphrase) = handler.get_passphrase() {
                        let passphrase = Zeroizing::new(passphrase);
                        match skesk.decrypt(&*self.crypto, &passphrase) {
                            Ok(key) => self.session_key = Some(key),
                            Err(e) if e.is_fatal() => return Err(e),
                            Err(e) => self.errors.push(e),
                        }
                    }
                }
                handler.event(Event::Packet(packet))
            }
            _ => handler.event(Event::Packet(packet)),
        }
    }

    fn emit_signature(&mut self, handler: &mut dyn Handler, signature: Signature) -> Result<()> {
        for sp in signature.critical_unknown_subpackets() {
            let typ = sp.typ();
            if self.config.critical_subpackets_fatal {
                return Err(Error::CriticalSubpacketIgnored { typ });
            }
            self.errors.push(Error::CriticalSubpacketIgnored { typ });
        }
        if !self.config.allow_weak_hash && signature.hash_alg == HashAlgorithm::MD5 {
            self.errors
                .push(crate::format_err!("signature uses weak hash algorithm MD5"));
        }

        let hash = self.take_sig_hash(&signature);
        if let Some(ref hash) = hash {
            let mut check = hash.box_clone();
            signature.update_hash(&mut *check);
            let digest = check.finalize();
            if digest[..2] != signature.signed_hash_value {
                self.errors
                    .push(crate::format_err!("signature quick check failed"));
            }
        }
        handler.event(Event::Signature { signature, hash })
    }

    /// Takes the document hash context belonging to `signature`: the
    /// cleartext hash when one is pending, otherwise the one pass
    /// seeded context matching issuer and algorithm.
    fn take_sig_hash(&mut self, signature: &Signature) -> Option<Box<dyn DynDigest>> {
        if let Some(hash) = self.cleartext_hash.take() {
            return Some(hash);
        }
        let issuer = signature.issuer();
        let pos = self.sig_hashes.iter().position(|sh| {
            sh.alg == signature.hash_alg
                && match issuer {
                    Some(id) => sh.key_id == id || sh.key_id == WILDCARD_KEY_ID,
                    None => true,
                }
        })?;
        Some(self.sig_hashes.remove(pos).hash)
    }

    /// Buffers the rest of the current region: its declared remainder
    /// when bounded, everything until EOF otherwise.
    fn read_body(&mut self) -> Result<Vec<u8>> {
        match self.regions.remaining() {
            Some(n) => self.read_exact(n),
            None => {
                let mut body = Vec::new();
                let mut chunk = [0u8; CHUNK_SIZE];
                loop {
                    let n = self.readers.read(&mut chunk)?;
                    if n == 0 {
                        return Ok(body);
                    }
                    self.regions.consume(n);
                    body.extend_from_slice(&chunk[..n]);
                }
            }
        }
    }

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        self.regions.check(n)?;
        let mut buf = vec![0u8; n];
        let got = self.readers.read_all(&mut buf)?;
        if got != n {
            return Err(Error::ReadFailed { wanted: n, got });
        }
        self.regions.consume(n);
        Ok(buf)
    }

    /// Discards the rest of a bounded region to resynchronize on the
    /// next packet boundary.
    fn skip_remaining(&mut self) -> Result<()> {
        let mut chunk = [0u8; CHUNK_SIZE];
        while let Some(remaining) = self.regions.remaining() {
            if remaining == 0 {
                break;
            }
            let n = self.readers.read(&mut chunk[..remaining.min(CHUNK_SIZE)])?;
            if n == 0 {
                return Err(Error::PacketIncomplete);
            }
            self.regions.consume(n);
        }
        Ok(())
    }

    /// Drains a partial body filter to its final chunk.
    fn drain_to_eof(&mut self) -> Result<()> {
        let mut chunk = [0u8; CHUNK_SIZE];
        loop {
            let n = self.readers.read(&mut chunk)?;
            if n == 0 {
                return Ok(());
            }
            self.regions.consume(n);
        }
    }

    fn forward_events(&mut self, handler: &mut dyn Handler) -> Result<()> {
        for event in self.readers.take_events() {
            match event {
                FilterEvent::ArmorBegin { typ, headers } => {
                    handler.event(Event::ArmorBegin { typ, headers })?
                }
                FilterEvent::ArmorEnd { typ } => handler.event(Event::ArmorEnd { typ })?,
                FilterEvent::UnarmouredText(text) => {
                    handler.event(Event::UnarmouredText(text))?
                }
                FilterEvent::CleartextBody(text) => {
                    handler.event(Event::CleartextBody(text))?
                }
                FilterEvent::CleartextHash(hash) => self.cleartext_hash = Some(hash),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::DefaultCrypto;
    use crate::packet::{write_packet, LiteralData};
    use crate::ser::Serialize;
    use crate::types::{StringToKey, SymmetricKeyAlgorithm};
    use sha2::{Digest, Sha256};

    #[derive(Default)]
    struct Collector {
        packets: Vec<Packet>,
        literal_header: Option<LiteralDataHeader>,
        literal: Vec<u8>,
        compressed: Vec<CompressionAlgorithm>,
        signatures: Vec<(Signature, bool)>,
        passphrase: Option<Vec<u8>>,
    }

    impl Handler for Collector {
        fn event(&mut self, event: Event<'_>) -> Result<()> {
            match event {
                Event::Packet(p) => self.packets.push(p),
                Event::LiteralHeader(h) => self.literal_header = Some(h),
                Event::LiteralChunk(c) => self.literal.extend_from_slice(c),
                Event::CompressedBegin(alg) => self.compressed.push(alg),
                Event::Signature { signature, hash } => {
                    self.signatures.push((signature, hash.is_some()))
                }
                _ => {}
            }
            Ok(())
        }

        fn get_passphrase(&mut self) -> Option<Vec<u8>> {
            self.passphrase.clone()
        }
    }

    fn run(data: &[u8], collector: &mut Collector) -> Vec<Error> {
        parse(
            data,
            Arc::new(DefaultCrypto),
            ParseConfig::default(),
            collector,
        )
        .unwrap()
    }

    #[test]
    fn literal_hello_world() {
        let mut data = Vec::new();
        write_packet(&mut data, &LiteralData::from_bytes(&b"hello world"[..])).unwrap();

        let mut collector = Collector::default();
        let errors = run(&data, &mut collector);
        assert!(errors.is_empty());

        let header = collector.literal_header.unwrap();
        assert!(header.file_name.is_empty());
        assert_eq!(header.created.timestamp(), 0);
        assert_eq!(collector.literal, b"hello world");
    }

    #[test]
    fn partial_length_matches_fixed() {
        let body = LiteralData::from_bytes(&b"hello world"[..]).to_bytes().unwrap();
        assert_eq!(body.len(), 17);

        // 8 byte partial first chunk, then a 9 byte final chunk
        let mut partial = vec![0b1100_0000 | 11, 0xE0 | 3];
        partial.extend_from_slice(&body[..8]);
        partial.push(9);
        partial.extend_from_slice(&body[8..]);

        let mut fixed = Vec::new();
        write_packet(&mut fixed, &LiteralData::from_bytes(&b"hello world"[..])).unwrap();

        let mut from_partial = Collector::default();
        assert!(run(&partial, &mut from_partial).is_empty());
        let mut from_fixed = Collector::default();
        assert!(run(&fixed, &mut from_fixed).is_empty());

        assert_eq!(from_partial.literal, from_fixed.literal);
        assert_eq!(from_partial.literal_header, from_fixed.literal_header);
    }

    #[test]
    fn resynchronizes_after_malformed_packet() {
        // a marker packet with the wrong body, then a valid literal
        let mut data = vec![0b1100_0000 | 10, 3, b'X', b'X', b'X'];
        write_packet(&mut data, &LiteralData::from_bytes(&b"after"[..])).unwrap();

        let mut collector = Collector::default();
        let errors = run(&data, &mut collector);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], Error::InvalidPacketContent { .. }));
        assert_eq!(collector.literal, b"after");
    }

    #[test]
    fn error_in_indeterminate_region_halts() {
        // old format literal data, indeterminate length, invalid mode
        let mut data = vec![0x80 | (11 << 2) | 3];
        data.extend_from_slice(&[b'x', 0, 0, 0, 0, 0]);
        write_packet(&mut data, &LiteralData::from_bytes(&b"never seen"[..])).unwrap();

        let mut collector = Collector::default();
        let errors = run(&data, &mut collector);
        assert_eq!(errors.len(), 1);
        assert!(collector.literal.is_empty());
    }

    #[test]
    fn recurses_into_compressed_data() {
        use crate::writer::{CompressFilter, WriterStack};

        let mut inner = Vec::new();
        write_packet(&mut inner, &LiteralData::from_bytes(&b"nested"[..])).unwrap();

        let mut stack = WriterStack::new(Vec::new());
        stack.push(Box::new(CompressFilter::new(CompressionAlgorithm::ZLIB)));
        crate::writer::Sink::write_all(&mut stack, &inner).unwrap();
        let data = stack.finish_all().unwrap();

        let mut collector = Collector::default();
        let errors = run(&data, &mut collector);
        assert!(errors.is_empty());
        assert_eq!(collector.compressed, [CompressionAlgorithm::ZLIB]);
        assert_eq!(collector.literal, b"nested");
    }

    /// A v4 signature body with no subpackets over the given
    /// two-octet quick check value.
    fn v4_sig_body(quick: [u8; 2]) -> Vec<u8> {
        let mut body = vec![4, 0, 1, 8, 0, 0, 0, 0];
        body.extend_from_slice(&quick);
        body.extend_from_slice(&[0, 1, 1]); // one bit RSA "signature"
        body
    }

    #[test]
    fn one_pass_signature_hash_reaches_the_signature() {
        let ops = packet::OnePassSignature {
            typ: crate::types::SignatureType::Binary,
            hash_algorithm: HashAlgorithm::SHA256,
            pub_algorithm: crate::types::PublicKeyAlgorithm::RSA,
            key_id: [9u8; 8].into(),
            last: 1,
        };

        // digest the driver should accumulate: document, hashed area,
        // v4 trailer
        let mut expect = Sha256::new();
        Digest::update(&mut expect, b"hello world");
        Digest::update(&mut expect, [4u8, 0, 1, 8, 0, 0]);
        Digest::update(&mut expect, [0x04, 0xFF, 0, 0, 0, 6]);
        let digest = expect.finalize();

        let mut data = Vec::new();
        write_packet(&mut data, &ops).unwrap();
        write_packet(&mut data, &LiteralData::from_bytes(&b"hello world"[..])).unwrap();
        let sig_body = v4_sig_body([digest[0], digest[1]]);
        data.push(0b1100_0000 | 2);
        data.push(sig_body.len() as u8);
        data.extend_from_slice(&sig_body);

        let mut collector = Collector::default();
        let errors = run(&data, &mut collector);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(collector.signatures.len(), 1);
        assert!(collector.signatures[0].1, "hash context delivered");

        // and a wrong quick check value is reported
        let mut data = Vec::new();
        write_packet(&mut data, &ops).unwrap();
        write_packet(&mut data, &LiteralData::from_bytes(&b"hello world"[..])).unwrap();
        let sig_body = v4_sig_body([digest[0] ^ 0xFF, digest[1]]);
        data.push(0b1100_0000 | 2);
        data.push(sig_body.len() as u8);
        data.extend_from_slice(&sig_body);

        let mut collector = Collector::default();
        let errors = run(&data, &mut collector);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn skesk_unlocks_protected_data() {
        let crypto = DefaultCrypto;
        let skesk = packet::SymKeyEncryptedSessionKey {
            sym_algorithm: SymmetricKeyAlgorithm::AES128,
            s2k: StringToKey::new_simple(HashAlgorithm::SHA256),
            encrypted_key: None,
        };
        let session_key = skesk.decrypt(&crypto, b"open sesame").unwrap();

        let mut inner = Vec::new();
        write_packet(&mut inner, &LiteralData::from_bytes(&b"secret text"[..])).unwrap();

        use rand::{rngs::StdRng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(7);
        let encrypted =
            packet::sym_encrypted::encrypt_protected(&crypto, &session_key, &mut rng, &inner)
                .unwrap();

        let mut data = Vec::new();
        write_packet(&mut data, &skesk).unwrap();
        data.push(0b1100_0000 | 18);
        crate::packet::write_body_len(&mut data, 1 + encrypted.len()).unwrap();
        data.push(1);
        data.extend_from_slice(&encrypted);

        let mut collector = Collector::default();
        collector.passphrase = Some(b"open sesame".to_vec());
        let errors = run(&data, &mut collector);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(collector.literal, b"secret text");
        // the MDC packet of the decrypted layer is surfaced too
        assert!(collector
            .packets
            .iter()
            .any(|p| p.tag() == Tag::ModDetectionCode));
    }

    #[test]
    fn encrypted_data_without_key_surfaces_ciphertext() {
        let mut data = vec![0b1100_0000 | 9];
        crate::packet::write_body_len(&mut data, 5).unwrap();
        data.extend_from_slice(&[1, 2, 3, 4, 5]);

        struct Raw(Vec<u8>);
        impl Handler for Raw {
            fn event(&mut self, event: Event<'_>) -> Result<()> {
                if let Event::EncryptedChunk(c) = event {
                    self.0.extend_from_slice(c);
                }
                Ok(())
            }
        }
        let mut raw = Raw(Vec::new());
        let errors = parse(
            &data[..],
            Arc::new(DefaultCrypto),
            ParseConfig::default(),
            &mut raw,
        )
        .unwrap();
        assert!(errors.is_empty());
        assert_eq!(raw.0, [1, 2, 3, 4, 5]);
    }
}
