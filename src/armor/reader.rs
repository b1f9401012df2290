//! The dearmour state machine, as a reader filter.
//!
//! Scans unarmoured text until an armor header line appears, then
//! base64-decodes the body while tracking the CRC-24 checksum, and
//! verifies the trailer names the same block type. Cleartext signed
//! messages short-circuit into dash escaped text processing instead,
//! terminating at the `BEGIN PGP SIGNATURE` line.

use std::collections::VecDeque;
use std::hash::Hasher;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use crc24::Crc24Hasher;
use digest::DynDigest;

use crate::armor::{
    is_allowed_header_key, parse_begin_line, parse_end_line, BlockType, Headers,
};
use crate::crypto::Crypto;
use crate::errors::{Error, Result};
use crate::reader::{FilterEvent, ReadFilter, Source};
use crate::types::HashAlgorithm;
use crate::{bail, format_err, unsupported_err};

const UNARMORED_FLUSH: usize = 1024;
const PULL_SIZE: usize = 1024;

enum State {
    OutsideBlock,
    Base64,
    AtTrailerName,
    Cleartext,
    Done,
}

pub struct DearmorFilter {
    state: State,
    crypto: Arc<dyn Crypto>,

    in_buf: Vec<u8>,
    in_pos: usize,
    in_eof: bool,
    consumed: usize,

    out: VecDeque<u8>,
    events: Vec<FilterEvent>,

    /// Block type of the most recent `BEGIN`.
    block: Option<BlockType>,
    crc: Crc24Hasher,
    b64_acc: Vec<u8>,
    b64_finished: bool,

    unarmoured: Vec<u8>,

    /// Cleartext mode: the running hash and the previous body line,
    /// pending its line ending.
    clear_hash: Option<Box<dyn DynDigest>>,
    clear_prev: Option<Vec<u8>>,
}

impl DearmorFilter {
    pub fn new(crypto: Arc<dyn Crypto>) -> Self {
        DearmorFilter {
            state: State::OutsideBlock,
            crypto,
            in_buf: Vec::new(),
            in_pos: 0,
            in_eof: false,
            consumed: 0,
            out: VecDeque::new(),
            events: Vec::new(),
            block: None,
            crc: Crc24Hasher::new(),
            b64_acc: Vec::new(),
            b64_finished: false,
            unarmoured: Vec::new(),
            clear_hash: None,
            clear_prev: None,
        }
    }

    /// Returns the next line, without its line ending. `None` at EOF.
    fn read_line(&mut self, below: &mut dyn Source) -> Result<Option<Vec<u8>>> {
        loop {
            if let Some(idx) = self.in_buf[self.in_pos..].iter().position(|b| *b == b'\n') {
                let mut line = self.in_buf[self.in_pos..self.in_pos + idx].to_vec();
                self.in_pos += idx + 1;
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                // compact the consumed prefix now and then
                if self.in_pos > 4096 {
                    self.in_buf.drain(..self.in_pos);
                    self.in_pos = 0;
                }
                return Ok(Some(line));
            }

            if self.in_eof {
                if self.in_pos < self.in_buf.len() {
                    let mut line = self.in_buf[self.in_pos..].to_vec();
                    self.in_pos = self.in_buf.len();
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                    return Ok(Some(line));
                }
                return Ok(None);
            }

            let mut chunk = [0u8; PULL_SIZE];
            let n = below.read(&mut chunk)?;
            if n == 0 {
                self.in_eof = true;
            } else {
                self.consumed += n;
                self.in_buf.extend_from_slice(&chunk[..n]);
            }
        }
    }

    fn flush_unarmoured(&mut self) {
        if !self.unarmoured.is_empty() {
            self.events
                .push(FilterEvent::UnarmouredText(std::mem::take(
                    &mut self.unarmoured,
                )));
        }
    }

    /// Parses the colon delimited armor headers up to the blank line.
    fn read_headers(&mut self, below: &mut dyn Source) -> Result<Headers> {
        let mut headers = Headers::new();
        loop {
            let Some(line) = self.read_line(below)? else {
                return Err(Error::PacketIncomplete);
            };
            if line.is_empty() {
                return Ok(headers);
            }
            let line = std::str::from_utf8(&line)?;
            let Some((key, value)) = line.split_once(": ") else {
                bail!("malformed armor header line {:?}", line);
            };
            if !is_allowed_header_key(key) {
                bail!("illegal armor header key {:?}", key);
            }
            headers
                .entry(key.to_string())
                .or_default()
                .push(value.to_string());
        }
    }

    fn begin_block(&mut self, below: &mut dyn Source, typ: BlockType) -> Result<()> {
        if let BlockType::MultiPartMessage(..) = typ {
            unsupported_err!("multi-part armored messages");
        }

        let headers = self.read_headers(below)?;
        self.flush_unarmoured();

        if typ == BlockType::CleartextMessage {
            // default MD5 for historic cleartext messages without a Hash header
            let alg = match headers.get("Hash").and_then(|v| v.first()) {
                Some(name) => HashAlgorithm::from_name(name)
                    .ok_or_else(|| format_err!("unsupported cleartext hash {:?}", name))?,
                None => HashAlgorithm::MD5,
            };
            self.clear_hash = Some(self.crypto.hasher(alg)?);
            self.clear_prev = None;
            self.state = State::Cleartext;
        } else {
            self.crc = Crc24Hasher::new();
            self.b64_acc.clear();
            self.b64_finished = false;
            self.state = State::Base64;
        }

        self.block = Some(typ);
        self.events.push(FilterEvent::ArmorBegin { typ, headers });
        Ok(())
    }

    fn decode_base64_line(&mut self, line: &[u8]) -> Result<()> {
        let trimmed: Vec<u8> = line
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        if trimmed.is_empty() {
            return Ok(());
        }
        if self.b64_finished {
            bail!("armor data after base64 padding");
        }
        self.b64_acc.extend_from_slice(&trimmed);

        while self.b64_acc.len() >= 4 {
            let quad: Vec<u8> = self.b64_acc.drain(..4).collect();
            let decoded = STANDARD.decode(&quad)?;
            self.crc.write(&decoded);
            self.out.extend(decoded);
            if quad.contains(&b'=') {
                self.b64_finished = true;
                if !self.b64_acc.is_empty() {
                    bail!("armor data after base64 padding");
                }
            }
        }
        Ok(())
    }

    fn check_crc_line(&mut self, line: &[u8]) -> Result<()> {
        if !self.b64_acc.is_empty() {
            bail!("truncated base64 quad before checksum");
        }
        if line.len() != 5 {
            bail!("malformed armor checksum line");
        }
        let decoded = STANDARD.decode(&line[1..5])?;
        if decoded.len() != 3 {
            bail!("malformed armor checksum line");
        }
        let expected =
            (u32::from(decoded[0]) << 16) | (u32::from(decoded[1]) << 8) | u32::from(decoded[2]);
        let actual = self.crc.finish() as u32 & 0xFF_FFFF;
        if expected != actual {
            return Err(Error::InvalidChecksum);
        }
        Ok(())
    }

    fn step_cleartext(&mut self, below: &mut dyn Source) -> Result<()> {
        let Some(line) = self.read_line(below)? else {
            return Err(Error::PacketIncomplete);
        };

        if parse_begin_line(&line) == Some(BlockType::Signature) {
            // the line ending before the signature header is not hashed
            let mut hash = self.clear_hash.take().expect("cleartext mode has a hash");
            if let Some(prev) = self.clear_prev.take() {
                hash.update(trim_end_whitespace(&prev));
            }
            self.events.push(FilterEvent::CleartextHash(hash));

            let headers = self.read_headers(below)?;
            self.block = Some(BlockType::Signature);
            self.crc = Crc24Hasher::new();
            self.b64_acc.clear();
            self.b64_finished = false;
            self.state = State::Base64;
            self.events.push(FilterEvent::ArmorBegin {
                typ: BlockType::Signature,
                headers,
            });
            return Ok(());
        }

        // dash escaped lines lose their "- " prefix
        let body = if line.starts_with(b"- ") {
            line[2..].to_vec()
        } else {
            line
        };

        let hash = self.clear_hash.as_mut().expect("cleartext mode has a hash");
        if let Some(prev) = self.clear_prev.take() {
            // earlier line endings are hashed, normalized to CRLF
            hash.update(trim_end_whitespace(&prev));
            hash.update(b"\r\n");
        }
        self.clear_prev = Some(body.clone());

        let mut delivered = body;
        delivered.push(b'\n');
        self.events.push(FilterEvent::CleartextBody(delivered));
        Ok(())
    }

    /// Advances the state machine by one line. Returns `false` once the
    /// input is exhausted.
    fn step(&mut self, below: &mut dyn Source) -> Result<bool> {
        match self.state {
            State::Done => Ok(false),
            State::OutsideBlock => {
                let Some(line) = self.read_line(below)? else {
                    self.flush_unarmoured();
                    self.state = State::Done;
                    return Ok(false);
                };

                if let Some(typ) = parse_begin_line(&line) {
                    self.begin_block(below, typ)?;
                } else {
                    self.unarmoured.extend_from_slice(&line);
                    self.unarmoured.push(b'\n');
                    if self.unarmoured.len() >= UNARMORED_FLUSH {
                        self.flush_unarmoured();
                    }
                }
                Ok(true)
            }
            State::Base64 => {
                let Some(line) = self.read_line(below)? else {
                    return Err(Error::PacketIncomplete);
                };

                if line.first() == Some(&b'=') {
                    self.check_crc_line(&line)?;
                    self.state = State::AtTrailerName;
                } else if parse_end_line(&line).is_some() {
                    // the checksum line is mandatory
                    return Err(Error::InvalidChecksum);
                } else {
                    self.decode_base64_line(&line)?;
                }
                Ok(true)
            }
            State::AtTrailerName => {
                let Some(line) = self.read_line(below)? else {
                    return Err(Error::PacketIncomplete);
                };
                let Some(typ) = parse_end_line(&line) else {
                    return Err(Error::InvalidArmorWrappers);
                };
                if Some(typ) != self.block {
                    return Err(Error::InvalidArmorWrappers);
                }
                self.events.push(FilterEvent::ArmorEnd { typ });
                self.block = None;
                self.state = State::OutsideBlock;
                Ok(true)
            }
            State::Cleartext => {
                self.step_cleartext(below)?;
                Ok(true)
            }
        }
    }
}

fn trim_end_whitespace(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| *b != b' ' && *b != b'\t')
        .map_or(0, |p| p + 1);
    &line[..end]
}

impl ReadFilter for DearmorFilter {
    fn read(&mut self, below: &mut dyn Source, buf: &mut [u8]) -> Result<usize> {
        loop {
            if !self.out.is_empty() {
                let n = buf.len().min(self.out.len());
                for (i, b) in self.out.drain(..n).enumerate() {
                    buf[i] = b;
                }
                return Ok(n);
            }
            if !self.step(below)? {
                return Ok(0);
            }
        }
    }

    fn consumed_below(&self) -> usize {
        self.consumed
    }

    fn take_events(&mut self) -> Vec<FilterEvent> {
        std::mem::take(&mut self.events)
    }

    fn name(&self) -> &'static str {
        "dearmor"
    }
}
