//! ASCII armoring writer filter.

use std::hash::Hasher;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use crc24::Crc24Hasher;

use crate::armor::{BlockType, Headers, ARMOR_COLUMNS};
use crate::errors::Result;
use crate::writer::{Sink, WriteFilter};

/// Raw bytes per armor line: 57 bytes encode to 76 base64 characters.
const BYTES_PER_LINE: usize = ARMOR_COLUMNS / 4 * 3;

pub struct ArmorFilter {
    typ: BlockType,
    headers: Headers,
    started: bool,
    pending: Vec<u8>,
    crc: Crc24Hasher,
}

impl ArmorFilter {
    pub fn new(typ: BlockType) -> Self {
        Self::with_headers(typ, Headers::new())
    }

    pub fn with_headers(typ: BlockType, headers: Headers) -> Self {
        ArmorFilter {
            typ,
            headers,
            started: false,
            pending: Vec::new(),
            crc: Crc24Hasher::new(),
        }
    }

    fn begin(&mut self, below: &mut dyn Sink) -> Result<()> {
        if self.started {
            return Ok(());
        }
        below.write_all(format!("-----BEGIN {}-----\n", self.typ).as_bytes())?;
        for (key, values) in &self.headers {
            for value in values {
                below.write_all(format!("{key}: {value}\n").as_bytes())?;
            }
        }
        below.write_all(b"\n")?;
        self.started = true;
        Ok(())
    }

    fn flush_lines(&mut self, below: &mut dyn Sink, all: bool) -> Result<()> {
        let mut line = String::with_capacity(ARMOR_COLUMNS + 1);
        while self.pending.len() >= BYTES_PER_LINE {
            let chunk: Vec<u8> = self.pending.drain(..BYTES_PER_LINE).collect();
            line.clear();
            STANDARD.encode_string(&chunk, &mut line);
            line.push('\n');
            below.write_all(line.as_bytes())?;
        }
        if all && !self.pending.is_empty() {
            line.clear();
            STANDARD.encode_string(&self.pending, &mut line);
            line.push('\n');
            below.write_all(line.as_bytes())?;
            self.pending.clear();
        }
        Ok(())
    }
}

impl WriteFilter for ArmorFilter {
    fn write(&mut self, below: &mut dyn Sink, buf: &[u8]) -> Result<()> {
        self.begin(below)?;
        self.crc.write(buf);
        self.pending.extend_from_slice(buf);
        self.flush_lines(below, false)
    }

    fn finish(&mut self, below: &mut dyn Sink) -> Result<()> {
        self.begin(below)?;
        self.flush_lines(below, true)?;

        let crc = self.crc.finish() as u32 & 0xFF_FFFF;
        let crc_bytes = [(crc >> 16) as u8, (crc >> 8) as u8, crc as u8];
        let mut line = String::from("=");
        STANDARD.encode_string(crc_bytes, &mut line);
        line.push('\n');
        below.write_all(line.as_bytes())?;

        below.write_all(format!("-----END {}-----\n", self.typ).as_bytes())?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "armor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::WriterStack;

    fn armored(typ: BlockType, data: &[u8]) -> String {
        let mut stack = WriterStack::new(Vec::new());
        stack.push(Box::new(ArmorFilter::new(typ)));
        stack.write_all(data).unwrap();
        String::from_utf8(stack.finish_all().unwrap()).unwrap()
    }

    #[test]
    fn small_message() {
        let out = armored(BlockType::Message, &[1, 2, 3]);
        assert_eq!(
            out,
            "-----BEGIN PGP MESSAGE-----\n\nAQID\n=Z2GT\n-----END PGP MESSAGE-----\n"
        );
    }

    #[test]
    fn empty_payload_crc() {
        // CRC-24 of the empty string is the 0xB704CE initializer
        let out = armored(BlockType::Signature, &[]);
        assert!(out.contains("\n=twTO\n"));
    }

    #[test]
    fn wraps_at_76_columns() {
        let out = armored(BlockType::Message, &[0xAAu8; 200]);
        for line in out.lines() {
            assert!(line.len() <= 76, "line too long: {line:?}");
        }
        // 200 bytes need three full 57 byte lines and a remainder
        let body_lines: Vec<&str> = out
            .lines()
            .filter(|l| !l.starts_with('-') && !l.starts_with('=') && !l.is_empty())
            .collect();
        assert_eq!(body_lines.len(), 4);
        assert_eq!(body_lines[0].len(), 76);
    }

    #[test]
    fn headers_are_emitted() {
        let mut headers = Headers::new();
        headers.insert("Version".into(), vec!["test 1.0".into()]);
        let mut stack = WriterStack::new(Vec::new());
        stack.push(Box::new(ArmorFilter::with_headers(
            BlockType::PublicKey,
            headers,
        )));
        stack.write_all(&[5]).unwrap();
        let out = String::from_utf8(stack.finish_all().unwrap()).unwrap();
        assert!(out.starts_with(
            "-----BEGIN PGP PUBLIC KEY BLOCK-----\nVersion: test 1.0\n\n"
        ));
    }

    #[test]
    fn roundtrips_through_dearmor() {
        use crate::crypto::DefaultCrypto;
        use crate::armor::DearmorFilter;
        use crate::reader::{ReaderStack, Source};
        use std::sync::Arc;

        let data: Vec<u8> = (0u8..=255).cycle().take(300).collect();
        let out = armored(BlockType::Message, &data);

        let mut stack = ReaderStack::new(out.as_bytes());
        stack.push(Box::new(DearmorFilter::new(Arc::new(DefaultCrypto))));
        let mut back = vec![0u8; data.len()];
        assert_eq!(stack.read_all(&mut back).unwrap(), data.len());
        assert_eq!(back, data);
    }
}
