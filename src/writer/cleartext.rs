//! Dash escaped cleartext framing for clearsigned messages.
//!
//! Emits the `BEGIN PGP SIGNED MESSAGE` header, escapes body lines and
//! feeds the canonicalized text (trailing whitespace stripped, CRLF
//! line endings) into the signature hash.
//!
//! Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-7>

use std::cell::RefCell;
use std::rc::Rc;

use digest::DynDigest;

use crate::armor::BlockType;
use crate::errors::Result;
use crate::types::HashAlgorithm;
use crate::writer::{Sink, WriteFilter};

/// Handle onto the hash context a [`DashEscapeFilter`] fills while the
/// body streams through. The signature over the cleartext is built
/// from the context taken out of this handle after the filter is
/// popped.
#[derive(Clone)]
pub struct CleartextHashHandle(Rc<RefCell<Option<Box<dyn DynDigest>>>>);

impl CleartextHashHandle {
    pub fn take(&self) -> Option<Box<dyn DynDigest>> {
        self.0.borrow_mut().take()
    }
}

pub struct DashEscapeFilter {
    hash_alg: HashAlgorithm,
    hash: Rc<RefCell<Option<Box<dyn DynDigest>>>>,
    started: bool,
    /// Current, incomplete line.
    line: Vec<u8>,
    /// Whether any complete line has been hashed yet; earlier lines
    /// get their CRLF terminator, the final one does not.
    any_line_hashed: bool,
}

impl DashEscapeFilter {
    pub fn new(
        hash_alg: HashAlgorithm,
        hash: Box<dyn DynDigest>,
    ) -> (Self, CleartextHashHandle) {
        let shared = Rc::new(RefCell::new(Some(hash)));
        let filter = DashEscapeFilter {
            hash_alg,
            hash: shared.clone(),
            started: false,
            line: Vec::new(),
            any_line_hashed: false,
        };
        (filter, CleartextHashHandle(shared))
    }

    fn begin(&mut self, below: &mut dyn Sink) -> Result<()> {
        if self.started {
            return Ok(());
        }
        below.write_all(
            format!("-----BEGIN {}-----\n", BlockType::CleartextMessage).as_bytes(),
        )?;
        below.write_all(format!("Hash: {}\n\n", self.hash_alg.name()).as_bytes())?;
        self.started = true;
        Ok(())
    }

    fn emit_line(&mut self, below: &mut dyn Sink) -> Result<()> {
        let line = std::mem::take(&mut self.line);

        // hash with trailing whitespace stripped, CRLF separated
        let trimmed = trim_end_whitespace(&line);
        if let Some(ref mut hash) = *self.hash.borrow_mut() {
            if self.any_line_hashed {
                hash.update(b"\r\n");
            }
            hash.update(trimmed);
        }
        self.any_line_hashed = true;

        if line.starts_with(b"-") {
            below.write_all(b"- ")?;
        }
        below.write_all(&line)?;
        below.write_all(b"\r\n")?;
        Ok(())
    }
}

fn trim_end_whitespace(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| *b != b' ' && *b != b'\t' && *b != b'\r')
        .map_or(0, |p| p + 1);
    &line[..end]
}

impl WriteFilter for DashEscapeFilter {
    fn write(&mut self, below: &mut dyn Sink, buf: &[u8]) -> Result<()> {
        self.begin(below)?;
        for b in buf {
            if *b == b'\n' {
                self.emit_line(below)?;
            } else {
                self.line.push(*b);
            }
        }
        Ok(())
    }

    fn finish(&mut self, below: &mut dyn Sink) -> Result<()> {
        self.begin(below)?;
        if !self.line.is_empty() {
            self.emit_line(below)?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "dash-escape"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Crypto, DefaultCrypto};
    use crate::writer::WriterStack;
    use sha2::{Digest, Sha256};

    #[test]
    fn escapes_and_hashes() {
        let hash = DefaultCrypto.hasher(HashAlgorithm::SHA256).unwrap();
        let (filter, handle) = DashEscapeFilter::new(HashAlgorithm::SHA256, hash);

        let mut stack = WriterStack::new(Vec::new());
        stack.push(Box::new(filter));
        stack
            .write_all(b"hello world  \n-----dashes\nlast line")
            .unwrap();
        let out = String::from_utf8(stack.finish_all().unwrap()).unwrap();

        assert_eq!(
            out,
            "-----BEGIN PGP SIGNED MESSAGE-----\nHash: SHA256\n\n\
             hello world  \r\n- -----dashes\r\nlast line\r\n"
        );

        let digest = handle.take().unwrap().finalize();
        let expected = Sha256::digest(b"hello world\r\n-----dashes\r\nlast line");
        assert_eq!(digest.as_ref(), expected.as_slice());
    }

    #[test]
    fn matches_dearmor_hashing() {
        use crate::armor::DearmorFilter;
        use crate::reader::{FilterEvent, ReaderStack, Source};
        use std::sync::Arc;

        let body = b"line one\n- starts with dash\ntail";

        let hash = DefaultCrypto.hasher(HashAlgorithm::SHA256).unwrap();
        let (filter, handle) = DashEscapeFilter::new(HashAlgorithm::SHA256, hash);
        let mut stack = WriterStack::new(Vec::new());
        stack.push(Box::new(filter));
        stack.write_all(body).unwrap();
        let mut armored = stack.finish_all().unwrap();
        let write_digest = handle.take().unwrap().finalize();

        // close the block the way a signature would
        armored.extend_from_slice(b"-----BEGIN PGP SIGNATURE-----\n\nAQID\n=Z2GT\n-----END PGP SIGNATURE-----\n");

        let mut reader = ReaderStack::new(&armored[..]);
        reader.push(Box::new(DearmorFilter::new(Arc::new(DefaultCrypto))));
        let mut sink = [0u8; 64];
        while reader.read(&mut sink).unwrap() != 0 {}
        let read_digest = reader
            .take_events()
            .into_iter()
            .find_map(|e| match e {
                FilterEvent::CleartextHash(h) => Some(h.finalize()),
                _ => None,
            })
            .unwrap();

        assert_eq!(write_digest, read_digest);
    }
}
