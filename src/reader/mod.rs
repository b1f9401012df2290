//! The stacked reader filter chain.
//!
//! Every transformation applied to the incoming byte stream
//! (dearmouring, partial length coalescing, decryption, decompression)
//! is a [`ReadFilter`] pushed onto the [`ReaderStack`]. A single top
//! level read call pulls down through every pushed filter before
//! returning bytes. The stack exclusively owns its filters; popping a
//! filter releases exactly that filter.

mod buffer;
mod decompress;
mod decrypt;
mod partial;

pub use self::buffer::BufferFilter;
pub use self::decompress::DecompressFilter;
pub use self::decrypt::DecryptFilter;
pub use self::partial::PartialBodyFilter;

use std::io;

use digest::DynDigest;
use log::debug;

use crate::armor::{BlockType, Headers};
use crate::errors::Result;

/// A pull source of bytes, either the base reader or the filters below
/// the current one.
pub trait Source {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Reads until `buf` is full or the source is exhausted. Returns
    /// the number of bytes read.
    fn read_all(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut total = 0;
        while total < buf.len() {
            let n = self.read(&mut buf[total..])?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }
}

/// Out of band notifications a filter wants delivered to the caller
/// (armor block boundaries, unarmoured text, cleartext bodies).
pub enum FilterEvent {
    ArmorBegin {
        typ: BlockType,
        headers: Headers,
    },
    ArmorEnd {
        typ: BlockType,
    },
    UnarmouredText(Vec<u8>),
    CleartextBody(Vec<u8>),
    /// The running hash over a dash escaped cleartext body, ready for
    /// the signature packet that follows.
    CleartextHash(Box<dyn DynDigest>),
}

impl std::fmt::Debug for FilterEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterEvent::ArmorBegin { typ, headers } => f
                .debug_struct("ArmorBegin")
                .field("typ", typ)
                .field("headers", headers)
                .finish(),
            FilterEvent::ArmorEnd { typ } => {
                f.debug_struct("ArmorEnd").field("typ", typ).finish()
            }
            FilterEvent::UnarmouredText(t) => {
                write!(f, "UnarmouredText({} bytes)", t.len())
            }
            FilterEvent::CleartextBody(t) => write!(f, "CleartextBody({} bytes)", t.len()),
            FilterEvent::CleartextHash(_) => write!(f, "CleartextHash"),
        }
    }
}

/// One entry in the reader stack.
pub trait ReadFilter {
    /// Pulls transformed bytes, drawing on the layer below as needed.
    /// Returning `Ok(0)` signals this filter is exhausted.
    fn read(&mut self, below: &mut dyn Source, buf: &mut [u8]) -> Result<usize>;

    /// Bytes this filter has pulled from the layer below, used to
    /// advance the outer regions once the filter is popped.
    fn consumed_below(&self) -> usize {
        0
    }

    fn take_events(&mut self) -> Vec<FilterEvent> {
        Vec::new()
    }

    fn name(&self) -> &'static str;
}

struct Layered<'a> {
    base: &'a mut dyn io::Read,
    filters: &'a mut [Box<dyn ReadFilter>],
}

impl Source for Layered<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.filters.split_last_mut() {
            Some((top, rest)) => {
                let mut below = Layered {
                    base: &mut *self.base,
                    filters: rest,
                };
                top.read(&mut below, buf)
            }
            None => Ok(self.base.read(buf)?),
        }
    }
}

/// The stack of reader filters over a base byte source.
pub struct ReaderStack<R> {
    base: R,
    filters: Vec<Box<dyn ReadFilter>>,
}

impl<R: io::Read> ReaderStack<R> {
    pub fn new(base: R) -> Self {
        ReaderStack {
            base,
            filters: Vec::new(),
        }
    }

    pub fn push(&mut self, filter: Box<dyn ReadFilter>) {
        debug!("pushing reader filter {}", filter.name());
        self.filters.push(filter);
    }

    pub fn pop(&mut self) -> Option<Box<dyn ReadFilter>> {
        let filter = self.filters.pop();
        if let Some(ref f) = filter {
            debug!("popped reader filter {}", f.name());
        }
        filter
    }

    pub fn depth(&self) -> usize {
        self.filters.len()
    }

    /// Drains pending out of band events, bottom-most filter first.
    pub fn take_events(&mut self) -> Vec<FilterEvent> {
        let mut events = Vec::new();
        for f in self.filters.iter_mut() {
            events.extend(f.take_events());
        }
        events
    }
}

impl<R: io::Read> Source for ReaderStack<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut layered = Layered {
            base: &mut self.base,
            filters: &mut self.filters,
        };
        layered.read(buf)
    }
}

pub(crate) fn read_u8(below: &mut dyn Source) -> Result<Option<u8>> {
    let mut b = [0u8; 1];
    let n = below.read_all(&mut b)?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(b[0]))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Adds one to every byte; enough to prove layering order.
    struct AddOne;

    impl ReadFilter for AddOne {
        fn read(&mut self, below: &mut dyn Source, buf: &mut [u8]) -> Result<usize> {
            let n = below.read(buf)?;
            for b in &mut buf[..n] {
                *b = b.wrapping_add(1);
            }
            Ok(n)
        }

        fn name(&self) -> &'static str {
            "add-one"
        }
    }

    #[test]
    fn filters_stack_in_order() {
        let data = [0u8, 1, 2, 3];
        let mut stack = ReaderStack::new(&data[..]);
        stack.push(Box::new(AddOne));
        stack.push(Box::new(AddOne));

        let mut out = [0u8; 4];
        assert_eq!(stack.read_all(&mut out).unwrap(), 4);
        assert_eq!(out, [2, 3, 4, 5]);

        stack.pop().unwrap();
        assert_eq!(stack.depth(), 1);
    }
}
