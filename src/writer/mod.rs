//! The stacked writer filter chain, mirroring the reader side.
//!
//! Filters transform outgoing bytes (armoring, compression,
//! encryption) on their way down to the base writer. Popping a filter
//! finalizes it exactly once: buffered state is flushed through the
//! layers below before the filter is released.

mod armor;
mod checksum;
mod cleartext;
mod compress;
mod sym_encrypted;

pub use self::armor::ArmorFilter;
pub use self::checksum::ChecksumFilter;
pub use self::cleartext::{CleartextHashHandle, DashEscapeFilter};
pub use self::compress::CompressFilter;
pub use self::sym_encrypted::{SymEncryptedLegacyFilter, SymEncryptedProtectedFilter};

use std::io;

use log::debug;

use crate::errors::Result;

/// A push sink of bytes, either the base writer or the filters below
/// the current one.
pub trait Sink {
    fn write_all(&mut self, buf: &[u8]) -> Result<()>;
}

impl<W: io::Write> Sink for W {
    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        io::Write::write_all(self, buf)?;
        Ok(())
    }
}

/// One entry in the writer stack.
pub trait WriteFilter {
    /// Pushes transformed bytes down to the layer below.
    fn write(&mut self, below: &mut dyn Sink, buf: &[u8]) -> Result<()>;

    /// Flushes buffered state; called exactly once, when the filter is
    /// popped.
    fn finish(&mut self, below: &mut dyn Sink) -> Result<()> {
        let _ = below;
        Ok(())
    }

    fn name(&self) -> &'static str;
}

struct Layered<'a> {
    base: &'a mut dyn io::Write,
    filters: &'a mut [Box<dyn WriteFilter>],
}

impl Sink for Layered<'_> {
    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        match self.filters.split_last_mut() {
            Some((top, rest)) => {
                let mut below = Layered {
                    base: &mut *self.base,
                    filters: rest,
                };
                top.write(&mut below, buf)
            }
            None => {
                io::Write::write_all(self.base, buf)?;
                Ok(())
            }
        }
    }
}

/// The stack of writer filters over a base writer.
pub struct WriterStack<W: io::Write> {
    base: W,
    filters: Vec<Box<dyn WriteFilter>>,
}

impl<W: io::Write> WriterStack<W> {
    pub fn new(base: W) -> Self {
        WriterStack {
            base,
            filters: Vec::new(),
        }
    }

    pub fn push(&mut self, filter: Box<dyn WriteFilter>) {
        debug!("pushing writer filter {}", filter.name());
        self.filters.push(filter);
    }

    /// Finalizes and removes the top filter.
    pub fn pop(&mut self) -> Result<()> {
        if let Some(mut top) = self.filters.pop() {
            debug!("finishing writer filter {}", top.name());
            let mut below = Layered {
                base: &mut self.base,
                filters: &mut self.filters,
            };
            top.finish(&mut below)?;
        }
        Ok(())
    }

    /// Finalizes every remaining filter, top to bottom, and returns
    /// the base writer.
    pub fn finish_all(mut self) -> Result<W> {
        while !self.filters.is_empty() {
            self.pop()?;
        }
        Ok(self.base)
    }

    pub fn depth(&self) -> usize {
        self.filters.len()
    }
}

/// Identity filter. Carries no transformation of its own; it holds a
/// finalization action at a fixed point in the stack, run when the
/// filter is popped.
#[derive(Default)]
pub struct PassthroughFilter {
    on_finish: Option<Box<dyn FnOnce(&mut dyn Sink) -> Result<()>>>,
}

impl PassthroughFilter {
    pub fn new() -> Self {
        PassthroughFilter { on_finish: None }
    }

    pub fn on_finish<F>(f: F) -> Self
    where
        F: FnOnce(&mut dyn Sink) -> Result<()> + 'static,
    {
        PassthroughFilter {
            on_finish: Some(Box::new(f)),
        }
    }
}

impl WriteFilter for PassthroughFilter {
    fn write(&mut self, below: &mut dyn Sink, buf: &[u8]) -> Result<()> {
        below.write_all(buf)
    }

    fn finish(&mut self, below: &mut dyn Sink) -> Result<()> {
        match self.on_finish.take() {
            Some(f) => f(below),
            None => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }
}

impl<W: io::Write> Sink for WriterStack<W> {
    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        let mut layered = Layered {
            base: &mut self.base,
            filters: &mut self.filters,
        };
        layered.write_all(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Doubles every byte on the way down; finish appends a sentinel.
    struct Doubler;

    impl WriteFilter for Doubler {
        fn write(&mut self, below: &mut dyn Sink, buf: &[u8]) -> Result<()> {
            for b in buf {
                below.write_all(&[*b, *b])?;
            }
            Ok(())
        }

        fn finish(&mut self, below: &mut dyn Sink) -> Result<()> {
            below.write_all(b"!")
        }

        fn name(&self) -> &'static str {
            "doubler"
        }
    }

    #[test]
    fn filters_compose_and_finalize_in_order() {
        let mut stack = WriterStack::new(Vec::new());
        stack.push(Box::new(Doubler));
        stack.push(Box::new(Doubler));

        stack.write_all(b"a").unwrap();
        let out = stack.finish_all().unwrap();
        // "a" doubled twice, then the top sentinel doubled by the
        // lower filter, then the lower sentinel
        assert_eq!(out, b"aaaa!!!");
    }

    #[test]
    fn passthrough_runs_finalizer_in_place() {
        let mut stack = WriterStack::new(Vec::new());
        stack.push(Box::new(Doubler));
        stack.push(Box::new(PassthroughFilter::on_finish(|below| {
            below.write_all(b"end")
        })));

        stack.write_all(b"x").unwrap();
        let out = stack.finish_all().unwrap();
        // the trailer goes through the doubler below, its sentinel last
        assert_eq!(out, b"xxeenndd!");
    }
}
