//! Bounds-tracked regions over the packet stream.
//!
//! A region is the declared extent of one packet body. Regions nest:
//! consuming bytes in a child advances every ancestor as well, and a
//! child may never consume past a bounded ancestor. Old format packets
//! with an indeterminate length have no a-priori bound and are limited
//! only by their parent.

use crate::errors::{Error, Result};

/// One nested extent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Declared length; `None` for indeterminate regions.
    len: Option<usize>,
    /// Bytes consumed so far.
    readc: usize,
    /// A fence starts a fresh byte space (a decompressed or decrypted
    /// layer); consumption does not propagate past it.
    fence: bool,
}

impl Region {
    pub fn remaining(&self) -> Option<usize> {
        self.len.map(|l| l - self.readc)
    }

    pub fn is_indeterminate(&self) -> bool {
        self.len.is_none()
    }

    pub fn consumed(&self) -> usize {
        self.readc
    }

    pub fn declared_len(&self) -> Option<usize> {
        self.len
    }
}

/// The stack of active regions for one parse session.
///
/// The bottom frame is a fenced indeterminate region representing the
/// whole input.
#[derive(Debug)]
pub struct RegionStack {
    frames: Vec<Region>,
}

impl Default for RegionStack {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionStack {
    pub fn new() -> Self {
        RegionStack {
            frames: vec![Region {
                len: None,
                readc: 0,
                fence: true,
            }],
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Opens a region with a declared length.
    pub fn push_fixed(&mut self, len: usize) {
        self.frames.push(Region {
            len: Some(len),
            readc: 0,
            fence: false,
        });
    }

    /// Opens an indeterminate region, bounded only by its ancestors.
    pub fn push_indeterminate(&mut self) {
        self.frames.push(Region {
            len: None,
            readc: 0,
            fence: false,
        });
    }

    /// Opens a fenced indeterminate region for a transformed byte
    /// space (decompressed or decrypted data).
    pub fn push_fenced(&mut self) {
        self.frames.push(Region {
            len: None,
            readc: 0,
            fence: true,
        });
    }

    /// Closes the innermost region.
    ///
    /// The ancestors were already advanced while reading, so nothing
    /// further propagates here.
    pub fn pop(&mut self) -> Option<Region> {
        debug_assert!(self.frames.len() > 1, "base region must not be popped");
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    pub fn top(&self) -> &Region {
        self.frames.last().expect("stack always has a base frame")
    }

    /// Remaining bytes in the innermost region, `None` if indeterminate.
    pub fn remaining(&self) -> Option<usize> {
        self.top().remaining()
    }

    /// Fails with `NotEnoughData` if reading `n` bytes would overrun
    /// any bounded region in the current byte space.
    pub fn check(&self, n: usize) -> Result<()> {
        for frame in self.frames.iter().rev() {
            if let Some(remaining) = frame.remaining() {
                if remaining < n {
                    return Err(Error::NotEnoughData { needed: n });
                }
            }
            if frame.fence {
                break;
            }
        }
        Ok(())
    }

    /// Records `n` consumed bytes on the innermost region and every
    /// ancestor within the current byte space.
    pub fn consume(&mut self, n: usize) {
        for frame in self.frames.iter_mut().rev() {
            frame.readc += n;
            if frame.fence {
                break;
            }
        }
    }

    /// Records bytes consumed from the parent byte space, after a
    /// fenced frame was popped (e.g. compressed input pulled from
    /// below a decompression filter).
    pub fn consume_outer(&mut self, n: usize) {
        self.consume(n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_consumption_propagates() {
        let mut regions = RegionStack::new();
        regions.push_fixed(10);
        regions.push_fixed(4);

        regions.check(4).unwrap();
        regions.consume(4);
        assert_eq!(regions.remaining(), Some(0));

        let child = regions.pop().unwrap();
        assert_eq!(child.consumed(), 4);
        // the parent advanced alongside the child
        assert_eq!(regions.remaining(), Some(6));
    }

    #[test]
    fn bounded_region_rejects_overrun() {
        let mut regions = RegionStack::new();
        regions.push_fixed(3);
        assert!(matches!(
            regions.check(4),
            Err(Error::NotEnoughData { needed: 4 })
        ));
    }

    #[test]
    fn indeterminate_child_limited_by_parent() {
        let mut regions = RegionStack::new();
        regions.push_fixed(5);
        regions.push_indeterminate();

        assert!(regions.check(6).is_err());
        regions.check(5).unwrap();
        regions.consume(5);
        assert!(regions.check(1).is_err());
    }

    #[test]
    fn fence_stops_propagation() {
        let mut regions = RegionStack::new();
        regions.push_fixed(10);
        regions.push_fenced();
        regions.push_fixed(100);

        // the decompressed layer may be larger than the outer region
        regions.check(100).unwrap();
        regions.consume(100);
        regions.pop();
        regions.pop();
        assert_eq!(regions.remaining(), Some(10));

        regions.consume_outer(10);
        assert_eq!(regions.remaining(), Some(0));
    }
}
