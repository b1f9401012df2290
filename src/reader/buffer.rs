use crate::errors::Result;
use crate::reader::{ReadFilter, Source};

/// Serves a decrypted or otherwise pre-transformed buffer as a packet
/// source. Never touches the layer below.
pub struct BufferFilter {
    data: Vec<u8>,
    pos: usize,
}

impl BufferFilter {
    pub fn new(data: Vec<u8>) -> Self {
        BufferFilter { data, pos: 0 }
    }
}

impl ReadFilter for BufferFilter {
    fn read(&mut self, _below: &mut dyn Source, buf: &mut [u8]) -> Result<usize> {
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn name(&self) -> &'static str {
        "buffer"
    }
}

impl Drop for BufferFilter {
    fn drop(&mut self) {
        // may hold decrypted plaintext
        use zeroize::Zeroize;
        self.data.zeroize();
    }
}
