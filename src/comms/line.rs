//! Byte-at-a-time line accumulator for the serial transport.

use heapless::Vec;

/// Collects bytes until a newline arrives or the buffer is one short of
/// `N` (the last slot is reserved for the terminator), then hands the line
/// over and starts again.
#[derive(Debug, Clone, Default)]
pub struct LineBuffer<const N: usize> {
    buf: Vec<u8, N>,
}

impl<const N: usize> LineBuffer<N> {
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Feed one byte.  Returns the completed line, newline included when
    /// there was one.
    pub fn push(&mut self, byte: u8) -> Option<Vec<u8, N>> {
        // Capacity is kept one short of N below, so this cannot fail.
        let _ = self.buf.push(byte);
        if byte == b'\n' || self.buf.len() >= N.saturating_sub(1) {
            Some(core::mem::take(&mut self.buf))
        } else {
            None
        }
    }

    /// Bytes accumulated so far.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
