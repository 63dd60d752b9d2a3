//! Receive buffer for partially arrived frames
//!
//! Bytes read from the link accumulate here until the engine can decode
//! whole frames out of them. Whatever the engine does not consume stays
//! at the front for the next pass.

use heapless::Vec;
use nbrain_hal::StreamRx;
use nbrain_protocol::MAX_FRAME_SIZE;

/// Default capacity, two maximal frames
pub const PENDING_CAPACITY: usize = 2 * MAX_FRAME_SIZE;

/// Byte accumulator with front compaction
pub struct PendingBuffer<const N: usize = PENDING_CAPACITY> {
    bytes: Vec<u8, N>,
}

impl<const N: usize> Default for PendingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PendingBuffer<N> {
    const FITS_A_FRAME: () = assert!(N >= MAX_FRAME_SIZE, "buffer must hold a maximal frame");

    pub const fn new() -> Self {
        let () = Self::FITS_A_FRAME;
        Self { bytes: Vec::new() }
    }

    /// Read whatever the link has pending into the free space
    ///
    /// Returns the number of bytes added. Read errors are logged and
    /// treated as no data.
    pub fn fill_from<R: StreamRx>(&mut self, link: &mut R) -> usize {
        let start = self.bytes.len();
        if start == N || link.available() == 0 {
            return 0;
        }

        // Zero-extend into the free space, read, then trim back
        let _ = self.bytes.resize(N, 0);
        let read = match link.read(&mut self.bytes[start..]) {
            Ok(n) => n.min(N - start),
            Err(_) => {
                warn!("Link read failed");
                0
            }
        };
        self.bytes.truncate(start + read);
        read
    }

    /// Append bytes directly, returning how many fit
    pub fn extend(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(N - self.bytes.len());
        let _ = self.bytes.extend_from_slice(&data[..n]);
        n
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Drop `n` bytes from the front, keeping the rest in order
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.bytes.len());
        if n == 0 {
            return;
        }
        let len = self.bytes.len();
        self.bytes.copy_within(n..len, 0);
        self.bytes.truncate(len - n);
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.bytes.len() == N
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockLink;

    #[test]
    fn test_fill_reads_only_what_fits() {
        let mut link = MockLink::new();
        link.feed(&[1; 700]);
        let mut pending = PendingBuffer::<600>::new();

        assert_eq!(pending.fill_from(&mut link), 600);
        assert!(pending.is_full());
        assert_eq!(pending.fill_from(&mut link), 0);
        assert_eq!(link.available(), 100);
    }

    #[test]
    fn test_fill_from_idle_link() {
        let mut link = MockLink::new();
        let mut pending = PendingBuffer::<PENDING_CAPACITY>::new();
        assert_eq!(pending.fill_from(&mut link), 0);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_consume_keeps_tail_in_order() {
        let mut pending = PendingBuffer::<PENDING_CAPACITY>::new();
        pending.extend(b"abcdef");
        pending.consume(4);
        assert_eq!(pending.as_slice(), b"ef");

        pending.extend(b"gh");
        assert_eq!(pending.as_slice(), b"efgh");

        pending.consume(10);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_extend_truncates_at_capacity() {
        let mut pending = PendingBuffer::<MAX_FRAME_SIZE>::new();
        assert_eq!(pending.extend(&[0; MAX_FRAME_SIZE + 5]), MAX_FRAME_SIZE);
        assert_eq!(pending.extend(b"x"), 0);
        pending.clear();
        assert_eq!(pending.len(), 0);
    }
}
