//! Output queue
//!
//! Bounded FIFO between the text producers (protocol engine, indicator)
//! and the flush step. Each character carries the colour that was current
//! when it was queued, and cursor moves travel through the queue so they
//! stay ordered with the text around them.

use heapless::Deque;

/// Entries the queue can hold
pub const QUEUE_CAPACITY: usize = 512;

/// Returned when an append would not fit
///
/// Nothing was queued; drain with a flush and retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueueFull;

/// One pending rendering step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QueueEntry {
    /// Byte to render in the given colour
    Char { ch: u8, color: u16 },
    /// Cursor move to a cell (clamped when applied)
    MoveTo { col: u16, row: u16 },
}

/// Fixed-capacity FIFO of [`QueueEntry`]
pub struct OutputQueue {
    entries: Deque<QueueEntry, QUEUE_CAPACITY>,
}

impl Default for OutputQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputQueue {
    pub const fn new() -> Self {
        Self {
            entries: Deque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remaining capacity
    pub fn free(&self) -> usize {
        QUEUE_CAPACITY - self.entries.len()
    }

    /// Append all of `text` or nothing
    pub fn push_text(&mut self, text: &[u8], color: u16) -> Result<(), QueueFull> {
        if text.len() > self.free() {
            return Err(QueueFull);
        }
        for &ch in text {
            self.entries
                .push_back(QueueEntry::Char { ch, color })
                .map_err(|_| QueueFull)?;
        }
        Ok(())
    }

    /// Append a cursor move
    pub fn push_move(&mut self, col: u16, row: u16) -> Result<(), QueueFull> {
        self.entries
            .push_back(QueueEntry::MoveTo { col, row })
            .map_err(|_| QueueFull)
    }

    pub fn pop(&mut self) -> Option<QueueEntry> {
        self.entries.pop_front()
    }

    /// Discard everything
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Newlines queued before the next cursor move
    ///
    /// A move repositions the cursor absolutely, so newlines after it can
    /// not be folded into a scroll that happens before it.
    pub fn newlines_ahead(&self) -> usize {
        self.entries
            .iter()
            .take_while(|e| !matches!(e, QueueEntry::MoveTo { .. }))
            .filter(|e| matches!(e, QueueEntry::Char { ch: b'\n', .. }))
            .count()
    }

    /// Queued characters in order, skipping moves
    pub fn chars(&self) -> impl Iterator<Item = u8> + '_ {
        self.entries.iter().filter_map(|e| match e {
            QueueEntry::Char { ch, .. } => Some(*ch),
            QueueEntry::MoveTo { .. } => None,
        })
    }
}
