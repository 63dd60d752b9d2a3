//! Monotonic time source
//!
//! The core never reads a hardware timer directly. Timeouts (handshake
//! login wait), the flush time budget and the input poll interval are all
//! measured against a [`Clock`].

/// Monotonic millisecond clock
///
/// Must never go backwards. Wrapping is not expected within a device
/// lifetime at millisecond resolution in 64 bits.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed epoch (typically boot)
    fn now_ms(&self) -> u64;

    /// Milliseconds elapsed since `since`
    fn elapsed_ms(&self, since: u64) -> u64 {
        self.now_ms().saturating_sub(since)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}
