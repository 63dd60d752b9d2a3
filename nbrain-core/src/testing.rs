//! Host-side test doubles for the capability traits

use core::cell::Cell;
use std::collections::VecDeque;
use std::vec::Vec;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embedded_hal_async::delay::DelayNs;
use nbrain_display::FrameBuffer;
use nbrain_hal::{Clock, OutputPin, SharedBus, StreamRx, StreamTx, TouchPoint, TouchSource};

/// Framebuffer behind a single-context bus lock
pub type Bus = SharedBus<NoopRawMutex, FrameBuffer>;

/// Manually driven clock
///
/// With a non-zero step every read advances time, so loops that poll the
/// clock always make progress towards their deadline.
pub struct MockClock {
    now: Cell<u64>,
    step: u64,
}

impl MockClock {
    /// Frozen clock at t = 0
    pub fn new() -> Self {
        Self::ticking(0)
    }

    /// Clock that advances `step` ms on every read
    pub fn ticking(step: u64) -> Self {
        Self {
            now: Cell::new(0),
            step,
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn peek(&self) -> u64 {
        self.now.get()
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}

/// Delay that moves a [`MockClock`] forward instead of sleeping
pub struct MockDelay<'c> {
    clock: &'c MockClock,
    pub calls: Vec<u32>,
}

impl<'c> MockDelay<'c> {
    pub fn new(clock: &'c MockClock) -> Self {
        Self {
            clock,
            calls: Vec::new(),
        }
    }
}

impl DelayNs for MockDelay<'_> {
    async fn delay_ns(&mut self, ns: u32) {
        self.delay_ms(ns.div_ceil(1_000_000)).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.calls.push(ms);
        self.clock.advance(u64::from(ms));
        embassy_futures::yield_now().await;
    }
}

/// Scripted serial link
#[derive(Default)]
pub struct MockLink {
    rx: VecDeque<u8>,
    pub tx: Vec<u8>,
    pub fail_writes: bool,
}

impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the device to receive
    pub fn feed(&mut self, data: &[u8]) {
        self.rx.extend(data.iter().copied());
    }

    /// Take everything transmitted so far
    pub fn take_tx(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.tx)
    }
}

impl StreamTx for MockLink {
    type Error = ();

    fn write_all(&mut self, data: &[u8]) -> Result<(), ()> {
        if self.fail_writes {
            return Err(());
        }
        self.tx.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }
}

impl StreamRx for MockLink {
    type Error = ();

    fn available(&self) -> usize {
        self.rx.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

/// Touch controller returning a fixed press list
#[derive(Default)]
pub struct MockTouch {
    pub presses: Vec<TouchPoint>,
    pub samples: usize,
}

impl TouchSource for MockTouch {
    fn press_count(&mut self) -> usize {
        self.samples += 1;
        self.presses.len()
    }

    fn press(&self, index: usize) -> Option<TouchPoint> {
        self.presses.get(index).copied()
    }
}

/// Output pin latch
#[derive(Default)]
pub struct MockPin {
    high: bool,
}

impl OutputPin for MockPin {
    fn set_high(&mut self) {
        self.high = true;
    }

    fn set_low(&mut self) {
        self.high = false;
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}
