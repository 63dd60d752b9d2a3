//! Runtime glue
//!
//! The board wires three activities onto its executor:
//!
//! ```text
//!   boot()          handshake ─┬─ loading indicator     (once)
//!                              ▼
//!   Peripheral::run()  link ─► PendingBuffer ─► Engine ─► Terminal queue
//!                        ▲                                      │
//!                        └──────── InputMux ◄─ touch, keys      ▼
//!   run_flush()                                         surface (bus lock)
//! ```
//!
//! All of them are cooperative: every loop awaits a delay or yields.

use embassy_futures::join::join;
use embassy_futures::yield_now;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;
use nbrain_display::PixelSurface;
use nbrain_hal::{Clock, OutputPin, StreamRx, StreamTx, TouchSource};

use crate::engine::Engine;
use crate::handshake::{Handshake, HandshakeError};
use crate::indicator::{clear_indicator, run_indicator, LoadingFlag};
use crate::input::{InputMux, KEY_QUEUE_DEPTH};
use crate::pending::PendingBuffer;
use crate::terminal::Terminal;

/// Log the companion in while the loading indicator spins
///
/// The indicator is removed on success. On failure it stays on screen and
/// the caller must not start [`Peripheral::run`].
pub async fn boot<L, HC, HD, M, S, C, D>(
    handshake: &mut Handshake<'_, L, HC, HD>,
    terminal: &Terminal<'_, M, S, C>,
    flag: &LoadingFlag,
    delay: &mut D,
    period_ms: u32,
) -> Result<(), HandshakeError>
where
    L: StreamRx + StreamTx,
    HC: Clock,
    HD: DelayNs,
    M: RawMutex,
    S: PixelSurface,
    C: Clock,
    D: DelayNs,
{
    flag.set();
    let login = async {
        let result = handshake.run().await;
        flag.clear();
        result
    };
    let (result, _) = join(login, run_indicator(terminal, flag, delay, period_ms)).await;

    if result.is_ok() {
        clear_indicator(terminal);
    }
    result
}

/// Steady-state protocol loop
pub struct Peripheral<'a, L, M, S, C, P, T, const K: usize = KEY_QUEUE_DEPTH>
where
    M: RawMutex,
    S: PixelSurface,
    C: Clock,
    P: OutputPin,
    T: TouchSource,
{
    link: L,
    pending: PendingBuffer,
    engine: Engine<'a, M, S, C, P>,
    input: InputMux<'a, M, T, C, K>,
}

impl<'a, L, M, S, C, P, T, const K: usize> Peripheral<'a, L, M, S, C, P, T, K>
where
    L: StreamRx + StreamTx,
    M: RawMutex,
    S: PixelSurface,
    C: Clock,
    P: OutputPin,
    T: TouchSource,
{
    pub fn new(link: L, engine: Engine<'a, M, S, C, P>, input: InputMux<'a, M, T, C, K>) -> Self {
        Self {
            link,
            pending: PendingBuffer::new(),
            engine,
            input,
        }
    }

    /// One main-loop iteration
    ///
    /// Reads what the link has, applies every complete frame and keeps the
    /// rest. When nothing arrived the input multiplexer gets a turn.
    /// Returns the number of bytes read.
    pub fn step(&mut self) -> usize {
        let read = self.pending.fill_from(&mut self.link);
        if read > 0 {
            let used = self.engine.process(self.pending.as_slice(), &mut self.link);
            self.pending.consume(used);
        } else {
            self.input.poll(&mut self.link);
        }
        read
    }

    /// Run forever
    pub async fn run(&mut self) {
        info!("Protocol running");
        loop {
            self.step();
            yield_now().await;
        }
    }

    pub fn engine(&self) -> &Engine<'a, M, S, C, P> {
        &self.engine
    }

    pub fn link(&mut self) -> &mut L {
        &mut self.link
    }

    /// Bytes held back as an incomplete frame
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Background flush activity
///
/// Renders queued text under the terminal's time budget, sleeping for
/// `idle_ms` whenever the queue is empty.
pub async fn run_flush<M, S, C, D>(terminal: &Terminal<'_, M, S, C>, delay: &mut D, idle_ms: u32)
where
    M: RawMutex,
    S: PixelSurface,
    C: Clock,
    D: DelayNs,
{
    loop {
        if terminal.flush() == 0 {
            delay.delay_ms(idle_ms).await;
        } else {
            yield_now().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DisplayConfig, HandshakeConfig};
    use crate::input::KeyboardQueue;
    use crate::testing::{Bus, MockClock, MockDelay, MockLink, MockPin, MockTouch};
    use crate::vram::VideoMemory;
    use embassy_futures::block_on;
    use embassy_futures::select::{select, Either};
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use nbrain_display::{FrameBuffer, GLYPH_HEIGHT};
    use nbrain_hal::TouchPoint;
    use nbrain_protocol::{Command, ACK};

    const WHITE: u16 = 0xFFFF;

    #[test]
    fn test_step_applies_frames_across_reads() {
        let bus = Bus::new(FrameBuffer::new(80, 52));
        let clock = MockClock::new();
        let term = Terminal::new(&bus, &clock, &DisplayConfig::default());
        let keys: KeyboardQueue<NoopRawMutex> = KeyboardQueue::new();
        let engine = Engine::new(&term, VideoMemory::allocate(2, 1), MockPin::default());
        let input = InputMux::new(&keys, MockTouch::default(), &clock, 5);
        let mut peripheral = Peripheral::new(MockLink::new(), engine, input);

        let pixel = Command::DrawPixel { x: 4, y: 5, color: 0x1234 }.encode_to_vec().unwrap();
        peripheral.link().feed(&[0x00]);
        peripheral.link().feed(&pixel[..3]);
        assert_eq!(peripheral.step(), 4);
        assert_eq!(peripheral.pending_len(), 3);
        assert_eq!(peripheral.link().take_tx(), [ACK]);

        peripheral.link().feed(&pixel[3..]);
        peripheral.step();
        assert_eq!(peripheral.pending_len(), 0);
        assert_eq!(bus.lock(|fb| fb.pixel(4, 5)), Some(0x1234));
        assert_eq!(peripheral.engine().stats().frames, 2);
    }

    #[test]
    fn test_idle_step_polls_input() {
        let bus = Bus::new(FrameBuffer::new(80, 52));
        let clock = MockClock::new();
        let term = Terminal::new(&bus, &clock, &DisplayConfig::default());
        let keys: KeyboardQueue<NoopRawMutex> = KeyboardQueue::new();
        let touch = MockTouch {
            presses: std::vec![TouchPoint::new(1, 2, 500)],
            ..MockTouch::default()
        };
        let engine = Engine::new(&term, VideoMemory::allocate(2, 1), MockPin::default());
        let input = InputMux::new(&keys, touch, &clock, 5);
        let mut peripheral = Peripheral::new(MockLink::new(), engine, input);

        keys.push(127);
        assert_eq!(peripheral.step(), 0);
        assert_eq!(
            peripheral.link().take_tx(),
            [0x03, 0x00, 0x08, 0x01, 1, 0, 1, 0, 2, 0x01, 0xF4]
        );

        // Busy link: no input poll this step
        keys.push(b'a' as u16);
        peripheral.link().feed(&[0x00]);
        peripheral.step();
        assert_eq!(peripheral.link().take_tx(), [ACK]);
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn test_run_flush_drains_queue() {
        let bus = Bus::new(FrameBuffer::new(80, 52));
        let clock = MockClock::ticking(1);
        let term = Terminal::new(&bus, &clock, &DisplayConfig::default());
        let mut delay = MockDelay::new(&clock);

        term.write_text(&[b'#'; 30]);
        let drained = async {
            while term.queued_len() > 0 {
                yield_now().await;
            }
        };
        let outcome = block_on(select(run_flush(&term, &mut delay, 5), drained));
        assert!(matches!(outcome, Either::Second(())));
        assert_eq!(term.cursor(), (0, 3));
    }

    fn boot_with(console: &[u8], config: &HandshakeConfig) -> (Result<(), HandshakeError>, Bus) {
        let bus = Bus::new(FrameBuffer::new(80, 52));
        let clock = MockClock::ticking(1);
        let term = Terminal::new(&bus, &clock, &DisplayConfig::default());
        let flag = LoadingFlag::new();
        let mut link = MockLink::new();
        link.feed(console);
        let mut handshake = Handshake::new(&mut link, &clock, MockDelay::new(&clock), config);
        let mut delay = MockDelay::new(&clock);

        let result = block_on(boot(&mut handshake, &term, &flag, &mut delay, 150));
        assert!(!flag.is_set());
        drop(handshake);
        drop(term);
        (result, bus)
    }

    #[test]
    fn test_boot_success_removes_indicator() {
        let (result, bus) = boot_with(b"login: \r\n~# x:~# ", &HandshakeConfig::default());
        assert_eq!(result, Ok(()));
        assert_eq!(bus.lock(|fb| fb.count(WHITE)), 0);
    }

    #[test]
    fn test_boot_failure_keeps_loading_screen() {
        let config = HandshakeConfig {
            prompt_timeout_ms: Some(400),
            ..HandshakeConfig::default()
        };
        let (result, bus) = boot_with(b"", &config);
        assert_eq!(result, Err(HandshakeError::Timeout));
        let row = bus.lock(|fb| fb.region(0, 3 * GLYPH_HEIGHT, 80, GLYPH_HEIGHT));
        assert!(row.iter().any(|&p| p == WHITE));
    }
}
