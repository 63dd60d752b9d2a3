//! Input event multiplexer
//!
//! Touch presses and keyboard codes share the link back to the companion.
//! Key codes are produced from the keyboard driver's callback context and
//! handed over through a channel; touch is sampled on a fixed interval and
//! only reported while something is pressed, plus once on release.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;
use nbrain_hal::{Clock, StreamTx, TouchSource};
use nbrain_protocol::{InputEvent, TouchPress, MAX_PRESSES};

/// Key queue depth used by the runtime
pub const KEY_QUEUE_DEPTH: usize = 16;

const KEY_DELETE: u16 = 127;
const KEY_BACKSPACE: u16 = 8;

/// Hand-off between the keyboard callback and the multiplexer
pub struct KeyboardQueue<M: RawMutex, const N: usize = KEY_QUEUE_DEPTH> {
    channel: Channel<M, u16, N>,
}

impl<M: RawMutex, const N: usize> Default for KeyboardQueue<M, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex, const N: usize> KeyboardQueue<M, N> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Queue a key press from the driver callback
    ///
    /// Delete is delivered as backspace. Returns `false` and drops the key
    /// when the queue is full.
    pub fn push(&self, key: u16) -> bool {
        let key = if key == KEY_DELETE { KEY_BACKSPACE } else { key };
        match self.channel.try_send(key) {
            Ok(()) => true,
            Err(_) => {
                warn!("Key queue full, dropped 0x{:04x}", key);
                false
            }
        }
    }

    pub fn pop(&self) -> Option<u16> {
        self.channel.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

/// Forwards keyboard and touch input to the companion
pub struct InputMux<'a, M: RawMutex, T: TouchSource, C: Clock, const K: usize = KEY_QUEUE_DEPTH> {
    keys: &'a KeyboardQueue<M, K>,
    touch: T,
    clock: C,
    interval_ms: u64,
    last_sample: Option<u64>,
    last_count: usize,
}

impl<'a, M, T, C, const K: usize> InputMux<'a, M, T, C, K>
where
    M: RawMutex,
    T: TouchSource,
    C: Clock,
{
    pub fn new(keys: &'a KeyboardQueue<M, K>, touch: T, clock: C, interval_ms: u32) -> Self {
        Self {
            keys,
            touch,
            clock,
            interval_ms: u64::from(interval_ms),
            last_sample: None,
            last_count: 0,
        }
    }

    /// Forward pending keys and, when the interval has passed, the touch
    /// state
    ///
    /// Returns the number of events written.
    pub fn poll<L: StreamTx>(&mut self, link: &mut L) -> usize {
        let mut sent = 0;

        while let Some(key) = self.keys.pop() {
            send(link, &InputEvent::Key(key));
            sent += 1;
        }

        if let Some(event) = self.sample_touch() {
            send(link, &event);
            sent += 1;
        }

        sent
    }

    fn sample_touch(&mut self) -> Option<InputEvent> {
        let now = self.clock.now_ms();
        if let Some(last) = self.last_sample {
            if now.saturating_sub(last) < self.interval_ms {
                return None;
            }
        }
        self.last_sample = Some(now);

        let count = self.touch.press_count().min(MAX_PRESSES);
        if count == 0 && self.last_count == 0 {
            return None;
        }
        self.last_count = count;

        let presses: Vec<TouchPress, MAX_PRESSES> = (0..count)
            .filter_map(|i| self.touch.press(i))
            .map(|p| TouchPress {
                x: p.x,
                y: p.y,
                z: p.z,
            })
            .collect();
        trace!("Touch: {} presses", presses.len());
        Some(InputEvent::Touch(presses))
    }

    pub fn touch(&self) -> &T {
        &self.touch
    }
}

fn send<L: StreamTx>(link: &mut L, event: &InputEvent) {
    let Ok(bytes) = event.encode_to_vec() else {
        return;
    };
    if link.write_all(&bytes).is_err() {
        warn!("Event write failed");
    }
}
