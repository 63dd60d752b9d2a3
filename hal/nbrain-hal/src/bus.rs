//! Shared bus abstractions
//!
//! The display controller sits on a bus that other peers may also use.
//! [`BusDevice`] is the raw byte exchange a board provides; [`SharedBus`]
//! wraps a device (or anything built on one, such as a pixel surface) in
//! a lock so a transaction is never interleaved with another peer's.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

/// Full-duplex byte exchange on a bus
pub trait BusDevice {
    /// Error type for bus operations
    type Error;

    /// Clock out `write` while clocking into `read`
    ///
    /// When the buffers differ in length the shorter one is padded: extra
    /// writes clock in nothing, extra reads clock out zeros.
    fn exchange(&mut self, write: &[u8], read: &mut [u8]) -> Result<(), Self::Error>;

    /// Write without keeping the clocked-in bytes
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.exchange(data, &mut [])
    }
}

/// Exclusive-access wrapper around a bus peer
///
/// Locking is scoped: the closure passed to [`SharedBus::lock`] runs with
/// the bus held and the lock is released when it returns. The raw mutex
/// type picks the exclusion domain (`NoopRawMutex` for a single executor,
/// `CriticalSectionRawMutex` when interrupts also touch the bus).
pub struct SharedBus<M: RawMutex, T> {
    inner: Mutex<M, RefCell<T>>,
}

impl<M: RawMutex, T> SharedBus<M, T> {
    /// Wrap a bus peer
    pub const fn new(device: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(device)),
        }
    }

    /// Run `f` with exclusive access to the peer
    ///
    /// Must not be re-entered from inside `f`.
    pub fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Mutable access without locking, for when the wrapper is uniquely owned
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut().get_mut()
    }

    /// Recover the wrapped peer
    pub fn into_inner(self) -> T {
        self.inner.into_inner().into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    /// Loopback device that echoes written bytes back
    #[derive(Default)]
    struct Loopback {
        transactions: usize,
    }

    impl BusDevice for Loopback {
        type Error = ();

        fn exchange(&mut self, write: &[u8], read: &mut [u8]) -> Result<(), ()> {
            self.transactions += 1;
            for (i, slot) in read.iter_mut().enumerate() {
                *slot = write.get(i).copied().unwrap_or(0);
            }
            Ok(())
        }
    }

    #[test]
    fn test_exchange_pads_short_write() {
        let mut dev = Loopback::default();
        let mut read = [0xFFu8; 4];
        dev.exchange(&[1, 2], &mut read).unwrap();
        assert_eq!(read, [1, 2, 0, 0]);
    }

    #[test]
    fn test_shared_bus_serializes_access() {
        let bus: SharedBus<NoopRawMutex, Loopback> = SharedBus::new(Loopback::default());
        bus.lock(|dev| dev.write(&[0xAA]).unwrap());
        bus.lock(|dev| dev.write(&[0xBB]).unwrap());
        let count = bus.lock(|dev| dev.transactions);
        assert_eq!(count, 2);
        assert_eq!(bus.into_inner().transactions, 2);
    }
}
