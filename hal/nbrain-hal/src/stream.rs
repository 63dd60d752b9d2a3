//! Byte stream abstractions
//!
//! The companion link is a single half-duplex serial stream carrying both
//! console text (during boot) and protocol frames (afterwards). Reads are
//! non-blocking: callers check [`StreamRx::available`] and yield to the
//! scheduler when nothing has arrived.

/// Stream transmitter
pub trait StreamTx {
    /// Error type for transmit operations
    type Error;

    /// Write all of `data` to the stream
    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Write a single byte
    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.write_all(&[byte])
    }

    /// Flush any buffered data
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Stream receiver
pub trait StreamRx {
    /// Error type for receive operations
    type Error;

    /// Number of bytes that can be read without waiting
    fn available(&self) -> usize;

    /// Read up to `buf.len()` already-received bytes
    ///
    /// Never waits; returns `Ok(0)` when nothing is pending.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Read a single byte if one is pending
    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        let mut buf = [0u8; 1];
        match self.read(&mut buf)? {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }
}

/// Combined stream interface
///
/// For links that provide both directions on a single peripheral.
pub trait ByteStream: StreamTx + StreamRx {}

// Blanket implementation
impl<T: StreamTx + StreamRx> ByteStream for T {}

/// Serial link configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baudrate: 115200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Seven,
    Eight,
    Nine,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}
