//! Outbound input events
//!
//! Event frames flow from the peripheral to the companion:
//! ```text
//! touch:  [0x01, n, (x_hi, x_lo, y_hi, y_lo, z_hi, z_lo) * n]
//! key:    [0x03, key_hi, key_lo]
//! ```
//! Event id 0x02 carries battery telemetry, which this firmware does not
//! sample.

use heapless::Vec;

use crate::frame::FrameError;

/// Most presses reported in one touch event
pub const MAX_PRESSES: usize = 10;

/// Largest encoded event (a full touch list)
pub const MAX_EVENT_SIZE: usize = 2 + 6 * MAX_PRESSES;

// Wire format values
const EVENT_TOUCH: u8 = 0x01;
const EVENT_KEY: u8 = 0x03;

/// One press in a touch event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchPress {
    pub x: u16,
    pub y: u16,
    pub z: u16,
}

/// Input event sent to the companion
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputEvent {
    /// Current press list; empty means every finger lifted
    Touch(Vec<TouchPress, MAX_PRESSES>),
    /// Key code from the keyboard
    Key(u16),
}

impl InputEvent {
    /// Wire id of this event
    pub fn id(&self) -> u8 {
        match self {
            InputEvent::Touch(_) => EVENT_TOUCH,
            InputEvent::Key(_) => EVENT_KEY,
        }
    }

    /// Encode this event into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let len = match self {
            InputEvent::Touch(presses) => 2 + 6 * presses.len(),
            InputEvent::Key(_) => 3,
        };
        if buffer.len() < len {
            return Err(FrameError::BufferTooSmall);
        }

        buffer[0] = self.id();
        match self {
            InputEvent::Touch(presses) => {
                buffer[1] = presses.len() as u8;
                for (chunk, press) in buffer[2..len].chunks_exact_mut(6).zip(presses) {
                    chunk[0..2].copy_from_slice(&press.x.to_be_bytes());
                    chunk[2..4].copy_from_slice(&press.y.to_be_bytes());
                    chunk[4..6].copy_from_slice(&press.z.to_be_bytes());
                }
            }
            InputEvent::Key(code) => buffer[1..3].copy_from_slice(&code.to_be_bytes()),
        }

        Ok(len)
    }

    /// Encode this event into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_EVENT_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_EVENT_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }

    /// Decode the event at the start of `buf`, companion side
    ///
    /// Returns the event and the bytes it occupies. An unrecognised id is
    /// reported as [`FrameError::UnknownOpcode`].
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), FrameError> {
        let (&id, rest) = buf.split_first().ok_or(FrameError::Incomplete)?;
        match id {
            EVENT_TOUCH => {
                let n = usize::from(*rest.first().ok_or(FrameError::Incomplete)?);
                if n > MAX_PRESSES {
                    return Err(FrameError::PayloadTooLarge);
                }
                let body = rest.get(1..1 + 6 * n).ok_or(FrameError::Incomplete)?;
                let mut presses = Vec::new();
                for chunk in body.chunks_exact(6) {
                    let press = TouchPress {
                        x: u16::from_be_bytes([chunk[0], chunk[1]]),
                        y: u16::from_be_bytes([chunk[2], chunk[3]]),
                        z: u16::from_be_bytes([chunk[4], chunk[5]]),
                    };
                    presses
                        .push(press)
                        .map_err(|_| FrameError::PayloadTooLarge)?;
                }
                Ok((InputEvent::Touch(presses), 2 + 6 * n))
            }
            EVENT_KEY => {
                let body = rest.get(..2).ok_or(FrameError::Incomplete)?;
                Ok((InputEvent::Key(u16::from_be_bytes([body[0], body[1]])), 3))
            }
            other => Err(FrameError::UnknownOpcode(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_event_layout() {
        let mut presses = Vec::new();
        presses
            .push(TouchPress { x: 0x0102, y: 0x0304, z: 500 })
            .unwrap();
        let bytes = InputEvent::Touch(presses).encode_to_vec().unwrap();
        assert_eq!(bytes.as_slice(), &[0x01, 1, 0x01, 0x02, 0x03, 0x04, 0x01, 0xF4]);
    }

    #[test]
    fn test_release_is_two_bytes() {
        let bytes = InputEvent::Touch(Vec::new()).encode_to_vec().unwrap();
        assert_eq!(bytes.as_slice(), &[0x01, 0x00]);
    }

    #[test]
    fn test_key_event_layout() {
        let bytes = InputEvent::Key(0x0108).encode_to_vec().unwrap();
        assert_eq!(bytes.as_slice(), &[0x03, 0x01, 0x08]);
    }

    #[test]
    fn test_decode_partial_touch_list() {
        let buf = [0x01, 2, 0, 1, 0, 2, 0, 3];
        assert_eq!(InputEvent::decode(&buf), Err(FrameError::Incomplete));
    }

    #[test]
    fn test_decode_rejects_oversized_list() {
        assert_eq!(
            InputEvent::decode(&[0x01, 11]),
            Err(FrameError::PayloadTooLarge)
        );
    }

    #[test]
    fn test_decode_battery_is_unknown() {
        assert_eq!(
            InputEvent::decode(&[0x02, 0, 0, 0, 0]),
            Err(FrameError::UnknownOpcode(0x02))
        );
    }

    #[test]
    fn test_decode_reads_back_full_list() {
        let mut presses: Vec<TouchPress, MAX_PRESSES> = Vec::new();
        for i in 0..MAX_PRESSES as u16 {
            presses.push(TouchPress { x: i, y: i * 2, z: i * 3 }).unwrap();
        }
        let event = InputEvent::Touch(presses);
        let bytes = event.encode_to_vec().unwrap();
        assert_eq!(bytes.len(), MAX_EVENT_SIZE);
        assert_eq!(InputEvent::decode(&bytes), Ok((event, MAX_EVENT_SIZE)));
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let mut buf = [0u8; 2];
        assert_eq!(
            InputEvent::Key(1).encode(&mut buf),
            Err(FrameError::BufferTooSmall)
        );
    }
}
