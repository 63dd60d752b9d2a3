//! Touch controller abstraction
//!
//! A capacitive controller reports an ordered list of current presses.
//! The board driver refreshes the list when polled; the core reads the
//! count and then each press by index.

/// One press as reported by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchPoint {
    /// Horizontal position in panel pixels
    pub x: u16,
    /// Vertical position in panel pixels
    pub y: u16,
    /// Pressure / contact size, controller specific
    pub z: u16,
}

impl TouchPoint {
    pub const fn new(x: u16, y: u16, z: u16) -> Self {
        Self { x, y, z }
    }
}

/// Source of touch presses
pub trait TouchSource {
    /// Sample the controller and return the number of current presses
    fn press_count(&mut self) -> usize;

    /// Press `index` from the most recent sample
    ///
    /// Returns `None` for an index past the sampled count.
    fn press(&self, index: usize) -> Option<TouchPoint>;
}
