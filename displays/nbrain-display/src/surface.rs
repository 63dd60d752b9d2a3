//! Pixel surface trait
//!
//! Defines the interface a panel driver offers the display engine.

/// Surface errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// Communication error with the panel controller
    Communication,
    /// Invalid coordinates or dimensions
    InvalidCoordinates,
    /// Bitmap slice shorter than `width * height`
    BitmapSize,
    /// Panel not initialized
    NotInitialized,
}

/// Pixel-addressable display surface
///
/// Coordinates are panel pixels with the origin top-left. Colours are
/// RGB565. Implementations clip: drawing that extends past the panel edge
/// is truncated, not rejected.
pub trait PixelSurface {
    /// Panel width in pixels
    fn width(&self) -> u16;

    /// Panel height in pixels
    fn height(&self) -> u16;

    /// Set one pixel
    fn set_pixel(&mut self, x: u16, y: u16, color: u16) -> Result<(), DisplayError>;

    /// Fill a `w` x `h` rectangle whose top-left corner is (`x`, `y`)
    fn fill_rect(&mut self, x: u16, y: u16, w: u16, h: u16, color: u16)
        -> Result<(), DisplayError>;

    /// Outline a `w` x `h` rectangle with a one pixel border
    fn draw_rect(
        &mut self,
        x: u16,
        y: u16,
        w: u16,
        h: u16,
        color: u16,
    ) -> Result<(), DisplayError> {
        if w == 0 || h == 0 {
            return Ok(());
        }
        let right = x.saturating_add(w - 1);
        let bottom = y.saturating_add(h - 1);
        self.fill_rect(x, y, w, 1, color)?;
        self.fill_rect(x, bottom, w, 1, color)?;
        self.fill_rect(x, y, 1, h, color)?;
        self.fill_rect(right, y, 1, h, color)
    }

    /// Copy a row-major `w` x `h` block of pixels to (`x`, `y`)
    fn blit_bitmap(
        &mut self,
        x: u16,
        y: u16,
        w: u16,
        h: u16,
        pixels: &[u16],
    ) -> Result<(), DisplayError>;

    /// Set backlight brightness, 0..=100
    fn set_brightness(&mut self, percent: u8) -> Result<(), DisplayError>;

    /// Fill the whole panel
    fn fill_screen(&mut self, color: u16) -> Result<(), DisplayError> {
        let (w, h) = (self.width(), self.height());
        self.fill_rect(0, 0, w, h, color)
    }
}

impl<S: PixelSurface + ?Sized> PixelSurface for &mut S {
    fn width(&self) -> u16 {
        (**self).width()
    }

    fn height(&self) -> u16 {
        (**self).height()
    }

    fn set_pixel(&mut self, x: u16, y: u16, color: u16) -> Result<(), DisplayError> {
        (**self).set_pixel(x, y, color)
    }

    fn fill_rect(
        &mut self,
        x: u16,
        y: u16,
        w: u16,
        h: u16,
        color: u16,
    ) -> Result<(), DisplayError> {
        (**self).fill_rect(x, y, w, h, color)
    }

    fn draw_rect(
        &mut self,
        x: u16,
        y: u16,
        w: u16,
        h: u16,
        color: u16,
    ) -> Result<(), DisplayError> {
        (**self).draw_rect(x, y, w, h, color)
    }

    fn blit_bitmap(
        &mut self,
        x: u16,
        y: u16,
        w: u16,
        h: u16,
        pixels: &[u16],
    ) -> Result<(), DisplayError> {
        (**self).blit_bitmap(x, y, w, h, pixels)
    }

    fn set_brightness(&mut self, percent: u8) -> Result<(), DisplayError> {
        (**self).set_brightness(percent)
    }

    fn fill_screen(&mut self, color: u16) -> Result<(), DisplayError> {
        (**self).fill_screen(color)
    }
}
