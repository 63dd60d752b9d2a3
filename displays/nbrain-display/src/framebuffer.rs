//! In-memory surface
//!
//! A plain RGB565 framebuffer implementing [`PixelSurface`], for the
//! desktop simulator and for host tests. It also counts the operations it
//! receives so callers can check how much bus traffic a render produced.

use std::vec;
use std::vec::Vec;

use crate::surface::{DisplayError, PixelSurface};

/// Operation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceOps {
    pub pixels: usize,
    pub fills: usize,
    pub blits: usize,
}

/// Heap-backed RGB565 framebuffer
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    pixels: Vec<u16>,
    brightness: u8,
    ops: SurfaceOps,
}

impl FrameBuffer {
    /// Create a framebuffer cleared to black
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; usize::from(width) * usize::from(height)],
            brightness: 100,
            ops: SurfaceOps::default(),
        }
    }

    /// Read one pixel
    pub fn pixel(&self, x: u16, y: u16) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(usize::from(y) * usize::from(self.width) + usize::from(x))
            .copied()
    }

    /// Copy out a clipped region, row-major
    pub fn region(&self, x: u16, y: u16, w: u16, h: u16) -> Vec<u16> {
        let mut out = Vec::new();
        for row in y..y.saturating_add(h).min(self.height) {
            for col in x..x.saturating_add(w).min(self.width) {
                if let Some(p) = self.pixel(col, row) {
                    out.push(p);
                }
            }
        }
        out
    }

    /// Number of pixels currently holding `color`
    pub fn count(&self, color: u16) -> usize {
        self.pixels.iter().filter(|&&p| p == color).count()
    }

    /// Current backlight setting
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Operations received so far
    pub fn ops(&self) -> SurfaceOps {
        self.ops
    }

    fn put(&mut self, x: u16, y: u16, color: u16) {
        if x < self.width && y < self.height {
            let idx = usize::from(y) * usize::from(self.width) + usize::from(x);
            self.pixels[idx] = color;
        }
    }
}

impl PixelSurface for FrameBuffer {
    fn width(&self) -> u16 {
        self.width
    }

    fn height(&self) -> u16 {
        self.height
    }

    fn set_pixel(&mut self, x: u16, y: u16, color: u16) -> Result<(), DisplayError> {
        self.ops.pixels += 1;
        self.put(x, y, color);
        Ok(())
    }

    fn fill_rect(
        &mut self,
        x: u16,
        y: u16,
        w: u16,
        h: u16,
        color: u16,
    ) -> Result<(), DisplayError> {
        self.ops.fills += 1;
        for row in y..y.saturating_add(h).min(self.height) {
            for col in x..x.saturating_add(w).min(self.width) {
                self.put(col, row, color);
            }
        }
        Ok(())
    }

    fn blit_bitmap(
        &mut self,
        x: u16,
        y: u16,
        w: u16,
        h: u16,
        pixels: &[u16],
    ) -> Result<(), DisplayError> {
        let needed = usize::from(w) * usize::from(h);
        if pixels.len() < needed {
            return Err(DisplayError::BitmapSize);
        }
        self.ops.blits += 1;
        for (i, &color) in pixels[..needed].iter().enumerate() {
            let col = (i % usize::from(w)) as u16;
            let row = (i / usize::from(w)) as u16;
            self.put(x.saturating_add(col), y.saturating_add(row), color);
        }
        Ok(())
    }

    fn set_brightness(&mut self, percent: u8) -> Result<(), DisplayError> {
        self.brightness = percent.min(100);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_rect_clips_at_edge() {
        let mut fb = FrameBuffer::new(4, 4);
        fb.fill_rect(2, 2, 10, 10, 0xF800).unwrap();
        assert_eq!(fb.count(0xF800), 4);
        assert_eq!(fb.pixel(3, 3), Some(0xF800));
        assert_eq!(fb.pixel(1, 1), Some(0));
    }

    #[test]
    fn test_draw_rect_outline_only() {
        let mut fb = FrameBuffer::new(8, 8);
        fb.draw_rect(1, 1, 4, 3, 0x07E0).unwrap();
        // 4 + 4 top/bottom, plus 1 + 1 for the middle row sides
        assert_eq!(fb.count(0x07E0), 10);
        assert_eq!(fb.pixel(2, 2), Some(0));
        assert_eq!(fb.pixel(4, 2), Some(0x07E0));
    }

    #[test]
    fn test_blit_rejects_short_bitmap() {
        let mut fb = FrameBuffer::new(8, 8);
        assert_eq!(
            fb.blit_bitmap(0, 0, 2, 2, &[1, 2, 3]),
            Err(DisplayError::BitmapSize)
        );
        fb.blit_bitmap(1, 1, 2, 2, &[1, 2, 3, 4]).unwrap();
        assert_eq!(fb.region(1, 1, 2, 2), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_brightness_clamped() {
        let mut fb = FrameBuffer::new(1, 1);
        fb.set_brightness(250).unwrap();
        assert_eq!(fb.brightness(), 100);
    }
}
