//! `embedded-graphics` adapter
//!
//! Glyphs come from the 8x13 ASCII mono font. [`SurfaceTarget`] presents a
//! [`PixelSurface`] as a `DrawTarget<Color = Rgb565>` in logical (unscaled)
//! coordinates; every logical pixel becomes a `scale` x `scale` block on
//! the panel.

use embedded_graphics::mono_font::ascii::FONT_8X13;
use embedded_graphics::mono_font::MonoTextStyleBuilder;
use embedded_graphics::pixelcolor::raw::RawU16;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::{Baseline, Text};

use crate::surface::{DisplayError, PixelSurface};

/// Glyph cell width in pixels at scale 1
pub const GLYPH_WIDTH: u16 = 8;

/// Glyph cell height in pixels at scale 1
pub const GLYPH_HEIGHT: u16 = 13;

/// Raw RGB565 word to colour
pub fn to_rgb565(raw: u16) -> Rgb565 {
    Rgb565::from(RawU16::new(raw))
}

/// Colour to raw RGB565 word
pub fn from_rgb565(color: Rgb565) -> u16 {
    RawU16::from(color).into_inner()
}

/// Scaled draw target over a pixel surface
pub struct SurfaceTarget<'a, S: PixelSurface + ?Sized> {
    surface: &'a mut S,
    scale: u16,
}

impl<'a, S: PixelSurface + ?Sized> SurfaceTarget<'a, S> {
    pub fn new(surface: &'a mut S, scale: u16) -> Self {
        Self {
            surface,
            scale: scale.max(1),
        }
    }

    /// Logical point to panel pixel, `None` when off-panel
    fn map(&self, point: Point) -> Option<(u16, u16)> {
        let size = self.size();
        if point.x < 0 || point.y < 0 {
            return None;
        }
        let (x, y) = (point.x as u32, point.y as u32);
        if x >= size.width || y >= size.height {
            return None;
        }
        let scale = u32::from(self.scale);
        Some(((x * scale) as u16, (y * scale) as u16))
    }
}

impl<S: PixelSurface + ?Sized> OriginDimensions for SurfaceTarget<'_, S> {
    fn size(&self) -> Size {
        Size::new(
            u32::from(self.surface.width() / self.scale),
            u32::from(self.surface.height() / self.scale),
        )
    }
}

impl<S: PixelSurface + ?Sized> DrawTarget for SurfaceTarget<'_, S> {
    type Color = Rgb565;
    type Error = DisplayError;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            let Some((x, y)) = self.map(point) else {
                continue;
            };
            let raw = from_rgb565(color);
            if self.scale == 1 {
                self.surface.set_pixel(x, y, raw)?;
            } else {
                self.surface.fill_rect(x, y, self.scale, self.scale, raw)?;
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        if area.is_zero_sized() {
            return Ok(());
        }
        let Some((x, y)) = self.map(area.top_left) else {
            return Ok(());
        };
        let w = (area.size.width as u16).saturating_mul(self.scale);
        let h = (area.size.height as u16).saturating_mul(self.scale);
        self.surface.fill_rect(x, y, w, h, from_rgb565(color))
    }
}

/// Render one character into grid cell (`col`, `row`)
///
/// The whole cell is painted: glyph pixels in `fg`, the rest in `bg`.
/// Bytes outside ASCII render as `?`.
pub fn draw_glyph<S: PixelSurface + ?Sized>(
    surface: &mut S,
    ch: u8,
    col: u16,
    row: u16,
    fg: u16,
    bg: u16,
    scale: u16,
) -> Result<(), DisplayError> {
    let style = MonoTextStyleBuilder::new()
        .font(&FONT_8X13)
        .text_color(to_rgb565(fg))
        .background_color(to_rgb565(bg))
        .build();

    let byte = [if ch.is_ascii() { ch } else { b'?' }];
    let text = core::str::from_utf8(&byte).unwrap_or("?");
    let origin = Point::new(
        i32::from(col) * i32::from(GLYPH_WIDTH),
        i32::from(row) * i32::from(GLYPH_HEIGHT),
    );

    let mut target = SurfaceTarget::new(surface, scale);
    Text::with_baseline(text, origin, style, Baseline::Top).draw(&mut target)?;
    Ok(())
}
