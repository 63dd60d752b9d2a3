//! Palette image decoding
//!
//! Layout in video memory, starting at the first cell of a sector:
//! ```text
//! ┌──────────────────────┬──────────────────────────────────────┐
//! │ palette[palette_size]│ rows[h], each ceil(w / 4) words      │
//! └──────────────────────┴──────────────────────────────────────┘
//! ```
//! Each row word packs four 4-bit palette indices, most significant nibble
//! first. Rows start on a word boundary, so the last word of a row may
//! carry unused nibbles. Indices past the palette decode to colour 0.

use crate::vram::{VideoMemory, VramError};

/// Longest row a palette image can have (width is a byte on the wire)
pub const MAX_ROW_PIXELS: usize = 256;

/// Words occupied by one row of `width` pixels
pub const fn words_per_row(width: u8) -> usize {
    (width as usize).div_ceil(4)
}

/// A bounds-checked palette image borrowed from video memory
#[derive(Debug, Clone, Copy)]
pub struct PaletteImage<'a> {
    palette: &'a [u16],
    rows: &'a [u16],
    width: u8,
    height: u8,
}

impl<'a> PaletteImage<'a> {
    /// Locate an image at `sector`
    ///
    /// The whole image (palette plus every row) must lie inside the store.
    pub fn locate(
        vram: &'a VideoMemory,
        sector: u16,
        width: u8,
        height: u8,
        palette_size: u8,
    ) -> Result<Self, VramError> {
        let palette_len = usize::from(palette_size);
        let total = palette_len + usize::from(height) * words_per_row(width);
        let cells = vram.sector_range(sector, total)?;
        let (palette, rows) = cells.split_at(palette_len);
        Ok(Self {
            palette,
            rows,
            width,
            height,
        })
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    /// Decode row `row` into `out`, returning the `width` decoded pixels
    pub fn decode_row<'o>(&self, row: u8, out: &'o mut [u16; MAX_ROW_PIXELS]) -> &'o [u16] {
        let width = usize::from(self.width);
        let stride = words_per_row(self.width);
        let start = usize::from(row) * stride;
        let words = self.rows.get(start..start + stride).unwrap_or(&[]);

        let indices = words
            .iter()
            .flat_map(|&word| (0..4).map(move |k| (word >> (12 - 4 * k)) & 0x0F));
        let mut n = 0;
        for (slot, index) in out.iter_mut().take(width).zip(indices) {
            *slot = self.palette.get(usize::from(index)).copied().unwrap_or(0);
            n += 1;
        }
        &out[..n]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(cells: &[u16]) -> VideoMemory {
        let mut vram = VideoMemory::allocate(2, 1);
        vram.write_sector(0, cells.iter().copied()).unwrap();
        vram
    }

    #[test]
    fn test_words_per_row() {
        assert_eq!(words_per_row(0), 0);
        assert_eq!(words_per_row(1), 1);
        assert_eq!(words_per_row(4), 1);
        assert_eq!(words_per_row(5), 2);
        assert_eq!(words_per_row(255), 64);
    }

    #[test]
    fn test_decode_msn_first() {
        // 4-colour palette, one row of 4 pixels: indices 3, 2, 1, 0
        let vram = store_with(&[0xAAAA, 0xBBBB, 0xCCCC, 0xDDDD, 0x3210]);
        let image = PaletteImage::locate(&vram, 0, 4, 1, 4).unwrap();
        let mut buf = [0u16; MAX_ROW_PIXELS];
        assert_eq!(
            image.decode_row(0, &mut buf),
            &[0xDDDD, 0xCCCC, 0xBBBB, 0xAAAA]
        );
    }

    #[test]
    fn test_rows_are_word_aligned() {
        // width 5 => two words per row; second word only uses its top nibble
        let vram = store_with(&[0x1111, 0x2222, 0x0101, 0x1FFF, 0x1010, 0x0FFF]);
        let image = PaletteImage::locate(&vram, 0, 5, 2, 2).unwrap();
        let mut buf = [0u16; MAX_ROW_PIXELS];
        assert_eq!(
            image.decode_row(0, &mut buf),
            &[0x1111, 0x2222, 0x1111, 0x2222, 0x2222]
        );
        assert_eq!(
            image.decode_row(1, &mut buf),
            &[0x2222, 0x1111, 0x2222, 0x1111, 0x1111]
        );
    }

    #[test]
    fn test_index_past_palette_is_zero() {
        let vram = store_with(&[0x1234, 0x0F00]);
        let image = PaletteImage::locate(&vram, 0, 3, 1, 1).unwrap();
        let mut buf = [0xEEEE; MAX_ROW_PIXELS];
        assert_eq!(image.decode_row(0, &mut buf), &[0x1234, 0, 0x1234]);
    }

    #[test]
    fn test_image_past_end_rejected() {
        let vram = VideoMemory::allocate(1, 1);
        // 16 colours + 255 rows of 64 words overruns a single sector
        assert_eq!(
            PaletteImage::locate(&vram, 0, 255, 255, 16).map(|_| ()),
            Err(VramError::RangeOutOfBounds)
        );
        assert_eq!(
            PaletteImage::locate(&vram, 1, 1, 1, 1).map(|_| ()),
            Err(VramError::SectorOutOfRange)
        );
    }

    #[test]
    fn test_zero_width_decodes_nothing() {
        let vram = store_with(&[0x1234]);
        let image = PaletteImage::locate(&vram, 0, 0, 3, 1).unwrap();
        let mut buf = [0u16; MAX_ROW_PIXELS];
        assert!(image.decode_row(0, &mut buf).is_empty());
    }
}
