//! Command opcodes

/// Inbound command opcodes
///
/// Values match the companion-side protocol module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    AckRequest = 0x00,
    SetCursorPixels = 0x01,
    WriteText = 0x02,
    DrawPixel = 0x03,
    FillRect = 0x04,
    DrawRect = 0x05,
    SetTextColor = 0x06,
    WriteVram = 0x07,
    RenderBitmap = 0x08,
    SelectDisplay = 0x09,
    DrawPaletteImage = 0x0A,
    FillDisplay = 0x0B,
    SetVibrate = 0x0C,
}

impl Opcode {
    /// Parse an opcode from its wire byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0x00 => Opcode::AckRequest,
            0x01 => Opcode::SetCursorPixels,
            0x02 => Opcode::WriteText,
            0x03 => Opcode::DrawPixel,
            0x04 => Opcode::FillRect,
            0x05 => Opcode::DrawRect,
            0x06 => Opcode::SetTextColor,
            0x07 => Opcode::WriteVram,
            0x08 => Opcode::RenderBitmap,
            0x09 => Opcode::SelectDisplay,
            0x0A => Opcode::DrawPaletteImage,
            0x0B => Opcode::FillDisplay,
            0x0C => Opcode::SetVibrate,
            _ => return None,
        })
    }

    /// Convert to wire byte
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Body size in bytes for fixed-size opcodes
    ///
    /// `None` for [`Opcode::WriteText`], whose body is length-prefixed.
    pub fn body_len(self) -> Option<usize> {
        match self {
            Opcode::AckRequest => Some(0),
            Opcode::SetCursorPixels => Some(4),
            Opcode::WriteText => None,
            Opcode::DrawPixel => Some(6),
            Opcode::FillRect | Opcode::DrawRect => Some(10),
            Opcode::SetTextColor => Some(2),
            Opcode::WriteVram => Some(2 + crate::frame::SECTOR_BYTES),
            Opcode::RenderBitmap => Some(8),
            Opcode::SelectDisplay => Some(1),
            Opcode::DrawPaletteImage => Some(9),
            Opcode::FillDisplay => Some(2),
            Opcode::SetVibrate => Some(1),
        }
    }

    /// Whether the command addresses video memory
    pub fn uses_vram(self) -> bool {
        matches!(
            self,
            Opcode::WriteVram | Opcode::RenderBitmap | Opcode::DrawPaletteImage
        )
    }
}
