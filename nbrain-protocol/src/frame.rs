//! Command frame decoding and encoding.
//!
//! Frame format:
//! - OPCODE (1 byte): see [`Opcode`]
//! - BODY: fixed size per opcode, except WRITE_TEXT which carries a one
//!   byte length followed by that many text bytes
//!
//! Decoding borrows from the input buffer; text and VRAM payloads are not
//! copied.

use heapless::Vec;

use crate::opcode::Opcode;

/// 16-bit cells per VRAM sector
pub const SECTOR_CELLS: usize = 256;

/// Bytes per VRAM sector on the wire
pub const SECTOR_BYTES: usize = SECTOR_CELLS * 2;

/// Largest frame on the wire (WRITE_VRAM)
pub const MAX_FRAME_SIZE: usize = 1 + 2 + SECTOR_BYTES;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Frame is incomplete (need more bytes)
    Incomplete,
    /// First byte is not a known opcode
    UnknownOpcode(u8),
    /// Text longer than a length byte can describe
    PayloadTooLarge,
    /// Sector payload is not exactly one sector
    InvalidFrame,
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// Raw big-endian sector payload of a WRITE_VRAM frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorData<'a>(&'a [u8]);

impl<'a> SectorData<'a> {
    /// Wrap exactly [`SECTOR_BYTES`] bytes
    pub fn new(bytes: &'a [u8]) -> Result<Self, FrameError> {
        if bytes.len() != SECTOR_BYTES {
            return Err(FrameError::InvalidFrame);
        }
        Ok(Self(bytes))
    }

    /// The cells, decoded from big-endian pairs
    pub fn cells(&self) -> impl Iterator<Item = u16> + 'a {
        self.0
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.0
    }
}

/// A decoded inbound command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// Reply with [`crate::ACK`]
    AckRequest,
    /// Move the text cursor to the cell containing pixel (x, y)
    SetCursorPixels { x: u16, y: u16 },
    /// Queue text for the terminal
    WriteText { text: &'a [u8] },
    DrawPixel { x: u16, y: u16, color: u16 },
    /// Filled rectangle between two inclusive corners
    FillRect { x1: u16, y1: u16, x2: u16, y2: u16, color: u16 },
    /// Outlined rectangle between two inclusive corners
    DrawRect { x1: u16, y1: u16, x2: u16, y2: u16, color: u16 },
    SetTextColor { color: u16 },
    /// Store one sector of video memory
    WriteVram { sector: u16, data: SectorData<'a> },
    /// Blit `w` x `h` raw pixels starting at `sector`
    RenderBitmap { sector: u16, x: u16, y: u16, w: u8, h: u8 },
    /// Reserved for multi-panel boards
    SelectDisplay { id: u8 },
    /// Decode and blit a 4-bit palette image starting at `sector`
    DrawPaletteImage {
        sector: u16,
        x: u16,
        y: u16,
        w: u8,
        h: u8,
        palette_size: u8,
    },
    FillDisplay { color: u16 },
    SetVibrate { on: bool },
}

/// Big-endian field reader over a complete body
struct Body<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Body<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn u8(&mut self) -> u8 {
        let b = self.bytes[self.pos];
        self.pos += 1;
        b
    }

    fn u16(&mut self) -> u16 {
        let hi = self.u8();
        let lo = self.u8();
        u16::from_be_bytes([hi, lo])
    }

    fn rest(&mut self) -> &'a [u8] {
        let rest = &self.bytes[self.pos..];
        self.pos = self.bytes.len();
        rest
    }
}

/// Big-endian field writer with bounds checking
struct Writer<'b> {
    buf: &'b mut [u8],
    pos: usize,
}

impl<'b> Writer<'b> {
    fn u8(&mut self, value: u8) -> Result<(), FrameError> {
        let slot = self.buf.get_mut(self.pos).ok_or(FrameError::BufferTooSmall)?;
        *slot = value;
        self.pos += 1;
        Ok(())
    }

    fn u16(&mut self, value: u16) -> Result<(), FrameError> {
        let [hi, lo] = value.to_be_bytes();
        self.u8(hi)?;
        self.u8(lo)
    }

    fn bytes(&mut self, data: &[u8]) -> Result<(), FrameError> {
        let end = self.pos + data.len();
        let dst = self
            .buf
            .get_mut(self.pos..end)
            .ok_or(FrameError::BufferTooSmall)?;
        dst.copy_from_slice(data);
        self.pos = end;
        Ok(())
    }
}

impl<'a> Command<'a> {
    /// Decode the frame at the start of `buf`
    ///
    /// Returns the command and the number of bytes it occupies. Nothing is
    /// consumed on error: [`FrameError::Incomplete`] means wait for more
    /// bytes, [`FrameError::UnknownOpcode`] means the first byte is not a
    /// command.
    pub fn decode(buf: &'a [u8]) -> Result<(Self, usize), FrameError> {
        let (&first, rest) = buf.split_first().ok_or(FrameError::Incomplete)?;
        let opcode = Opcode::from_byte(first).ok_or(FrameError::UnknownOpcode(first))?;

        let body_len = match opcode.body_len() {
            Some(len) => len,
            None => 1 + usize::from(*rest.first().ok_or(FrameError::Incomplete)?),
        };
        let body = rest.get(..body_len).ok_or(FrameError::Incomplete)?;
        let mut b = Body::new(body);

        let command = match opcode {
            Opcode::AckRequest => Command::AckRequest,
            Opcode::SetCursorPixels => Command::SetCursorPixels {
                x: b.u16(),
                y: b.u16(),
            },
            Opcode::WriteText => {
                b.u8();
                Command::WriteText { text: b.rest() }
            }
            Opcode::DrawPixel => Command::DrawPixel {
                x: b.u16(),
                y: b.u16(),
                color: b.u16(),
            },
            Opcode::FillRect => Command::FillRect {
                x1: b.u16(),
                y1: b.u16(),
                x2: b.u16(),
                y2: b.u16(),
                color: b.u16(),
            },
            Opcode::DrawRect => Command::DrawRect {
                x1: b.u16(),
                y1: b.u16(),
                x2: b.u16(),
                y2: b.u16(),
                color: b.u16(),
            },
            Opcode::SetTextColor => Command::SetTextColor { color: b.u16() },
            Opcode::WriteVram => Command::WriteVram {
                sector: b.u16(),
                data: SectorData(b.rest()),
            },
            Opcode::RenderBitmap => Command::RenderBitmap {
                sector: b.u16(),
                x: b.u16(),
                y: b.u16(),
                w: b.u8(),
                h: b.u8(),
            },
            Opcode::SelectDisplay => Command::SelectDisplay { id: b.u8() },
            Opcode::DrawPaletteImage => Command::DrawPaletteImage {
                sector: b.u16(),
                x: b.u16(),
                y: b.u16(),
                w: b.u8(),
                h: b.u8(),
                palette_size: b.u8(),
            },
            Opcode::FillDisplay => Command::FillDisplay { color: b.u16() },
            Opcode::SetVibrate => Command::SetVibrate { on: b.u8() != 0 },
        };

        Ok((command, 1 + body_len))
    }

    /// Opcode of this command
    pub fn opcode(&self) -> Opcode {
        match self {
            Command::AckRequest => Opcode::AckRequest,
            Command::SetCursorPixels { .. } => Opcode::SetCursorPixels,
            Command::WriteText { .. } => Opcode::WriteText,
            Command::DrawPixel { .. } => Opcode::DrawPixel,
            Command::FillRect { .. } => Opcode::FillRect,
            Command::DrawRect { .. } => Opcode::DrawRect,
            Command::SetTextColor { .. } => Opcode::SetTextColor,
            Command::WriteVram { .. } => Opcode::WriteVram,
            Command::RenderBitmap { .. } => Opcode::RenderBitmap,
            Command::SelectDisplay { .. } => Opcode::SelectDisplay,
            Command::DrawPaletteImage { .. } => Opcode::DrawPaletteImage,
            Command::FillDisplay { .. } => Opcode::FillDisplay,
            Command::SetVibrate { .. } => Opcode::SetVibrate,
        }
    }

    /// Encode this command into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let mut w = Writer { buf: buffer, pos: 0 };
        w.u8(self.opcode().to_byte())?;

        match *self {
            Command::AckRequest => {}
            Command::SetCursorPixels { x, y } => {
                w.u16(x)?;
                w.u16(y)?;
            }
            Command::WriteText { text } => {
                let len = u8::try_from(text.len()).map_err(|_| FrameError::PayloadTooLarge)?;
                w.u8(len)?;
                w.bytes(text)?;
            }
            Command::DrawPixel { x, y, color } => {
                w.u16(x)?;
                w.u16(y)?;
                w.u16(color)?;
            }
            Command::FillRect { x1, y1, x2, y2, color }
            | Command::DrawRect { x1, y1, x2, y2, color } => {
                w.u16(x1)?;
                w.u16(y1)?;
                w.u16(x2)?;
                w.u16(y2)?;
                w.u16(color)?;
            }
            Command::SetTextColor { color } | Command::FillDisplay { color } => w.u16(color)?,
            Command::WriteVram { sector, data } => {
                if data.0.len() != SECTOR_BYTES {
                    return Err(FrameError::InvalidFrame);
                }
                w.u16(sector)?;
                w.bytes(data.0)?;
            }
            Command::RenderBitmap { sector, x, y, w: width, h } => {
                w.u16(sector)?;
                w.u16(x)?;
                w.u16(y)?;
                w.u8(width)?;
                w.u8(h)?;
            }
            Command::SelectDisplay { id } => w.u8(id)?,
            Command::DrawPaletteImage {
                sector,
                x,
                y,
                w: width,
                h,
                palette_size,
            } => {
                w.u16(sector)?;
                w.u16(x)?;
                w.u16(y)?;
                w.u8(width)?;
                w.u8(h)?;
                w.u8(palette_size)?;
            }
            Command::SetVibrate { on } => w.u8(u8::from(on))?,
        }

        Ok(w.pos)
    }

    /// Encode this command into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }
}
