//! Protocol engine
//!
//! Decodes command frames from the front of the receive buffer and applies
//! them to the terminal, the video memory and the vibration output. A
//! frame is consumed only once all of its bytes are present; the caller
//! keeps the unconsumed tail and retries after more bytes arrive.

use embassy_sync::blocking_mutex::raw::RawMutex;
use nbrain_display::PixelSurface;
use nbrain_hal::{Clock, OutputPin, StreamTx};
use nbrain_protocol::{Command, FrameError, ACK};

use crate::palette::{PaletteImage, MAX_ROW_PIXELS};
use crate::terminal::Terminal;
use crate::vram::{VideoMemory, VramError};

/// Diagnostic counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineStats {
    /// Frames decoded and applied
    pub frames: u32,
    /// Bytes skipped because they were not a known opcode
    pub unknown_bytes: u32,
    /// VRAM commands dropped for addressing outside the store
    pub vram_rejected: u32,
}

/// Command interpreter
pub struct Engine<'a, M: RawMutex, S: PixelSurface, C: Clock, P: OutputPin> {
    terminal: &'a Terminal<'a, M, S, C>,
    vram: VideoMemory,
    vibrate: P,
    stats: EngineStats,
}

impl<'a, M, S, C, P> Engine<'a, M, S, C, P>
where
    M: RawMutex,
    S: PixelSurface,
    C: Clock,
    P: OutputPin,
{
    pub fn new(terminal: &'a Terminal<'a, M, S, C>, vram: VideoMemory, vibrate: P) -> Self {
        Self {
            terminal,
            vram,
            vibrate,
            stats: EngineStats::default(),
        }
    }

    /// Apply every complete frame at the front of `buf`
    ///
    /// Returns the number of bytes consumed. A trailing partial frame is
    /// left in place; replies (acknowledge bytes) go to `link`.
    pub fn process<T: StreamTx>(&mut self, buf: &[u8], link: &mut T) -> usize {
        let mut consumed = 0;

        while consumed < buf.len() {
            match Command::decode(&buf[consumed..]) {
                Ok((command, len)) => {
                    self.execute(command, link);
                    self.stats.frames = self.stats.frames.wrapping_add(1);
                    consumed += len;
                }
                Err(FrameError::Incomplete) => break,
                Err(FrameError::UnknownOpcode(op)) => {
                    warn!("Unknown opcode 0x{:02x}, skipping", op);
                    self.stats.unknown_bytes = self.stats.unknown_bytes.wrapping_add(1);
                    consumed += 1;
                }
                Err(e) => {
                    warn!("Bad frame: {:?}, skipping", e);
                    self.stats.unknown_bytes = self.stats.unknown_bytes.wrapping_add(1);
                    consumed += 1;
                }
            }
        }

        consumed
    }

    fn execute<T: StreamTx>(&mut self, command: Command<'_>, link: &mut T) {
        trace!("Command {:?}", command.opcode());
        let term = self.terminal;

        match command {
            Command::AckRequest => {
                if link.write_byte(ACK).and_then(|()| link.flush()).is_err() {
                    warn!("Ack write failed");
                }
            }
            Command::SetCursorPixels { x, y } => term.set_cursor_pixels(x, y),
            Command::WriteText { text } => term.write_text(text),
            Command::DrawPixel { x, y, color } => term.draw_pixel(x, y, color),
            Command::FillRect { x1, y1, x2, y2, color } => term.fill_rect(x1, y1, x2, y2, color),
            Command::DrawRect { x1, y1, x2, y2, color } => term.draw_rect(x1, y1, x2, y2, color),
            Command::SetTextColor { color } => term.set_text_color(color),
            Command::WriteVram { sector, data } => {
                let result = self.vram.write_sector(sector, data.cells());
                self.check_vram(result);
            }
            Command::RenderBitmap { sector, x, y, w, h } => {
                let result = self.render_bitmap(sector, x, y, w, h);
                self.check_vram(result);
            }
            Command::SelectDisplay { id } => debug!("Select display {} ignored", id),
            Command::DrawPaletteImage {
                sector,
                x,
                y,
                w,
                h,
                palette_size,
            } => {
                let result = self.draw_palette_image(sector, x, y, w, h, palette_size);
                self.check_vram(result);
            }
            Command::FillDisplay { color } => term.clear(color),
            Command::SetVibrate { on } => self.vibrate.set_state(on),
        }
    }

    fn render_bitmap(&self, sector: u16, x: u16, y: u16, w: u8, h: u8) -> Result<(), VramError> {
        if w == 0 || h == 0 {
            return Ok(());
        }
        let (w, h) = (u16::from(w), u16::from(h));
        let pixels = self.vram.sector_range(sector, usize::from(w) * usize::from(h))?;
        self.terminal.blit(x, y, w, h, pixels);
        Ok(())
    }

    fn draw_palette_image(
        &self,
        sector: u16,
        x: u16,
        y: u16,
        w: u8,
        h: u8,
        palette_size: u8,
    ) -> Result<(), VramError> {
        if w == 0 || h == 0 {
            return Ok(());
        }
        let image = PaletteImage::locate(&self.vram, sector, w, h, palette_size)?;
        let mut line = [0u16; MAX_ROW_PIXELS];
        for row in 0..h {
            let pixels = image.decode_row(row, &mut line);
            self.terminal
                .blit(x, y.saturating_add(u16::from(row)), u16::from(w), 1, pixels);
        }
        Ok(())
    }

    fn check_vram(&mut self, result: Result<(), VramError>) {
        if let Err(e) = result {
            warn!("VRAM command dropped: {:?}", e);
            self.stats.vram_rejected = self.stats.vram_rejected.wrapping_add(1);
        }
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn vram(&self) -> &VideoMemory {
        &self.vram
    }

    pub fn vibrate(&self) -> &P {
        &self.vibrate
    }

    pub fn terminal(&self) -> &'a Terminal<'a, M, S, C> {
        self.terminal
    }
}
