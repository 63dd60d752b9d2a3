//! Loading indicator
//!
//! Shown while the companion boots: a caption and a spinner at the bottom
//! of the panel, redrawn every period until the loading flag is cleared.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;
use nbrain_display::PixelSurface;
use nbrain_hal::Clock;
use portable_atomic::{AtomicBool, Ordering};

use crate::terminal::Terminal;

const CAPTION: &[u8] = b"Loading ";
const SPINNER: [u8; 4] = [b'|', b'/', b'-', b'\\'];

/// Shared "still loading" flag
pub struct LoadingFlag(AtomicBool);

impl LoadingFlag {
    /// Create a flag that starts set
    pub const fn new() -> Self {
        Self(AtomicBool::new(true))
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Default for LoadingFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Animate the indicator until `flag` clears
///
/// The caption goes on the last text row and stays there after the flag
/// clears; [`clear_indicator`] removes it. Returns the number of frames
/// drawn.
pub async fn run_indicator<M, S, C, D>(
    terminal: &Terminal<'_, M, S, C>,
    flag: &LoadingFlag,
    delay: &mut D,
    period_ms: u32,
) -> u32
where
    M: RawMutex,
    S: PixelSurface,
    C: Clock,
    D: DelayNs,
{
    let row = indicator_row(terminal);
    let color = terminal.text_color();
    let spinner_col = CAPTION.len() as u16;
    let mut frames = 0u32;

    while flag.is_set() {
        if frames == 0 {
            terminal.draw_label(0, row, CAPTION, color);
        }
        let glyph = SPINNER[frames as usize % SPINNER.len()];
        terminal.draw_label(spinner_col, row, &[glyph], color);
        frames = frames.wrapping_add(1);
        delay.delay_ms(period_ms).await;
    }

    debug!("Indicator stopped after {} frames", frames);
    frames
}

/// Blank the indicator row
pub fn clear_indicator<M, S, C>(terminal: &Terminal<'_, M, S, C>)
where
    M: RawMutex,
    S: PixelSurface,
    C: Clock,
{
    let blank = [b' '; CAPTION.len() + 1];
    terminal.draw_label(0, indicator_row(terminal), &blank, terminal.text_color());
}

fn indicator_row<M, S, C>(terminal: &Terminal<'_, M, S, C>) -> u16
where
    M: RawMutex,
    S: PixelSurface,
    C: Clock,
{
    let (_, rows) = terminal.grid_size();
    rows.saturating_sub(1)
}
