//! Text and graphics display engine
//!
//! [`Terminal`] owns everything drawn on the panel: the character grid,
//! the text cursor, the output queue and the pixel primitives. Text is
//! rendered asynchronously: producers append to the queue and a flush step
//! renders it under a time budget so a long burst of text never blocks the
//! protocol loop for long.
//!
//! # Locking
//!
//! ```text
//!   write_text / set_cursor ──┐                   ┌── flush
//!                             ▼                   ▼
//!               data lock: grid, queue, cursor, colours
//!                             │  (released before drawing)
//!                             ▼
//!               bus lock: PixelSurface (SharedBus)
//! ```
//!
//! The data lock is held only while state is mutated; drawing happens
//! afterwards under the bus lock, from values copied out of the state.

mod queue;

pub use queue::{OutputQueue, QueueEntry, QueueFull, QUEUE_CAPACITY};

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::Vec;

use nbrain_display::{draw_glyph, Cell, PixelSurface, TextGrid, GLYPH_HEIGHT, GLYPH_WIDTH, MAX_COLS};
use nbrain_hal::{Clock, SharedBus};

use crate::config::DisplayConfig;

const BACKSPACE: u8 = 0x08;
const TAB: u8 = 0x09;
const TAB_STOP: u16 = 4;

/// Mutable render state guarded by the data lock
struct TermState {
    grid: TextGrid,
    queue: OutputQueue,
    col: u16,
    row: u16,
    text_color: u16,
    background: u16,
    scale: u16,
}

/// Surface work decided under the data lock and performed after it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrawOp {
    Glyph { col: u16, row: u16, ch: u8, color: u16 },
    Erase { col: u16, row: u16, count: u16 },
    Repaint,
}

type DrawOps = Vec<DrawOp, 2>;

impl TermState {
    /// Apply one queue entry to the grid and cursor
    fn apply(&mut self, entry: QueueEntry) -> DrawOps {
        let mut ops = DrawOps::new();
        let cols = self.grid.cols();

        match entry {
            QueueEntry::MoveTo { col, row } => {
                self.col = col.min(cols - 1);
                self.row = row.min(self.grid.rows() - 1);
            }
            QueueEntry::Char { ch: BACKSPACE, .. } => {
                if self.col > 0 {
                    self.col -= 1;
                    self.grid.set(self.col, self.row, Cell::BLANK);
                    push(&mut ops, self.erase(self.col, 1));
                }
            }
            QueueEntry::Char { ch: TAB, .. } => {
                let stop = (self.col / TAB_STOP + 1) * TAB_STOP;
                let end = stop.min(cols);
                for c in self.col..end {
                    self.grid.set(c, self.row, Cell::BLANK);
                }
                push(&mut ops, self.erase(self.col, end - self.col));
                if stop >= cols {
                    self.line_feed(&mut ops);
                } else {
                    self.col = stop;
                }
            }
            QueueEntry::Char { ch: b'\n', .. } => self.line_feed(&mut ops),
            QueueEntry::Char { ch: b'\r', .. } => {}
            QueueEntry::Char { ch: b' ', .. } => {
                self.grid.set(self.col, self.row, Cell::BLANK);
                push(&mut ops, self.erase(self.col, 1));
                self.advance(&mut ops);
            }
            QueueEntry::Char { ch, color } if ch.is_ascii_graphic() => {
                self.grid.set(self.col, self.row, Cell::new(ch, color));
                push(
                    &mut ops,
                    DrawOp::Glyph {
                        col: self.col,
                        row: self.row,
                        ch,
                        color,
                    },
                );
                self.advance(&mut ops);
            }
            QueueEntry::Char { .. } => {}
        }

        ops
    }

    fn erase(&self, col: u16, count: u16) -> DrawOp {
        DrawOp::Erase {
            col,
            row: self.row,
            count,
        }
    }

    /// Step the cursor right, wrapping past the last column
    fn advance(&mut self, ops: &mut DrawOps) {
        self.col += 1;
        if self.col >= self.grid.cols() {
            self.line_feed(ops);
        }
    }

    /// Column 0 of the next row, scrolling at the bottom
    ///
    /// Newlines already queued behind this one are folded into the same
    /// scroll; the cursor lands high enough that they then step down
    /// without scrolling again.
    fn line_feed(&mut self, ops: &mut DrawOps) {
        self.col = 0;
        let rows = self.grid.rows();
        if self.row + 1 < rows {
            self.row += 1;
            return;
        }

        let ahead = u16::try_from(self.queue.newlines_ahead()).unwrap_or(u16::MAX);
        let lines = ahead.saturating_add(1).min(rows);
        self.grid.scroll_up(lines);
        self.row = rows - lines;
        push(ops, DrawOp::Repaint);
    }

    fn reset_grid(&mut self, width: u16, height: u16) {
        let (cols, rows) = TextGrid::dimensions_for(width, height, self.scale);
        self.grid.resize(cols, rows);
        self.col = 0;
        self.row = 0;
    }
}

fn push(ops: &mut DrawOps, op: DrawOp) {
    // Two slots cover the worst case (erase then repaint)
    let _ = ops.push(op);
}

/// Normalise two inclusive corners into origin and size
fn span(a: u16, b: u16) -> (u16, u16) {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    (lo, (hi - lo).saturating_add(1))
}

/// The display engine
pub struct Terminal<'a, M: RawMutex, S: PixelSurface, C: Clock> {
    state: Mutex<M, RefCell<TermState>>,
    bus: &'a SharedBus<M, S>,
    clock: C,
    budget_ms: u64,
}

impl<'a, M: RawMutex, S: PixelSurface, C: Clock> Terminal<'a, M, S, C> {
    /// Create a terminal over the surface behind `bus`
    ///
    /// The panel is cleared to the configured background.
    pub fn new(bus: &'a SharedBus<M, S>, clock: C, config: &DisplayConfig) -> Self {
        let scale = u16::from(config.text_scale.max(1));
        let (width, height) = bus.lock(|s| (s.width(), s.height()));
        let (cols, rows) = TextGrid::dimensions_for(width, height, scale);
        debug!("Terminal: {}x{} cells at scale {}", cols, rows, scale);

        let terminal = Self {
            state: Mutex::new(RefCell::new(TermState {
                grid: TextGrid::new(cols, rows),
                queue: OutputQueue::new(),
                col: 0,
                row: 0,
                text_color: config.text_color,
                background: config.background,
                scale,
            })),
            bus,
            clock,
            budget_ms: u64::from(config.flush_budget_ms),
        };
        terminal.set_brightness(config.brightness);
        terminal.clear(config.background);
        terminal
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut TermState) -> R) -> R {
        self.state.lock(|cell| f(&mut cell.borrow_mut()))
    }

    fn with_surface(&self, f: impl FnOnce(&mut S) -> Result<(), nbrain_display::DisplayError>) {
        if let Err(e) = self.bus.lock(f) {
            warn!("Surface error: {:?}", e);
        }
    }

    // ---- text path ----

    /// Queue `text` in the current colour, all or nothing
    pub fn enqueue(&self, text: &[u8]) -> Result<(), QueueFull> {
        self.with_state(|st| {
            let color = st.text_color;
            st.queue.push_text(text, color)
        })
    }

    /// Queue `text`, flushing as needed to make room
    pub fn write_text(&self, text: &[u8]) {
        for chunk in text.chunks(QUEUE_CAPACITY) {
            while self.enqueue(chunk).is_err() {
                self.flush();
            }
        }
    }

    /// Move the text cursor to the cell containing pixel (`x`, `y`)
    ///
    /// The move is queued behind any pending text.
    pub fn set_cursor_pixels(&self, x: u16, y: u16) {
        loop {
            let queued = self.with_state(|st| {
                let col = x / (GLYPH_WIDTH * st.scale);
                let row = y / (GLYPH_HEIGHT * st.scale);
                st.queue.push_move(col, row)
            });
            if queued.is_ok() {
                return;
            }
            self.flush();
        }
    }

    pub fn set_text_color(&self, color: u16) {
        self.with_state(|st| st.text_color = color);
    }

    pub fn text_color(&self) -> u16 {
        self.with_state(|st| st.text_color)
    }

    pub fn background(&self) -> u16 {
        self.with_state(|st| st.background)
    }

    /// Render queued entries until the queue is empty or the time budget
    /// is spent
    ///
    /// At least one entry is rendered per call. Returns the number of
    /// entries consumed.
    pub fn flush(&self) -> usize {
        let start = self.clock.now_ms();
        let mut processed = 0;

        loop {
            if processed > 0 && self.clock.elapsed_ms(start) >= self.budget_ms {
                break;
            }

            let step = self.with_state(|st| {
                let entry = st.queue.pop()?;
                Some((st.apply(entry), st.background, st.scale))
            });
            let Some((ops, bg, scale)) = step else {
                break;
            };
            processed += 1;

            for op in ops {
                self.draw(op, bg, scale);
            }
        }

        if processed > 0 {
            trace!("Flushed {} entries", processed);
        }
        processed
    }

    fn draw(&self, op: DrawOp, bg: u16, scale: u16) {
        match op {
            DrawOp::Glyph { col, row, ch, color } => {
                self.with_surface(|s| draw_glyph(s, ch, col, row, color, bg, scale));
            }
            DrawOp::Erase { col, row, count } => {
                let (cw, ch) = (GLYPH_WIDTH * scale, GLYPH_HEIGHT * scale);
                self.with_surface(|s| s.fill_rect(col * cw, row * ch, count * cw, ch, bg));
            }
            DrawOp::Repaint => self.repaint(bg, scale),
        }
    }

    /// Two-pass redraw after a scroll: blank the text area, then draw
    /// every non-blank cell row by row
    fn repaint(&self, bg: u16, scale: u16) {
        let (cols, rows) = self.with_state(|st| (st.grid.cols(), st.grid.rows()));
        let (cw, ch) = (GLYPH_WIDTH * scale, GLYPH_HEIGHT * scale);
        self.with_surface(|s| s.fill_rect(0, 0, cols * cw, rows * ch, bg));

        let mut line = [Cell::BLANK; MAX_COLS];
        for row in 0..rows {
            let n = self.with_state(|st| {
                let cells = st.grid.row(row);
                line[..cells.len()].copy_from_slice(cells);
                cells.len()
            });
            if line[..n].iter().all(Cell::is_blank) {
                continue;
            }
            self.with_surface(|s| {
                for (col, cell) in line[..n].iter().enumerate() {
                    if !cell.is_blank() {
                        draw_glyph(s, cell.ch, col as u16, row, cell.color, bg, scale)?;
                    }
                }
                Ok(())
            });
        }
    }

    /// Scroll the grid up by `lines` and repaint
    pub fn scroll(&self, lines: u16) {
        if lines == 0 {
            return;
        }
        let (bg, scale) = self.with_state(|st| {
            st.grid.scroll_up(lines);
            (st.background, st.scale)
        });
        self.repaint(bg, scale);
    }

    /// Home the cursor, blank the grid, drop queued text and fill the
    /// panel with `color`, which becomes the background
    pub fn clear(&self, color: u16) {
        self.with_state(|st| {
            st.grid.clear();
            st.queue.clear();
            st.col = 0;
            st.row = 0;
            st.background = color;
        });
        self.with_surface(|s| s.fill_screen(color));
    }

    /// Change glyph magnification
    ///
    /// The grid is resized to fit and blanked; the cursor goes home.
    pub fn set_text_scale(&self, scale: u8) {
        let (width, height) = self.bus.lock(|s| (s.width(), s.height()));
        self.with_state(|st| {
            st.scale = u16::from(scale.max(1));
            st.reset_grid(width, height);
        });
    }

    pub fn set_brightness(&self, percent: u8) {
        self.with_surface(|s| s.set_brightness(percent.min(100)));
    }

    // ---- pixel primitives ----

    pub fn draw_pixel(&self, x: u16, y: u16, color: u16) {
        self.with_surface(|s| s.set_pixel(x, y, color));
    }

    /// Filled rectangle between two inclusive corners, in any order
    pub fn fill_rect(&self, x1: u16, y1: u16, x2: u16, y2: u16, color: u16) {
        let ((x, w), (y, h)) = (span(x1, x2), span(y1, y2));
        self.with_surface(|s| s.fill_rect(x, y, w, h, color));
    }

    /// Outlined rectangle between two inclusive corners, in any order
    pub fn draw_rect(&self, x1: u16, y1: u16, x2: u16, y2: u16, color: u16) {
        let ((x, w), (y, h)) = (span(x1, x2), span(y1, y2));
        self.with_surface(|s| s.draw_rect(x, y, w, h, color));
    }

    pub fn blit(&self, x: u16, y: u16, w: u16, h: u16, pixels: &[u16]) {
        if w == 0 || h == 0 {
            return;
        }
        self.with_surface(|s| s.blit_bitmap(x, y, w, h, pixels));
    }

    /// Draw `text` at a fixed cell, bypassing the grid and cursor
    ///
    /// Used for status overlays such as the loading indicator.
    pub fn draw_label(&self, col: u16, row: u16, text: &[u8], color: u16) {
        let (bg, scale) = self.with_state(|st| (st.background, st.scale));
        self.with_surface(|s| {
            for (i, &ch) in text.iter().enumerate() {
                draw_glyph(s, ch, col.saturating_add(i as u16), row, color, bg, scale)?;
            }
            Ok(())
        });
    }

    // ---- inspection ----

    /// Cursor as (column, row), after everything already flushed
    pub fn cursor(&self) -> (u16, u16) {
        self.with_state(|st| (st.col, st.row))
    }

    /// Grid size as (columns, rows)
    pub fn grid_size(&self) -> (u16, u16) {
        self.with_state(|st| (st.grid.cols(), st.grid.rows()))
    }

    pub fn cell(&self, col: u16, row: u16) -> Option<Cell> {
        self.with_state(|st| st.grid.get(col, row))
    }

    pub fn queued_len(&self) -> usize {
        self.with_state(|st| st.queue.len())
    }

    /// Queued characters in order
    pub fn queued_text(&self) -> Vec<u8, QUEUE_CAPACITY> {
        self.with_state(|st| st.queue.chars().collect())
    }
}
