//! Character grid
//!
//! Mirror of the characters currently on screen. The terminal needs it to
//! erase correctly on backspace and tab and to repaint after a scroll,
//! since the panel itself cannot be read back.

use crate::target::{GLYPH_HEIGHT, GLYPH_WIDTH};

/// Widest grid supported (800 px panel at scale 1)
pub const MAX_COLS: usize = 100;

/// Tallest grid supported
pub const MAX_ROWS: usize = 40;

/// One character cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cell {
    /// ASCII byte shown in the cell
    pub ch: u8,
    /// Foreground colour it was drawn with
    pub color: u16,
}

impl Cell {
    pub const BLANK: Cell = Cell { ch: b' ', color: 0 };

    pub const fn new(ch: u8, color: u16) -> Self {
        Self { ch, color }
    }

    pub const fn is_blank(&self) -> bool {
        self.ch == b' '
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::BLANK
    }
}

/// Fixed-capacity character grid
///
/// Storage is sized for [`MAX_COLS`] x [`MAX_ROWS`]; the active area is
/// whatever fits the panel at the current text scale.
#[derive(Clone)]
pub struct TextGrid {
    cells: [[Cell; MAX_COLS]; MAX_ROWS],
    cols: u16,
    rows: u16,
}

impl TextGrid {
    /// Create a blank grid with the given active size
    ///
    /// Dimensions are clamped to `1..=MAX_COLS` and `1..=MAX_ROWS`.
    pub fn new(cols: u16, rows: u16) -> Self {
        let mut grid = Self {
            cells: [[Cell::BLANK; MAX_COLS]; MAX_ROWS],
            cols: 1,
            rows: 1,
        };
        grid.resize(cols, rows);
        grid
    }

    /// Grid dimensions for a panel of `width` x `height` pixels at `scale`
    pub fn dimensions_for(width: u16, height: u16, scale: u16) -> (u16, u16) {
        let scale = scale.max(1);
        let cols = width / GLYPH_WIDTH.saturating_mul(scale);
        let rows = height / GLYPH_HEIGHT.saturating_mul(scale);
        (
            cols.clamp(1, MAX_COLS as u16),
            rows.clamp(1, MAX_ROWS as u16),
        )
    }

    /// Change the active size and blank every cell
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols.clamp(1, MAX_COLS as u16);
        self.rows = rows.clamp(1, MAX_ROWS as u16);
        self.clear();
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    /// Cell at (`col`, `row`), if inside the active area
    pub fn get(&self, col: u16, row: u16) -> Option<Cell> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        Some(self.cells[usize::from(row)][usize::from(col)])
    }

    /// Store a cell; writes outside the active area are dropped
    pub fn set(&mut self, col: u16, row: u16, cell: Cell) -> bool {
        if col >= self.cols || row >= self.rows {
            return false;
        }
        self.cells[usize::from(row)][usize::from(col)] = cell;
        true
    }

    /// Active cells of one row
    pub fn row(&self, row: u16) -> &[Cell] {
        match self.cells.get(usize::from(row)) {
            Some(cells) if row < self.rows => &cells[..usize::from(self.cols)],
            _ => &[],
        }
    }

    /// Blank every cell
    pub fn clear(&mut self) {
        for row in self.cells.iter_mut() {
            row.fill(Cell::BLANK);
        }
    }

    /// Shift rows up by `lines`, blanking the rows exposed at the bottom
    pub fn scroll_up(&mut self, lines: u16) {
        let rows = usize::from(self.rows);
        let lines = usize::from(lines).min(rows);
        self.cells[..rows].rotate_left(lines);
        for row in &mut self.cells[rows - lines..rows] {
            row.fill(Cell::BLANK);
        }
    }

    /// Whether every active cell is blank
    pub fn is_empty(&self) -> bool {
        (0..self.rows).all(|r| self.row(r).iter().all(Cell::is_blank))
    }
}

impl Default for TextGrid {
    fn default() -> Self {
        Self::new(MAX_COLS as u16, MAX_ROWS as u16)
    }
}
