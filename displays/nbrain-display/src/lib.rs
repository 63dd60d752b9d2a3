//! Display abstraction for the nbrain peripheral
//!
//! This crate provides:
//! - [`PixelSurface`], the pixel-level interface a panel driver implements
//! - [`TextGrid`], the character mirror the terminal keeps of what is on screen
//! - [`SurfaceTarget`], an `embedded-graphics` draw target over any surface,
//!   used to rasterise glyphs from the built-in mono font
//!
//! # Architecture
//!
//! ```text
//!   Terminal (nbrain-core)
//!     │  cells, cursor            glyphs
//!     ├──────────► TextGrid        ├──────────► SurfaceTarget
//!     │                            │                 │
//!     └──── rects, bitmaps ────────┴─────────────────▼
//!                                              PixelSurface
//!                                        (RA8875 driver / FrameBuffer)
//! ```
//!
//! Colours are raw RGB565 words throughout, exactly as they travel on the
//! wire; conversion to `embedded-graphics` colour types happens only
//! inside the draw target.

#![no_std]

#[cfg(any(test, feature = "std"))]
extern crate std;

#[cfg(any(test, feature = "std"))]
pub mod framebuffer;
pub mod grid;
pub mod surface;
pub mod target;

// Re-export key types
pub use grid::{Cell, TextGrid, MAX_COLS, MAX_ROWS};
pub use surface::{DisplayError, PixelSurface};
pub use target::{draw_glyph, SurfaceTarget, GLYPH_HEIGHT, GLYPH_WIDTH};

#[cfg(any(test, feature = "std"))]
pub use framebuffer::FrameBuffer;
