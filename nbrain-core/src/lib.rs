//! Board-agnostic control core for the nbrain peripheral MCU
//!
//! This crate contains all peripheral logic that does not depend on
//! specific hardware implementations:
//!
//! - Boot handshake (console login on the companion link)
//! - Protocol engine (frame decoding with partial-frame resumption)
//! - Video memory and palette image decoding
//! - Text terminal and pixel primitives over a shared display bus
//! - Input multiplexing (touch sampling, keyboard hand-off)
//! - Loading indicator and the cooperative runtime loops
//! - Configuration type definitions
//!
//! Hardware is reached only through the traits in `nbrain-hal` and the
//! `PixelSurface` trait in `nbrain-display`.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod config;
pub mod engine;
pub mod handshake;
pub mod indicator;
pub mod input;
pub mod palette;
pub mod pending;
pub mod runtime;
pub mod terminal;
pub mod vram;

#[cfg(test)]
mod testing;

pub use config::PeripheralConfig;
pub use engine::{Engine, EngineStats};
pub use handshake::{Handshake, HandshakeError, HandshakeState};
pub use indicator::LoadingFlag;
pub use input::{InputMux, KeyboardQueue};
pub use runtime::{boot, run_flush, Peripheral};
pub use terminal::Terminal;
pub use vram::VideoMemory;
