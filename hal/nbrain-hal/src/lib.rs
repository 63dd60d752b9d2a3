//! nbrain Device Capability Layer
//!
//! This crate defines the minimal hardware interfaces the peripheral core
//! reads and writes through. Concrete implementations (Teensy serial ports,
//! the FT5436 touch controller, the RA8875 panel on its SPI bus) live with
//! the board support code; the core only ever sees these traits.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  nbrain-core (engine, terminal, input)  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  nbrain-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  board support (serial, bus, touch IC)  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`stream::StreamRx`], [`stream::StreamTx`] - Companion serial link
//! - [`bus::BusDevice`] - Byte exchange on a shared bus, with [`bus::SharedBus`] for locking
//! - [`gpio::OutputPin`] - Digital outputs (vibration motor)
//! - [`touch::TouchSource`] - Capacitive touch press list
//! - [`clock::Clock`] - Monotonic millisecond time source

#![no_std]
#![deny(unsafe_code)]

pub mod bus;
pub mod clock;
pub mod gpio;
pub mod stream;
pub mod touch;

// Re-export key traits at crate root for convenience
pub use bus::{BusDevice, SharedBus};
pub use clock::Clock;
pub use gpio::{NoPin, OutputPin};
pub use stream::{ByteStream, StreamRx, StreamTx, UartConfig};
pub use touch::{TouchPoint, TouchSource};
