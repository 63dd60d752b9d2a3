//! nbrain Display Protocol
//!
//! This crate defines the byte protocol spoken over the serial link between
//! the companion computer (which owns all UI logic) and the peripheral MCU
//! (which owns the panel, touch controller and keyboard).
//!
//! # Protocol Overview
//!
//! Inbound commands have no start byte, length header or checksum. A frame
//! is an opcode followed by a body whose size is fixed by the opcode, or,
//! for text, by a one byte length prefix:
//! ```text
//! ┌────────┬──────────────────────────────┐
//! │ OPCODE │ BODY                         │
//! │ 1B     │ 0–514B, fixed per opcode     │
//! └────────┴──────────────────────────────┘
//! ```
//!
//! Multi-byte integers are big-endian. A frame is complete only once its
//! whole body is present; decoding a short buffer reports
//! [`FrameError::Incomplete`] and consumes nothing, so the caller can keep
//! the bytes and retry when more arrive.
//!
//! Outbound traffic is a single acknowledge byte ([`ACK`]) or an
//! [`InputEvent`] frame.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod events;
pub mod frame;
pub mod opcode;

pub use events::{InputEvent, TouchPress, MAX_EVENT_SIZE, MAX_PRESSES};
pub use frame::{Command, FrameError, SectorData, MAX_FRAME_SIZE, SECTOR_BYTES, SECTOR_CELLS};
pub use opcode::Opcode;

/// Reply to [`Opcode::AckRequest`]
pub const ACK: u8 = 0x06;
