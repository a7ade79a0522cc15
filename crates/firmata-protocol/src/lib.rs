//! Firmata Wire Protocol Library
//!
//! This crate provides framing, decoding, and encoding for the Firmata
//! protocol, which lets a host control and observe a microcontroller's
//! pins and peripherals over a byte-oriented serial link.
//!
//! # Architecture
//!
//! - [`framer`]: a streaming state machine that consumes one byte at a
//!   time and detects frame boundaries (fixed two-byte messages and
//!   variable-length SysEx payloads). Purely structural, resumable at
//!   any chunk boundary.
//! - [`message`]: turns completed frames into typed [`Message`] values
//!   (digital/analog reports, firmware identity, strings, I2C replies,
//!   stepper notifications).
//! - [`encoder`]: stateless builders for every outbound frame, from
//!   digital writes to the stepper and I2C sub-protocols.
//! - [`wire`]: the command constants and the 7-bit packing helpers both
//!   directions share.
//!
//! The protocol is 7-bit-clean framing over an 8-bit channel: the high
//! bit of each byte discriminates commands from data, so any wider value
//! travels as multiple 7-bit bytes, low byte first.
//!
//! # Example
//!
//! ```rust
//! use firmata_protocol::{Framer, Frame, Message};
//!
//! // Reassemble an analog report for channel 3 with sample 1023
//! let mut framer = Framer::new();
//! let frames: Vec<Frame> = [0xE3, 0x7F, 0x07]
//!     .into_iter()
//!     .filter_map(|b| framer.push(b))
//!     .collect();
//!
//! let message = Message::from_frame(frames[0].clone()).unwrap();
//! assert_eq!(message, Message::AnalogChannel { channel: 3, value: 1023 });
//! ```

pub mod encoder;
pub mod error;
pub mod framer;
pub mod message;
pub mod wire;

pub use encoder::{StepDirection, StepperRamp};
pub use error::DecodeError;
pub use framer::{FixedKind, Frame, Framer};
pub use message::{I2cReply, Message};
pub use wire::{PinMode, MAX_ANALOG_CHANNELS, MAX_PINS, MAX_PORTS};
