//! Typed decoding of completed frames
//!
//! A [`Frame`] is structure without meaning; [`Message::from_frame`] turns
//! it into a typed protocol message. SysEx payloads dispatch on their first
//! byte; sub-commands outside the known set come back as an opaque
//! [`Message::SysexPayload`], the designed extension point for protocol
//! additions this decoder does not natively understand.

use crate::error::DecodeError;
use crate::framer::{FixedKind, Frame};
use crate::wire::{
    combine_u14, decode_packed_bytes, decode_packed_string, SYSEX_I2C_REPLY,
    SYSEX_REPORT_FIRMWARE, SYSEX_STEPPER_DATA, SYSEX_STRING_DATA,
};

/// Payload of an I2C reply
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct I2cReply {
    /// 14-bit device address
    pub address: u16,
    /// 14-bit register
    pub register: u16,
    /// Reply data, recombined from 7-bit pairs
    pub data: Vec<u8>,
}

/// A decoded inbound protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// New 8-bit value for a digital port
    DigitalPort { port: u8, value: u8 },
    /// Protocol version report
    ProtocolVersion { major: u8, minor: u8 },
    /// New sample for an analog channel
    AnalogChannel { channel: u8, value: u16 },
    /// Firmware version and name report
    FirmwareReport { major: u8, minor: u8, name: String },
    /// Decoded string message
    StringData(String),
    /// I2C read reply
    I2cReply(I2cReply),
    /// A stepper finished its motion
    StepperDone { stepper_id: u16 },
    /// SysEx payload with an unrecognized sub-command, passed through raw
    SysexPayload(Vec<u8>),
}

impl Message {
    /// Decode a completed frame
    pub fn from_frame(frame: Frame) -> Result<Message, DecodeError> {
        match frame {
            Frame::Fixed {
                kind,
                channel,
                value,
            } => Ok(match kind {
                FixedKind::DigitalPort => Message::DigitalPort {
                    port: channel,
                    value: (value & 0xFF) as u8,
                },
                // Major arrives first, so it sits in the low 7 bits
                FixedKind::ProtocolVersion => Message::ProtocolVersion {
                    major: (value & 0x7F) as u8,
                    minor: ((value >> 7) & 0x7F) as u8,
                },
                FixedKind::AnalogChannel => Message::AnalogChannel { channel, value },
            }),
            Frame::Sysex(payload) => Self::from_sysex(payload),
        }
    }

    /// Decode a SysEx payload; the framer guarantees it is non-empty
    fn from_sysex(payload: Vec<u8>) -> Result<Message, DecodeError> {
        match payload[0] {
            SYSEX_REPORT_FIRMWARE => {
                if payload.len() < 3 {
                    return Err(DecodeError::TruncatedSysex {
                        kind: "firmware report",
                        len: payload.len(),
                    });
                }
                // Version bytes arrive minor first, then the name as one
                // 7-bit pair per character
                Ok(Message::FirmwareReport {
                    minor: payload[1],
                    major: payload[2],
                    name: decode_packed_string(&payload[3..]),
                })
            }
            SYSEX_STRING_DATA => Ok(Message::StringData(decode_packed_string(&payload[1..]))),
            SYSEX_I2C_REPLY => {
                if payload.len() < 5 {
                    return Err(DecodeError::TruncatedSysex {
                        kind: "I2C reply",
                        len: payload.len(),
                    });
                }
                Ok(Message::I2cReply(I2cReply {
                    address: combine_u14(payload[1], payload[2]),
                    register: combine_u14(payload[3], payload[4]),
                    data: decode_packed_bytes(&payload[5..]),
                }))
            }
            SYSEX_STEPPER_DATA => {
                if payload.len() < 2 {
                    return Err(DecodeError::TruncatedSysex {
                        kind: "stepper report",
                        len: payload.len(),
                    });
                }
                // Identifier is two bytes only when there is room for both
                let stepper_id = if payload.len() > 2 {
                    combine_u14(payload[1], payload[2])
                } else {
                    (payload[1] & 0x7F) as u16
                };
                Ok(Message::StepperDone { stepper_id })
            }
            _ => Ok(Message::SysexPayload(payload)),
        }
    }
}
