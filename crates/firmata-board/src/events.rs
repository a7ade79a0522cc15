//! Typed notifications emitted by the protocol engine
//!
//! Every observation the decoder makes surfaces as a [`BoardEvent`].
//! Events are delivered in emission order, synchronously within the poll
//! call that produced them; nothing is buffered across polls.

use firmata_protocol::I2cReply;

/// An event produced while decoding inbound traffic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    /// The board reported its protocol version
    ProtocolVersionReceived { major: u8, minor: u8 },

    /// The board reported its firmware version and name
    FirmwareVersionReceived {
        major: u8,
        minor: u8,
        name: String,
    },

    /// Fired alongside the firmware report; marks the board usable.
    /// Re-fires if the board reports its firmware again.
    Initialized,

    /// An analog channel's sample changed from its previous value
    AnalogPinChanged { channel: u8, value: u16 },

    /// A digital input pin's observed bit changed
    DigitalPinChanged { pin: u8, value: u8 },

    /// A decoded string message arrived
    StringReceived(String),

    /// A SysEx payload with an unrecognized sub-command arrived
    SysexReceived(Vec<u8>),

    /// An I2C read reply arrived
    I2cDataReceived(I2cReply),

    /// A stepper finished its commanded motion
    StepperFinished { stepper_id: u16 },
}

impl BoardEvent {
    /// Check if this is a connection lifecycle event (identity/readiness)
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            BoardEvent::ProtocolVersionReceived { .. }
                | BoardEvent::FirmwareVersionReceived { .. }
                | BoardEvent::Initialized
        )
    }

    /// Get the pin or channel index if this event concerns a single pin
    pub fn pin(&self) -> Option<u8> {
        match self {
            BoardEvent::AnalogPinChanged { channel, .. } => Some(*channel),
            BoardEvent::DigitalPinChanged { pin, .. } => Some(*pin),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_classification() {
        assert!(BoardEvent::Initialized.is_lifecycle());
        assert!(BoardEvent::ProtocolVersionReceived { major: 2, minor: 5 }.is_lifecycle());
        assert!(!BoardEvent::DigitalPinChanged { pin: 2, value: 1 }.is_lifecycle());
    }

    #[test]
    fn test_pin_extraction() {
        let event = BoardEvent::DigitalPinChanged { pin: 7, value: 0 };
        assert_eq!(event.pin(), Some(7));
        assert_eq!(BoardEvent::StringReceived("x".into()).pin(), None);
    }
}
