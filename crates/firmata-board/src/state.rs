//! Per-pin, per-port, and per-channel state tables

use firmata_protocol::PinMode;

use crate::history::History;

/// State of one digital pin
///
/// What `value` means depends on the mode: last commanded value in the
/// output modes, last observed bit in the input modes.
#[derive(Debug, Clone)]
pub struct PinState {
    /// Current operating mode
    pub mode: PinMode,
    /// Last written/read value, None until the first write or observation
    pub value: Option<u16>,
    /// Last commanded servo position, tracked separately from the PWM
    /// value even for the same pin index
    pub servo_value: Option<u16>,
    /// Whether this pin individually requested digital reporting
    pub reporting: bool,
    /// Recent digital observations, newest first
    pub history: History<u8>,
}

impl PinState {
    pub fn new(history_retention: usize) -> Self {
        Self {
            mode: PinMode::Output,
            value: None,
            servo_value: None,
            reporting: false,
            history: History::new(history_retention),
        }
    }
}

/// State of one group of 8 digital pins
#[derive(Debug, Clone, Copy, Default)]
pub struct PortState {
    /// Aggregated 8-bit value, one bit per pin. Holds the last commanded
    /// output bits only; observed input bits never land here.
    pub value: u8,
    /// Whether reporting is enabled for the port. On iff at least one of
    /// its pins has reporting individually enabled.
    pub reporting: bool,
}

/// State of one analog input channel
#[derive(Debug, Clone)]
pub struct AnalogChannelState {
    /// Whether the channel reports samples
    pub reporting: bool,
    /// Recent samples, newest first
    pub history: History<u16>,
}

impl AnalogChannelState {
    pub fn new(history_retention: usize) -> Self {
        Self {
            reporting: false,
            history: History::new(history_retention),
        }
    }
}

/// Protocol and firmware identity negotiated once per connection.
/// Stable until a fresh version or firmware report arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardIdentity {
    pub protocol_major: u8,
    pub protocol_minor: u8,
    pub firmware_major: u8,
    pub firmware_minor: u8,
    pub firmware_name: String,
}

impl Default for BoardIdentity {
    fn default() -> Self {
        Self {
            protocol_major: 0,
            protocol_minor: 0,
            firmware_major: 0,
            firmware_minor: 0,
            firmware_name: "Unknown".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_defaults() {
        let pin = PinState::new(2);
        assert_eq!(pin.mode, PinMode::Output);
        assert_eq!(pin.value, None);
        assert!(!pin.reporting);
        assert!(pin.history.is_empty());
    }

    #[test]
    fn test_identity_defaults() {
        let identity = BoardIdentity::default();
        assert_eq!(identity.firmware_name, "Unknown");
        assert_eq!(identity.protocol_major, 0);
    }
}
