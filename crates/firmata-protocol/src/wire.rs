//! Wire-level constants and 7-bit value packing
//!
//! Firmata reserves the high bit of every byte as a command/data
//! discriminator, so any value wider than 7 bits travels as multiple
//! bytes with the high bit clear. The helpers here implement that
//! packing in one place; everything else in the crate builds on them.

/// Digital port report/write command (low nibble selects the port)
pub const DIGITAL_MESSAGE: u8 = 0x90;
/// Analog channel report/write command (low nibble selects the channel)
pub const ANALOG_MESSAGE: u8 = 0xE0;
/// Enable/disable analog channel reporting (low nibble selects the channel)
pub const REPORT_ANALOG: u8 = 0xC0;
/// Enable/disable digital port reporting (low nibble selects the port)
pub const REPORT_DIGITAL: u8 = 0xD0;
/// Set pin mode command
pub const SET_PIN_MODE: u8 = 0xF4;
/// Protocol version report (two data bytes follow: major, minor)
pub const REPORT_VERSION: u8 = 0xF9;
/// System reset command
pub const SYSTEM_RESET: u8 = 0xFF;
/// Start of a variable-length SysEx message
pub const START_SYSEX: u8 = 0xF0;
/// End of a variable-length SysEx message
pub const END_SYSEX: u8 = 0xF7;

// SysEx sub-commands (first payload byte)

/// Servo attach (pin, min pulse, max pulse)
pub const SYSEX_SERVO_ATTACH: u8 = 0x00;
/// Servo detach (pin)
pub const SYSEX_SERVO_DETACH: u8 = 0x01;
/// Servo position write (pin, value)
pub const SYSEX_SERVO_WRITE: u8 = 0x02;
/// String message, one character per 7-bit pair
pub const SYSEX_STRING_DATA: u8 = 0x71;
/// Stepper sub-protocol (config, step, limit switch, done reports)
pub const SYSEX_STEPPER_DATA: u8 = 0x72;
/// I2C request (write or read, mode in bits 3-4 of the second byte)
pub const SYSEX_I2C_REQUEST: u8 = 0x76;
/// I2C reply (address, register, data pairs)
pub const SYSEX_I2C_REPLY: u8 = 0x77;
/// I2C configuration (inter-read delay)
pub const SYSEX_I2C_CONFIG: u8 = 0x78;
/// Firmware version and name report
pub const SYSEX_REPORT_FIRMWARE: u8 = 0x79;

// Stepper sub-protocol opcodes (second byte of a SYSEX_STEPPER_DATA frame)

/// Configure a stepper
pub const STEPPER_CONFIG: u8 = 0;
/// Command a stepper motion
pub const STEPPER_STEP: u8 = 1;
/// Configure a stepper limit switch
pub const STEPPER_LIMIT_SWITCH: u8 = 2;

// Stepper wiring interface codes

/// Step/direction driver interface (used for two-wire configs)
pub const STEPPER_INTERFACE_DRIVER: u8 = 1;
/// Four-wire interface
pub const STEPPER_INTERFACE_FOUR_WIRE: u8 = 4;

// I2C request modes, shifted into bits 3-4 of the request mode byte

/// Write to the device
pub const I2C_MODE_WRITE: u8 = 0;
/// One-shot read
pub const I2C_MODE_READ: u8 = 1;
/// Continuous streaming read
pub const I2C_MODE_CONTINUOUS_READ: u8 = 2;
/// Stop a continuous read
pub const I2C_MODE_STOP_READING: u8 = 3;

/// Maximum digital pins addressable by the protocol (16 ports of 8 pins)
pub const MAX_PINS: usize = 128;
/// Maximum digital ports (4-bit port selector)
pub const MAX_PORTS: usize = 16;
/// Maximum analog input channels (4-bit channel selector)
pub const MAX_ANALOG_CHANNELS: usize = 16;

/// Pin operating mode, as carried in a set-pin-mode frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PinMode {
    /// Digital input
    Input,
    /// Digital output
    Output,
    /// Analog input (analog pin not used as digital)
    Analog,
    /// PWM output
    Pwm,
    /// Servo output
    Servo,
    /// Digital input with the internal pullup enabled
    InputPullup,
}

impl PinMode {
    /// Wire value for this mode
    pub fn as_wire(self) -> u8 {
        match self {
            PinMode::Input => 0x00,
            PinMode::Output => 0x01,
            PinMode::Analog => 0x02,
            PinMode::Pwm => 0x03,
            PinMode::Servo => 0x04,
            PinMode::InputPullup => 0x0B,
        }
    }

    /// Decode a wire value
    pub fn from_wire(value: u8) -> Option<PinMode> {
        match value {
            0x00 => Some(PinMode::Input),
            0x01 => Some(PinMode::Output),
            0x02 => Some(PinMode::Analog),
            0x03 => Some(PinMode::Pwm),
            0x04 => Some(PinMode::Servo),
            0x0B => Some(PinMode::InputPullup),
            _ => None,
        }
    }

    /// True for the input variants that stream over digital port reports
    pub fn is_input(self) -> bool {
        matches!(self, PinMode::Input | PinMode::InputPullup)
    }
}

/// Split a value of up to 14 bits into two 7-bit bytes, low byte first
pub fn split_u14(value: u16) -> [u8; 2] {
    [(value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8]
}

/// Recombine two 7-bit bytes into a value; `lsb` is the first-arrived byte
///
/// This is the byte-order contract for every two-byte payload on the wire:
/// the first byte carries the low 7 bits, the second the high 7 bits.
pub fn combine_u14(lsb: u8, msb: u8) -> u16 {
    (((msb & 0x7F) as u16) << 7) | ((lsb & 0x7F) as u16)
}

/// Expand bytes into 7-bit pairs, low byte first
pub fn encode_packed_bytes(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 2);
    for &byte in data {
        let [lsb, msb] = split_u14(byte as u16);
        out.push(lsb);
        out.push(msb);
    }
    out
}

/// Recombine 7-bit pairs into bytes
///
/// An odd trailing byte is tolerated by treating the missing high byte as
/// zero. This matches the lenient decode policy boards rely on for string
/// payloads.
pub fn decode_packed_bytes(data: &[u8]) -> Vec<u8> {
    data.chunks(2)
        .map(|pair| {
            let lsb = pair[0];
            let msb = pair.get(1).copied().unwrap_or(0);
            combine_u14(lsb, msb) as u8
        })
        .collect()
}

/// Decode 7-bit pairs into a string, one character per pair
pub fn decode_packed_string(data: &[u8]) -> String {
    String::from_utf8_lossy(&decode_packed_bytes(data)).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_combine_roundtrip() {
        for value in [0u16, 1, 0x7F, 0x80, 0xFF, 0x1234, 0x3FFF] {
            let [lsb, msb] = split_u14(value);
            assert!(lsb < 0x80 && msb < 0x80);
            assert_eq!(combine_u14(lsb, msb), value);
        }
    }

    #[test]
    fn test_byte_order_is_low_first() {
        // 0x1234 = 0b0010010_0110100: low 7 bits 0x34, high 7 bits 0x24
        assert_eq!(split_u14(0x1234), [0x34, 0x24]);
        assert_eq!(combine_u14(0x34, 0x24), 0x1234);
    }

    #[test]
    fn test_packed_bytes_roundtrip() {
        let data = [0x00u8, 0x7F, 0x80, 0xFF, b'A'];
        let packed = encode_packed_bytes(&data);
        assert_eq!(packed.len(), data.len() * 2);
        assert!(packed.iter().all(|&b| b < 0x80));
        assert_eq!(decode_packed_bytes(&packed), data);
    }

    #[test]
    fn test_odd_length_decode_zero_fills() {
        // Trailing low byte without its high byte decodes as-is
        assert_eq!(decode_packed_bytes(&[b'A', 0, b'B']), vec![b'A', b'B']);
        assert_eq!(decode_packed_string(&[b'A', 0, b'B']), "AB");
    }

    #[test]
    fn test_pin_mode_wire_values() {
        for mode in [
            PinMode::Input,
            PinMode::Output,
            PinMode::Analog,
            PinMode::Pwm,
            PinMode::Servo,
            PinMode::InputPullup,
        ] {
            assert_eq!(PinMode::from_wire(mode.as_wire()), Some(mode));
        }
        assert_eq!(PinMode::from_wire(0x05), None);
    }
}
