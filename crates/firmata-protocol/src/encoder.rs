//! Outbound frame construction
//!
//! Stateless builders for every frame the host can send. Idempotence
//! bookkeeping (suppressing unchanged writes) lives in the engine, not
//! here. Every scalar wider than 7 bits is split low byte first.

use crate::wire::{
    encode_packed_bytes, split_u14, PinMode, ANALOG_MESSAGE, DIGITAL_MESSAGE, END_SYSEX,
    I2C_MODE_CONTINUOUS_READ, I2C_MODE_READ, I2C_MODE_WRITE, REPORT_ANALOG, REPORT_DIGITAL,
    REPORT_VERSION, SET_PIN_MODE, START_SYSEX, STEPPER_CONFIG, STEPPER_INTERFACE_DRIVER,
    STEPPER_INTERFACE_FOUR_WIRE, STEPPER_LIMIT_SWITCH, STEPPER_STEP, SYSEX_I2C_CONFIG,
    SYSEX_I2C_REQUEST, SYSEX_REPORT_FIRMWARE, SYSEX_SERVO_ATTACH, SYSEX_SERVO_DETACH,
    SYSEX_SERVO_WRITE, SYSEX_STEPPER_DATA, SYSEX_STRING_DATA, SYSTEM_RESET,
};

/// Stepper rotation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StepDirection {
    /// Counter-clockwise
    Ccw,
    /// Clockwise
    Cw,
}

impl StepDirection {
    /// Wire value for this direction
    pub fn as_wire(self) -> u8 {
        match self {
            StepDirection::Ccw => 0,
            StepDirection::Cw => 1,
        }
    }
}

/// Acceleration/deceleration ramp for a stepper motion, in units per
/// second squared; encoded on the wire as integer hundredths
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepperRamp {
    pub acceleration: f32,
    pub deceleration: f32,
}

impl StepperRamp {
    fn acceleration_hundredths(&self) -> u16 {
        (self.acceleration * 100.0).floor() as u16
    }

    fn deceleration_hundredths(&self) -> u16 {
        (self.deceleration * 100.0).floor() as u16
    }
}

/// Digital port write: the port's full 8-bit value
pub fn digital_port(port: u8, bits: u8) -> Vec<u8> {
    let [lsb, msb] = split_u14(bits as u16);
    vec![DIGITAL_MESSAGE | (port & 0x0F), lsb, msb]
}

/// Analog channel write (PWM duty or servo position via analog message)
pub fn analog(pin: u8, value: u16) -> Vec<u8> {
    let [lsb, msb] = split_u14(value);
    vec![ANALOG_MESSAGE | (pin & 0x0F), lsb, msb]
}

/// Set a pin's operating mode
pub fn set_pin_mode(pin: u8, mode: PinMode) -> Vec<u8> {
    vec![SET_PIN_MODE, pin, mode.as_wire()]
}

/// Enable or disable analog channel reporting
pub fn report_analog(channel: u8, enabled: bool) -> Vec<u8> {
    vec![REPORT_ANALOG | (channel & 0x0F), enabled as u8]
}

/// Enable or disable digital port reporting
pub fn report_digital(port: u8, enabled: bool) -> Vec<u8> {
    vec![REPORT_DIGITAL | (port & 0x0F), enabled as u8]
}

/// Ask the board for its protocol version
pub fn protocol_version_request() -> Vec<u8> {
    vec![REPORT_VERSION]
}

/// Reset the board
pub fn system_reset() -> Vec<u8> {
    vec![SYSTEM_RESET]
}

/// Generic SysEx frame: start marker, sub-command, payload, end marker
pub fn sysex(command: u8, data: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(data.len() + 3);
    frame.push(START_SYSEX);
    frame.push(command);
    frame.extend_from_slice(data);
    frame.push(END_SYSEX);
    frame
}

/// Ask the board for its firmware version and name
pub fn firmware_report_request() -> Vec<u8> {
    sysex(SYSEX_REPORT_FIRMWARE, &[])
}

/// String message, one 7-bit pair per byte of the string
pub fn string_data(text: &str) -> Vec<u8> {
    sysex(SYSEX_STRING_DATA, &encode_packed_bytes(text.as_bytes()))
}

/// Servo position write
pub fn servo_write(pin: u8, value: u16) -> Vec<u8> {
    let [lsb, msb] = split_u14(value);
    sysex(SYSEX_SERVO_WRITE, &[pin, lsb, msb])
}

/// Attach a servo with its pulse range in microseconds
pub fn servo_attach(pin: u8, min_pulse: u16, max_pulse: u16) -> Vec<u8> {
    let [min_lsb, min_msb] = split_u14(min_pulse);
    let [max_lsb, max_msb] = split_u14(max_pulse);
    sysex(
        SYSEX_SERVO_ATTACH,
        &[pin, min_lsb, min_msb, max_lsb, max_msb],
    )
}

/// Detach a servo
pub fn servo_detach(pin: u8) -> Vec<u8> {
    sysex(SYSEX_SERVO_DETACH, &[pin])
}

/// Configure a stepper driven through dir/step pins.
/// Two-wire steppers use the driver interface code.
pub fn stepper_config_driver(
    stepper_id: u8,
    steps_per_rev: u16,
    dir_pin: u8,
    step_pin: u8,
) -> Vec<u8> {
    let [rev_lsb, rev_msb] = split_u14(steps_per_rev);
    sysex(
        SYSEX_STEPPER_DATA,
        &[
            STEPPER_CONFIG,
            stepper_id,
            STEPPER_INTERFACE_DRIVER,
            rev_lsb,
            rev_msb,
            dir_pin,
            step_pin,
        ],
    )
}

/// Configure a four-wire stepper
pub fn stepper_config_four_wire(stepper_id: u8, steps_per_rev: u16, pins: [u8; 4]) -> Vec<u8> {
    let [rev_lsb, rev_msb] = split_u14(steps_per_rev);
    sysex(
        SYSEX_STEPPER_DATA,
        &[
            STEPPER_CONFIG,
            stepper_id,
            STEPPER_INTERFACE_FOUR_WIRE,
            rev_lsb,
            rev_msb,
            pins[0],
            pins[1],
            pins[2],
            pins[3],
        ],
    )
}

/// Command a stepper motion. The step count is split into three 7-bit
/// bytes; the ramp, when given, is appended as two 14-bit hundredths.
pub fn stepper_step(
    stepper_id: u8,
    direction: StepDirection,
    steps: u32,
    speed: u16,
    ramp: Option<StepperRamp>,
) -> Vec<u8> {
    let [speed_lsb, speed_msb] = split_u14(speed);
    let mut data = vec![
        STEPPER_STEP,
        stepper_id,
        direction.as_wire(),
        (steps & 0x7F) as u8,
        ((steps >> 7) & 0x7F) as u8,
        ((steps >> 14) & 0x7F) as u8,
        speed_lsb,
        speed_msb,
    ];
    if let Some(ramp) = ramp {
        data.extend_from_slice(&split_u14(ramp.acceleration_hundredths()));
        data.extend_from_slice(&split_u14(ramp.deceleration_hundredths()));
    }
    sysex(SYSEX_STEPPER_DATA, &data)
}

/// Configure a limit switch for a stepper
pub fn stepper_limit_switch(
    stepper_id: u8,
    pin: u8,
    at_motor_end: bool,
    input_pullup: bool,
) -> Vec<u8> {
    sysex(
        SYSEX_STEPPER_DATA,
        &[
            STEPPER_LIMIT_SWITCH,
            stepper_id,
            at_motor_end as u8,
            pin,
            input_pullup as u8,
        ],
    )
}

/// I2C configuration with the inter-read delay in microseconds.
/// The delay travels as two plain 8-bit halves, low byte first.
pub fn i2c_config(delay_us: u16) -> Vec<u8> {
    sysex(
        SYSEX_I2C_CONFIG,
        &[(delay_us & 0xFF) as u8, (delay_us >> 8) as u8],
    )
}

/// I2C write request; each payload byte expands to a 7-bit pair
pub fn i2c_write(address: u8, bytes: &[u8]) -> Vec<u8> {
    let mut data = vec![address, I2C_MODE_WRITE << 3];
    data.extend(encode_packed_bytes(bytes));
    sysex(SYSEX_I2C_REQUEST, &data)
}

/// I2C write of a single value to a register
pub fn i2c_write_register(address: u8, register: u16, value: u16) -> Vec<u8> {
    let [reg_lsb, reg_msb] = split_u14(register);
    let [val_lsb, val_msb] = split_u14(value);
    sysex(
        SYSEX_I2C_REQUEST,
        &[
            address,
            I2C_MODE_WRITE << 3,
            reg_lsb,
            reg_msb,
            val_lsb,
            val_msb,
        ],
    )
}

/// Legacy one-shot I2C read: address and byte count only
pub fn i2c_read_request(address: u8, count: u16) -> Vec<u8> {
    let [count_lsb, count_msb] = split_u14(count);
    sysex(
        SYSEX_I2C_REQUEST,
        &[address, I2C_MODE_READ << 3, count_lsb, count_msb],
    )
}

/// One-shot I2C read from a register
pub fn i2c_read_once(address: u8, register: u16, count: u16) -> Vec<u8> {
    i2c_read(address, I2C_MODE_READ, register, count)
}

/// Continuous streaming I2C read from a register
pub fn i2c_read_continuous(address: u8, register: u16, count: u16) -> Vec<u8> {
    i2c_read(address, I2C_MODE_CONTINUOUS_READ, register, count)
}

fn i2c_read(address: u8, mode: u8, register: u16, count: u16) -> Vec<u8> {
    let [reg_lsb, reg_msb] = split_u14(register);
    let [count_lsb, count_msb] = split_u14(count);
    sysex(
        SYSEX_I2C_REQUEST,
        &[address, mode << 3, reg_lsb, reg_msb, count_lsb, count_msb],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digital_port_frame() {
        // Bit 7 set forces a non-zero high data byte
        assert_eq!(digital_port(2, 0xA5), vec![0x92, 0x25, 0x01]);
    }

    #[test]
    fn test_analog_frame() {
        assert_eq!(analog(3, 1023), vec![0xE3, 0x7F, 0x07]);
    }

    #[test]
    fn test_set_pin_mode_frame() {
        assert_eq!(set_pin_mode(13, PinMode::Pwm), vec![0xF4, 13, 0x03]);
        assert_eq!(set_pin_mode(2, PinMode::InputPullup), vec![0xF4, 2, 0x0B]);
    }

    #[test]
    fn test_reporting_frames() {
        assert_eq!(report_analog(5, true), vec![0xC5, 1]);
        assert_eq!(report_digital(1, false), vec![0xD1, 0]);
    }

    #[test]
    fn test_firmware_request_is_empty_sysex() {
        assert_eq!(firmware_report_request(), vec![0xF0, 0x79, 0xF7]);
    }

    #[test]
    fn test_string_frame() {
        assert_eq!(
            string_data("AB"),
            vec![0xF0, 0x71, b'A', 0, b'B', 0, 0xF7]
        );
    }

    #[test]
    fn test_servo_frames() {
        assert_eq!(servo_write(9, 90), vec![0xF0, 0x02, 9, 90, 0, 0xF7]);
        assert_eq!(
            servo_attach(9, 544, 2400),
            vec![0xF0, 0x00, 9, 0x20, 0x04, 0x60, 0x12, 0xF7]
        );
        assert_eq!(servo_detach(9), vec![0xF0, 0x01, 9, 0xF7]);
    }

    #[test]
    fn test_stepper_config_frames() {
        assert_eq!(
            stepper_config_driver(0, 200, 2, 3),
            vec![0xF0, 0x72, 0, 0, 1, 0x48, 0x01, 2, 3, 0xF7]
        );
        assert_eq!(
            stepper_config_four_wire(1, 200, [4, 5, 6, 7]),
            vec![0xF0, 0x72, 0, 1, 4, 0x48, 0x01, 4, 5, 6, 7, 0xF7]
        );
    }

    #[test]
    fn test_stepper_step_without_ramp() {
        // 100000 steps = 0x186A0 -> low 7: 0x20, mid 7: 0x0D, high 7: 0x06
        assert_eq!(
            stepper_step(2, StepDirection::Cw, 100_000, 500, None),
            vec![0xF0, 0x72, 1, 2, 1, 0x20, 0x0D, 0x06, 0x74, 0x03, 0xF7]
        );
    }

    #[test]
    fn test_stepper_step_with_ramp() {
        let ramp = StepperRamp {
            acceleration: 1.5,
            deceleration: 0.25,
        };
        let frame = stepper_step(0, StepDirection::Ccw, 1, 100, Some(ramp));
        // 1.5 -> 150 hundredths -> [0x16, 0x01]; 0.25 -> 25 -> [25, 0]
        assert_eq!(
            frame,
            vec![0xF0, 0x72, 1, 0, 0, 1, 0, 0, 100, 0, 0x16, 0x01, 25, 0, 0xF7]
        );
    }

    #[test]
    fn test_stepper_limit_switch_frame() {
        assert_eq!(
            stepper_limit_switch(1, 8, true, false),
            vec![0xF0, 0x72, 2, 1, 1, 8, 0, 0xF7]
        );
    }

    #[test]
    fn test_i2c_config_uses_eight_bit_halves() {
        assert_eq!(i2c_config(0x1234), vec![0xF0, 0x78, 0x34, 0x12, 0xF7]);
    }

    #[test]
    fn test_i2c_write_frame() {
        assert_eq!(
            i2c_write(0x48, &[0xFF]),
            vec![0xF0, 0x76, 0x48, 0x00, 0x7F, 0x01, 0xF7]
        );
    }

    #[test]
    fn test_i2c_read_frames() {
        assert_eq!(
            i2c_read_request(0x48, 2),
            vec![0xF0, 0x76, 0x48, 0x08, 2, 0, 0xF7]
        );
        assert_eq!(
            i2c_read_once(0x48, 0x10, 2),
            vec![0xF0, 0x76, 0x48, 0x08, 0x10, 0, 2, 0, 0xF7]
        );
        assert_eq!(
            i2c_read_continuous(0x48, 0x10, 2),
            vec![0xF0, 0x76, 0x48, 0x10, 0x10, 0, 2, 0, 0xF7]
        );
    }
}
