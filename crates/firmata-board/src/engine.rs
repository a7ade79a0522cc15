//! Protocol engine
//!
//! [`Board`] drives the framer and decoder over a transport, owns the
//! pin/port/channel state tables and bounded histories, and exposes the
//! outbound command surface. One engine per connection; single-threaded,
//! poll-driven.

use std::time::{Duration, Instant};

use firmata_protocol::wire::{MAX_ANALOG_CHANNELS, MAX_PINS, MAX_PORTS};
use firmata_protocol::{encoder, Framer, Message, PinMode, StepDirection, StepperRamp};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::error::BoardError;
use crate::events::BoardEvent;
use crate::history::History;
use crate::state::{AnalogChannelState, BoardIdentity, PinState, PortState};
use crate::transport::Transport;

/// Minimum retention for analog and digital sample histories
const MIN_SAMPLE_HISTORY: usize = 2;
/// Minimum retention for string and SysEx histories
const MIN_RECORD_HISTORY: usize = 1;
/// Upper bound on bytes drained from the transport per poll
const MAX_BYTES_PER_POLL: usize = 512;

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Retention length for per-channel analog sample histories
    pub analog_history_length: usize,
    /// Retention length for per-pin digital sample histories
    pub digital_history_length: usize,
    /// Retention length for the received-string history
    pub string_history_length: usize,
    /// Retention length for the raw SysEx payload history
    pub sysex_history_length: usize,
    /// Minimum time after connect before the board is reported ready,
    /// giving the microcontroller time to boot
    pub ready_delay: Duration,
    /// Whether `is_ready` honors the ready delay
    pub use_ready_delay: bool,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            analog_history_length: 2,
            digital_history_length: 2,
            string_history_length: 1,
            sysex_history_length: 1,
            ready_delay: Duration::from_secs(4),
            use_ready_delay: true,
        }
    }
}

/// The protocol engine for one board connection
pub struct Board<T: Transport> {
    config: BoardConfig,
    transport: T,
    framer: Framer,
    pins: Vec<PinState>,
    ports: Vec<PortState>,
    analog: Vec<AnalogChannelState>,
    string_history: History<String>,
    sysex_history: History<Vec<u8>>,
    identity: BoardIdentity,
    initialized: bool,
    i2c_configured: bool,
    connected_at: Option<Instant>,
    event_buffer: Vec<BoardEvent>,
}

impl<T: Transport> Board<T> {
    /// Create an engine with default configuration
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, BoardConfig::default())
    }

    /// Create an engine with custom configuration
    pub fn with_config(transport: T, config: BoardConfig) -> Self {
        // Clamp to the floors so config() always reports the retention
        // actually in force
        let mut config = config;
        config.analog_history_length = config.analog_history_length.max(MIN_SAMPLE_HISTORY);
        config.digital_history_length = config.digital_history_length.max(MIN_SAMPLE_HISTORY);
        config.string_history_length = config.string_history_length.max(MIN_RECORD_HISTORY);
        config.sysex_history_length = config.sysex_history_length.max(MIN_RECORD_HISTORY);

        let analog_len = config.analog_history_length;
        let digital_len = config.digital_history_length;
        let string_len = config.string_history_length;
        let sysex_len = config.sysex_history_length;

        Self {
            config,
            transport,
            framer: Framer::new(),
            pins: (0..MAX_PINS).map(|_| PinState::new(digital_len)).collect(),
            ports: vec![PortState::default(); MAX_PORTS],
            analog: (0..MAX_ANALOG_CHANNELS)
                .map(|_| AnalogChannelState::new(analog_len))
                .collect(),
            string_history: History::new(string_len),
            sysex_history: History::new(sysex_len),
            identity: BoardIdentity::default(),
            initialized: false,
            i2c_configured: false,
            connected_at: None,
            event_buffer: Vec::new(),
        }
    }

    /// Current configuration
    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Access the transport, mainly for tests and diagnostics
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // -------------------------------------------------------------------
    // Connection lifecycle
    // -------------------------------------------------------------------

    /// Request the firmware report and start the ready-delay clock.
    /// The initialized event fires once the board answers.
    pub fn connect(&mut self) -> Result<(), BoardError> {
        self.transport.write(&encoder::firmware_report_request())?;
        self.connected_at = Some(Instant::now());
        Ok(())
    }

    /// True once `connect` has run
    pub fn is_connected(&self) -> bool {
        self.connected_at.is_some()
    }

    /// True once the connection is open and the boot delay (if enabled)
    /// has elapsed
    pub fn is_ready(&self) -> bool {
        match self.connected_at {
            None => false,
            Some(at) => !self.config.use_ready_delay || at.elapsed() >= self.config.ready_delay,
        }
    }

    /// Enable or disable the boot delay in the ready check
    pub fn set_use_ready_delay(&mut self, use_delay: bool) {
        self.config.use_ready_delay = use_delay;
    }

    /// True once a firmware report has arrived
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Protocol and firmware identity reported by the board
    pub fn identity(&self) -> &BoardIdentity {
        &self.identity
    }

    // -------------------------------------------------------------------
    // Inbound path
    // -------------------------------------------------------------------

    /// Drain available bytes from the transport (at most 512 per call)
    /// and return the events they produced, in emission order
    pub fn update(&mut self) -> Result<Vec<BoardEvent>, BoardError> {
        for _ in 0..MAX_BYTES_PER_POLL {
            match self.transport.try_read_byte()? {
                Some(byte) => self.process_byte(byte),
                None => break,
            }
        }
        Ok(self.drain_events())
    }

    /// Feed one byte through the framer and decoder.
    /// Must not be called from within handling of a returned event.
    pub fn process_byte(&mut self, byte: u8) {
        let Some(frame) = self.framer.push(byte) else {
            return;
        };
        match Message::from_frame(frame) {
            Ok(message) => self.apply(message),
            Err(e) => warn!("dropping malformed message: {}", e),
        }
    }

    /// Take the events buffered since the last drain. `update` drains
    /// implicitly; this serves callers feeding bytes directly.
    pub fn drain_events(&mut self) -> Vec<BoardEvent> {
        std::mem::take(&mut self.event_buffer)
    }

    fn apply(&mut self, message: Message) {
        match message {
            Message::DigitalPort { port, value } => self.apply_digital_port(port, value),
            Message::AnalogChannel { channel, value } => self.apply_analog(channel, value),
            Message::ProtocolVersion { major, minor } => {
                self.identity.protocol_major = major;
                self.identity.protocol_minor = minor;
                self.event_buffer
                    .push(BoardEvent::ProtocolVersionReceived { major, minor });
            }
            Message::FirmwareReport { major, minor, name } => {
                self.identity.firmware_major = major;
                self.identity.firmware_minor = minor;
                self.identity.firmware_name = name.clone();
                self.event_buffer
                    .push(BoardEvent::FirmwareVersionReceived { major, minor, name });
                self.event_buffer.push(BoardEvent::Initialized);
                self.initialized = true;
            }
            Message::StringData(text) => {
                self.string_history.push(text.clone());
                self.event_buffer.push(BoardEvent::StringReceived(text));
            }
            Message::I2cReply(reply) => {
                self.event_buffer.push(BoardEvent::I2cDataReceived(reply));
            }
            Message::StepperDone { stepper_id } => {
                self.event_buffer
                    .push(BoardEvent::StepperFinished { stepper_id });
            }
            Message::SysexPayload(payload) => {
                self.sysex_history.push(payload.clone());
                self.event_buffer.push(BoardEvent::SysexReceived(payload));
            }
        }
    }

    fn apply_digital_port(&mut self, port: u8, value: u8) {
        if port as usize >= self.ports.len() {
            warn!("digital message for out-of-range port {}", port);
            return;
        }
        // The port aggregate tracks commanded output bits only; inbound
        // reports land in the per-pin input histories below.

        for bit in 0..8u8 {
            let pin = port as usize * 8 + bit as usize;
            let state = &mut self.pins[pin];
            if !state.mode.is_input() {
                continue;
            }

            let observed = (value >> bit) & 1;
            // An empty history compares against 0, so the first observed
            // high bit fires a change event and the first low bit does not
            let previous = state.history.front().copied().unwrap_or(0);
            state.history.push(observed);
            state.value = Some(observed as u16);

            if observed != previous {
                self.event_buffer.push(BoardEvent::DigitalPinChanged {
                    pin: pin as u8,
                    value: observed,
                });
            }
        }
    }

    fn apply_analog(&mut self, channel: u8, value: u16) {
        let Some(state) = self.analog.get_mut(channel as usize) else {
            warn!("analog message for out-of-range channel {}", channel);
            return;
        };

        let previous = state.history.front().copied();
        state.history.push(value);

        // No event for the very first sample
        if previous.is_some_and(|prev| prev != value) {
            self.event_buffer
                .push(BoardEvent::AnalogPinChanged { channel, value });
        }
    }

    // -------------------------------------------------------------------
    // History configuration
    // -------------------------------------------------------------------

    /// Set the analog history retention; values below 2 are ignored
    pub fn set_analog_history_length(&mut self, length: usize) {
        if length < MIN_SAMPLE_HISTORY {
            return;
        }
        self.config.analog_history_length = length;
        for channel in &mut self.analog {
            channel.history.set_retention(length);
        }
    }

    /// Set the digital history retention; values below 2 are ignored
    pub fn set_digital_history_length(&mut self, length: usize) {
        if length < MIN_SAMPLE_HISTORY {
            return;
        }
        self.config.digital_history_length = length;
        for pin in &mut self.pins {
            pin.history.set_retention(length);
        }
    }

    /// Set the string history retention; values below 1 are ignored
    pub fn set_string_history_length(&mut self, length: usize) {
        if length < MIN_RECORD_HISTORY {
            return;
        }
        self.config.string_history_length = length;
        self.string_history.set_retention(length);
    }

    /// Set the SysEx history retention; values below 1 are ignored
    pub fn set_sysex_history_length(&mut self, length: usize) {
        if length < MIN_RECORD_HISTORY {
            return;
        }
        self.config.sysex_history_length = length;
        self.sysex_history.set_retention(length);
    }

    // -------------------------------------------------------------------
    // State accessors
    // -------------------------------------------------------------------

    /// Most recent sample on an analog channel
    pub fn analog_value(&self, channel: u8) -> Result<Option<u16>, BoardError> {
        Ok(self.channel_state(channel)?.history.front().copied())
    }

    /// A pin's digital value: last observed bit in the input modes, last
    /// commanded value in output mode, None otherwise
    pub fn digital_value(&self, pin: u8) -> Result<Option<u8>, BoardError> {
        let state = self.pin_state(pin)?;
        if state.mode.is_input() {
            Ok(state.history.front().copied())
        } else if state.mode == PinMode::Output {
            Ok(state.value.map(|v| v as u8))
        } else {
            Ok(None)
        }
    }

    /// Last commanded PWM duty, if the pin is in PWM mode
    pub fn pwm_value(&self, pin: u8) -> Result<Option<u16>, BoardError> {
        let state = self.pin_state(pin)?;
        Ok((state.mode == PinMode::Pwm).then_some(state.value).flatten())
    }

    /// Last commanded servo position, if the pin is in servo mode
    pub fn servo_value(&self, pin: u8) -> Result<Option<u16>, BoardError> {
        let state = self.pin_state(pin)?;
        Ok((state.mode == PinMode::Servo)
            .then_some(state.servo_value)
            .flatten())
    }

    /// A pin's current operating mode
    pub fn pin_mode(&self, pin: u8) -> Result<PinMode, BoardError> {
        Ok(self.pin_state(pin)?.mode)
    }

    /// Whether an analog channel is reporting
    pub fn analog_reporting(&self, channel: u8) -> Result<bool, BoardError> {
        Ok(self.channel_state(channel)?.reporting)
    }

    /// An analog channel's sample history, newest first
    pub fn analog_history(&self, channel: u8) -> Result<&History<u16>, BoardError> {
        Ok(&self.channel_state(channel)?.history)
    }

    /// A pin's digital observation history, newest first
    pub fn digital_history(&self, pin: u8) -> Result<&History<u8>, BoardError> {
        Ok(&self.pin_state(pin)?.history)
    }

    /// Most recent received string
    pub fn last_string(&self) -> Option<&str> {
        self.string_history.front().map(String::as_str)
    }

    /// Most recent unrecognized SysEx payload
    pub fn last_sysex(&self) -> Option<&[u8]> {
        self.sysex_history.front().map(Vec::as_slice)
    }

    /// Received-string history, newest first
    pub fn string_history(&self) -> &History<String> {
        &self.string_history
    }

    /// Unrecognized-SysEx history, newest first
    pub fn sysex_history(&self) -> &History<Vec<u8>> {
        &self.sysex_history
    }

    // -------------------------------------------------------------------
    // Outbound path: pins and reporting
    // -------------------------------------------------------------------

    /// Write a digital pin. Suppressed unless the value differs from the
    /// last sent one or `force` is set; ignored for pins whose mode is
    /// neither output nor an input variant.
    pub fn send_digital(&mut self, pin: u8, value: bool, force: bool) -> Result<(), BoardError> {
        let state = self.pin_state(pin)?;
        if !(state.mode.is_input() || state.mode == PinMode::Output) {
            trace!("digital write ignored, pin {} is in {:?} mode", pin, state.mode);
            return Ok(());
        }
        if state.value == Some(value as u16) && !force {
            trace!("digital write suppressed, pin {} already {}", pin, value);
            return Ok(());
        }

        let port = (pin >> 3) as usize;
        let bit = pin & 0x07;
        if value {
            self.ports[port].value |= 1 << bit;
        } else {
            self.ports[port].value &= !(1 << bit);
        }
        self.pins[pin as usize].value = Some(value as u16);

        let frame = encoder::digital_port(port as u8, self.ports[port].value);
        self.transport.write(&frame)?;
        Ok(())
    }

    /// Write an analog value to a PWM or servo pin via an analog-channel
    /// frame. PWM and servo last-sent values are tracked independently.
    pub fn send_pwm(&mut self, pin: u8, value: u16, force: bool) -> Result<(), BoardError> {
        let state = self.pin_state(pin)?;
        match state.mode {
            PinMode::Pwm if state.value != Some(value) || force => {
                self.transport.write(&encoder::analog(pin, value))?;
                self.pins[pin as usize].value = Some(value);
            }
            PinMode::Servo if state.servo_value != Some(value) || force => {
                self.transport.write(&encoder::analog(pin, value))?;
                self.pins[pin as usize].servo_value = Some(value);
            }
            _ => trace!("analog write ignored for pin {} in {:?} mode", pin, state.mode),
        }
        Ok(())
    }

    /// Write a servo position via the servo SysEx sub-protocol
    pub fn send_servo(&mut self, pin: u8, value: u16, force: bool) -> Result<(), BoardError> {
        let state = self.pin_state(pin)?;
        if state.mode == PinMode::Servo && (state.servo_value != Some(value) || force) {
            self.transport.write(&encoder::servo_write(pin, value))?;
            self.pins[pin as usize].servo_value = Some(value);
        }
        Ok(())
    }

    /// Change a pin's mode. Input variants automatically enable the
    /// pin's digital reporting; other modes disable it.
    pub fn set_pin_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), BoardError> {
        self.pin_state(pin)?;
        self.transport.write(&encoder::set_pin_mode(pin, mode))?;
        self.pins[pin as usize].mode = mode;
        self.set_digital_pin_reporting(pin, mode.is_input())
    }

    /// Enable or disable digital reporting for one pin. The owning port
    /// starts reporting the instant any pin requests it and only stops
    /// once none of its 8 pins still want it.
    pub fn set_digital_pin_reporting(&mut self, pin: u8, enabled: bool) -> Result<(), BoardError> {
        self.pin_state(pin)?;
        self.pins[pin as usize].reporting = enabled;

        let port = pin >> 3;
        if enabled {
            self.set_digital_port_reporting(port, true)
        } else {
            let base = port as usize * 8;
            if self.pins[base..base + 8].iter().any(|p| p.reporting) {
                Ok(())
            } else {
                self.set_digital_port_reporting(port, false)
            }
        }
    }

    /// Enable or disable reporting for a whole digital port
    pub fn set_digital_port_reporting(&mut self, port: u8, enabled: bool) -> Result<(), BoardError> {
        let state = self
            .ports
            .get_mut(port as usize)
            .ok_or(BoardError::InvalidPort(port))?;
        state.reporting = enabled;
        self.transport.write(&encoder::report_digital(port, enabled))?;
        Ok(())
    }

    /// Whether a digital port is reporting
    pub fn digital_port_reporting(&self, port: u8) -> Result<bool, BoardError> {
        self.ports
            .get(port as usize)
            .map(|p| p.reporting)
            .ok_or(BoardError::InvalidPort(port))
    }

    /// Enable or disable reporting for an analog channel
    pub fn set_analog_reporting(&mut self, channel: u8, enabled: bool) -> Result<(), BoardError> {
        self.channel_state(channel)?;
        self.transport
            .write(&encoder::report_analog(channel, enabled))?;
        self.analog[channel as usize].reporting = enabled;
        Ok(())
    }

    // -------------------------------------------------------------------
    // Outbound path: queries, strings, reset
    // -------------------------------------------------------------------

    /// Ask the board for its protocol version
    pub fn request_protocol_version(&mut self) -> Result<(), BoardError> {
        self.transport.write(&encoder::protocol_version_request())?;
        Ok(())
    }

    /// Ask the board for its firmware version and name
    pub fn request_firmware_report(&mut self) -> Result<(), BoardError> {
        self.transport.write(&encoder::firmware_report_request())?;
        Ok(())
    }

    /// Reset the board
    pub fn send_reset(&mut self) -> Result<(), BoardError> {
        self.transport.write(&encoder::system_reset())?;
        Ok(())
    }

    /// Send a string message
    pub fn send_string(&mut self, text: &str) -> Result<(), BoardError> {
        self.transport.write(&encoder::string_data(text))?;
        Ok(())
    }

    /// Send a raw SysEx frame; the outbound mirror of the decoder's
    /// opaque-SysEx extension point
    pub fn send_sysex(&mut self, command: u8, data: &[u8]) -> Result<(), BoardError> {
        self.transport.write(&encoder::sysex(command, data))?;
        Ok(())
    }

    // -------------------------------------------------------------------
    // Outbound path: servo and stepper sub-protocols
    // -------------------------------------------------------------------

    /// Attach a servo to a pin; the pin switches to servo mode
    pub fn send_servo_attach(
        &mut self,
        pin: u8,
        min_pulse: u16,
        max_pulse: u16,
    ) -> Result<(), BoardError> {
        self.pin_state(pin)?;
        self.transport
            .write(&encoder::servo_attach(pin, min_pulse, max_pulse))?;
        self.pins[pin as usize].mode = PinMode::Servo;
        Ok(())
    }

    /// Detach a servo; the pin reverts to output mode
    pub fn send_servo_detach(&mut self, pin: u8) -> Result<(), BoardError> {
        self.pin_state(pin)?;
        self.transport.write(&encoder::servo_detach(pin))?;
        self.pins[pin as usize].mode = PinMode::Output;
        Ok(())
    }

    /// Configure a two-wire (dir/step driver) stepper; both pins switch
    /// to output mode
    pub fn send_stepper_two_wire(
        &mut self,
        stepper_id: u8,
        dir_pin: u8,
        step_pin: u8,
        steps_per_rev: u16,
    ) -> Result<(), BoardError> {
        self.pin_state(dir_pin)?;
        self.pin_state(step_pin)?;
        self.transport.write(&encoder::stepper_config_driver(
            stepper_id,
            steps_per_rev,
            dir_pin,
            step_pin,
        ))?;
        self.pins[dir_pin as usize].mode = PinMode::Output;
        self.pins[step_pin as usize].mode = PinMode::Output;
        Ok(())
    }

    /// Configure a four-wire stepper; all four pins switch to output mode
    pub fn send_stepper_four_wire(
        &mut self,
        stepper_id: u8,
        pins: [u8; 4],
        steps_per_rev: u16,
    ) -> Result<(), BoardError> {
        for &pin in &pins {
            self.pin_state(pin)?;
        }
        self.transport.write(&encoder::stepper_config_four_wire(
            stepper_id,
            steps_per_rev,
            pins,
        ))?;
        for &pin in &pins {
            self.pins[pin as usize].mode = PinMode::Output;
        }
        Ok(())
    }

    /// Command a stepper motion; the sign of `steps` is discarded in
    /// favor of the explicit direction
    pub fn send_stepper_step(
        &mut self,
        stepper_id: u8,
        direction: StepDirection,
        steps: i32,
        speed: u16,
        ramp: Option<StepperRamp>,
    ) -> Result<(), BoardError> {
        self.transport.write(&encoder::stepper_step(
            stepper_id,
            direction,
            steps.unsigned_abs(),
            speed,
            ramp,
        ))?;
        Ok(())
    }

    /// Configure a stepper limit switch
    pub fn send_stepper_limit_switch(
        &mut self,
        stepper_id: u8,
        pin: u8,
        at_motor_end: bool,
        input_pullup: bool,
    ) -> Result<(), BoardError> {
        self.pin_state(pin)?;
        self.transport.write(&encoder::stepper_limit_switch(
            stepper_id,
            pin,
            at_motor_end,
            input_pullup,
        ))?;
        Ok(())
    }

    // -------------------------------------------------------------------
    // Outbound path: I2C sub-protocol
    // -------------------------------------------------------------------

    /// Configure I2C with an inter-read delay in microseconds. Must be
    /// called before any other I2C operation.
    pub fn send_i2c_config(&mut self, delay_us: u16) -> Result<(), BoardError> {
        self.transport.write(&encoder::i2c_config(delay_us))?;
        self.i2c_configured = true;
        Ok(())
    }

    /// True once I2C has been configured
    pub fn is_i2c_configured(&self) -> bool {
        self.i2c_configured
    }

    /// Write bytes to an I2C device
    pub fn send_i2c_write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BoardError> {
        if !self.i2c_ready() {
            return Ok(());
        }
        self.transport.write(&encoder::i2c_write(address, bytes))?;
        Ok(())
    }

    /// Write a value to a register on an I2C device
    pub fn send_i2c_write_register(
        &mut self,
        address: u8,
        register: u16,
        value: u16,
    ) -> Result<(), BoardError> {
        if !self.i2c_ready() {
            return Ok(());
        }
        self.transport
            .write(&encoder::i2c_write_register(address, register, value))?;
        Ok(())
    }

    /// Legacy one-shot read: address and byte count only
    pub fn send_i2c_read_request(&mut self, address: u8, count: u16) -> Result<(), BoardError> {
        if !self.i2c_ready() {
            return Ok(());
        }
        self.transport
            .write(&encoder::i2c_read_request(address, count))?;
        Ok(())
    }

    /// One-shot read from a register
    pub fn send_i2c_read_once(
        &mut self,
        address: u8,
        register: u16,
        count: u16,
    ) -> Result<(), BoardError> {
        if !self.i2c_ready() {
            return Ok(());
        }
        self.transport
            .write(&encoder::i2c_read_once(address, register, count))?;
        Ok(())
    }

    /// Continuous streaming read from a register
    pub fn send_i2c_read_continuous(
        &mut self,
        address: u8,
        register: u16,
        count: u16,
    ) -> Result<(), BoardError> {
        if !self.i2c_ready() {
            return Ok(());
        }
        self.transport
            .write(&encoder::i2c_read_continuous(address, register, count))?;
        Ok(())
    }

    fn i2c_ready(&self) -> bool {
        if !self.i2c_configured {
            warn!("I2C request ignored: send an I2C config first");
        }
        self.i2c_configured
    }

    // -------------------------------------------------------------------

    fn pin_state(&self, pin: u8) -> Result<&PinState, BoardError> {
        self.pins
            .get(pin as usize)
            .ok_or(BoardError::InvalidPin(pin))
    }

    fn channel_state(&self, channel: u8) -> Result<&AnalogChannelState, BoardError> {
        self.analog
            .get(channel as usize)
            .ok_or(BoardError::InvalidChannel(channel))
    }
}
