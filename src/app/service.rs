//! Board controller: the aggregate that owns one board's state.
//!
//! [`BoardController`] owns the sensor bank, the protection interlock, the
//! control law and both command transports.  It drives the board through
//! the injected [`BoardHardware`] ports, so the same controller runs on an
//! MCU, in the host simulator, and against the recording test mock.
//!
//! ```text
//!  AnalogPort ──▶ ┌────────────────────────────┐ ──▶ DigitalPort / PwmPort
//!                 │      BoardController        │
//!  bytes in   ──▶ │ Sensors · Interlock · Law   │ ──▶ SerialPort / BusReplySlot
//!                 └────────────────────────────┘
//! ```
//!
//! Two entry points do all the work: [`tick`](BoardController::tick) from
//! the periodic timer and the byte handlers from the transports.  Both run
//! to completion.

use heapless::Vec;
use log::{debug, info, warn};

use crate::boards::{BoardProfile, GatePins, MAX_OUTPUTS, ProtectionPolicy, Switching};
use crate::comms::line::LineBuffer;
use crate::comms::parse::{Command, parse_line};
use crate::comms::{
    BusReplySlot, COMM_BUFFER_SIZE, MAX_COMMAND_CALLBACKS, Reply, SERIAL_LINE_END, Transport,
    reply_from,
};
use crate::config::{BoardConfig, ProtectionConfig};
use crate::control::compensator::Coefficients;
use crate::control::droop::Droop;
use crate::control::drive::{Bootstrap, DriveSignal};
use crate::control::duty::DutyCycle;
use crate::control::{ControlLaw, ControlMode, OutputMode, PortReadings, Regulation};
use crate::error::{ConfigError, Result};
use crate::safety::{
    ChannelTripInterlock, Interlock, LatchingInterlock, MAX_PROTECTED_CHANNELS, ProtectionLimits,
    ShutdownReason,
};
use crate::sensors::conversions::{ma_to_raw, mv_to_raw, raw_to_adc_mv, raw_to_ma, raw_to_mv};
use crate::sensors::temperature::raw_to_celsius;
use crate::sensors::{MAX_SENSOR_CHANNELS, SensorBank};

use super::ports::{BoardHardware, Level};

/// Extension handler for keys the board table does not know.
///
/// Handlers get the controller itself, so they use the same setters as
/// the built-in commands and reply through [`BoardController::reply`].
pub type CommandCallback<H> = fn(&mut BoardController<H>, &Command, Transport);

// ───────────────────────────────────────────────────────────────
// BoardController
// ───────────────────────────────────────────────────────────────

pub struct BoardController<H: BoardHardware> {
    profile: &'static BoardProfile,
    hw: H,
    sensors: SensorBank,
    /// Calibrated supply rail (mV); scale of every conversion.
    vcc_mv: i32,
    interlock: Interlock,
    limits: ProtectionLimits,
    control: ControlLaw,
    regulation: Option<Regulation>,
    drive: DriveSignal,
    bootstrap: Bootstrap,
    hardware_shutoff: [bool; MAX_OUTPUTS],
    inrush_hold_us: u32,
    timing: ProtectionConfig,
    serial: LineBuffer<COMM_BUFFER_SIZE>,
    bus_reply: BusReplySlot,
    callbacks: Vec<CommandCallback<H>, MAX_COMMAND_CALLBACKS>,
    tick_count: u64,
}

impl<H: BoardHardware> BoardController<H> {
    /// Assemble and initialise a board.
    ///
    /// Validates `config`, calibrates the supply rail, forces every power
    /// path off, installs the default limits and fills every averaging
    /// window with real samples.  Latching boards come up latched; call
    /// [`start_pwm`](Self::start_pwm) to run.
    pub fn new(config: &BoardConfig, mut hw: H) -> Result<Self> {
        config.validate()?;
        let profile = config.board.profile();

        let windows = config.windows();
        let mut lengths: Vec<usize, MAX_SENSOR_CHANNELS> = Vec::new();
        for spec in profile.sensors {
            lengths
                .push(windows.for_kind(spec.kind))
                .map_err(|_| ConfigError::TooManyChannels(profile.sensors.len()))?;
        }
        let sensors = SensorBank::new(&lengths)?;

        let interlock = match profile.policy {
            ProtectionPolicy::Latching => Interlock::Latching(LatchingInterlock::new()),
            ProtectionPolicy::ChannelTrip => Interlock::ChannelTrip(ChannelTripInterlock::new()),
            ProtectionPolicy::MonitorOnly => Interlock::MonitorOnly,
        };

        let c = &config.control;
        let mut control = ControlLaw::new(
            DutyCycle::new(i32::from(c.initial_duty)),
            c.coefficients()?,
            c.gradient_settle,
            c.gradient_average,
            Droop::from_milliohms(c.droop_milliohms),
        )?;
        control.set_mode(c.mode);

        let vcc_mv = profile.reference.calibrate(|| hw.read_reference());

        let mut board = Self {
            profile,
            hw,
            sensors,
            vcc_mv,
            interlock,
            limits: ProtectionLimits::default(),
            control,
            regulation: None,
            drive: DriveSignal::Pwm,
            bootstrap: Bootstrap::new(c.bootstrap_refresh_ticks),
            hardware_shutoff: [config.channels.hardware_shutoff; MAX_OUTPUTS],
            inrush_hold_us: config.channels.inrush_hold_us,
            timing: config.protection,
            serial: LineBuffer::new(),
            bus_reply: BusReplySlot::new(),
            callbacks: Vec::new(),
            tick_count: 0,
        };

        board.force_off();
        board.prime_sensors();

        let p = &config.protection;
        for ch in 0..profile.protected_currents.len() {
            board.set_current_limit(ch, p.channel_limit_ma);
        }
        if profile.policy == ProtectionPolicy::ChannelTrip {
            board.set_total_limit(p.total_limit_ma);
        }
        if !profile.temperatures.is_empty() {
            board.set_thermal_limit(p.thermal_limit_c);
        }

        info!(
            "{} board ready: vcc {} mV, {} sensors",
            profile.name,
            board.vcc_mv,
            board.sensors.len()
        );
        Ok(board)
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// One control period: refresh sensors, check protection, keep the
    /// bootstrap alive, then regulate if allowed.
    pub fn tick(&mut self) {
        self.tick_count += 1;
        self.refresh_sensors();
        self.check_protection();
        if self.drive.is_holding() && self.bootstrap.tick() {
            self.refresh_bootstrap();
        }
        self.regulate();
    }

    /// Take one sample of every analog channel.
    pub fn refresh_sensors(&mut self) {
        let profile = self.profile;
        for (i, spec) in profile.sensors.iter().enumerate() {
            let raw = i32::from(self.hw.read_channel(spec.pin)) - spec.kind.offset();
            self.sensors.update(i, raw);
        }
    }

    fn prime_sensors(&mut self) {
        for _ in 0..self.sensors.longest_window() {
            self.refresh_sensors();
        }
    }

    /// Re-measure the supply rail.  Limits already installed keep their
    /// raw values.
    pub fn recalibrate_vcc(&mut self) -> i32 {
        let hw = &mut self.hw;
        self.vcc_mv = self.profile.reference.calibrate(|| hw.read_reference());
        self.vcc_mv
    }

    fn check_protection(&mut self) {
        let profile = self.profile;
        match &mut self.interlock {
            Interlock::Latching(latch) => {
                if let Some(stage) = profile.power_stage {
                    if latch.is_armed() && self.hw.read_input(stage.gates.shutdown).is_low() {
                        latch.latch(ShutdownReason::Hardware);
                    }
                }
                let sensors = &self.sensors;
                let currents = profile
                    .protected_currents
                    .iter()
                    .zip(self.limits.channel_raw)
                    .map(|(&i, limit)| (sensors.average(i), limit));
                let temperatures = profile
                    .temperatures
                    .iter()
                    .map(|&i| raw_to_celsius(sensors.average(i)));
                if latch
                    .evaluate(currents, temperatures, self.limits.thermal_c)
                    .is_some()
                {
                    self.pulse_gate_shutdown();
                }
            }
            Interlock::ChannelTrip(trip) => {
                let n = profile.protected_currents.len().min(MAX_PROTECTED_CHANNELS);
                let mut averages = [0; MAX_PROTECTED_CHANNELS];
                for (avg, &i) in averages.iter_mut().zip(profile.protected_currents) {
                    *avg = self.sensors.average(i);
                }
                let fresh = trip.evaluate(
                    &averages[..n],
                    &self.limits.channel_raw[..n],
                    self.limits.total_raw,
                );
                for ch in (0..n).filter(|ch| fresh & (1 << ch) != 0) {
                    self.drive_output(ch, false);
                }
            }
            Interlock::MonitorOnly => {}
        }
    }

    fn regulate(&mut self) {
        let (Some(regulation), Some(stage)) = (self.regulation, self.profile.power_stage) else {
            return;
        };
        if !self.interlock.allows_control() {
            return;
        }
        let readings = PortReadings {
            voltage: stage.voltage.map(|i| self.sensors.average(i)),
            current: stage.current.map(|i| self.sensors.average(i)),
        };
        let error = regulation.error(&readings, self.control.droop());
        if let Some(duty) = self.control.update(error) {
            self.hw.set_duty(duty.percent());
        }
    }

    // ── Readings ──────────────────────────────────────────────

    pub fn average(&self, sensor: usize) -> i32 {
        self.sensors.average(sensor)
    }

    pub fn millivolts(&self, sensor: usize) -> i32 {
        raw_to_mv(self.sensors.average(sensor), self.vcc_mv)
    }

    pub fn milliamps(&self, sensor: usize) -> i32 {
        raw_to_ma(self.sensors.average(sensor), self.vcc_mv)
    }

    pub fn celsius(&self, sensor: usize) -> i32 {
        raw_to_celsius(self.sensors.average(sensor))
    }

    /// Voltage at the ADC pin itself, before any divider.
    pub fn adc_millivolts(&self, sensor: usize) -> i32 {
        raw_to_adc_mv(self.sensors.average(sensor), self.vcc_mv)
    }

    /// Sum of all protected current channels.
    pub fn total_milliamps(&self) -> i32 {
        let raw: i32 = self
            .profile
            .protected_currents
            .iter()
            .map(|&i| self.sensors.average(i))
            .sum();
        raw_to_ma(raw, self.vcc_mv)
    }

    pub fn vcc_mv(&self) -> i32 {
        self.vcc_mv
    }

    pub fn duty(&self) -> DutyCycle {
        self.control.duty()
    }

    pub fn droop_milliohms(&self) -> i32 {
        self.control.droop().milliohms()
    }

    /// Shutdown reason code, −1 while running.
    pub fn shutdown_code(&self) -> i32 {
        self.interlock.shutdown_code()
    }

    /// Whether output `index` is on, read back from its pin.
    pub fn output_state(&mut self, index: usize) -> bool {
        let profile = self.profile;
        let Some(spec) = profile.outputs.get(index) else {
            return false;
        };
        self.hw.read_input(spec.pin).is_high() != spec.active_low
    }

    // ── Protection settings ───────────────────────────────────

    /// Per-channel current limit, converted with the present rail.  A
    /// negative limit leaves an empty band, so the channel trips on the
    /// next tick.
    pub fn set_current_limit(&mut self, channel: usize, milliamps: i32) {
        if let Some(limit) = self.limits.channel_raw.get_mut(channel) {
            *limit = ma_to_raw(milliamps, self.vcc_mv);
            info!("channel {channel} limit {milliamps} mA (raw {limit})");
        }
    }

    /// Aggregate limit over all protected channels.  Negative means
    /// always trip.
    pub fn set_total_limit(&mut self, milliamps: i32) {
        let raw = ma_to_raw(milliamps, self.vcc_mv);
        self.limits.total_raw = Some(raw);
        info!("total limit {milliamps} mA (raw {raw})");
    }

    pub fn set_thermal_limit(&mut self, celsius: i32) {
        self.limits.thermal_c = celsius;
        info!("thermal limit {celsius} C");
    }

    /// Shut the power path down.
    ///
    /// Latching boards latch with `reason` (an existing latch keeps its
    /// reason) and pulse the gate shutdown line.  Other boards switch all
    /// outputs off.  Returns `true` if this call latched.
    pub fn shutdown(&mut self, reason: ShutdownReason) -> bool {
        let latched = match &mut self.interlock {
            Interlock::Latching(latch) => latch.latch(reason),
            _ => false,
        };
        self.force_off();
        latched
    }

    /// Clear the protection latch and re-arm.  A latch the hardware still
    /// holds is seen again on the next tick.
    pub fn enable_gate_drivers(&mut self) {
        if let Some(stage) = self.profile.power_stage {
            self.hw.set_output(stage.gates.reset, Level::High);
            self.hw.delay_us(self.timing.enable_hold_us);
            self.hw.set_output(stage.gates.reset, Level::Low);
        }
        if let Interlock::Latching(latch) = &mut self.interlock {
            latch.rearm();
        }
    }

    /// Apply the present duty and enable the gate drivers.
    pub fn start_pwm(&mut self) {
        self.hw.set_duty(self.control.duty().percent());
        self.enable_gate_drivers();
    }

    fn force_off(&mut self) {
        let profile = self.profile;
        match profile.policy {
            ProtectionPolicy::Latching => self.pulse_gate_shutdown(),
            ProtectionPolicy::ChannelTrip => {
                for spec in profile.outputs {
                    self.hw.set_output(spec.pin, Level::from(spec.active_low));
                }
                self.hw.delay_us(self.timing.shutdown_pulse_us);
                for spec in profile.outputs {
                    self.hw.release(spec.pin);
                }
            }
            ProtectionPolicy::MonitorOnly => {
                for ch in 0..profile.outputs.len() {
                    self.drive_output(ch, false);
                }
            }
        }
    }

    fn pulse_gate_shutdown(&mut self) {
        let Some(stage) = self.profile.power_stage else {
            return;
        };
        self.hw.set_output(stage.gates.shutdown, Level::Low);
        self.hw.delay_us(self.timing.shutdown_pulse_us);
        self.hw.release(stage.gates.shutdown);
    }

    // ── Outputs ───────────────────────────────────────────────

    /// Switch output `index`.  Switching on re-arms a tripped channel.
    /// Inrush-hold outputs are driven through the hold window and then
    /// handed to the hardware shutoff when it is enabled.
    ///
    /// Switching off, by command or by a channel trip, keeps the line
    /// driven low.  A released line on an active-high channel would be
    /// left to the shutoff circuit's pull, which can hold the channel on.
    pub fn set_output(&mut self, index: usize, on: bool) {
        let profile = self.profile;
        let Some(spec) = profile.outputs.get(index) else {
            return;
        };
        if on {
            if let Interlock::ChannelTrip(trip) = &mut self.interlock {
                trip.rearm(index);
            }
        }
        self.drive_output(index, on);
        if on && spec.switching == Switching::InrushHold && self.hardware_shutoff[index] {
            self.hw.delay_us(self.inrush_hold_us);
            self.hw.release(spec.pin);
        }
        info!("output {} {}", spec.label, if on { "on" } else { "off" });
    }

    fn drive_output(&mut self, index: usize, on: bool) {
        if let Some(spec) = self.profile.outputs.get(index) {
            self.hw.set_output(spec.pin, Level::from(on != spec.active_low));
        }
    }

    /// Enable or disable the hand-off to the hardware shutoff.
    pub fn set_hardware_shutoff(&mut self, index: usize, enabled: bool) {
        if let Some(flag) = self.hardware_shutoff.get_mut(index) {
            *flag = enabled;
        }
    }

    pub fn set_inrush_hold(&mut self, us: u32) {
        self.inrush_hold_us = us;
    }

    // ── Drive signal ──────────────────────────────────────────

    /// Hold one gate driver's high side on (`port` 1 or 2) so the bridge
    /// runs as a plain buck or boost.
    pub fn apply_hold_high(&mut self, port: u8) {
        let Some(stage) = self.profile.power_stage else {
            return;
        };
        let (held, other, drive) = match port {
            1 => (0, 1, DriveSignal::HoldHigh1),
            2 => (1, 0, DriveSignal::HoldHigh2),
            _ => return,
        };
        let gates = stage.gates;
        self.hw.set_output(gates.vctrl[held], Level::High);
        self.hw.set_output(gates.vctrl[other], Level::Low);
        self.hw.set_output(gates.alt, Level::High);
        self.drive = drive;
        self.bootstrap.restart();
        self.pulse_bootstrap(gates);
        info!("drive {drive:?}");
    }

    /// Return both gate drivers to the PWM signal.
    pub fn remove_hold(&mut self) {
        let Some(stage) = self.profile.power_stage else {
            return;
        };
        for pin in stage.gates.vctrl {
            self.hw.set_output(pin, Level::Low);
        }
        self.hw.set_output(stage.gates.alt, Level::Low);
        self.drive = DriveSignal::Pwm;
    }

    fn refresh_bootstrap(&mut self) {
        if let Some(stage) = self.profile.power_stage {
            self.pulse_bootstrap(stage.gates);
        }
    }

    fn pulse_bootstrap(&mut self, gates: GatePins) {
        self.hw.set_output(gates.alt, Level::Low);
        self.hw.set_output(gates.alt, Level::High);
    }

    pub fn drive(&self) -> DriveSignal {
        self.drive
    }

    // ── Control law ───────────────────────────────────────────

    /// Force a duty (clamped to 1..=99) and apply it.
    pub fn set_duty_cycle(&mut self, percent: i32) -> DutyCycle {
        let duty = self.control.set_duty(percent);
        self.hw.set_duty(duty.percent());
        duty
    }

    pub fn set_droop(&mut self, milliohms: i32) {
        self.control.droop_mut().set_milliohms(milliohms);
    }

    pub fn set_control_mode(&mut self, mode: ControlMode) {
        self.control.set_mode(mode);
        info!("control mode {mode:?}");
    }

    /// Install new compensator coefficients.  Histories are resized and
    /// re-seeded around the present duty.
    pub fn set_compensator(
        &mut self,
        num: &[i32],
        den: &[i32],
    ) -> core::result::Result<(), ConfigError> {
        let coeffs = Coefficients::new(num, den)?;
        self.control.set_coefficients(coeffs);
        Ok(())
    }

    pub fn reset_compensator(&mut self) {
        self.control.reset_compensator();
    }

    pub fn set_gradient_counts(
        &mut self,
        settle: u32,
        average: u32,
    ) -> core::result::Result<(), ConfigError> {
        self.control.set_gradient_counts(settle, average)
    }

    pub fn trigger_gradient_step(&mut self) {
        self.control.trigger_gradient_step();
    }

    /// Regulate `mode` to `target` (mV for voltage modes, mA for current
    /// modes).  The stepper is triggered so the new target acts at once.
    pub fn set_regulation(&mut self, mode: OutputMode, target: i32) {
        let target_raw = if mode.is_voltage() {
            mv_to_raw(target, self.vcc_mv)
        } else {
            ma_to_raw(target, self.vcc_mv)
        };
        self.regulation = Some(Regulation { mode, target_raw });
        self.control.trigger_gradient_step();
        info!("regulating {mode:?} to {target} (raw {target_raw})");
    }

    pub fn clear_regulation(&mut self) {
        self.regulation = None;
    }

    pub fn regulation(&self) -> Option<Regulation> {
        self.regulation
    }

    pub fn control(&self) -> &ControlLaw {
        &self.control
    }

    // ── Transports ────────────────────────────────────────────

    /// Feed one byte from the serial transport.
    pub fn on_serial_byte(&mut self, byte: u8) {
        if let Some(line) = self.serial.push(byte) {
            let cmd = parse_line(&line);
            self.dispatch(&cmd, Transport::Serial);
        }
    }

    /// Handle one bus write.  The leading register byte is discarded; a
    /// write carrying nothing else is only a register select.
    pub fn on_bus_receive(&mut self, data: &[u8]) {
        let Some((_register, payload)) = data.split_first() else {
            return;
        };
        if payload.is_empty() {
            return;
        }
        let payload = &payload[..payload.len().min(COMM_BUFFER_SIZE - 1)];
        let cmd = parse_line(payload);
        self.dispatch(&cmd, Transport::Bus);
    }

    /// Bus read request: hand over the pending reply, if any.
    pub fn on_bus_request(&self) -> Option<Reply> {
        self.bus_reply.take()
    }

    /// Send `text` back over `transport`.
    pub fn reply(&mut self, transport: Transport, text: &str) {
        match transport {
            Transport::Serial => {
                self.hw.serial_write(text.as_bytes());
                self.hw.serial_write(SERIAL_LINE_END);
            }
            Transport::Bus => self.bus_reply.store(reply_from(text)),
        }
    }

    /// Add an extension handler.  Returns `false` when the list is full.
    pub fn register_callback(&mut self, callback: CommandCallback<H>) -> bool {
        if self.callbacks.push(callback).is_err() {
            warn!("callback list full ({MAX_COMMAND_CALLBACKS}), registration dropped");
            return false;
        }
        true
    }

    pub(crate) fn forward(&mut self, cmd: &Command, transport: Transport) {
        debug!("forwarding {:?} to {} callbacks", cmd.key(), self.callbacks.len());
        let callbacks = self.callbacks.clone();
        for callback in callbacks {
            callback(self, cmd, transport);
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn profile(&self) -> &'static BoardProfile {
        self.profile
    }

    pub fn interlock(&self) -> &Interlock {
        &self.interlock
    }

    pub fn limits(&self) -> &ProtectionLimits {
        &self.limits
    }

    pub fn sensors(&self) -> &SensorBank {
        &self.sensors
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn hw(&self) -> &H {
        &self.hw
    }

    pub fn hw_mut(&mut self) -> &mut H {
        &mut self.hw
    }
}
