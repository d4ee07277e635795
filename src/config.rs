//! Board configuration parameters.
//!
//! Every tunable of the control kernel.  Defaults match the boards'
//! shipped firmware; the simulator can override them from a JSON file.
//! [`BoardConfig::validate`] is the startup-time check for the
//! preconditions the real-time paths rely on but never re-check.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::boards::BoardKind;
use crate::control::ControlMode;
use crate::control::compensator::{Coefficients, MAX_TAPS};
use crate::control::duty::DUTY_DEFAULT;
use crate::error::ConfigError;
use crate::sensors::{SensorKind, validate_window};

/// Averaging window per sensor kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorWindows {
    pub voltage: usize,
    pub current: usize,
    pub temperature: usize,
    pub analog: usize,
}

impl SensorWindows {
    pub fn for_kind(&self, kind: SensorKind) -> usize {
        match kind {
            SensorKind::Voltage => self.voltage,
            SensorKind::Current => self.current,
            SensorKind::Temperature => self.temperature,
            SensorKind::Analog => self.analog,
        }
    }

    /// Shipped windows for each board.
    pub fn for_board(board: BoardKind) -> Self {
        match board {
            BoardKind::Converter | BoardKind::Panel => Self {
                voltage: 4,
                current: 16,
                temperature: 4,
                analog: 4,
            },
            BoardKind::Supply => Self {
                voltage: 32,
                current: 16,
                temperature: 4,
                analog: 32,
            },
        }
    }
}

/// Protection thresholds and pulse timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionConfig {
    /// Per-channel current limit (mA), applied to every protected channel.
    pub channel_limit_ma: i32,
    /// Aggregate current limit (mA) for multi-channel boards.
    pub total_limit_ma: i32,
    /// Thermal shutdown (°C).
    pub thermal_limit_c: i32,
    /// Width of the latch-reset pulse when re-enabling (µs).
    pub enable_hold_us: u32,
    /// Width of the software shutdown pulse (µs).
    pub shutdown_pulse_us: u32,
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            channel_limit_ma: 6500,  // 5 A continuous plus ripple
            total_limit_ma: 22_000,  // 20 A bus plus margin
            thermal_limit_c: 80,
            enable_hold_us: 3000,
            shutdown_pulse_us: 10_000,
        }
    }
}

/// Control law tuning for power-stage boards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Duty applied when the PWM starts (%).
    pub initial_duty: u8,
    pub mode: ControlMode,
    /// Gradient stepper calls ignored after each step.
    pub gradient_settle: u32,
    /// Gradient stepper calls averaged per decision.
    pub gradient_average: u32,
    pub droop_milliohms: i32,
    /// Ticks between bootstrap refresh pulses in hold-high drive.
    pub bootstrap_refresh_ticks: u32,
    pub compensator_num: Vec<i32, MAX_TAPS>,
    pub compensator_den: Vec<i32, MAX_TAPS>,
}

impl ControlConfig {
    pub fn coefficients(&self) -> Result<Coefficients, ConfigError> {
        Coefficients::new(&self.compensator_num, &self.compensator_den)
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        let identity = Coefficients::identity();
        Self {
            initial_duty: DUTY_DEFAULT,
            mode: ControlMode::Gradient,
            gradient_settle: 20,
            gradient_average: 10,
            droop_milliohms: 0,
            bootstrap_refresh_ticks: 10,
            compensator_num: Vec::from_slice(identity.numerator()).unwrap_or_default(),
            compensator_den: Vec::from_slice(identity.denominator()).unwrap_or_default(),
        }
    }
}

/// Output switching parameters for inrush-hold boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Time an output is driven before release to the hardware shutoff (µs).
    pub inrush_hold_us: u32,
    /// Hand switched outputs back to the hardware overcurrent shutoff.
    pub hardware_shutoff: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            inrush_hold_us: 20,
            hardware_shutoff: true,
        }
    }
}

/// Complete configuration of one board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub board: BoardKind,
    /// Control tick period (µs).
    pub tick_period_us: u32,
    /// Window overrides; `None` uses the board's shipped windows.
    pub windows: Option<SensorWindows>,
    pub protection: ProtectionConfig,
    pub control: ControlConfig,
    pub channels: ChannelConfig,
}

impl BoardConfig {
    pub fn for_board(board: BoardKind) -> Self {
        Self {
            board,
            ..Self::default()
        }
    }

    /// Effective averaging windows.
    pub fn windows(&self) -> SensorWindows {
        self.windows
            .unwrap_or_else(|| SensorWindows::for_board(self.board))
    }

    /// Check everything the real-time paths assume.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_period_us == 0 {
            return Err(ConfigError::ZeroTickPeriod);
        }
        let w = self.windows();
        for window in [w.voltage, w.current, w.temperature, w.analog] {
            validate_window(window)?;
        }
        let p = &self.protection;
        if p.channel_limit_ma <= 0 {
            return Err(ConfigError::NonPositiveLimit("channel current"));
        }
        if p.total_limit_ma <= 0 {
            return Err(ConfigError::NonPositiveLimit("total current"));
        }
        if p.thermal_limit_c <= 0 {
            return Err(ConfigError::NonPositiveLimit("thermal"));
        }
        let c = &self.control;
        if c.gradient_settle == 0 || c.gradient_average == 0 {
            return Err(ConfigError::InvalidGradientCounts);
        }
        c.coefficients()?;
        Ok(())
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            board: BoardKind::Converter,
            tick_period_us: 1000, // 1 kHz control loop
            windows: None,
            protection: ProtectionConfig::default(),
            control: ControlConfig::default(),
            channels: ChannelConfig::default(),
        }
    }
}
