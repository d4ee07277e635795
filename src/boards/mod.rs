//! Static board profiles.
//!
//! A profile describes one board variant as data: which analog channels it
//! samples, which outputs it switches, how it protects itself, and which
//! protocol keys it answers.  One [`BoardController`](crate::app::service::BoardController)
//! runs every variant from its profile; nothing is subclassed.
//!
//! ```text
//!   BoardKind ──▶ &'static BoardProfile
//!                   ├── sensors   [SensorSpec]     indexed by channel number
//!                   ├── outputs   [OutputSpec]     indexed by output number
//!                   ├── policy    ProtectionPolicy
//!                   └── commands  [CommandEntry]   key → Op
//! ```

pub mod converter;
pub mod panel;
pub mod supply;

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::pins::Pin;
use crate::sensors::SensorKind;
use crate::sensors::reference::ReferenceCalibration;

/// Supported board variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardKind {
    /// Bidirectional DC-DC converter.
    #[default]
    Converter,
    /// Four-channel power distribution panel.
    Panel,
    /// Supply-channel controller.
    Supply,
}

impl BoardKind {
    pub fn profile(self) -> &'static BoardProfile {
        match self {
            Self::Converter => &converter::PROFILE,
            Self::Panel => &panel::PROFILE,
            Self::Supply => &supply::PROFILE,
        }
    }
}

impl fmt::Display for BoardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.profile().name)
    }
}

/// One analog input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorSpec {
    pub label: &'static str,
    pub pin: Pin,
    pub kind: SensorKind,
}

/// How an output pin is switched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switching {
    /// Drive the pin and keep driving it.
    Direct,
    /// Drive the pin through the inrush window, then release it to the
    /// hardware overcurrent shutoff (when that is enabled).
    InrushHold,
}

/// One switchable power output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSpec {
    pub label: &'static str,
    pub pin: Pin,
    /// Output is on when the pin is LOW.
    pub active_low: bool,
    pub switching: Switching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionPolicy {
    /// Single power path with a latched shutdown.
    Latching,
    /// Independent outputs tripped individually.
    ChannelTrip,
    /// No automatic shutdown.
    MonitorOnly,
}

/// Most switchable outputs on any board.
pub const MAX_OUTPUTS: usize = 4;

/// Gate-driver control lines of a power stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatePins {
    /// Alternate drive signal (bootstrap refresh is a low pulse here).
    pub alt: Pin,
    /// Per-driver select: LOW follows PWM, HIGH follows `alt`.
    pub vctrl: [Pin; 2],
    /// Protection latch reset, active high.
    pub reset: Pin,
    /// Shared shutdown line.  Pulled low to shut down; reads low while
    /// the protection latch holds.
    pub shutdown: Pin,
}

/// A two-port power stage: sensor indices per port plus its gate lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerStage {
    pub voltage: [usize; 2],
    pub current: [usize; 2],
    pub gates: GatePins,
}

/// Built-in read operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    /// Divider voltage of a sensor, mV.
    Millivolts(usize),
    /// Signed current of a sensor, mA.
    Milliamps(usize),
    /// Thermistor temperature of a sensor, °C.
    Celsius(usize),
    /// Undivided ADC pin voltage of a sensor, mV.
    AdcMillivolts(usize),
    /// Sum of all protected current channels, mA.
    TotalMilliamps,
    /// Calibrated supply rail, mV.
    Vcc,
    /// Duty cycle, percent.
    Duty,
    /// Droop resistance, mΩ.
    Droop,
    /// Shutdown reason code, −1 when running.
    ShutdownCode,
    /// On/off state of an output, read back from the pin.
    Output(usize),
}

/// Built-in write operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    /// Current limit of a protected channel, mA.
    CurrentLimit(usize),
    /// Aggregate current limit, mA.
    TotalLimit,
    /// Thermal ceiling, °C.
    ThermalLimit,
    Droop,
    Duty,
    /// Latch a shutdown with the given code.
    Shutdown,
    /// Clear the latch and enable the gate drivers.
    Enable,
    /// Switch an output on (non-zero) or off.
    Output(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Read(Reading),
    Write(Setting),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub key: &'static str,
    pub op: Op,
}

pub(crate) const fn read(key: &'static str, r: Reading) -> CommandEntry {
    CommandEntry { key, op: Op::Read(r) }
}

pub(crate) const fn write(key: &'static str, s: Setting) -> CommandEntry {
    CommandEntry { key, op: Op::Write(s) }
}

#[derive(Debug)]
pub struct BoardProfile {
    pub kind: BoardKind,
    pub name: &'static str,
    pub sensors: &'static [SensorSpec],
    pub outputs: &'static [OutputSpec],
    /// Sensor indices of the protected current channels, in limit order.
    pub protected_currents: &'static [usize],
    /// Sensor indices of the thermistors.
    pub temperatures: &'static [usize],
    pub policy: ProtectionPolicy,
    pub reference: ReferenceCalibration,
    pub power_stage: Option<PowerStage>,
    pub commands: &'static [CommandEntry],
}

impl BoardProfile {
    /// Exact, case-sensitive key lookup.
    pub fn lookup(&self, key: &str) -> Option<Op> {
        self.commands.iter().find(|c| c.key == key).map(|c| c.op)
    }
}
