//! Supply-channel controller.
//!
//! Monitors the 48 V input and the 12 V bus, switches four supply rails,
//! and exposes four header analog inputs.  It runs from its own rail, so
//! the reference floor is disabled.

use crate::pins::supply as pin;
use crate::sensors::SensorKind;
use crate::sensors::reference::ReferenceCalibration;

use super::{
    BoardKind, BoardProfile, CommandEntry, OutputSpec, ProtectionPolicy, Reading, SensorSpec,
    Setting, Switching, read, write,
};

pub const V48: usize = 0;
pub const V12: usize = 1;
pub const A0: usize = 2;
pub const A1: usize = 3;
pub const A6: usize = 4;
pub const A7: usize = 5;

pub const CH_PI: usize = 0;
pub const CH_5V: usize = 1;
pub const CH_GPIO: usize = 2;
pub const CH_12V: usize = 3;

const SENSORS: [SensorSpec; 6] = [
    SensorSpec { label: "V48", pin: pin::V48, kind: SensorKind::Voltage },
    SensorSpec { label: "V12", pin: pin::V12, kind: SensorKind::Voltage },
    SensorSpec { label: "A0", pin: pin::A0, kind: SensorKind::Analog },
    SensorSpec { label: "A1", pin: pin::A1, kind: SensorKind::Analog },
    SensorSpec { label: "A6", pin: pin::A6, kind: SensorKind::Analog },
    SensorSpec { label: "A7", pin: pin::A7, kind: SensorKind::Analog },
];

const OUTPUTS: [OutputSpec; 4] = [
    OutputSpec { label: "PI", pin: pin::CH_PI, active_low: true, switching: Switching::Direct },
    OutputSpec { label: "5V", pin: pin::CH_5V, active_low: true, switching: Switching::Direct },
    OutputSpec { label: "GPIO", pin: pin::CH_GPIO, active_low: true, switching: Switching::Direct },
    OutputSpec { label: "12V", pin: pin::CH_12V, active_low: false, switching: Switching::Direct },
];

const COMMANDS: [CommandEntry; 15] = [
    read("RV48", Reading::Millivolts(V48)),
    read("RV12", Reading::Millivolts(V12)),
    read("RVCC", Reading::Vcc),
    read("RCPI", Reading::Output(CH_PI)),
    read("RC5V", Reading::Output(CH_5V)),
    read("RCGP", Reading::Output(CH_GPIO)),
    read("RC12V", Reading::Output(CH_12V)),
    read("RA0", Reading::AdcMillivolts(A0)),
    read("RA1", Reading::AdcMillivolts(A1)),
    read("RA6", Reading::AdcMillivolts(A6)),
    read("RA7", Reading::AdcMillivolts(A7)),
    write("WCPI", Setting::Output(CH_PI)),
    write("WC5V", Setting::Output(CH_5V)),
    write("WCGP", Setting::Output(CH_GPIO)),
    write("WC12V", Setting::Output(CH_12V)),
];

pub static PROFILE: BoardProfile = BoardProfile {
    kind: BoardKind::Supply,
    name: "supply",
    sensors: &SENSORS,
    outputs: &OUTPUTS,
    protected_currents: &[],
    temperatures: &[],
    policy: ProtectionPolicy::MonitorOnly,
    reference: ReferenceCalibration::UNFLOORED,
    power_stage: None,
    commands: &COMMANDS,
};
