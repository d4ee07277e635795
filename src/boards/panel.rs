//! Four-channel power distribution panel.

use crate::pins::panel as pin;
use crate::sensors::SensorKind;
use crate::sensors::reference::ReferenceCalibration;

use super::{
    BoardKind, BoardProfile, CommandEntry, OutputSpec, ProtectionPolicy, Reading, SensorSpec,
    Setting, Switching, read, write,
};

pub const VBUS: usize = 0;
pub const I1: usize = 1;
pub const I2: usize = 2;
pub const I3: usize = 3;
pub const I4: usize = 4;

const SENSORS: [SensorSpec; 5] = [
    SensorSpec { label: "VBUS", pin: pin::VBUS, kind: SensorKind::Voltage },
    SensorSpec { label: "I1", pin: pin::I1, kind: SensorKind::Current },
    SensorSpec { label: "I2", pin: pin::I2, kind: SensorKind::Current },
    SensorSpec { label: "I3", pin: pin::I3, kind: SensorKind::Current },
    SensorSpec { label: "I4", pin: pin::I4, kind: SensorKind::Current },
];

const fn channel(label: &'static str, pin: crate::pins::Pin) -> OutputSpec {
    OutputSpec { label, pin, active_low: false, switching: Switching::InrushHold }
}

const OUTPUTS: [OutputSpec; 4] = [
    channel("CH1", pin::CH1),
    channel("CH2", pin::CH2),
    channel("CH3", pin::CH3),
    channel("CH4", pin::CH4),
];

const COMMANDS: [CommandEntry; 20] = [
    read("RVB", Reading::Millivolts(VBUS)),
    read("RI1", Reading::Milliamps(I1)),
    read("RI2", Reading::Milliamps(I2)),
    read("RI3", Reading::Milliamps(I3)),
    read("RI4", Reading::Milliamps(I4)),
    read("RIT", Reading::TotalMilliamps),
    read("RVCC", Reading::Vcc),
    read("RCH1", Reading::Output(0)),
    read("RCH2", Reading::Output(1)),
    read("RCH3", Reading::Output(2)),
    read("RCH4", Reading::Output(3)),
    write("WCH1", Setting::Output(0)),
    write("WCH2", Setting::Output(1)),
    write("WCH3", Setting::Output(2)),
    write("WCH4", Setting::Output(3)),
    write("WIL1", Setting::CurrentLimit(0)),
    write("WIL2", Setting::CurrentLimit(1)),
    write("WIL3", Setting::CurrentLimit(2)),
    write("WIL4", Setting::CurrentLimit(3)),
    write("WILT", Setting::TotalLimit),
];

pub static PROFILE: BoardProfile = BoardProfile {
    kind: BoardKind::Panel,
    name: "panel",
    sensors: &SENSORS,
    outputs: &OUTPUTS,
    protected_currents: &[I1, I2, I3, I4],
    temperatures: &[],
    policy: ProtectionPolicy::ChannelTrip,
    reference: ReferenceCalibration::STANDARD,
    power_stage: None,
    commands: &COMMANDS,
};
