//! Bidirectional H-bridge DC-DC converter.
//!
//! Two ports, each with voltage and Hall current sensing, plus one
//! thermistor per half-bridge.  Duty is referenced to side 1.

use crate::pins::converter as pin;
use crate::sensors::SensorKind;
use crate::sensors::reference::ReferenceCalibration;

use super::{
    BoardKind, BoardProfile, CommandEntry, GatePins, PowerStage, ProtectionPolicy, Reading,
    SensorSpec, Setting, read, write,
};

pub const V1: usize = 0;
pub const V2: usize = 1;
pub const I1: usize = 2;
pub const I2: usize = 3;
pub const T1: usize = 4;
pub const T2: usize = 5;

const SENSORS: [SensorSpec; 6] = [
    SensorSpec { label: "V1", pin: pin::V1, kind: SensorKind::Voltage },
    SensorSpec { label: "V2", pin: pin::V2, kind: SensorKind::Voltage },
    SensorSpec { label: "I1", pin: pin::I1, kind: SensorKind::Current },
    SensorSpec { label: "I2", pin: pin::I2, kind: SensorKind::Current },
    SensorSpec { label: "T1", pin: pin::T1, kind: SensorKind::Temperature },
    SensorSpec { label: "T2", pin: pin::T2, kind: SensorKind::Temperature },
];

const COMMANDS: [CommandEntry; 17] = [
    read("RV1", Reading::Millivolts(V1)),
    read("RV2", Reading::Millivolts(V2)),
    read("RI1", Reading::Milliamps(I1)),
    read("RI2", Reading::Milliamps(I2)),
    read("RT1", Reading::Celsius(T1)),
    read("RT2", Reading::Celsius(T2)),
    read("RVCC", Reading::Vcc),
    read("RDUT", Reading::Duty),
    read("RDRP", Reading::Droop),
    read("RSDC", Reading::ShutdownCode),
    write("WIS1", Setting::CurrentLimit(0)),
    write("WIS2", Setting::CurrentLimit(1)),
    write("WTSD", Setting::ThermalLimit),
    write("WDRP", Setting::Droop),
    write("WDUT", Setting::Duty),
    write("WSDC", Setting::Shutdown),
    write("WENA", Setting::Enable),
];

pub static PROFILE: BoardProfile = BoardProfile {
    kind: BoardKind::Converter,
    name: "converter",
    sensors: &SENSORS,
    outputs: &[],
    protected_currents: &[I1, I2],
    temperatures: &[T1, T2],
    policy: ProtectionPolicy::Latching,
    reference: ReferenceCalibration::STANDARD,
    power_stage: Some(PowerStage {
        voltage: [V1, V2],
        current: [I1, I2],
        gates: GatePins {
            alt: pin::ALT,
            vctrl: [pin::VCTRL1, pin::VCTRL2],
            reset: pin::PRORESET,
            shutdown: pin::GATESD,
        },
    }),
    commands: &COMMANDS,
};
