//! Host-side simulated board.
//!
//! Implements every port against a small integer model of the converter
//! power stage, so the controller can be exercised end to end on a PC.
//! A [`SimBoard::bench`] has no plant: every analog pin reads whatever was
//! last set with [`SimBoard::set_analog`] (mid-scale by default), which is
//! enough to run the panel and supply profiles.
//!
//! The plant: port 1 is a stiff source, port 2 feeds a resistive load.
//! Port 2 settles towards `V1 · d / (100 − d)` with a first-order lag;
//! port 1 current follows from power balance.  The gate shutdown line
//! behaves like the real latch: pulling it low latches, a reset pulse
//! clears it, and while latched the bridge does not switch.

use std::collections::HashMap;

use crate::app::ports::{AnalogPort, DelayPort, DigitalPort, Level, PwmPort, SerialPort};
use crate::control::duty::DutyCycle;
use crate::pins::{Pin, converter};
use crate::sensors::conversions::{ma_to_raw, mv_to_raw};
use crate::sensors::temperature::celsius_to_raw;
use crate::sensors::{ADC_MAX, ADC_MIDPOINT};

/// Lag of port 2, in ticks (larger is slower).
const PLANT_LAG: i32 = 8;

/// Plant parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlantParams {
    /// Supply rail seen by the ADC (mV).
    pub vcc_mv: i32,
    /// Source voltage on port 1 (mV).
    pub source_mv: i32,
    /// Load on port 2 (mΩ).
    pub load_milliohms: i32,
    pub ambient_c: i32,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            vcc_mv: 5000,
            source_mv: 24_000,
            load_milliohms: 10_000,
            ambient_c: 25,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimBoard {
    params: PlantParams,
    plant: bool,
    duty: DutyCycle,
    v2_mv: i32,
    gates_latched: bool,
    levels: HashMap<Pin, Level>,
    analog: HashMap<Pin, u16>,
    tx: Vec<u8>,
    elapsed_us: u64,
}

impl SimBoard {
    /// Converter plant on the converter's pins.
    pub fn new(params: PlantParams) -> Self {
        Self {
            params,
            plant: true,
            duty: DutyCycle::default(),
            v2_mv: 0,
            gates_latched: true,
            levels: HashMap::new(),
            analog: HashMap::new(),
            tx: Vec::new(),
            elapsed_us: 0,
        }
    }

    /// No plant; analog pins are static.
    pub fn bench(params: PlantParams) -> Self {
        Self {
            plant: false,
            gates_latched: false,
            ..Self::new(params)
        }
    }

    /// Fix the raw reading of a pin the plant does not model.
    pub fn set_analog(&mut self, pin: Pin, raw: u16) {
        self.analog.insert(pin, raw.min(ADC_MAX));
    }

    pub fn set_load(&mut self, milliohms: i32) {
        self.params.load_milliohms = milliohms.max(1);
    }

    /// Advance the plant by one control period.
    pub fn advance(&mut self, period_us: u32) {
        self.elapsed_us += u64::from(period_us);
        let target = if self.gates_latched {
            0
        } else {
            let d = i32::from(self.duty.percent());
            self.params.source_mv * d / (100 - d)
        };
        self.v2_mv += (target - self.v2_mv) / PLANT_LAG;
    }

    pub fn port2_mv(&self) -> i32 {
        self.v2_mv
    }

    fn port2_ma(&self) -> i32 {
        (i64::from(self.v2_mv) * 1000 / i64::from(self.params.load_milliohms)) as i32
    }

    fn port1_ma(&self) -> i32 {
        let p2 = i64::from(self.v2_mv) * i64::from(self.port2_ma());
        (p2 / i64::from(self.params.source_mv.max(1))) as i32
    }

    /// Current flows out of port 1 and into port 2's load.
    fn current_raw(&self, ma: i32) -> u16 {
        (ma_to_raw(ma, self.params.vcc_mv) + ADC_MIDPOINT).clamp(0, i32::from(ADC_MAX)) as u16
    }

    fn model(&self, pin: Pin) -> Option<u16> {
        if !self.plant {
            return None;
        }
        let vcc = self.params.vcc_mv;
        let raw = match pin {
            converter::V1 => mv_to_raw(self.params.source_mv, vcc),
            converter::V2 => mv_to_raw(self.v2_mv, vcc),
            converter::I1 => return Some(self.current_raw(-self.port1_ma())),
            converter::I2 => return Some(self.current_raw(self.port2_ma())),
            converter::T1 | converter::T2 => {
                // 1 °C per amp through the bridge
                celsius_to_raw(self.params.ambient_c + self.port2_ma() / 1000)
            }
            _ => return None,
        };
        Some(raw.clamp(0, i32::from(ADC_MAX)) as u16)
    }

    pub fn gates_latched(&self) -> bool {
        self.gates_latched
    }

    pub fn duty(&self) -> DutyCycle {
        self.duty
    }

    /// Drain everything written to the serial port.
    pub fn take_tx(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.tx)
    }

    /// Simulated time spent in blocking delays.
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_us
    }
}

impl Default for SimBoard {
    fn default() -> Self {
        Self::new(PlantParams::default())
    }
}

impl AnalogPort for SimBoard {
    fn read_channel(&mut self, pin: Pin) -> u16 {
        self.model(pin)
            .or_else(|| self.analog.get(&pin).copied())
            .unwrap_or(ADC_MIDPOINT as u16)
    }

    fn read_reference(&mut self) -> u16 {
        (1_125_300 / self.params.vcc_mv.max(1)) as u16
    }
}

impl DigitalPort for SimBoard {
    fn set_output(&mut self, pin: Pin, level: Level) {
        if self.plant {
            match (pin, level) {
                (converter::GATESD, Level::Low) => self.gates_latched = true,
                (converter::PRORESET, Level::High) => self.gates_latched = false,
                _ => {}
            }
        }
        self.levels.insert(pin, level);
    }

    /// Output latches keep holding the last driven level.
    fn release(&mut self, _pin: Pin) {}

    fn read_input(&mut self, pin: Pin) -> Level {
        if self.plant && pin == converter::GATESD {
            return Level::from(!self.gates_latched);
        }
        // Never-driven lines float high through their pull-ups.
        self.levels.get(&pin).copied().unwrap_or(Level::High)
    }
}

impl PwmPort for SimBoard {
    fn set_duty(&mut self, percent: u8) {
        self.duty = DutyCycle::new(i32::from(percent));
    }
}

impl DelayPort for SimBoard {
    fn delay_us(&mut self, us: u32) {
        self.elapsed_us += u64::from(us);
    }
}

impl SerialPort for SimBoard {
    fn serial_write(&mut self, bytes: &[u8]) {
        self.tx.extend_from_slice(bytes);
    }
}
