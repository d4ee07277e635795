//! Mock board for integration tests.
//!
//! Records every digital, PWM and delay call so tests can assert on the
//! full actuation history without real GPIO.  Analog pins return scripted
//! raw values, and the gate shutdown line emulates the protection latch.

use std::collections::HashMap;

use powerstage::app::ports::{AnalogPort, DelayPort, DigitalPort, Level, PwmPort, SerialPort};
use powerstage::pins::{Pin, converter};

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwCall {
    Set(Pin, Level),
    Release(Pin),
    Duty(u8),
    Delay(u32),
}

// ── MockBoard ─────────────────────────────────────────────────

pub struct MockBoard {
    pub calls: Vec<HwCall>,
    pub analog: HashMap<Pin, u16>,
    pub reference: u16,
    pub tx: Vec<u8>,
    levels: HashMap<Pin, Level>,
    /// Emulate the converter latch on GATESD/PRORESET.
    gate_latch: bool,
    latched: bool,
}

#[allow(dead_code)]
impl MockBoard {
    /// Quiet board: every analog pin at mid-scale, 5001 mV rail.
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            analog: HashMap::new(),
            reference: 225,
            tx: Vec::new(),
            levels: HashMap::new(),
            gate_latch: false,
            latched: false,
        }
    }

    /// Converter board: the gate shutdown line behaves like the latch.
    pub fn converter() -> Self {
        Self {
            gate_latch: true,
            ..Self::new()
        }
    }

    pub fn set_analog(&mut self, pin: Pin, raw: u16) {
        self.analog.insert(pin, raw);
    }

    /// Trip the hardware latch as the protection comparator would.
    pub fn trip_hardware_latch(&mut self) {
        self.latched = true;
    }

    pub fn is_latched(&self) -> bool {
        self.latched
    }

    pub fn level(&self, pin: Pin) -> Option<Level> {
        self.levels.get(&pin).copied()
    }

    pub fn last_duty(&self) -> Option<u8> {
        self.calls.iter().rev().find_map(|c| match c {
            HwCall::Duty(d) => Some(*d),
            _ => None,
        })
    }

    /// Calls touching `pin`, in order.
    pub fn pin_calls(&self, pin: Pin) -> Vec<HwCall> {
        self.calls
            .iter()
            .copied()
            .filter(|c| matches!(c, HwCall::Set(p, _) | HwCall::Release(p) if *p == pin))
            .collect()
    }

    pub fn take_tx(&mut self) -> String {
        String::from_utf8(std::mem::take(&mut self.tx)).unwrap()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl Default for MockBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalogPort for MockBoard {
    fn read_channel(&mut self, pin: Pin) -> u16 {
        self.analog.get(&pin).copied().unwrap_or(512)
    }

    fn read_reference(&mut self) -> u16 {
        self.reference
    }
}

impl DigitalPort for MockBoard {
    fn set_output(&mut self, pin: Pin, level: Level) {
        if self.gate_latch {
            match (pin, level) {
                (converter::GATESD, Level::Low) => self.latched = true,
                (converter::PRORESET, Level::High) => self.latched = false,
                _ => {}
            }
        }
        self.levels.insert(pin, level);
        self.calls.push(HwCall::Set(pin, level));
    }

    /// The external latch keeps holding the last driven level.
    fn release(&mut self, pin: Pin) {
        self.calls.push(HwCall::Release(pin));
    }

    fn read_input(&mut self, pin: Pin) -> Level {
        if self.gate_latch && pin == converter::GATESD {
            return Level::from(!self.latched);
        }
        // Never-driven lines float high.
        self.levels.get(&pin).copied().unwrap_or(Level::High)
    }
}

impl PwmPort for MockBoard {
    fn set_duty(&mut self, percent: u8) {
        self.calls.push(HwCall::Duty(percent));
    }
}

impl DelayPort for MockBoard {
    fn delay_us(&mut self, us: u32) {
        self.calls.push(HwCall::Delay(us));
    }
}

impl SerialPort for MockBoard {
    fn serial_write(&mut self, bytes: &[u8]) {
        self.tx.extend_from_slice(bytes);
    }
}
