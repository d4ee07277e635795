//! Port traits: the boundary between the control kernel and the board.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ BoardController (domain)
//! ```
//!
//! Hardware adapters (a real MCU HAL, the host simulator, test mocks)
//! implement these traits.  The [`BoardController`](super::service::BoardController)
//! consumes them through generics, so the kernel never touches registers.
//!
//! Every method is immediate-return.  Nothing here may block on I/O; the
//! only intentional wait is [`DelayPort::delay_us`], used for the short
//! protection pulses.

use crate::pins::Pin;

/// Logic level of a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Self::High
    }

    pub fn is_low(self) -> bool {
        self == Self::Low
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}


// ───────────────────────────────────────────────────────────────
// Analog port (hardware → domain)
// ───────────────────────────────────────────────────────────────

pub trait AnalogPort {
    /// One raw 10-bit sample (0–1023) from an analog pin.
    fn read_channel(&mut self, pin: Pin) -> u16;

    /// One raw sample of the internal bandgap reference against the
    /// supply rail.
    fn read_reference(&mut self) -> u16;
}

// ───────────────────────────────────────────────────────────────
// Digital port (domain ↔ hardware)
// ───────────────────────────────────────────────────────────────

pub trait DigitalPort {
    /// Drive `pin` as an output at `level`.
    fn set_output(&mut self, pin: Pin, level: Level);

    /// Stop driving `pin` (high impedance).  External circuitry, such as a
    /// protection latch, takes over the line.
    fn release(&mut self, pin: Pin);

    /// Sample the level currently on `pin`.
    fn read_input(&mut self, pin: Pin) -> Level;
}

// ───────────────────────────────────────────────────────────────
// PWM port (domain → power stage)
// ───────────────────────────────────────────────────────────────

pub trait PwmPort {
    /// Apply a duty cycle in percent.  Callers guarantee `1..=99`.
    fn set_duty(&mut self, percent: u8);
}

// ───────────────────────────────────────────────────────────────
// Delay port
// ───────────────────────────────────────────────────────────────

pub trait DelayPort {
    fn delay_us(&mut self, us: u32);
}

// ───────────────────────────────────────────────────────────────
// Serial port (domain → host)
// ───────────────────────────────────────────────────────────────

pub trait SerialPort {
    /// Queue bytes for transmission.  Must not block.
    fn serial_write(&mut self, bytes: &[u8]);
}

/// Everything a board needs.  Implemented automatically for any type
/// providing all the individual ports.
pub trait BoardHardware: AnalogPort + DigitalPort + PwmPort + DelayPort + SerialPort {}

impl<T> BoardHardware for T where T: AnalogPort + DigitalPort + PwmPort + DelayPort + SerialPort {}
