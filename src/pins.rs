//! Pin assignments for each supported board.
//!
//! Single source of truth: board profiles and the controller reference
//! these constants rather than hard-coding pin numbers.  Numbers follow
//! the ATmega328P Arduino-style numbering (digital 0–13, analog A0 = 14).

/// Pin number as understood by the hardware adapter.
pub type Pin = u8;

pub const A0: Pin = 14;
pub const A1: Pin = 15;
pub const A2: Pin = 16;
pub const A3: Pin = 17;
pub const A6: Pin = 20;
pub const A7: Pin = 21;

// ---------------------------------------------------------------------------
// Bidirectional DC-DC converter
// ---------------------------------------------------------------------------

pub mod converter {
    use super::{A0, A1, A2, A3, A6, A7, Pin};

    /// Alternate gate signal for hold-high operation.
    pub const ALT: Pin = 8;
    /// Gate driver 1 multiplexer. LOW selects PWM, HIGH selects ALT.
    pub const VCTRL1: Pin = 9;
    /// Gate driver 2 multiplexer.
    pub const VCTRL2: Pin = 7;
    /// Pulse HIGH to clear the protection latch.
    pub const PRORESET: Pin = 5;
    /// Open-drain gate shutdown line. Reads LOW while latched; pulled
    /// LOW by firmware to force a shutdown.
    pub const GATESD: Pin = 6;

    pub const V1: Pin = A3;
    pub const V2: Pin = A7;
    pub const I1: Pin = A2;
    pub const I2: Pin = A6;
    pub const T1: Pin = A1;
    pub const T2: Pin = A0;
}

// ---------------------------------------------------------------------------
// Four-channel power distribution panel
// ---------------------------------------------------------------------------

pub mod panel {
    use super::{A0, A1, A2, A3, A7, Pin};

    /// Channel gates.  Driven to switch, released to hand control back to
    /// the hardware overcurrent shutoff.
    pub const CH1: Pin = 9;
    pub const CH2: Pin = 8;
    pub const CH3: Pin = 3;
    pub const CH4: Pin = 7;

    pub const VBUS: Pin = A3;
    pub const I1: Pin = A2;
    pub const I2: Pin = A1;
    pub const I3: Pin = A0;
    pub const I4: Pin = A7;
}

// ---------------------------------------------------------------------------
// Supply-channel controller
// ---------------------------------------------------------------------------

pub mod supply {
    use super::{A0 as ANALOG0, A1 as ANALOG1, A2, A3, A6 as ANALOG6, A7 as ANALOG7, Pin};

    /// Pi 5 V rail enable (active LOW).
    pub const CH_PI: Pin = 5;
    /// 5 V output enable (active LOW).
    pub const CH_5V: Pin = 6;
    /// GPIO header 5 V enable (active LOW).
    pub const CH_GPIO: Pin = 10;
    /// 12 V output enable (active HIGH).
    pub const CH_12V: Pin = 7;

    /// ~48 V input bus.
    pub const V48: Pin = A2;
    /// 12 V bus.
    pub const V12: Pin = A3;

    /// User analog inputs on the GPIO header.
    pub const A0: Pin = ANALOG0;
    pub const A1: Pin = ANALOG1;
    pub const A6: Pin = ANALOG6;
    pub const A7: Pin = ANALOG7;
}
