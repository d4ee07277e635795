//! Gate drive signal selection.
//!
//! Each gate driver is multiplexed between the PWM signal and an
//! alternate signal.  Holding one side's high-side switch permanently on
//! turns the H-bridge into a plain buck or boost.  The bootstrap
//! capacitor of a held switch slowly discharges, so the alternate signal
//! is pulsed low periodically to recharge it.

/// Which signal drives the gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriveSignal {
    /// Both gate drivers follow the PWM signal.
    #[default]
    Pwm,
    /// Gate driver 1 held high, driver 2 on PWM.
    HoldHigh1,
    /// Gate driver 2 held high, driver 1 on PWM.
    HoldHigh2,
}

impl DriveSignal {
    pub fn is_holding(self) -> bool {
        !matches!(self, Self::Pwm)
    }
}

/// Countdown to the next bootstrap refresh.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    period_ticks: u32,
    remaining: u32,
}

impl Bootstrap {
    /// A period of zero is treated as one (refresh every tick).
    pub fn new(period_ticks: u32) -> Self {
        let period_ticks = period_ticks.max(1);
        Self {
            period_ticks,
            remaining: period_ticks,
        }
    }

    /// Restart the countdown after a refresh pulse.
    pub fn restart(&mut self) {
        self.remaining = self.period_ticks;
    }

    /// Count one tick; true when a refresh pulse is due.  The countdown
    /// restarts itself when it fires.
    pub fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.restart();
            true
        } else {
            false
        }
    }
}
