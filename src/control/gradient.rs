//! Gradient-descent duty stepper.
//!
//! A slow sign-of-error hill climb.  Each call advances a counter:
//!
//! ```text
//!   call 1 ..= settle                 ignore (plant still settling)
//!   call settle+1 ..= settle+average  accumulate error
//!   call settle+average               mean = acc / samples → step ±1 %
//! ```
//!
//! and the cycle restarts.  A zero mean holds the duty where it is.

use crate::error::ConfigError;

/// What a single call decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientDecision {
    /// Still inside the settle window.
    Settling,
    /// Error recorded, window not complete yet.
    Accumulating,
    /// Window complete, mean error positive.
    StepUp,
    /// Window complete, mean error negative.
    StepDown,
    /// Window complete, mean error zero.
    Hold,
}

impl GradientDecision {
    /// Duty change in percent implied by the decision.
    pub fn delta(self) -> i32 {
        match self {
            Self::StepUp => 1,
            Self::StepDown => -1,
            _ => 0,
        }
    }

    /// True when an averaging window just completed.
    pub fn completed(self) -> bool {
        matches!(self, Self::StepUp | Self::StepDown | Self::Hold)
    }
}

#[derive(Debug, Clone)]
pub struct GradientStepper {
    settle: u32,
    average: u32,
    count: u32,
    samples: u32,
    acc: i64,
}

impl GradientStepper {
    pub fn new(settle: u32, average: u32) -> Result<Self, ConfigError> {
        let mut s = Self {
            settle: 1,
            average: 1,
            count: 0,
            samples: 0,
            acc: 0,
        };
        s.set_counts(settle, average)?;
        Ok(s)
    }

    /// Change the settle and averaging windows.  Restarts the cycle.
    pub fn set_counts(&mut self, settle: u32, average: u32) -> Result<(), ConfigError> {
        if settle == 0 || average == 0 {
            return Err(ConfigError::InvalidGradientCounts);
        }
        self.settle = settle;
        self.average = average;
        self.restart();
        Ok(())
    }

    /// Make the next call complete the window with its error as the only
    /// sample.
    pub fn trigger(&mut self) {
        self.count = self.settle + self.average - 1;
        self.samples = 0;
        self.acc = 0;
    }

    pub fn step(&mut self, error: i32) -> GradientDecision {
        self.count += 1;
        if self.count <= self.settle {
            return GradientDecision::Settling;
        }
        self.acc += i64::from(error);
        self.samples += 1;
        if self.count < self.settle + self.average {
            return GradientDecision::Accumulating;
        }
        let mean = self.acc / i64::from(self.samples.max(1));
        self.restart();
        match mean.signum() {
            1 => GradientDecision::StepUp,
            -1 => GradientDecision::StepDown,
            _ => GradientDecision::Hold,
        }
    }

    fn restart(&mut self) {
        self.count = 0;
        self.samples = 0;
        self.acc = 0;
    }

    pub fn counts(&self) -> (u32, u32) {
        (self.settle, self.average)
    }

    /// Calls made in the current cycle.
    pub fn progress(&self) -> u32 {
        self.count
    }
}
