//! Control law engine.
//!
//! Two strategies share one duty cycle:
//!
//! - [`compensator`]: classical discrete difference equation, fast.
//! - [`gradient`]: sign-of-error duty stepper, slow but model-free.
//!
//! Switching strategy is bumpless: the gradient stepper seeds the
//! compensator's output history after every step, and a switch to the
//! compensator resets its histories around the duty in effect.
//!
//! [`Regulation`] turns averaged sensor readings into the error term fed
//! to whichever strategy is active, including the droop correction that
//! lets parallel converters share load.

pub mod compensator;
pub mod droop;
pub mod drive;
pub mod duty;
pub mod gradient;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use compensator::{Coefficients, Compensator};
use droop::Droop;
use duty::DutyCycle;
use gradient::{GradientDecision, GradientStepper};

/// Which strategy computes the next duty cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ControlMode {
    #[default]
    Gradient,
    Classical,
}

/// Regulated quantity and port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputMode {
    /// Constant voltage at port 1.
    CV1,
    /// Constant current at port 1.
    CC1,
    /// Constant voltage at port 2.
    CV2,
    /// Constant current at port 2.
    CC2,
}

impl OutputMode {
    /// Port (1 or 2) whose terminal is regulated.
    pub fn port(self) -> u8 {
        match self {
            Self::CV1 | Self::CC1 => 1,
            Self::CV2 | Self::CC2 => 2,
        }
    }

    pub fn is_voltage(self) -> bool {
        matches!(self, Self::CV1 | Self::CV2)
    }

    /// Sign relating duty to the regulated quantity.  Duty is referenced
    /// to side 1, so raising it lowers port 1 and raises port 2.
    pub fn direction(self) -> i32 {
        if self.port() == 2 { 1 } else { -1 }
    }
}

/// Averaged raw readings the regulator needs, one per port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortReadings {
    pub voltage: [i32; 2],
    pub current: [i32; 2],
}

/// Closed-loop set point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regulation {
    pub mode: OutputMode,
    /// Target in the raw domain of the regulated quantity.
    pub target_raw: i32,
}

impl Regulation {
    /// Signed control error.  Positive means duty should rise.
    pub fn error(&self, readings: &PortReadings, droop: &Droop) -> i32 {
        let port = usize::from(self.mode.port() - 1);
        let (target, measured) = if self.mode.is_voltage() {
            let target = self.target_raw - droop.voltage_raw(readings.current[port]);
            (target, readings.voltage[port])
        } else {
            (self.target_raw, readings.current[port])
        };
        self.mode.direction() * (target - measured)
    }
}

/// Duty cycle plus both strategies.
#[derive(Debug, Clone)]
pub struct ControlLaw {
    duty: DutyCycle,
    mode: ControlMode,
    compensator: Compensator,
    gradient: GradientStepper,
    droop: Droop,
}

impl ControlLaw {
    pub fn new(
        duty: DutyCycle,
        coeffs: Coefficients,
        settle: u32,
        average: u32,
        droop: Droop,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            duty,
            mode: ControlMode::default(),
            compensator: Compensator::new(coeffs, duty),
            gradient: GradientStepper::new(settle, average)?,
            droop,
        })
    }

    pub fn duty(&self) -> DutyCycle {
        self.duty
    }

    /// Force a duty (clamped).  Returns the value actually applied.
    pub fn set_duty(&mut self, percent: i32) -> DutyCycle {
        self.duty = DutyCycle::new(percent);
        self.duty
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Select a strategy.  Entering classical mode resets the compensator
    /// around the current duty; entering gradient mode primes the stepper
    /// so the next error acts immediately.
    pub fn set_mode(&mut self, mode: ControlMode) {
        if mode == self.mode {
            return;
        }
        match mode {
            ControlMode::Classical => self.compensator.reset(self.duty),
            ControlMode::Gradient => self.gradient.trigger(),
        }
        self.mode = mode;
    }

    pub fn set_coefficients(&mut self, coeffs: Coefficients) {
        self.compensator.configure(coeffs, self.duty);
    }

    pub fn reset_compensator(&mut self) {
        self.compensator.reset(self.duty);
    }

    pub fn set_gradient_counts(&mut self, settle: u32, average: u32) -> Result<(), ConfigError> {
        self.gradient.set_counts(settle, average)
    }

    pub fn trigger_gradient_step(&mut self) {
        self.gradient.trigger();
    }

    pub fn droop(&self) -> &Droop {
        &self.droop
    }

    pub fn droop_mut(&mut self) -> &mut Droop {
        &mut self.droop
    }

    /// One classical evaluation: push `input`, map `y[n]` to a duty.
    pub fn compensate(&mut self, input: i32) -> DutyCycle {
        let raw = self.compensator.step(input);
        self.duty = DutyCycle::from_raw(raw);
        self.duty
    }

    /// One gradient call.  On a completed window the duty moves by at most
    /// one percent and the compensator is seeded with the result.
    pub fn gradient_step(&mut self, error: i32) -> GradientDecision {
        let decision = self.gradient.step(error);
        if decision.completed() {
            self.duty = self.duty.nudged(decision.delta());
            self.compensator.seed_output(self.duty);
        }
        decision
    }

    /// Run the selected strategy on `error`.  Returns the new duty if it
    /// changed.
    pub fn update(&mut self, error: i32) -> Option<DutyCycle> {
        let before = self.duty;
        match self.mode {
            ControlMode::Classical => {
                self.compensate(error);
            }
            ControlMode::Gradient => {
                self.gradient_step(error);
            }
        }
        (self.duty != before).then_some(self.duty)
    }

    pub fn compensator(&self) -> &Compensator {
        &self.compensator
    }

    pub fn gradient(&self) -> &GradientStepper {
        &self.gradient
    }
}
