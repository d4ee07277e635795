//! Classical discrete compensator.
//!
//! Evaluates the difference equation
//!
//! ```text
//!   den[0]·y[n] + den[1]·y[n-1] + … = num[0]·x[n] + num[1]·x[n-1] + …
//!
//!   y[n] = (Σ num[i]·x[n-i] − Σ_{i≥1} den[i]·y[n-i]) / den[0]
//! ```
//!
//! Histories are stored newest-first (`x[0]` is the current input) and are
//! exactly as long as their coefficient vectors.  Coefficients are checked
//! when installed so evaluation never divides by zero.

use heapless::Vec;

use crate::error::ConfigError;

use super::duty::DutyCycle;

/// Most taps either side of the equation may have.
pub const MAX_TAPS: usize = 8;

/// Validated numerator/denominator pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coefficients {
    num: Vec<i32, MAX_TAPS>,
    den: Vec<i32, MAX_TAPS>,
}

impl Coefficients {
    pub fn new(num: &[i32], den: &[i32]) -> Result<Self, ConfigError> {
        if num.is_empty() || den.is_empty() {
            return Err(ConfigError::EmptyCoefficients);
        }
        let taps = num.len().max(den.len());
        if taps > MAX_TAPS {
            return Err(ConfigError::TooManyCoefficients(taps));
        }
        if den[0] == 0 {
            return Err(ConfigError::ZeroLeadingDenominator);
        }
        let num = Vec::from_slice(num).map_err(|()| ConfigError::TooManyCoefficients(taps))?;
        let den = Vec::from_slice(den).map_err(|()| ConfigError::TooManyCoefficients(taps))?;
        Ok(Self { num, den })
    }

    /// `y[n] = x[n]`.
    pub fn identity() -> Self {
        let mut num = Vec::new();
        let mut den = Vec::new();
        let _ = num.push(1);
        let _ = den.push(1);
        Self { num, den }
    }

    pub fn numerator(&self) -> &[i32] {
        &self.num
    }

    pub fn denominator(&self) -> &[i32] {
        &self.den
    }
}

impl Default for Coefficients {
    fn default() -> Self {
        Self::identity()
    }
}

/// Compensator state: coefficients plus input/output histories.
#[derive(Debug, Clone)]
pub struct Compensator {
    coeffs: Coefficients,
    inputs: Vec<i32, MAX_TAPS>,
    outputs: Vec<i32, MAX_TAPS>,
}

impl Compensator {
    /// Install `coeffs` with histories reset around `duty`.
    pub fn new(coeffs: Coefficients, duty: DutyCycle) -> Self {
        let mut c = Self {
            coeffs: Coefficients::identity(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        };
        c.configure(coeffs, duty);
        c
    }

    /// Replace the coefficients.  Histories are resized to match and reset.
    pub fn configure(&mut self, coeffs: Coefficients, duty: DutyCycle) {
        self.coeffs = coeffs;
        self.inputs.clear();
        self.outputs.clear();
        // Lengths were bounded by MAX_TAPS when the coefficients were built.
        let _ = self.inputs.resize(self.coeffs.num.len(), 0);
        let _ = self.outputs.resize(self.coeffs.den.len(), 0);
        self.reset(duty);
    }

    /// Clear inputs and seed every past output with the duty in effect,
    /// so the first evaluation after a strategy switch starts where the
    /// plant already is.
    pub fn reset(&mut self, duty: DutyCycle) {
        self.inputs.iter_mut().for_each(|x| *x = 0);
        let raw = duty.to_raw();
        self.outputs.iter_mut().for_each(|y| *y = raw);
    }

    /// Overwrite the most recent output, e.g. after another strategy moved
    /// the duty cycle.
    pub fn seed_output(&mut self, duty: DutyCycle) {
        if let Some(y) = self.outputs.first_mut() {
            *y = duty.to_raw();
        }
    }

    /// Shift both histories by one and store `input` as `x[n]`.
    pub fn push(&mut self, input: i32) {
        shift(&mut self.inputs);
        shift(&mut self.outputs);
        if let Some(x) = self.inputs.first_mut() {
            *x = input;
        }
    }

    /// Evaluate `y[n]` from the current histories and record it.
    pub fn evaluate(&mut self) -> i32 {
        let mut acc: i64 = self
            .coeffs
            .num
            .iter()
            .zip(self.inputs.iter())
            .map(|(&b, &x)| i64::from(b) * i64::from(x))
            .sum();
        acc -= self
            .coeffs
            .den
            .iter()
            .zip(self.outputs.iter())
            .skip(1)
            .map(|(&a, &y)| i64::from(a) * i64::from(y))
            .sum::<i64>();
        let y = (acc / i64::from(self.coeffs.den[0])).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
        if let Some(slot) = self.outputs.first_mut() {
            *slot = y;
        }
        y
    }

    /// Push `input` and evaluate.
    pub fn step(&mut self, input: i32) -> i32 {
        self.push(input);
        self.evaluate()
    }

    pub fn coefficients(&self) -> &Coefficients {
        &self.coeffs
    }

    pub fn inputs(&self) -> &[i32] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[i32] {
        &self.outputs
    }
}

fn shift(history: &mut [i32]) {
    if history.len() > 1 {
        history.copy_within(..history.len() - 1, 1);
    }
}
