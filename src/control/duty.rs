//! Duty cycle state shared by every control strategy.

/// Lowest duty the PWM generator accepts.  0 % and 100 % stall the
/// fixed-frequency timer.
pub const DUTY_MIN: u8 = 1;
/// Highest duty the PWM generator accepts.
pub const DUTY_MAX: u8 = 99;
/// Duty at power-on.
pub const DUTY_DEFAULT: u8 = 50;

/// Raw compensator value corresponding to 100 % duty.
pub const DUTY_RAW_FULL_SCALE: i32 = 1024;

/// Percent duty referenced to side 1 (side 2 sees `100 - duty`).
///
/// Always within `DUTY_MIN..=DUTY_MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyCycle(u8);

impl DutyCycle {
    /// Clamp an arbitrary request into the allowed range.
    pub fn new(percent: i32) -> Self {
        Self(percent.clamp(i32::from(DUTY_MIN), i32::from(DUTY_MAX)) as u8)
    }

    /// Duty from a raw compensator output (1024 = 100 %).
    pub fn from_raw(raw: i32) -> Self {
        Self::new(raw.saturating_mul(100) / DUTY_RAW_FULL_SCALE)
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    /// Back-convert to the compensator's raw domain.
    pub fn to_raw(self) -> i32 {
        i32::from(self.0) * DUTY_RAW_FULL_SCALE / 100
    }

    /// One percent up or down, still clamped.
    pub fn nudged(self, delta: i32) -> Self {
        Self::new(i32::from(self.0) + delta)
    }
}

impl Default for DutyCycle {
    fn default() -> Self {
        Self(DUTY_DEFAULT)
    }
}
