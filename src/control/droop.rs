//! Droop resistance for passive load sharing.
//!
//! Parallel converters share load if each lowers its voltage target in
//! proportion to its output current.  The resistance is stored in the raw
//! ADC domain so the per-tick correction is one multiply and one shift:
//!
//! ```text
//!   r_raw        = DROOP_SCALE · mΩ / DROOP_RATIO
//!   v_droop_raw  = i_raw · r_raw / DROOP_SCALE
//! ```
//!
//! `DROOP_RATIO` folds the current and voltage raw conversions together:
//! `1000 · CURRENT_INVERSE / DIVIDER_INVERSE = 1000 · 341 / 79 ≈ 4316`.

/// Fixed-point scale applied to the stored resistance.
pub const DROOP_SCALE: i32 = 1024;

/// Milliohms per raw-domain unit, times 1000.
pub const DROOP_RATIO: i32 = 4316;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Droop {
    r_raw: i32,
}

impl Droop {
    pub fn from_milliohms(milliohms: i32) -> Self {
        let mut d = Self::default();
        d.set_milliohms(milliohms);
        d
    }

    pub fn set_milliohms(&mut self, milliohms: i32) {
        self.r_raw = (i64::from(DROOP_SCALE) * i64::from(milliohms) / i64::from(DROOP_RATIO)) as i32;
    }

    /// Stored resistance converted back to milliohms (quantised).
    pub fn milliohms(&self) -> i32 {
        (i64::from(self.r_raw) * i64::from(DROOP_RATIO) / i64::from(DROOP_SCALE)) as i32
    }

    pub fn raw(&self) -> i32 {
        self.r_raw
    }

    /// Voltage drop, raw divider domain, for a signed raw output current.
    pub fn voltage_raw(&self, current_raw: i32) -> i32 {
        (i64::from(current_raw) * i64::from(self.r_raw) / i64::from(DROOP_SCALE)) as i32
    }
}
