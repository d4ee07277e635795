//! Raw ADC ↔ physical unit conversions.
//!
//! All boards share the same front end: a 120k/10k divider on the voltage
//! sense lines and a 333 mV/A Hall current sensor centred at VCC/2.  Every
//! conversion scales by the live reference voltage `vcc_mv` so a sagging
//! 5 V rail does not skew readings.
//!
//! ```text
//!   mV  = raw · vcc · 13 / 1024          (130k/10k divider)
//!   mA  = raw · vcc ·  3 / 1024          (1000/333 ≈ 3)
//!   raw = mV · 79  / vcc                 (1024 · 10/130 ≈ 79)
//!   raw = mA · 341 / vcc                 (1024 · 333/1000 ≈ 341)
//! ```
//!
//! Integer only.  Intermediates are widened to `i64`.

/// Voltage divider gain numerator, (120k + 10k) / 10k.
pub const DIVIDER_GAIN: i64 = 13;

/// Inverse divider gain scaled to the 10-bit range, 1024 · 10k / 130k.
pub const DIVIDER_INVERSE: i64 = 79;

/// Inverse current sensor sensitivity, 1000 / 333 mV/A.
pub const CURRENT_GAIN: i64 = 3;

/// Current sensor sensitivity scaled to the 10-bit range, 1024 · 333 / 1000.
pub const CURRENT_INVERSE: i64 = 341;

/// ADC full scale.
pub const ADC_FULL_SCALE: i64 = 1024;

fn saturate(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Averaged divider reading to terminal millivolts.
pub fn raw_to_mv(raw: i32, vcc_mv: i32) -> i32 {
    saturate(i64::from(raw) * i64::from(vcc_mv) * DIVIDER_GAIN / ADC_FULL_SCALE)
}

/// Averaged reading to millivolts at the ADC pin (no divider).
pub fn raw_to_adc_mv(raw: i32, vcc_mv: i32) -> i32 {
    saturate(i64::from(raw) * i64::from(vcc_mv) / ADC_FULL_SCALE)
}

/// Signed (midpoint-offset) current reading to milliamps.
pub fn raw_to_ma(raw: i32, vcc_mv: i32) -> i32 {
    saturate(i64::from(raw) * i64::from(vcc_mv) * CURRENT_GAIN / ADC_FULL_SCALE)
}

/// Terminal millivolts to the raw divider domain.
///
/// A zero reference cannot be divided by; it maps to zero.
pub fn mv_to_raw(mv: i32, vcc_mv: i32) -> i32 {
    if vcc_mv == 0 {
        return 0;
    }
    saturate(i64::from(mv) * DIVIDER_INVERSE / i64::from(vcc_mv))
}

/// Milliamps to the signed raw current domain.
pub fn ma_to_raw(ma: i32, vcc_mv: i32) -> i32 {
    if vcc_mv == 0 {
        return 0;
    }
    saturate(i64::from(ma) * CURRENT_INVERSE / i64::from(vcc_mv))
}
