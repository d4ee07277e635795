//! NTC thermistor temperature (NCP15WF104F03RC, 100 kOhm divider).
//!
//! The divider is non-linear, so readings are mapped through a lookup
//! table of `(raw, °C)` breakpoints with piecewise-linear interpolation.
//!
//! ## Edge policy
//!
//! Below the first breakpoint the first segment's slope is extended
//! downward; at or above the last breakpoint the last segment's slope is
//! extended upward.  Out-of-table readings are therefore extrapolated,
//! not clamped, so a runaway heatsink still reads as hotter than 100 °C.

/// One lookup breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breakpoint {
    pub raw: i32,
    pub celsius: i32,
}

const fn bp(raw: i32, celsius: i32) -> Breakpoint {
    Breakpoint { raw, celsius }
}

/// Raw reading vs. temperature, strictly increasing in both columns.
pub const THERMISTOR_TABLE: [Breakpoint; 14] = [
    bp(139, 10),
    bp(211, 20),
    bp(301, 30),
    bp(404, 40),
    bp(510, 50),
    bp(612, 60),
    bp(658, 65),
    bp(701, 70),
    bp(740, 75),
    bp(776, 80),
    bp(807, 85),
    bp(835, 90),
    bp(859, 95),
    bp(880, 100),
];

/// Index of the lower breakpoint of the segment used for `x`, given a key
/// extractor over the table.  Always in `0..len-1`.
fn segment(table: &[Breakpoint], x: i32, key: fn(&Breakpoint) -> i32) -> usize {
    let last = table.len().saturating_sub(2);
    table
        .windows(2)
        .position(|w| x < key(&w[1]))
        .unwrap_or(last)
}

fn lerp(x: i32, x0: i32, x1: i32, y0: i32, y1: i32) -> i32 {
    if x1 == x0 {
        return y0;
    }
    let y = i64::from(y0)
        + (i64::from(x) - i64::from(x0)) * (i64::from(y1) - i64::from(y0))
            / (i64::from(x1) - i64::from(x0));
    y.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Averaged thermistor reading to whole degrees Celsius.
pub fn raw_to_celsius(raw: i32) -> i32 {
    raw_to_celsius_with(&THERMISTOR_TABLE, raw)
}

/// Degrees Celsius back to the raw reading (for threshold setting).
pub fn celsius_to_raw(celsius: i32) -> i32 {
    celsius_to_raw_with(&THERMISTOR_TABLE, celsius)
}

/// Interpolate over an arbitrary table (at least two breakpoints).
pub fn raw_to_celsius_with(table: &[Breakpoint], raw: i32) -> i32 {
    if table.len() < 2 {
        return table.first().map_or(0, |b| b.celsius);
    }
    let i = segment(table, raw, |b| b.raw);
    let (a, b) = (table[i], table[i + 1]);
    lerp(raw, a.raw, b.raw, a.celsius, b.celsius)
}

/// Inverse interpolation over an arbitrary table.
pub fn celsius_to_raw_with(table: &[Breakpoint], celsius: i32) -> i32 {
    if table.len() < 2 {
        return table.first().map_or(0, |b| b.raw);
    }
    let i = segment(table, celsius, |b| b.celsius);
    let (a, b) = (table[i], table[i + 1]);
    lerp(celsius, a.celsius, b.celsius, a.raw, b.raw)
}
