//! Unified error types for the control kernel.
//!
//! The real-time paths (sensor refresh, protection checks, control law,
//! command dispatch) are infallible and report through explicit state.
//! Errors only exist at configuration time, where a board is assembled
//! from a [`BoardConfig`](crate::config::BoardConfig) and compensator
//! coefficients are installed.  All variants are `Copy`.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the kernel funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Configuration rejected before the board was started.
    Config(ConfigError),
    /// A hardware adapter could not drive or read a pin.
    Hardware(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Hardware(msg) => write!(f, "hardware: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Violated configuration preconditions.
///
/// These are checked once at startup (or when coefficients are swapped),
/// never on the per-tick path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Averaging window outside `1..=MAX_WINDOW`.
    WindowOutOfRange(usize),
    /// Averaging window is not a power of two.
    WindowNotPowerOfTwo(usize),
    /// Compensator numerator or denominator has no coefficients.
    EmptyCoefficients,
    /// Compensator has more taps than the history buffers hold.
    TooManyCoefficients(usize),
    /// Leading denominator coefficient is zero (division by zero).
    ZeroLeadingDenominator,
    /// Gradient-descent settle/averaging counts must be at least one.
    InvalidGradientCounts,
    /// A protection limit must be strictly positive.
    NonPositiveLimit(&'static str),
    /// The board profile declares more channels than the bank can hold.
    TooManyChannels(usize),
    /// The control tick period is zero.
    ZeroTickPeriod,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WindowOutOfRange(w) => write!(f, "averaging window {w} out of range"),
            Self::WindowNotPowerOfTwo(w) => write!(f, "averaging window {w} is not a power of two"),
            Self::EmptyCoefficients => write!(f, "compensator coefficients are empty"),
            Self::TooManyCoefficients(n) => write!(f, "compensator has {n} taps, too many"),
            Self::ZeroLeadingDenominator => write!(f, "leading denominator coefficient is zero"),
            Self::InvalidGradientCounts => write!(f, "gradient descent counts must be >= 1"),
            Self::NonPositiveLimit(which) => write!(f, "{which} limit must be positive"),
            Self::TooManyChannels(n) => write!(f, "{n} channels exceed the sensor bank"),
            Self::ZeroTickPeriod => write!(f, "tick period must be non-zero"),
        }
    }
}

impl core::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Kernel-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
