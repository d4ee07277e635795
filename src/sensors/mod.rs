//! Sensor subsystem: per-channel moving averages and unit conversion.
//!
//! Every analog input on a board is a [`SensorChannel`]: a fixed-window
//! circular buffer with a running accumulator.  Channels live in one
//! homogeneous [`SensorBank`] indexed by channel number, so the tick
//! handler refreshes them with a single loop and no per-channel selector.
//!
//! ```text
//!   raw sample ──▶ subtract oldest ──▶ store newest ──▶ add newest ──▶ advance cursor
//!                                                                     │
//!                                              average = acc / W  ◀───┘
//! ```
//!
//! The update is O(1) in time and constant in memory.

pub mod conversions;
pub mod reference;
pub mod temperature;

use heapless::Vec;

use crate::error::ConfigError;

/// Largest supported averaging window.
pub const MAX_WINDOW: usize = 32;

/// Most analog channels any board declares.
pub const MAX_SENSOR_CHANNELS: usize = 8;

/// ADC midpoint used to centre bidirectional (current) samples on zero.
pub const ADC_MIDPOINT: i32 = 512;

/// Largest raw 10-bit sample.
pub const ADC_MAX: u16 = 1023;

/// What physical quantity a channel measures.  Decides the sample
/// offset and the unit conversion used when it is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// Divided-down terminal or bus voltage.
    Voltage,
    /// Hall current sensor centred on the ADC midpoint (signed).
    Current,
    /// Thermistor divider, converted through the lookup table.
    Temperature,
    /// Plain analog input reported as millivolts at the ADC pin.
    Analog,
}

impl SensorKind {
    /// Offset applied to the raw sample before it enters the window.
    pub const fn offset(self) -> i32 {
        match self {
            Self::Current => ADC_MIDPOINT,
            _ => 0,
        }
    }
}

/// Check a window length against the configuration preconditions.
pub fn validate_window(window: usize) -> Result<(), ConfigError> {
    if window == 0 || window > MAX_WINDOW {
        return Err(ConfigError::WindowOutOfRange(window));
    }
    if !window.is_power_of_two() {
        return Err(ConfigError::WindowNotPowerOfTwo(window));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// SensorChannel
// ---------------------------------------------------------------------------

/// Fixed-window moving average over raw samples.
///
/// Invariant: `accumulator` always equals the sum of the first `window`
/// slots of `buffer`.
#[derive(Debug, Clone)]
pub struct SensorChannel {
    buffer: [i32; MAX_WINDOW],
    window: usize,
    accumulator: i32,
    cursor: usize,
    average: i32,
}

impl SensorChannel {
    /// Create a zero-filled channel.
    ///
    /// `window` must be in `1..=MAX_WINDOW`; use [`validate_window`] at
    /// configuration time.  Out-of-range values are clamped here so the
    /// buffer indexing can never leave the array.
    pub fn new(window: usize) -> Self {
        Self {
            buffer: [0; MAX_WINDOW],
            window: window.clamp(1, MAX_WINDOW),
            accumulator: 0,
            cursor: 0,
            average: 0,
        }
    }

    /// Push one sample and return the new integer-truncated average.
    pub fn update(&mut self, sample: i32) -> i32 {
        self.accumulator -= self.buffer[self.cursor];
        self.buffer[self.cursor] = sample;
        self.accumulator += sample;
        self.average = self.accumulator / self.window as i32;
        self.cursor += 1;
        if self.cursor >= self.window {
            self.cursor = 0;
        }
        self.average
    }

    /// Last computed average, without sampling.
    pub fn average(&self) -> i32 {
        self.average
    }

    /// Fill every slot with `sample` (used at startup so the first
    /// averages are not dragged toward zero).
    pub fn prime(&mut self, sample: i32) {
        for _ in 0..self.window {
            self.update(sample);
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn accumulator(&self) -> i32 {
        self.accumulator
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

// ---------------------------------------------------------------------------
// SensorBank
// ---------------------------------------------------------------------------

/// All analog channels of one board, indexed uniformly by channel number.
#[derive(Debug, Clone, Default)]
pub struct SensorBank {
    channels: Vec<SensorChannel, MAX_SENSOR_CHANNELS>,
}

impl SensorBank {
    /// Build a bank from per-channel window lengths.
    pub fn new(windows: &[usize]) -> Result<Self, ConfigError> {
        if windows.len() > MAX_SENSOR_CHANNELS {
            return Err(ConfigError::TooManyChannels(windows.len()));
        }
        let mut channels = Vec::new();
        for &w in windows {
            validate_window(w)?;
            // Capacity was checked above.
            let _ = channels.push(SensorChannel::new(w));
        }
        Ok(Self { channels })
    }

    /// Push a sample into `channel`; returns the new average.
    ///
    /// Out-of-range channel indices are ignored and report zero.
    pub fn update(&mut self, channel: usize, sample: i32) -> i32 {
        self.channels
            .get_mut(channel)
            .map_or(0, |ch| ch.update(sample))
    }

    /// Last average of `channel` (zero for an unknown channel).
    pub fn average(&self, channel: usize) -> i32 {
        self.channels.get(channel).map_or(0, SensorChannel::average)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Largest window in the bank; the number of refreshes needed before
    /// every channel holds only real samples.
    pub fn longest_window(&self) -> usize {
        self.channels
            .iter()
            .map(SensorChannel::window)
            .max()
            .unwrap_or(0)
    }
}
