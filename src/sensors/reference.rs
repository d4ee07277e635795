//! Supply-voltage self-calibration.
//!
//! The ADC reference is the board's own 5 V rail, which drifts with load
//! and source.  Measuring the internal 1.1 V bandgap against that rail
//! gives the rail itself:
//!
//! ```text
//!   vcc_mv = BANDGAP_CONSTANT / bandgap_raw      (1.1 V · 1023 · 1000)
//! ```
//!
//! Several readings are averaged.  A result below the plausibility floor
//! usually means the board is powered from USB, where the bandgap reading
//! is unreliable, so the nominal value is used instead.

/// `1.1 V · 1023 · 1000`, the textbook bandgap scale.
pub const BANDGAP_CONSTANT: i32 = 1_125_300;

/// Bandgap scale trimmed for the supply board's regulator.
pub const BANDGAP_CONSTANT_TRIMMED: i32 = 1_126_400;

/// Readings averaged per calibration.
pub const CALIBRATION_SAMPLES: usize = 4;

/// Results below this are treated as implausible.
pub const PLAUSIBILITY_FLOOR_MV: i32 = 4950;

/// Substitute used when a result is implausible.
pub const NOMINAL_VCC_MV: i32 = 5000;

/// Calibration parameters for one board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceCalibration {
    pub bandgap_constant: i32,
    /// `None` disables the floor (board is always on its own supply).
    pub floor_mv: Option<i32>,
}

impl ReferenceCalibration {
    pub const STANDARD: Self = Self {
        bandgap_constant: BANDGAP_CONSTANT,
        floor_mv: Some(PLAUSIBILITY_FLOOR_MV),
    };

    pub const UNFLOORED: Self = Self {
        bandgap_constant: BANDGAP_CONSTANT_TRIMMED,
        floor_mv: None,
    };

    /// Convert one bandgap reading to millivolts.
    ///
    /// A zero reading would divide by zero and is reported as nominal.
    pub fn reading_to_mv(&self, bandgap_raw: u16) -> i32 {
        if bandgap_raw == 0 {
            return NOMINAL_VCC_MV;
        }
        self.bandgap_constant / i32::from(bandgap_raw)
    }

    /// Average `CALIBRATION_SAMPLES` readings from `read` and apply the
    /// plausibility floor.
    pub fn calibrate(&self, mut read: impl FnMut() -> u16) -> i32 {
        let sum: i32 = (0..CALIBRATION_SAMPLES)
            .map(|_| self.reading_to_mv(read()))
            .sum();
        let vcc = sum / CALIBRATION_SAMPLES as i32;
        match self.floor_mv {
            Some(floor) if vcc < floor => {
                log::debug!("vcc {vcc} mV below floor {floor} mV, using nominal");
                NOMINAL_VCC_MV
            }
            _ => vcc,
        }
    }
}

impl Default for ReferenceCalibration {
    fn default() -> Self {
        Self::STANDARD
    }
}
