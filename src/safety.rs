//! Protection interlock.
//!
//! Runs every tick right after the sensor refresh, against averages that
//! are already computed, so a check is a handful of comparisons unless
//! something actually trips.
//!
//! ## Policies
//!
//! - **Latching** (single power path): any breach latches a shutdown with
//!   a reason code.  Only an explicit re-enable clears it.
//!
//!   ```text
//!            breach / user shutdown / hardware latch
//!   Armed ─────────────────────────────────────────▶ Latched(reason)
//!     ▲                                                   │
//!     └──────────────────── re-enable ◀───────────────────┘
//!   ```
//!
//! - **Channel-trip** (independent outputs): a channel breach opens that
//!   channel only; an aggregate breach opens all of them.  There is no
//!   global latch; re-asserting an output re-arms it.
//!
//! Current averages are signed (midpoint already removed), so both
//! policies compare against a symmetric `±limit` band.

use core::fmt;

use log::{error, info};

/// Most current channels a single interlock watches.
pub const MAX_PROTECTED_CHANNELS: usize = 4;

/// True when `avg` lies strictly outside `±limit`.
#[inline]
pub fn exceeds(avg: i32, limit: i32) -> bool {
    avg > limit || avg < -limit
}

// ---------------------------------------------------------------------------
// Shutdown reason
// ---------------------------------------------------------------------------

/// Why the power stage is shut down.  Codes 0–3 are reserved; 4 and up
/// belong to application callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Latched by the protection hardware itself.
    Hardware,
    /// Software shutdown with no specific cause (also the power-on state).
    SoftwareUnlabeled,
    Overcurrent,
    Overtemperature,
    /// Application-defined code, always ≥ 4.
    User(u16),
}

impl ShutdownReason {
    /// First code available to applications.
    pub const FIRST_USER_CODE: i32 = 4;

    pub fn code(self) -> i32 {
        match self {
            Self::Hardware => 0,
            Self::SoftwareUnlabeled => 1,
            Self::Overcurrent => 2,
            Self::Overtemperature => 3,
            Self::User(c) => i32::from(c),
        }
    }

    /// Map a wire code to a reason.  Negative codes are unlabeled;
    /// codes beyond `u16` saturate.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Hardware,
            2 => Self::Overcurrent,
            3 => Self::Overtemperature,
            c if c >= Self::FIRST_USER_CODE => Self::User(c.min(i32::from(u16::MAX)) as u16),
            _ => Self::SoftwareUnlabeled,
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardware => write!(f, "hardware latch"),
            Self::SoftwareUnlabeled => write!(f, "software shutdown"),
            Self::Overcurrent => write!(f, "overcurrent"),
            Self::Overtemperature => write!(f, "overtemperature"),
            Self::User(c) => write!(f, "user shutdown {c}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Thresholds, all in the units the checks compare against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtectionLimits {
    /// Per-channel current amplitude, raw signed domain.
    pub channel_raw: [i32; MAX_PROTECTED_CHANNELS],
    /// Aggregate current amplitude, raw signed domain.
    pub total_raw: Option<i32>,
    /// Thermal ceiling, whole °C.
    pub thermal_c: i32,
}

impl Default for ProtectionLimits {
    fn default() -> Self {
        Self {
            channel_raw: [i32::MAX; MAX_PROTECTED_CHANNELS],
            total_raw: None,
            thermal_c: i32::MAX,
        }
    }
}

// ---------------------------------------------------------------------------
// Latching interlock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterlockState {
    Armed,
    Latched(ShutdownReason),
}

#[derive(Debug, Clone)]
pub struct LatchingInterlock {
    state: InterlockState,
}

impl LatchingInterlock {
    /// Starts latched: the power stage stays off until it is enabled.
    pub fn new() -> Self {
        Self {
            state: InterlockState::Latched(ShutdownReason::SoftwareUnlabeled),
        }
    }

    pub fn state(&self) -> InterlockState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == InterlockState::Armed
    }

    /// Reason code, or −1 while armed.
    pub fn shutdown_code(&self) -> i32 {
        match self.state {
            InterlockState::Armed => -1,
            InterlockState::Latched(r) => r.code(),
        }
    }

    /// Latch with `reason`.  Returns `true` only on the Armed → Latched
    /// transition; an existing latch keeps its original reason.
    pub fn latch(&mut self, reason: ShutdownReason) -> bool {
        if self.is_armed() {
            error!("SHUTDOWN LATCHED: {reason}");
            self.state = InterlockState::Latched(reason);
            true
        } else {
            false
        }
    }

    /// Clear the latch.
    pub fn rearm(&mut self) {
        if let InterlockState::Latched(r) = self.state {
            info!("interlock re-armed (was {r})");
        }
        self.state = InterlockState::Armed;
    }

    /// Evaluate current and temperature channels.
    ///
    /// `currents` yields `(average, limit)` pairs.  Checks are skipped
    /// entirely while latched.  Returns the reason if this call latched.
    pub fn evaluate(
        &mut self,
        currents: impl IntoIterator<Item = (i32, i32)>,
        temperatures_c: impl IntoIterator<Item = i32>,
        thermal_limit_c: i32,
    ) -> Option<ShutdownReason> {
        if !self.is_armed() {
            return None;
        }
        if currents.into_iter().any(|(avg, limit)| exceeds(avg, limit)) {
            self.latch(ShutdownReason::Overcurrent);
            return Some(ShutdownReason::Overcurrent);
        }
        if temperatures_c.into_iter().any(|t| t > thermal_limit_c) {
            self.latch(ShutdownReason::Overtemperature);
            return Some(ShutdownReason::Overtemperature);
        }
        None
    }
}

impl Default for LatchingInterlock {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Channel-trip interlock
// ---------------------------------------------------------------------------

/// Bitmask of output channels, bit `n` = channel `n`.
pub type ChannelMask = u8;

#[derive(Debug, Clone, Default)]
pub struct ChannelTripInterlock {
    tripped: ChannelMask,
}

impl ChannelTripInterlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check every channel and the aggregate.  Returns the channels that
    /// must be opened now (newly tripped ones only).
    pub fn evaluate(&mut self, averages: &[i32], limits: &[i32], total_limit: Option<i32>) -> ChannelMask {
        let n = averages.len().min(limits.len()).min(MAX_PROTECTED_CHANNELS);
        let all: ChannelMask = ((1u16 << n) - 1) as ChannelMask;
        let mut trip: ChannelMask = 0;

        for (i, (&avg, &limit)) in averages.iter().zip(limits).take(n).enumerate() {
            if exceeds(avg, limit) {
                trip |= 1 << i;
            }
        }
        if let Some(total) = total_limit {
            let sum: i32 = averages[..n].iter().sum();
            if exceeds(sum, total) {
                trip = all;
            }
        }

        let fresh = trip & !self.tripped;
        if fresh != 0 {
            error!("CHANNEL TRIP: mask {fresh:#06b}");
            self.tripped |= fresh;
        }
        fresh
    }

    /// Clear the trip flag for `channel` (output re-asserted).
    pub fn rearm(&mut self, channel: usize) {
        if channel < MAX_PROTECTED_CHANNELS {
            self.tripped &= !(1 << channel);
        }
    }

    pub fn tripped(&self) -> ChannelMask {
        self.tripped
    }

    pub fn is_tripped(&self, channel: usize) -> bool {
        channel < MAX_PROTECTED_CHANNELS && self.tripped & (1 << channel) != 0
    }
}

// ---------------------------------------------------------------------------
// Policy selection
// ---------------------------------------------------------------------------

/// The interlock a board runs.
#[derive(Debug, Clone)]
pub enum Interlock {
    Latching(LatchingInterlock),
    ChannelTrip(ChannelTripInterlock),
    /// Sensors are reported but nothing is switched off automatically.
    MonitorOnly,
}

impl Interlock {
    /// Whether the power path may run closed-loop control.
    pub fn allows_control(&self) -> bool {
        match self {
            Self::Latching(l) => l.is_armed(),
            Self::ChannelTrip(_) | Self::MonitorOnly => true,
        }
    }

    /// Reason code for latching boards; −1 otherwise.
    pub fn shutdown_code(&self) -> i32 {
        match self {
            Self::Latching(l) => l.shutdown_code(),
            _ => -1,
        }
    }
}
