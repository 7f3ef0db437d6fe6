// src/error.rs

//! Error types.
//!
//! Only setup can fail. The per-cycle pipeline degrades through
//! [`FailureFlags`](crate::FailureFlags) instead of returning errors.

use thiserror::Error;

/// Errors returned by calibration and controller construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The inertial sensor could not be read during calibration.
    #[error("inertial sensor unavailable")]
    SensorUnavailable,
    /// The airframe did not come to rest within the allowed samples.
    #[error("airframe not at rest after {samples} samples")]
    NotAtRest {
        /// Samples read before giving up.
        samples: u32,
    },
    /// The averaged acceleration has no usable direction.
    #[error("accelerometer reads zero gravity")]
    ZeroGravity,
    /// A configuration value violates its invariants.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Configuration invariant violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A switch's low threshold is not below its high threshold.
    #[error("switch thresholds must increase")]
    SwitchThresholds,
    /// Transition bounds are not ordered `min <= mid <= max` with `min < max`.
    #[error("transition bounds must satisfy min <= mid <= max and min < max")]
    TransitionBounds,
    /// Mixing regime thresholds fall outside the transition bounds or are unordered.
    #[error("mix regime thresholds must be ordered and within the transition bounds")]
    MixThresholds,
    /// An output, angle or rate limit is not positive.
    #[error("limits must be positive")]
    Limit,
    /// A filter gain lies outside [0, 1].
    #[error("filter gains must lie in [0, 1]")]
    FilterGain,
    /// Calibration sample counts are zero or inconsistent.
    #[error("calibration sample counts must be non-zero")]
    CalibrationSamples,
    /// An actuator range has its minimum above its maximum.
    #[error("actuator range minimum exceeds maximum")]
    ActuatorRange,
    /// The loop period is not positive.
    #[error("loop period must be positive")]
    LoopPeriod,
}
