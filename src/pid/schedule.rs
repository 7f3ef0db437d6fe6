// src/pid/schedule.rs

//! # Gain Scheduling
//!
//! Selects PID gains from the flight regime. Gains are either picked per
//! flight mode or interpolated continuously over the transition progress.

use crate::math::interpolate;
use crate::mode::{FlightMode, TransitionConfig};
use crate::ConfigError;

/// One set of PID gains.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Gains {
    /// Proportional gain.
    pub p: f32,
    /// Integral gain.
    pub i: f32,
    /// Derivative gain.
    pub d: f32,
    /// Largest contribution of the integral term.
    pub i_max: f32,
}

impl Gains {
    /// Creates a gain set.
    pub const fn new(p: f32, i: f32, d: f32, i_max: f32) -> Self {
        Self { p, i, d, i_max }
    }

    /// Component-wise linear blend, `t = 0` is `self` and `t = 1` is `other`.
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        let mix = |a: f32, b: f32| a + (b - a) * t;
        Self {
            p: mix(self.p, other.p),
            i: mix(self.i, other.i),
            d: mix(self.d, other.d),
            i_max: mix(self.i_max, other.i_max),
        }
    }

    /// Bound applied to the raw integrator so that `i * integrator`
    /// stays within `i_max`. Zero when the integral gain is zero.
    pub fn integral_limit(&self) -> f32 {
        let ki = if self.i < 0.0 { -self.i } else { self.i };
        if ki > 0.0 {
            self.i_max / ki
        } else {
            0.0
        }
    }
}

/// How an axis picks its gains.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GainSchedule {
    /// One gain set regardless of regime.
    Fixed(Gains),
    /// Linear blend from `horizontal` at minimum progress to `vertical` at
    /// maximum progress.
    Interpolated {
        /// Gains in forward flight.
        horizontal: Gains,
        /// Gains in hover.
        vertical: Gains,
    },
    /// Discrete gain sets keyed by flight mode.
    ByFlightMode {
        /// Used in `Forward`, `ToForward`, `ToSlow` and `Disabled`.
        forward: Gains,
        /// Used in `Slow` and `ToVertical`.
        slow: Gains,
        /// Used in `Vertical`.
        vertical: Gains,
    },
}

impl GainSchedule {
    /// Gains for the given regime.
    pub fn gains(&self, mode: FlightMode, progress: i16, transition: &TransitionConfig) -> Gains {
        match self {
            GainSchedule::Fixed(gains) => *gains,
            GainSchedule::Interpolated {
                horizontal,
                vertical,
            } => {
                let t = interpolate(
                    f32::from(progress),
                    f32::from(transition.min),
                    f32::from(transition.max),
                    0.0,
                    1.0,
                )
                .clamp(0.0, 1.0);
                horizontal.lerp(vertical, t)
            }
            GainSchedule::ByFlightMode {
                forward,
                slow,
                vertical,
            } => match mode {
                FlightMode::Forward
                | FlightMode::ToForward
                | FlightMode::ToSlow
                | FlightMode::Disabled => *forward,
                FlightMode::Slow | FlightMode::ToVertical => *slow,
                FlightMode::Vertical => *vertical,
            },
        }
    }

    /// Checks that every `i_max` is non-negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid = |gains: &Gains| gains.i_max >= 0.0;
        let ok = match self {
            GainSchedule::Fixed(gains) => valid(gains),
            GainSchedule::Interpolated {
                horizontal,
                vertical,
            } => valid(horizontal) && valid(vertical),
            GainSchedule::ByFlightMode {
                forward,
                slow,
                vertical,
            } => valid(forward) && valid(slow) && valid(vertical),
        };
        if ok {
            Ok(())
        } else {
            Err(ConfigError::Limit)
        }
    }
}
