// src/mixer.rs

//! # Output Mixer
//!
//! Converts throttle and roll, pitch, yaw commands into per-actuator values.
//! The formula depends on the mixing regime selected by the transition
//! progress. Every mixer applies the low-throttle motor interlock and clamps
//! each actuator to its range. Tilt dependent actuators are rate damped
//! while a transition is under way.
//!
//! The mixing differs per airframe, so each airframe implements [`Mixer`].

pub mod elevon;
pub use elevon::*;
pub mod tilt_rotor;
pub use tilt_rotor::*;

use crate::input::{MAX_INPUT, MIN_INPUT};
use crate::mode::{FlightMode, TransitionConfig};
use crate::ConfigError;

/// Throttle and attitude commands for one cycle.
///
/// Roll, pitch and yaw are PID outputs, or filtered sticks in manual mode.
/// Throttle is always the raw stick value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Command {
    /// Throttle, `MIN_INPUT` is no thrust.
    pub throttle: f32,
    /// Roll command.
    pub roll: f32,
    /// Pitch command.
    pub pitch: f32,
    /// Yaw command.
    pub yaw: f32,
}

impl Default for Command {
    fn default() -> Self {
        Self {
            throttle: MIN_INPUT,
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
        }
    }
}

/// Mixing formula family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MixRegime {
    /// Wing-borne mixing: motors differential on yaw.
    Horizontal,
    /// Horizontal formula with flaps trim on the lifting surfaces.
    Intermediate,
    /// Thrust-borne mixing: motors differential on roll.
    Vertical,
}

/// Progress thresholds selecting the mixing regime.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MixRegimeConfig {
    /// First progress value mixed as intermediate.
    pub intermediate_from: i16,
    /// First progress value mixed as vertical.
    pub vertical_from: i16,
}

impl MixRegimeConfig {
    /// Regime for a progress value.
    pub fn regime(&self, progress: i16) -> MixRegime {
        if progress < self.intermediate_from {
            MixRegime::Horizontal
        } else if progress < self.vertical_from {
            MixRegime::Intermediate
        } else {
            MixRegime::Vertical
        }
    }

    /// Checks the thresholds are ordered and within the transition bounds.
    pub fn validate(&self, transition: &TransitionConfig) -> Result<(), ConfigError> {
        let within = |value: i16| transition.min <= value && value <= transition.max;
        if self.intermediate_from > self.vertical_from
            || !within(self.intermediate_from)
            || !within(self.vertical_from)
        {
            return Err(ConfigError::MixThresholds);
        }
        Ok(())
    }
}

/// Normalized limits of one actuator.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActuatorRange {
    /// Lowest value, also the motor value when the interlock applies.
    pub min: f32,
    /// Highest value.
    pub max: f32,
}

impl Default for ActuatorRange {
    fn default() -> Self {
        Self::FULL
    }
}

impl ActuatorRange {
    /// The whole normalized range.
    pub const FULL: Self = Self {
        min: MIN_INPUT,
        max: MAX_INPUT,
    };

    /// Clamps `value` into the range. NaN maps to `min`.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.min
        } else {
            value.clamp(self.min, self.max)
        }
    }

    /// Checks `min <= max`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min <= self.max {
            Ok(())
        } else {
            Err(ConfigError::ActuatorRange)
        }
    }
}

/// Flight regime information the mixers need each cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MixState {
    /// Current flight mode.
    pub flight_mode: FlightMode,
    /// Current transition progress.
    pub progress: i16,
    /// True if progress moved this cycle.
    pub progress_changed: bool,
    /// Transition bounds.
    pub transition: TransitionConfig,
}

impl MixState {
    /// True while tilt dependent actuators must be rate damped: during a
    /// transition, while progress moves, and while disabled, where the tilt
    /// base changes without progress moving.
    pub fn damping(&self) -> bool {
        self.flight_mode.is_transitional()
            || self.flight_mode == FlightMode::Disabled
            || self.progress_changed
    }
}

/// Throttle below `MIN_INPUT + dead_band` counts as no thrust.
pub fn throttle_idle(throttle: f32, dead_band: f32) -> bool {
    throttle < MIN_INPUT + dead_band
}

/// Limits `value` to within `step` of `last`.
pub fn rate_limit(value: f32, last: f32, step: f32) -> f32 {
    let step = if step > 0.0 { step } else { 0.0 };
    if value < last - step {
        last - step
    } else if value > last + step {
        last + step
    } else {
        value
    }
}

/// Airframe specific output mixing.
pub trait Mixer {
    /// Per-actuator output.
    type Output: Copy;

    /// Mixes one cycle's command.
    ///
    /// # Arguments
    /// * `command` - Throttle and roll, pitch, yaw commands for this cycle.
    /// * `state` - Flight mode, transition progress and transition bounds.
    ///
    /// # Returns
    /// Per-actuator values, each clamped to its range. Motors sit at their
    /// minimum while throttle is idle, and tilt dependent actuators move at
    /// most one damping step from the last output while [`MixState::damping`]
    /// holds.
    fn mix(&mut self, command: &Command, state: &MixState) -> Self::Output;

    /// Output of the last call.
    fn last_output(&self) -> Self::Output;

    /// Checks the mixer configuration against the transition bounds.
    fn validate(&self, transition: &TransitionConfig) -> Result<(), ConfigError>;
}
