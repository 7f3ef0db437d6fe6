// src/target.rs

//! # Target Generator
//!
//! Turns filtered stick input into target attitudes according to the
//! control mode:
//!
//! - **Manual**: targets track the estimated attitude, giving zero error.
//! - **Autolevel**: roll and pitch sticks map to angles, yaw is a rate.
//! - **Rate**: every stick is a per-cycle rate added to the target.
//!
//! Integrated targets are kept within a maximum error of the current
//! attitude so they cannot run away while the loop is saturated.

use num_traits::Float;

use crate::filter::{FirFilter, FIR_TAPS, STICK_RESPONSE};
use crate::input::{StickInput, MAX_INPUT, MIN_INPUT};
use crate::math::{interpolate, wrap_angle, Axes, EulerAttitude};
use crate::mode::ControlMode;
use crate::ConfigError;

/// Stick to target scaling in autolevel mode.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AutolevelLimits {
    /// Roll angle at full stick, degrees.
    pub max_roll: f32,
    /// Pitch angle at full stick, degrees.
    pub max_pitch: f32,
    /// Yaw rate at full stick, degrees per cycle.
    pub yaw_rate: f32,
    /// Largest yaw target error allowed, degrees.
    pub max_error: f32,
}

impl Default for AutolevelLimits {
    fn default() -> Self {
        Self {
            max_roll: 40.0,
            max_pitch: 40.0,
            yaw_rate: 2.5,
            max_error: 30.0,
        }
    }
}

/// Stick to target scaling in rate mode.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RateLimits {
    /// Roll rate at full stick, degrees per cycle.
    pub roll: f32,
    /// Pitch rate at full stick, degrees per cycle.
    pub pitch: f32,
    /// Yaw rate at full stick, degrees per cycle.
    pub yaw: f32,
    /// Largest target error allowed, degrees.
    pub max_error: f32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            roll: 1.5,
            pitch: 1.0,
            yaw: 2.5,
            max_error: 30.0,
        }
    }
}

/// Target generator settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetConfig {
    /// Stick values closer than this to center read as center.
    pub dead_zone: f32,
    /// FIR tap weights for the roll, pitch and yaw sticks.
    pub stick_response: [f32; FIR_TAPS],
    /// Autolevel scaling.
    pub autolevel: AutolevelLimits,
    /// Rate scaling.
    pub rate: RateLimits,
    /// Symmetric pitch target limit, degrees.
    pub pitch_limit: f32,
    /// Largest per-cycle target change outside manual mode, unlimited when `None`.
    pub slew_limit: Option<f32>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            dead_zone: 4.0,
            stick_response: STICK_RESPONSE,
            autolevel: AutolevelLimits::default(),
            rate: RateLimits::default(),
            pitch_limit: 60.0,
            slew_limit: None,
        }
    }
}

impl TargetConfig {
    /// Checks that every limit is positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = [
            self.autolevel.max_roll,
            self.autolevel.max_pitch,
            self.autolevel.yaw_rate,
            self.autolevel.max_error,
            self.rate.roll,
            self.rate.pitch,
            self.rate.yaw,
            self.rate.max_error,
            self.pitch_limit,
            self.slew_limit.unwrap_or(1.0),
        ];
        if limits.iter().any(|limit| !(*limit > 0.0)) || !(self.dead_zone >= 0.0) {
            return Err(ConfigError::Limit);
        }
        Ok(())
    }
}

/// Circular distance between two angles in degrees.
fn angular_distance(a: f32, b: f32) -> f32 {
    wrap_angle(a - b).abs()
}

/// Keeps `target` within `offset` degrees of `current`.
///
/// Both bounds `current ± offset` are wrapped. A target at least
/// `2 * offset` from either bound lies outside the window and is moved to
/// the closer bound.
///
/// # Arguments
/// * `target` - The proposed target angle in degrees.
/// * `current` - The current attitude angle in degrees.
/// * `offset` - The largest allowed error in degrees.
///
/// # Returns
/// `target` when it lies within the window, otherwise the circularly closer
/// bound.
pub fn bound_target(target: f32, current: f32, offset: f32) -> f32 {
    let lower = wrap_angle(current - offset);
    let upper = wrap_angle(current + offset);
    let to_lower = angular_distance(target, lower);
    let to_upper = angular_distance(target, upper);
    if to_lower >= 2.0 * offset || to_upper >= 2.0 * offset {
        if to_lower < to_upper {
            lower
        } else {
            upper
        }
    } else {
        target
    }
}

/// Snaps values inside the dead zone to center.
pub fn apply_dead_zone(value: f32, dead_zone: f32) -> f32 {
    if value.abs() < dead_zone {
        0.0
    } else {
        value
    }
}

/// Persistent target generator state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetGenerator {
    config: TargetConfig,
    filters: [FirFilter<f32, FIR_TAPS>; 3],
    filtered: Axes,
    target: EulerAttitude,
    started: bool,
}

impl TargetGenerator {
    /// Creates a generator with empty filter histories.
    pub fn new(config: TargetConfig) -> Self {
        let filter = FirFilter::new(config.stick_response);
        Self {
            config,
            filters: [filter; 3],
            filtered: Axes::default(),
            target: EulerAttitude::default(),
            started: false,
        }
    }

    /// Dead-zones and smooths the roll, pitch and yaw sticks.
    pub fn filter_sticks(&mut self, sticks: &StickInput) -> Axes {
        let dead_zone = self.config.dead_zone;
        let [roll, pitch, yaw] = &mut self.filters;
        self.filtered = Axes {
            roll: roll.calculate(apply_dead_zone(sticks.roll, dead_zone)),
            pitch: pitch.calculate(apply_dead_zone(sticks.pitch, dead_zone)),
            yaw: yaw.calculate(apply_dead_zone(sticks.yaw, dead_zone)),
        };
        self.filtered
    }

    /// Filters `sticks` and computes this cycle's target from the current attitude.
    pub fn update(
        &mut self,
        sticks: &StickInput,
        attitude: &EulerAttitude,
        mode: ControlMode,
    ) -> EulerAttitude {
        let stick = self.filter_sticks(sticks);

        if !self.started {
            self.started = true;
            self.target = *attitude;
            return self.target;
        }

        let previous = self.target;
        let scale = |value: f32, limit: f32| interpolate(value, MIN_INPUT, MAX_INPUT, -limit, limit);

        let mut target = match mode {
            ControlMode::Manual => *attitude,
            ControlMode::Autolevel => {
                let limits = &self.config.autolevel;
                let yaw = previous.yaw + scale(stick.yaw, limits.yaw_rate);
                EulerAttitude {
                    roll: scale(stick.roll, limits.max_roll),
                    pitch: scale(stick.pitch, limits.max_pitch),
                    yaw: bound_target(wrap_angle(yaw), attitude.yaw, limits.max_error),
                }
            }
            ControlMode::Rate => {
                let limits = &self.config.rate;
                let step = |previous: f32, value: f32, rate: f32, current: f32| {
                    let target = wrap_angle(previous + scale(value, rate));
                    bound_target(target, current, limits.max_error)
                };
                EulerAttitude {
                    roll: step(previous.roll, stick.roll, limits.roll, attitude.roll),
                    pitch: step(previous.pitch, stick.pitch, limits.pitch, attitude.pitch),
                    yaw: step(previous.yaw, stick.yaw, limits.yaw, attitude.yaw),
                }
            }
        };

        if mode != ControlMode::Manual {
            if let Some(limit) = self.config.slew_limit {
                let damp = |next: f32, last: f32| {
                    wrap_angle(last + wrap_angle(next - last).clamp(-limit, limit))
                };
                target = EulerAttitude {
                    roll: damp(target.roll, previous.roll),
                    pitch: damp(target.pitch, previous.pitch),
                    yaw: damp(target.yaw, previous.yaw),
                };
            }
        }

        let pitch_limit = self.config.pitch_limit;
        self.target = EulerAttitude {
            roll: wrap_angle(target.roll),
            pitch: target.pitch.clamp(-pitch_limit, pitch_limit),
            yaw: wrap_angle(target.yaw),
        };
        self.target
    }

    /// Target computed on the last update.
    pub fn target(&self) -> EulerAttitude {
        self.target
    }

    /// Sticks filtered on the last update.
    pub fn filtered(&self) -> Axes {
        self.filtered
    }

    /// Generator configuration.
    pub fn config(&self) -> &TargetConfig {
        &self.config
    }
}
