// src/mixer/elevon.rs

//! # Elevon Mixer
//!
//! Flying wing with two motors, two elevons and a gear channel driving the
//! wing tilt. Without a separate elevator, pitch goes to both elevons.

use super::{rate_limit, throttle_idle, ActuatorRange, Command, MixRegime, MixRegimeConfig, MixState, Mixer};
use crate::input::PulseRange;
use crate::math::interpolate;
use crate::mode::TransitionConfig;
use crate::ConfigError;

/// Elevon mixer settings, in normalized units.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElevonMixerConfig {
    /// Progress thresholds of the mixing regimes.
    pub regime: MixRegimeConfig,
    /// Throttle window above minimum that keeps the motors at minimum.
    pub throttle_dead_band: f32,
    /// Motor yaw differential in horizontal flight.
    pub horizontal_yaw_differential: f32,
    /// Motor roll differential in vertical flight.
    pub vertical_roll_differential: f32,
    /// Elevon offset in the intermediate regime, added right and subtracted left.
    pub flaps_trim: f32,
    /// Motor range; `min` is the idle value.
    pub motor_range: ActuatorRange,
    /// Elevon range.
    pub elevon_range: ActuatorRange,
    /// Gear (tilt) channel range.
    pub gear_range: ActuatorRange,
}

impl ElevonMixerConfig {
    /// Settings for a continuous transition over `[0, max]`, switching to
    /// vertical mixing at the midpoint.
    pub fn with_transition_max(max: i16) -> Self {
        Self {
            regime: MixRegimeConfig {
                intermediate_from: max / 2,
                vertical_from: max / 2,
            },
            throttle_dead_band: 4.0,
            horizontal_yaw_differential: 0.5,
            vertical_roll_differential: 0.3,
            flaps_trim: 0.0,
            motor_range: ActuatorRange::FULL,
            elevon_range: ActuatorRange::FULL,
            gear_range: ActuatorRange::FULL,
        }
    }
}

impl Default for ElevonMixerConfig {
    fn default() -> Self {
        Self::with_transition_max(90)
    }
}

/// Elevon airframe actuator values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElevonOutput {
    /// Right elevon.
    pub right_elevon: f32,
    /// Left elevon.
    pub left_elevon: f32,
    /// Right motor.
    pub right_motor: f32,
    /// Left motor.
    pub left_motor: f32,
    /// Gear channel driving the wing tilt.
    pub gear: f32,
}

impl ElevonOutput {
    /// Pulsewidths in field order, one range per actuator.
    pub fn to_pulses(&self, ranges: &[PulseRange; 5]) -> [u16; 5] {
        [
            ranges[0].to_pulse(self.right_elevon),
            ranges[1].to_pulse(self.left_elevon),
            ranges[2].to_pulse(self.right_motor),
            ranges[3].to_pulse(self.left_motor),
            ranges[4].to_pulse(self.gear),
        ]
    }
}

/// Elevon mixer state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevonMixer {
    config: ElevonMixerConfig,
    last: Option<ElevonOutput>,
}

impl ElevonMixer {
    /// Creates a mixer with no output history.
    pub fn new(config: ElevonMixerConfig) -> Self {
        Self { config, last: None }
    }

    /// Mixer configuration.
    pub fn config(&self) -> &ElevonMixerConfig {
        &self.config
    }

    /// Gear position: minimum below the vertical threshold, then linear in
    /// progress up to maximum.
    fn gear(&self, progress: i16, transition: &TransitionConfig) -> f32 {
        let range = &self.config.gear_range;
        let from = self.config.regime.vertical_from;
        if progress < from {
            range.min
        } else {
            interpolate(
                f32::from(progress),
                f32::from(from),
                f32::from(transition.max),
                range.min,
                range.max,
            )
        }
    }

    fn gear_step(&self, transition: &TransitionConfig) -> f32 {
        let range = &self.config.gear_range;
        let cycles = (transition.max - self.config.regime.vertical_from).max(1);
        (range.max - range.min) / f32::from(cycles)
    }
}

impl Mixer for ElevonMixer {
    type Output = ElevonOutput;

    fn mix(&mut self, command: &Command, state: &MixState) -> ElevonOutput {
        let config = &self.config;
        let throttle = command.throttle;
        let regime = config.regime.regime(state.progress);

        let mut output = match regime {
            MixRegime::Horizontal | MixRegime::Intermediate => ElevonOutput {
                right_elevon: command.pitch + command.roll,
                left_elevon: command.pitch - command.roll,
                right_motor: throttle - config.horizontal_yaw_differential * command.yaw,
                left_motor: throttle + config.horizontal_yaw_differential * command.yaw,
                gear: 0.0,
            },
            MixRegime::Vertical => ElevonOutput {
                right_elevon: command.pitch - command.yaw,
                left_elevon: command.pitch + command.yaw,
                right_motor: throttle - config.vertical_roll_differential * command.roll,
                left_motor: throttle + config.vertical_roll_differential * command.roll,
                gear: 0.0,
            },
        };
        if regime == MixRegime::Intermediate {
            output.right_elevon += config.flaps_trim;
            output.left_elevon -= config.flaps_trim;
        }
        output.gear = self.gear(state.progress, &state.transition);

        if throttle_idle(throttle, config.throttle_dead_band) {
            output.right_motor = config.motor_range.min;
            output.left_motor = config.motor_range.min;
        }

        if let (true, Some(last)) = (state.damping(), self.last) {
            output.gear = rate_limit(output.gear, last.gear, self.gear_step(&state.transition));
        }

        let output = ElevonOutput {
            right_elevon: config.elevon_range.clamp(output.right_elevon),
            left_elevon: config.elevon_range.clamp(output.left_elevon),
            right_motor: config.motor_range.clamp(output.right_motor),
            left_motor: config.motor_range.clamp(output.left_motor),
            gear: config.gear_range.clamp(output.gear),
        };
        self.last = Some(output);
        output
    }

    fn last_output(&self) -> ElevonOutput {
        self.last.unwrap_or_default()
    }

    fn validate(&self, transition: &TransitionConfig) -> Result<(), ConfigError> {
        let config = &self.config;
        config.regime.validate(transition)?;
        config.motor_range.validate()?;
        config.elevon_range.validate()?;
        config.gear_range.validate()?;
        if !(config.throttle_dead_band >= 0.0) {
            return Err(ConfigError::Limit);
        }
        Ok(())
    }
}
