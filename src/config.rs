// src/config.rs

//! # Flight Controller Configuration
//!
//! Aggregates the settings of every pipeline stage. Two presets describe
//! the supported airframes:
//!
//! - [`FlightControllerConfig::tilt_rotor`]: discrete five-state transition
//!   over `[-50, 50]` cycles with gains picked per flight mode.
//! - [`FlightControllerConfig::flying_wing`]: continuous transition over
//!   `[0, 90]` with interpolated gains and the attitude reference rotated
//!   by the transition progress.
//!
//! The mixer is configured separately since its settings are airframe specific.

use crate::estimator::EstimatorConfig;
use crate::mode::{ModeConfig, SwitchThresholds, TransitionConfig};
use crate::pid::{AxisConfig, GainSchedule, Gains, PidConfig};
use crate::target::TargetConfig;
use crate::ConfigError;

/// Flight controller settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlightControllerConfig {
    /// Attitude estimator.
    pub estimator: EstimatorConfig,
    /// Flight and control mode state machine.
    pub mode: ModeConfig,
    /// Target generator.
    pub target: TargetConfig,
    /// PID bank.
    pub pid: PidConfig,
    /// Nominal control loop period in microseconds.
    pub loop_period_us: u32,
    /// Lateness past the period tolerated before a cycle counts as overrun.
    pub overrun_margin_us: u32,
    /// Degrees of attitude reference pitch per unit of transition progress.
    /// The reference is rotated by `-progress * reference_pitch_per_step`.
    pub reference_pitch_per_step: f32,
}

impl Default for FlightControllerConfig {
    fn default() -> Self {
        Self::tilt_rotor()
    }
}

/// Scales gains tuned in microseconds of servo travel to normalized units.
const PULSE_TO_NORMALIZED: f32 = 0.2;

fn pulse_gains(p: f32, i: f32, d: f32, i_max: f32) -> Gains {
    Gains::new(
        p * PULSE_TO_NORMALIZED,
        i * PULSE_TO_NORMALIZED,
        d * PULSE_TO_NORMALIZED,
        i_max * PULSE_TO_NORMALIZED,
    )
}

impl FlightControllerConfig {
    /// Tilt-rotor preset: 50 Hz loop, discrete transition of 50 cycles
    /// each way, gain sets per flight mode.
    pub fn tilt_rotor() -> Self {
        let roll = GainSchedule::ByFlightMode {
            forward: pulse_gains(4.0, 0.0, 0.5, 1.0),
            slow: pulse_gains(4.0, 0.0, 0.5, 1.0),
            vertical: pulse_gains(10.0, 0.0, 4.0, 1.0),
        };
        let pitch = GainSchedule::ByFlightMode {
            forward: pulse_gains(20.0, 0.0, 0.5, 70.0),
            slow: pulse_gains(20.0, 0.0, 0.5, 70.0),
            vertical: pulse_gains(11.0, 0.0, 6.0, 1.0),
        };
        let yaw = GainSchedule::ByFlightMode {
            forward: pulse_gains(20.0, 0.0, 0.1, 1.0),
            slow: pulse_gains(20.0, 0.0, 0.1, 1.0),
            vertical: pulse_gains(8.0, 0.0, 3.0, 1.0),
        };

        Self {
            estimator: EstimatorConfig::default(),
            mode: ModeConfig {
                flight_switch: SwitchThresholds::default(),
                control_switch: SwitchThresholds::default(),
                transition: TransitionConfig::discrete(50),
            },
            target: TargetConfig::default(),
            pid: PidConfig {
                roll: AxisConfig::new(roll),
                pitch: AxisConfig::new(pitch),
                yaw: AxisConfig::new(yaw),
                ..PidConfig::default()
            },
            loop_period_us: 20_000,
            overrun_margin_us: 2_000,
            reference_pitch_per_step: 0.0,
        }
    }

    /// Flying-wing preset: 250 Hz loop, continuous transition over 90
    /// cycles, one degree of wing tilt per cycle, interpolated gains.
    pub fn flying_wing() -> Self {
        let schedule = |horizontal: Gains, vertical: Gains| {
            AxisConfig::new(GainSchedule::Interpolated {
                horizontal,
                vertical,
            })
        };

        Self {
            estimator: EstimatorConfig::default(),
            mode: ModeConfig {
                flight_switch: SwitchThresholds::default(),
                control_switch: SwitchThresholds::default(),
                transition: TransitionConfig::continuous(90),
            },
            target: TargetConfig {
                slew_limit: Some(5.0),
                ..TargetConfig::default()
            },
            pid: PidConfig {
                roll: schedule(Gains::new(1.5, 0.5, 0.05, 20.0), Gains::new(2.5, 0.5, 0.1, 20.0)),
                pitch: schedule(Gains::new(2.0, 0.5, 0.05, 20.0), Gains::new(2.5, 0.5, 0.1, 20.0)),
                yaw: schedule(Gains::new(1.0, 0.0, 0.0, 0.0), Gains::new(2.0, 0.2, 0.05, 10.0)),
                ..PidConfig::default()
            },
            loop_period_us: 4_000,
            overrun_margin_us: 500,
            reference_pitch_per_step: 1.0,
        }
    }

    /// Checks every stage's invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for switch in [&self.mode.flight_switch, &self.mode.control_switch] {
            if !(switch.low < switch.high) {
                return Err(ConfigError::SwitchThresholds);
            }
        }
        let transition = &self.mode.transition;
        if !(transition.min <= transition.mid
            && transition.mid <= transition.max
            && transition.min < transition.max)
        {
            return Err(ConfigError::TransitionBounds);
        }
        if self.loop_period_us == 0 {
            return Err(ConfigError::LoopPeriod);
        }
        if !self.reference_pitch_per_step.is_finite() {
            return Err(ConfigError::Limit);
        }
        self.estimator.validate()?;
        self.target.validate()?;
        self.pid.validate()
    }
}
