// src/pid.rs

//! # Gain-Scheduled PID Bank
//!
//! Three attitude controllers, one per axis, sharing one design. Gains are
//! selected each cycle from the flight regime through a [`GainSchedule`].

pub mod axis;
pub use axis::*;
pub mod schedule;
pub use schedule::*;

use crate::filter::{DERIVATIVE_RESPONSE, FIR_TAPS};
use crate::math::{Axes, EulerAttitude};
use crate::mode::{FlightMode, TransitionConfig};
use crate::ConfigError;

/// Gains and trim for one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisConfig {
    /// Gain schedule.
    pub schedule: GainSchedule,
    /// Constant offset added to the error.
    pub trim: f32,
}

impl AxisConfig {
    /// Axis with a gain schedule and no trim.
    pub const fn new(schedule: GainSchedule) -> Self {
        Self {
            schedule,
            trim: 0.0,
        }
    }
}

/// PID bank settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PidConfig {
    /// Roll axis.
    pub roll: AxisConfig,
    /// Pitch axis.
    pub pitch: AxisConfig,
    /// Yaw axis.
    pub yaw: AxisConfig,
    /// Symmetric output limit shared by all axes.
    pub output_limit: f32,
    /// Output on the first call.
    pub initial_output: f32,
    /// FIR tap weights for the derivative term.
    pub derivative_response: [f32; FIR_TAPS],
}

impl Default for PidConfig {
    fn default() -> Self {
        let schedule = GainSchedule::Fixed(Gains::new(1.0, 0.0, 0.0, 0.0));
        Self {
            roll: AxisConfig::new(schedule),
            pitch: AxisConfig::new(schedule),
            yaw: AxisConfig::new(schedule),
            output_limit: 100.0,
            initial_output: 0.0,
            derivative_response: DERIVATIVE_RESPONSE,
        }
    }
}

impl PidConfig {
    /// Checks the output limit and every gain schedule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.output_limit > 0.0) {
            return Err(ConfigError::Limit);
        }
        self.roll.schedule.validate()?;
        self.pitch.schedule.validate()?;
        self.yaw.schedule.validate()
    }

    fn axis_options(&self, axis: &AxisConfig) -> AxisOptions {
        AxisOptions {
            trim: axis.trim,
            angular: true,
            output_limit: self.output_limit,
            initial_output: self.initial_output,
            derivative_response: self.derivative_response,
        }
    }
}

/// Roll, pitch and yaw controllers.
pub struct PidBank {
    config: PidConfig,
    roll: AxisController,
    pitch: AxisController,
    yaw: AxisController,
}

impl PidBank {
    /// Creates a bank whose controllers have not run yet.
    pub fn new(config: PidConfig) -> Self {
        Self {
            roll: AxisController::new(config.axis_options(&config.roll)),
            pitch: AxisController::new(config.axis_options(&config.pitch)),
            yaw: AxisController::new(config.axis_options(&config.yaw)),
            config,
        }
    }

    /// Runs all three axes for this cycle and returns their outputs.
    pub fn update(
        &mut self,
        target: &EulerAttitude,
        attitude: &EulerAttitude,
        mode: FlightMode,
        progress: i16,
        transition: &TransitionConfig,
        time_us: u64,
    ) -> Axes {
        let roll_gains = self.config.roll.schedule.gains(mode, progress, transition);
        let pitch_gains = self.config.pitch.schedule.gains(mode, progress, transition);
        let yaw_gains = self.config.yaw.schedule.gains(mode, progress, transition);

        Axes {
            roll: self.roll.update(target.roll, attitude.roll, &roll_gains, time_us),
            pitch: self
                .pitch
                .update(target.pitch, attitude.pitch, &pitch_gains, time_us),
            yaw: self.yaw.update(target.yaw, attitude.yaw, &yaw_gains, time_us),
        }
    }

    /// Errors of the last update.
    pub fn errors(&self) -> Axes {
        Axes::new(self.roll.error(), self.pitch.error(), self.yaw.error())
    }

    /// Outputs of the last update.
    pub fn outputs(&self) -> Axes {
        Axes::new(self.roll.output(), self.pitch.output(), self.yaw.output())
    }

    /// Bank configuration.
    pub fn config(&self) -> &PidConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn bank_config() -> PidConfig {
        let schedule = GainSchedule::Interpolated {
            horizontal: Gains::new(1.0, 0.5, 0.0, 10.0),
            vertical: Gains::new(3.0, 0.5, 0.0, 10.0),
        };
        PidConfig {
            roll: AxisConfig::new(schedule),
            pitch: AxisConfig::new(schedule),
            yaw: AxisConfig {
                trim: 1.0,
                ..AxisConfig::new(schedule)
            },
            ..PidConfig::default()
        }
    }

    /// Test that the bank is neutral on its first call.
    #[test]
    fn test_pid_bank_first_call_neutral() {
        let mut bank = PidBank::new(bank_config());
        let transition = TransitionConfig::continuous(90);
        let outputs = bank.update(
            &EulerAttitude::new(20.0, -20.0, 5.0),
            &EulerAttitude::default(),
            FlightMode::Forward,
            0,
            &transition,
            0,
        );
        assert_eq!(Axes::default(), outputs);
    }

    /// Test that proportional gains follow the transition progress.
    #[test]
    fn test_pid_bank_scheduled_gains() {
        let config = PidConfig {
            roll: AxisConfig::new(GainSchedule::Interpolated {
                horizontal: Gains::new(1.0, 0.0, 0.0, 0.0),
                vertical: Gains::new(3.0, 0.0, 0.0, 0.0),
            }),
            ..bank_config()
        };
        let mut bank = PidBank::new(config);
        let transition = TransitionConfig::continuous(90);
        let target = EulerAttitude::new(10.0, 0.0, 0.0);
        let level = EulerAttitude::default();
        bank.update(&target, &level, FlightMode::Forward, 0, &transition, 0);
        let outputs = bank.update(&target, &level, FlightMode::Forward, 0, &transition, 20_000);
        assert!(value_close(10.0, outputs.roll));
        let outputs = bank.update(&target, &level, FlightMode::Vertical, 90, &transition, 40_000);
        assert!(value_close(30.0, outputs.roll));
        let outputs = bank.update(&target, &level, FlightMode::Slow, 45, &transition, 60_000);
        assert!(value_close(20.0, outputs.roll));
    }

    /// Test zero error gives zero output and the trim offsets the error.
    #[test]
    fn test_pid_bank_zero_error_and_trim() {
        let mut bank = PidBank::new(bank_config());
        let transition = TransitionConfig::continuous(90);
        let level = EulerAttitude::default();
        for cycle in 0..50 {
            bank.update(&level, &level, FlightMode::Forward, 0, &transition, cycle * 20_000);
        }
        let errors = bank.errors();
        assert!(value_close(0.0, errors.roll));
        assert!(value_close(0.0, bank.outputs().roll));
        assert!(value_close(1.0, errors.yaw));
        assert!(bank.outputs().yaw > 1.0, "Trimmed yaw should integrate.");
    }

    /// Test the output limit under saturating errors.
    #[test]
    fn test_pid_bank_output_limit() {
        let mut bank = PidBank::new(bank_config());
        let transition = TransitionConfig::continuous(90);
        let target = EulerAttitude::new(170.0, -80.0, -179.0);
        let level = EulerAttitude::default();
        for cycle in 0..200 {
            let outputs = bank.update(&target, &level, FlightMode::Vertical, 90, &transition, cycle * 20_000);
            assert!(outputs.roll.abs() <= 100.0);
            assert!(outputs.pitch.abs() <= 100.0);
            assert!(outputs.yaw.abs() <= 100.0);
        }
        assert!(value_close(100.0, bank.outputs().roll));
    }

    /// Test that a non-positive output limit is rejected.
    #[test]
    fn test_pid_config_validation() {
        let config = PidConfig {
            output_limit: 0.0,
            ..PidConfig::default()
        };
        assert_eq!(Err(ConfigError::Limit), config.validate());
        assert_eq!(Ok(()), bank_config().validate());
    }
}
