// src/mixer/tilt_rotor.rs

//! # Tilt-Rotor Mixer
//!
//! Two tilting motors, two ailerons and an elevator. The tilt servos sit at
//! a base position chosen by the flight mode; in vertical flight they also
//! take yaw and pitch.

use super::{rate_limit, throttle_idle, ActuatorRange, Command, MixRegime, MixRegimeConfig, MixState, Mixer};
use crate::input::PulseRange;
use crate::mode::{FlightMode, TransitionConfig};
use crate::ConfigError;

/// Right and left tilt servo positions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TiltPosition {
    /// Right tilt servo.
    pub right: f32,
    /// Left tilt servo.
    pub left: f32,
}

impl TiltPosition {
    /// Creates a tilt position.
    pub const fn new(right: f32, left: f32) -> Self {
        Self { right, left }
    }
}

/// Tilt-rotor mixer settings, in normalized units.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TiltRotorMixerConfig {
    /// Progress thresholds of the mixing regimes.
    pub regime: MixRegimeConfig,
    /// Throttle window above minimum that keeps the motors at minimum.
    pub throttle_dead_band: f32,
    /// Motor yaw differential in forward flight.
    pub forward_yaw_differential: f32,
    /// Motor yaw differential in slow flight.
    pub slow_yaw_differential: f32,
    /// Motor roll differential in vertical flight.
    pub vertical_roll_differential: f32,
    /// Aileron flaps offset in slow flight.
    pub slow_flaps_trim: f32,
    /// Aileron flaps offset in vertical flight.
    pub vertical_flaps_trim: f32,
    /// Tilt servo travel per unit of yaw in vertical flight.
    pub vertical_yaw_tilt: f32,
    /// Tilt servo travel per unit of pitch in vertical flight.
    pub vertical_pitch_tilt: f32,
    /// Tilt offset trimming yaw in vertical flight.
    pub vertical_yaw_trim: f32,
    /// Tilt base in `Forward` and `ToForward`.
    pub forward_tilt: TiltPosition,
    /// Tilt base in `Slow` and `ToSlow`.
    pub slow_tilt: TiltPosition,
    /// Tilt base in `Vertical`, `ToVertical` and `Disabled`.
    pub vertical_tilt: TiltPosition,
    /// Motor range; `min` is the idle value.
    pub motor_range: ActuatorRange,
    /// Tilt servo range.
    pub tilt_range: ActuatorRange,
    /// Aileron range.
    pub aileron_range: ActuatorRange,
    /// Elevator range.
    pub elevator_range: ActuatorRange,
}

impl TiltRotorMixerConfig {
    /// Settings for a transition over `[-time, time]`.
    pub fn with_transition_time(time: i16) -> Self {
        Self {
            regime: MixRegimeConfig {
                intermediate_from: 0,
                vertical_from: time,
            },
            throttle_dead_band: 4.0,
            forward_yaw_differential: 0.5,
            slow_yaw_differential: 0.1,
            vertical_roll_differential: 0.3,
            slow_flaps_trim: -20.0,
            vertical_flaps_trim: -20.0,
            vertical_yaw_tilt: 0.5,
            vertical_pitch_tilt: 0.5,
            vertical_yaw_trim: 8.0,
            forward_tilt: TiltPosition::new(-100.0, 100.0),
            slow_tilt: TiltPosition::new(0.0, 14.0),
            vertical_tilt: TiltPosition::new(70.0, -48.0),
            motor_range: ActuatorRange::FULL,
            tilt_range: ActuatorRange::FULL,
            aileron_range: ActuatorRange {
                min: -60.0,
                max: 60.0,
            },
            elevator_range: ActuatorRange {
                min: -60.0,
                max: 60.0,
            },
        }
    }
}

impl Default for TiltRotorMixerConfig {
    fn default() -> Self {
        Self::with_transition_time(50)
    }
}

/// Tilt-rotor actuator values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TiltRotorOutput {
    /// Right motor.
    pub right_motor: f32,
    /// Left motor.
    pub left_motor: f32,
    /// Right tilt servo.
    pub right_tilt: f32,
    /// Left tilt servo.
    pub left_tilt: f32,
    /// Right aileron.
    pub right_aileron: f32,
    /// Left aileron.
    pub left_aileron: f32,
    /// Elevator.
    pub elevator: f32,
}

impl TiltRotorOutput {
    /// Pulsewidths in field order, one range per actuator.
    pub fn to_pulses(&self, ranges: &[PulseRange; 7]) -> [u16; 7] {
        let values = [
            self.right_motor,
            self.left_motor,
            self.right_tilt,
            self.left_tilt,
            self.right_aileron,
            self.left_aileron,
            self.elevator,
        ];
        let mut pulses = [0; 7];
        for ((pulse, value), range) in pulses.iter_mut().zip(values).zip(ranges) {
            *pulse = range.to_pulse(value);
        }
        pulses
    }
}

/// Tilt-rotor mixer state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiltRotorMixer {
    config: TiltRotorMixerConfig,
    last: Option<TiltRotorOutput>,
}

impl TiltRotorMixer {
    /// Creates a mixer with no output history.
    pub fn new(config: TiltRotorMixerConfig) -> Self {
        Self { config, last: None }
    }

    /// Mixer configuration.
    pub fn config(&self) -> &TiltRotorMixerConfig {
        &self.config
    }

    fn tilt_base(&self, mode: FlightMode) -> TiltPosition {
        match mode {
            FlightMode::Forward | FlightMode::ToForward => self.config.forward_tilt,
            FlightMode::Slow | FlightMode::ToSlow => self.config.slow_tilt,
            FlightMode::Vertical | FlightMode::ToVertical | FlightMode::Disabled => {
                self.config.vertical_tilt
            }
        }
    }

    /// Largest tilt change per cycle for the transition segment holding
    /// `progress`. At the midpoint either segment may be finishing, so the
    /// larger step applies.
    fn tilt_step(&self, progress: i16, transition: &TransitionConfig) -> TiltPosition {
        let config = &self.config;
        let forward = segment_step(
            &config.forward_tilt,
            &config.slow_tilt,
            transition.mid - transition.min,
        );
        let vertical = segment_step(
            &config.slow_tilt,
            &config.vertical_tilt,
            transition.max - transition.mid,
        );
        if progress < transition.mid {
            forward
        } else if progress > transition.mid {
            vertical
        } else {
            TiltPosition {
                right: forward.right.max(vertical.right),
                left: forward.left.max(vertical.left),
            }
        }
    }
}

/// Even per-cycle travel between two tilt positions over `cycles` cycles.
fn segment_step(from: &TiltPosition, to: &TiltPosition, cycles: i16) -> TiltPosition {
    let cycles = f32::from(cycles.max(1));
    let distance = |a: f32, b: f32| if a > b { a - b } else { b - a };
    TiltPosition {
        right: distance(to.right, from.right) / cycles,
        left: distance(to.left, from.left) / cycles,
    }
}

impl Mixer for TiltRotorMixer {
    type Output = TiltRotorOutput;

    fn mix(&mut self, command: &Command, state: &MixState) -> TiltRotorOutput {
        let config = &self.config;
        let throttle = command.throttle;
        let base = self.tilt_base(state.flight_mode);

        let mut output = match config.regime.regime(state.progress) {
            MixRegime::Horizontal => TiltRotorOutput {
                right_motor: throttle + config.forward_yaw_differential * command.yaw,
                left_motor: throttle - config.forward_yaw_differential * command.yaw,
                right_tilt: base.right,
                left_tilt: base.left,
                right_aileron: -command.roll,
                left_aileron: -command.roll,
                elevator: -command.pitch,
            },
            MixRegime::Intermediate => TiltRotorOutput {
                right_motor: throttle + config.slow_yaw_differential * command.yaw,
                left_motor: throttle - config.slow_yaw_differential * command.yaw,
                right_tilt: base.right,
                left_tilt: base.left,
                right_aileron: -command.roll + config.slow_flaps_trim,
                left_aileron: -command.roll - config.slow_flaps_trim,
                elevator: -command.pitch,
            },
            MixRegime::Vertical => {
                let yaw_tilt = config.vertical_yaw_tilt * command.yaw;
                let pitch_tilt = config.vertical_pitch_tilt * command.pitch;
                TiltRotorOutput {
                    right_motor: throttle + config.vertical_roll_differential * command.roll,
                    left_motor: throttle - config.vertical_roll_differential * command.roll,
                    right_tilt: base.right - yaw_tilt - pitch_tilt - config.vertical_yaw_trim,
                    left_tilt: base.left - yaw_tilt + pitch_tilt - config.vertical_yaw_trim,
                    right_aileron: config.vertical_flaps_trim,
                    left_aileron: -config.vertical_flaps_trim,
                    elevator: 0.0,
                }
            }
        };

        if throttle_idle(throttle, config.throttle_dead_band) {
            output.right_motor = config.motor_range.min;
            output.left_motor = config.motor_range.min;
        }

        if let (true, Some(last)) = (state.damping(), self.last) {
            let step = self.tilt_step(state.progress, &state.transition);
            output.right_tilt = rate_limit(output.right_tilt, last.right_tilt, step.right);
            output.left_tilt = rate_limit(output.left_tilt, last.left_tilt, step.left);
        }

        let output = TiltRotorOutput {
            right_motor: config.motor_range.clamp(output.right_motor),
            left_motor: config.motor_range.clamp(output.left_motor),
            right_tilt: config.tilt_range.clamp(output.right_tilt),
            left_tilt: config.tilt_range.clamp(output.left_tilt),
            right_aileron: config.aileron_range.clamp(output.right_aileron),
            left_aileron: config.aileron_range.clamp(output.left_aileron),
            elevator: config.elevator_range.clamp(output.elevator),
        };
        self.last = Some(output);
        output
    }

    fn last_output(&self) -> TiltRotorOutput {
        self.last.unwrap_or_default()
    }

    fn validate(&self, transition: &TransitionConfig) -> Result<(), ConfigError> {
        let config = &self.config;
        config.regime.validate(transition)?;
        config.motor_range.validate()?;
        config.tilt_range.validate()?;
        config.aileron_range.validate()?;
        config.elevator_range.validate()?;
        if !(config.throttle_dead_band >= 0.0) {
            return Err(ConfigError::Limit);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    const T: i16 = 50;

    fn state(flight_mode: FlightMode, progress: i16) -> MixState {
        MixState {
            flight_mode,
            progress,
            progress_changed: false,
            transition: TransitionConfig::discrete(T),
        }
    }

    fn command(throttle: f32, roll: f32, pitch: f32, yaw: f32) -> Command {
        Command {
            throttle,
            roll,
            pitch,
            yaw,
        }
    }

    /// Test forward flight mixing.
    #[test]
    fn test_tilt_rotor_forward_mix() {
        let mut mixer = TiltRotorMixer::new(TiltRotorMixerConfig::default());
        let output = mixer.mix(&command(0.0, 10.0, 20.0, 30.0), &state(FlightMode::Forward, -T));
        assert!(value_close(15.0, output.right_motor));
        assert!(value_close(-15.0, output.left_motor));
        assert!(value_close(-10.0, output.right_aileron));
        assert!(value_close(-10.0, output.left_aileron));
        assert!(value_close(-20.0, output.elevator));
        assert!(value_close(-100.0, output.right_tilt));
        assert!(value_close(100.0, output.left_tilt));
    }

    /// Test slow flight mixing adds the flaps trim.
    #[test]
    fn test_tilt_rotor_slow_mix() {
        let mut mixer = TiltRotorMixer::new(TiltRotorMixerConfig::default());
        let output = mixer.mix(&command(0.0, 10.0, 0.0, 30.0), &state(FlightMode::Slow, 0));
        assert!(value_close(3.0, output.right_motor));
        assert!(value_close(-3.0, output.left_motor));
        assert!(value_close(-30.0, output.right_aileron));
        assert!(value_close(10.0, output.left_aileron));
        assert!(value_close(0.0, output.right_tilt));
        assert!(value_close(14.0, output.left_tilt));
    }

    /// Test vertical mixing moves the tilt servos with yaw and pitch.
    #[test]
    fn test_tilt_rotor_vertical_mix() {
        let mut mixer = TiltRotorMixer::new(TiltRotorMixerConfig::default());
        let output = mixer.mix(&command(0.0, 10.0, 20.0, 4.0), &state(FlightMode::Vertical, T));
        assert!(value_close(3.0, output.right_motor));
        assert!(value_close(-3.0, output.left_motor));
        // 70 - 2 - 10 - 8
        assert!(value_close(50.0, output.right_tilt));
        // -48 - 2 + 10 - 8
        assert!(value_close(-48.0, output.left_tilt));
        assert!(value_close(-20.0, output.right_aileron));
        assert!(value_close(20.0, output.left_aileron));
        assert!(value_close(0.0, output.elevator));
    }

    /// Test the motor interlock for every regime and full attitude commands.
    #[test]
    fn test_tilt_rotor_interlock() {
        let mut mixer = TiltRotorMixer::new(TiltRotorMixerConfig::default());
        for (mode, progress) in [
            (FlightMode::Forward, -T),
            (FlightMode::Slow, 0),
            (FlightMode::Vertical, T),
        ] {
            for roll in [-100.0, 100.0] {
                let output = mixer.mix(&command(-100.0, roll, 100.0, 100.0), &state(mode, progress));
                assert_eq!(-100.0, output.right_motor);
                assert_eq!(-100.0, output.left_motor);
            }
        }
        let output = mixer.mix(&command(-97.0, 100.0, 0.0, 0.0), &state(FlightMode::Vertical, T));
        assert_eq!(-100.0, output.right_motor, "Inside the dead band motors stay idle.");
    }

    /// Test that outputs are clamped to their ranges.
    #[test]
    fn test_tilt_rotor_clamps() {
        let mut mixer = TiltRotorMixer::new(TiltRotorMixerConfig::default());
        let output = mixer.mix(&command(100.0, -100.0, 100.0, 100.0), &state(FlightMode::Forward, -T));
        assert!(value_close(100.0, output.right_motor));
        assert!(value_close(60.0, output.right_aileron));
        assert!(value_close(-60.0, output.elevator));
    }

    /// Test tilt damping while moving from forward to slow flight.
    #[test]
    fn test_tilt_rotor_transition_damping() {
        let mut mixer = TiltRotorMixer::new(TiltRotorMixerConfig::default());
        let cmd = command(0.0, 0.0, 0.0, 0.0);
        mixer.mix(&cmd, &state(FlightMode::Forward, -T));

        let mut last = mixer.last_output().right_tilt;
        let mut progress = -T;
        // forward to slow: 100 units over 50 cycles
        while progress < 0 {
            progress += 1;
            let mut mix_state = state(FlightMode::ToSlow, progress);
            mix_state.progress_changed = true;
            let output = mixer.mix(&cmd, &mix_state);
            assert!(value_near(last + 2.0, output.right_tilt, 1e-3));
            last = output.right_tilt;
        }
        assert!(value_near(0.0, last, 1e-3));
    }

    /// Test the tilt servos travel at the damping rate after being disabled
    /// in forward flight.
    #[test]
    fn test_tilt_rotor_disabled_damping() {
        let mut mixer = TiltRotorMixer::new(TiltRotorMixerConfig::default());
        let cmd = command(-100.0, 0.0, 0.0, 0.0);
        mixer.mix(&cmd, &state(FlightMode::Forward, -T));

        let output = mixer.mix(&cmd, &state(FlightMode::Disabled, -T));
        assert!(value_near(-98.0, output.right_tilt, 1e-3));
        assert!(value_near(100.0 - 86.0 / 50.0, output.left_tilt, 1e-3));

        let mut last = output;
        for _ in 0..20 {
            let output = mixer.mix(&cmd, &state(FlightMode::Disabled, -T));
            assert!((output.right_tilt - last.right_tilt).abs() <= 2.0 + 1e-3);
            assert!((output.left_tilt - last.left_tilt).abs() <= 2.0 + 1e-3);
            last = output;
        }
    }

    /// Test pulse conversion order.
    #[test]
    fn test_tilt_rotor_pulses() {
        let output = TiltRotorOutput {
            right_motor: -100.0,
            left_motor: 100.0,
            elevator: 50.0,
            ..TiltRotorOutput::default()
        };
        let pulses = output.to_pulses(&[PulseRange::STANDARD; 7]);
        assert_eq!([1000, 2000, 1500, 1500, 1500, 1500, 1750], pulses);
    }

    /// Test validation of the regime thresholds.
    #[test]
    fn test_tilt_rotor_validation() {
        let mixer = TiltRotorMixer::new(TiltRotorMixerConfig::with_transition_time(60));
        assert_eq!(
            Err(ConfigError::MixThresholds),
            mixer.validate(&TransitionConfig::discrete(T))
        );
        let mixer = TiltRotorMixer::new(TiltRotorMixerConfig::default());
        assert_eq!(Ok(()), mixer.validate(&TransitionConfig::discrete(T)));
    }
}
