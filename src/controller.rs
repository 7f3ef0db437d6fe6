// src/controller.rs

//! # Flight Controller
//!
//! Runs one control cycle through every stage in order:
//!
//! 1. Loop timing and overrun detection.
//! 2. Flight and control mode update, including the fail-safe policy.
//! 3. Attitude estimation, with the reference pitch following the transition.
//! 4. Target generation.
//! 5. PID bank.
//! 6. Output mixing.
//!
//! The controller owns all state. The caller owns the hardware: it reads the
//! receiver and the IMU, calls [`FlightController::cycle`] once per period,
//! and writes the returned actuator values.

use crate::config::FlightControllerConfig;
use crate::estimator::{calibrate, AttitudeEstimator, Calibration, CalibrationConfig, ImuSample, InertialSensor};
use crate::input::StickInput;
use crate::math::{Axes, EulerAttitude};
use crate::mixer::{Command, MixState, Mixer};
use crate::mode::{ControlMode, FailureFlags, FlightMode, ModeStateMachine};
use crate::pid::PidBank;
use crate::target::TargetGenerator;
use crate::Error;

/// Inputs of one control cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleInput {
    /// Timestamp of this cycle in microseconds.
    pub time_us: u64,
    /// Normalized receiver input.
    pub sticks: StickInput,
    /// Inertial sample, `None` if the sensor could not be read.
    pub imu: Option<ImuSample>,
    /// Failures detected by the caller this cycle.
    pub flags: FailureFlags,
}

/// Snapshot of one cycle for logging and ground display.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Telemetry<O> {
    /// Cycle timestamp in microseconds.
    pub time_us: u64,
    /// Seconds since the previous cycle.
    pub dt: f32,
    /// Estimated attitude.
    pub attitude: EulerAttitude,
    /// Target attitude.
    pub target: EulerAttitude,
    /// PID errors.
    pub errors: Axes,
    /// PID outputs.
    pub outputs: Axes,
    /// Command passed to the mixer.
    pub command: Command,
    /// Flight mode.
    pub flight_mode: FlightMode,
    /// Control mode.
    pub control_mode: ControlMode,
    /// Transition progress.
    pub progress: i16,
    /// Failures in effect this cycle.
    pub flags: FailureFlags,
    /// Mixer output.
    pub output: O,
}

impl<O> Telemetry<O> {
    /// True if any failure was in effect.
    pub fn status_alert(&self) -> bool {
        !self.flags.is_empty()
    }
}

/// VTOL flight controller for one airframe mixer.
pub struct FlightController<M: Mixer> {
    config: FlightControllerConfig,
    estimator: AttitudeEstimator,
    modes: ModeStateMachine,
    targets: TargetGenerator,
    pids: PidBank,
    mixer: M,
    last_time_us: Option<u64>,
    telemetry: Telemetry<M::Output>,
}

impl<M: Mixer> FlightController<M> {
    /// Validates `config` against `mixer` and builds the pipeline.
    pub fn new(config: FlightControllerConfig, mixer: M) -> Result<Self, Error> {
        config.validate()?;
        mixer.validate(&config.mode.transition)?;

        let modes = ModeStateMachine::new(config.mode);
        let estimator = AttitudeEstimator::new(config.estimator);
        let attitude = estimator.attitude();
        let telemetry = Telemetry {
            time_us: 0,
            dt: 0.0,
            attitude,
            target: attitude,
            errors: Axes::default(),
            outputs: Axes::default(),
            command: Command::default(),
            flight_mode: modes.flight_mode(),
            control_mode: modes.control_mode(),
            progress: modes.progress(),
            flags: FailureFlags::NONE,
            output: mixer.last_output(),
        };
        info!(
            "flight controller ready, loop period {} us",
            config.loop_period_us
        );

        Ok(Self {
            estimator,
            modes,
            targets: TargetGenerator::new(config.target),
            pids: PidBank::new(config.pid),
            mixer,
            last_time_us: None,
            telemetry,
            config,
        })
    }

    /// Seconds since the previous cycle, and whether the cycle ran late.
    /// The first cycle assumes one nominal period.
    fn loop_timing(&mut self, time_us: u64) -> (f32, bool) {
        let period = u64::from(self.config.loop_period_us);
        let elapsed = match self.last_time_us {
            Some(last) => time_us.saturating_sub(last),
            None => period,
        };
        self.last_time_us = Some(time_us);
        let overrun = elapsed > period + u64::from(self.config.overrun_margin_us);
        (elapsed as f32 * 1e-6, overrun)
    }

    /// Runs one control cycle and returns the actuator values.
    pub fn cycle(&mut self, input: &CycleInput) -> M::Output {
        let (dt, overrun) = self.loop_timing(input.time_us);

        let mut flags = input.flags;
        if overrun {
            warn!("control loop overrun, {} s since last cycle", dt);
            flags.insert(FailureFlags::LOOP_OVERRUN);
        }
        if input.imu.is_none() {
            flags.insert(FailureFlags::IMU_FAILED);
        }

        let state = self.modes.update(&input.sticks, flags);

        let sticks = if state.flight_mode == FlightMode::Disabled
            || flags.contains(FailureFlags::RX_FAILED)
        {
            StickInput::failsafe(
                input.sticks.flight_mode_switch,
                input.sticks.control_mode_switch,
            )
        } else {
            input.sticks
        };

        self.estimator
            .set_reference_pitch(-f32::from(state.progress) * self.config.reference_pitch_per_step);
        let attitude = match input.imu {
            Some(sample) if !flags.contains(FailureFlags::IMU_FAILED) => {
                self.estimator.update(&sample, dt)
            }
            _ => self.estimator.attitude(),
        };

        let target = self.targets.update(&sticks, &attitude, state.control_mode);
        let outputs = self.pids.update(
            &target,
            &attitude,
            state.flight_mode,
            state.progress,
            &self.config.mode.transition,
            input.time_us,
        );

        let command = match state.control_mode {
            ControlMode::Manual => {
                let filtered = self.targets.filtered();
                Command {
                    throttle: sticks.throttle,
                    roll: filtered.roll,
                    pitch: filtered.pitch,
                    yaw: filtered.yaw,
                }
            }
            ControlMode::Rate | ControlMode::Autolevel => Command {
                throttle: sticks.throttle,
                roll: outputs.roll,
                pitch: outputs.pitch,
                yaw: outputs.yaw,
            },
        };

        let output = self.mixer.mix(
            &command,
            &MixState {
                flight_mode: state.flight_mode,
                progress: state.progress,
                progress_changed: state.progress_changed,
                transition: self.config.mode.transition,
            },
        );

        trace!(
            "cycle {}: mode {} progress {} roll {} pitch {} yaw {}",
            input.time_us,
            state.flight_mode,
            state.progress,
            attitude.roll,
            attitude.pitch,
            attitude.yaw
        );

        self.telemetry = Telemetry {
            time_us: input.time_us,
            dt,
            attitude,
            target,
            errors: self.pids.errors(),
            outputs,
            command,
            flight_mode: state.flight_mode,
            control_mode: state.control_mode,
            progress: state.progress,
            flags,
            output,
        };
        output
    }

    /// Calibrates the estimator against `sensor`. Call before the first cycle
    /// with the airframe at rest.
    pub fn calibrate<S: InertialSensor>(
        &mut self,
        sensor: &mut S,
        config: &CalibrationConfig,
    ) -> Result<Calibration, Error> {
        calibrate(sensor, &mut self.estimator, config)
    }

    /// Snapshot of the last cycle.
    pub fn telemetry(&self) -> Telemetry<M::Output> {
        self.telemetry
    }

    /// Attitude estimator.
    pub fn estimator(&self) -> &AttitudeEstimator {
        &self.estimator
    }

    /// Mutable attitude estimator, for applying stored calibration.
    pub fn estimator_mut(&mut self) -> &mut AttitudeEstimator {
        &mut self.estimator
    }

    /// Output mixer.
    pub fn mixer(&self) -> &M {
        &self.mixer
    }

    /// Controller configuration.
    pub fn config(&self) -> &FlightControllerConfig {
        &self.config
    }
}
