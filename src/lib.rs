// src/lib.rs

//! # VTOL Flight Core
//!
//! A `no_std`, no-alloc flight-control core for vertical take-off and landing
//! aircraft that transition between thrust-borne hover and wing-borne flight.
//! Two airframes are supported: a tilt-rotor with discrete transition states
//! and a tilting flying wing with a continuous transition.
//!
//! Each control cycle runs the same pipeline:
//!
//! - [`AttitudeEstimator`] integrates gyro rates into a quaternion attitude.
//! - [`ModeStateMachine`] decodes the mode switches, applies the fail-safe
//!   policy and advances the transition progress one step at a time.
//! - [`TargetGenerator`] turns filtered sticks into a target attitude.
//! - [`PidBank`] runs gain-scheduled roll, pitch and yaw controllers.
//! - A [`Mixer`] produces actuator values for the airframe.
//!
//! [`FlightController`] owns every stage and runs them in order. Hardware
//! access stays with the caller: radio and IMU readings go in as a
//! [`CycleInput`], normalized actuator values come out.

#![no_std]
#![deny(missing_docs)]

mod fmt;

pub mod config;
pub mod controller;
pub mod error;
pub mod estimator;
pub mod filter;
pub mod input;
pub mod math;
pub mod mixer;
pub mod mode;
pub mod number;
pub mod pid;
pub mod target;

#[doc(inline)]
pub use config::FlightControllerConfig;
#[doc(inline)]
pub use controller::{CycleInput, FlightController, Telemetry};
#[doc(inline)]
pub use error::{ConfigError, Error};
#[doc(inline)]
pub use estimator::{AttitudeEstimator, ImuSample, InertialSensor};
#[doc(inline)]
pub use input::StickInput;
#[doc(inline)]
pub use math::{Axes, EulerAttitude, Quaternion, Vector3};
#[doc(inline)]
pub use mixer::{Command, ElevonMixer, Mixer, TiltRotorMixer};
#[doc(inline)]
pub use mode::{ControlMode, FailureFlags, FlightMode, ModeStateMachine};
#[doc(inline)]
pub use number::Number;
#[doc(inline)]
pub use pid::PidBank;
#[doc(inline)]
pub use target::TargetGenerator;

#[cfg(test)]
mod test_utils;
