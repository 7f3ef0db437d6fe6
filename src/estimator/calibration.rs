// src/estimator/calibration.rs

//! # Sensor Calibration
//!
//! One-time blocking routine run before the control loop starts. It can
//! wait for the airframe to come to rest, measures the gyro zero-rate bias
//! and references the initial orientation to gravity.

use num_traits::Float;

use super::{AttitudeEstimator, InertialSensor};
use crate::math::{Vector3, NORM_EPSILON};
use crate::{ConfigError, Error};

/// Rest detection settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RestDetection {
    /// Largest sample to sample accelerometer change, per axis, still treated as rest.
    pub threshold: f32,
    /// Consecutive quiet samples required.
    pub samples: u32,
    /// Samples to try before giving up.
    pub max_samples: u32,
}

impl Default for RestDetection {
    fn default() -> Self {
        Self {
            threshold: 0.05,
            samples: 100,
            max_samples: 3000,
        }
    }
}

/// Calibration settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibrationConfig {
    /// Wait for the airframe to be at rest first, skipped when `None`.
    pub wait_for_rest: Option<RestDetection>,
    /// Samples averaged for the gyro bias and the gravity vector.
    pub samples: u32,
    /// Rotate the initial orientation so it matches the measured tilt.
    pub gravity_reference: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            wait_for_rest: Some(RestDetection::default()),
            samples: 500,
            gravity_reference: true,
        }
    }
}

impl CalibrationConfig {
    /// Checks that sample counts are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.samples == 0 {
            return Err(ConfigError::CalibrationSamples);
        }
        if let Some(rest) = self.wait_for_rest {
            if rest.samples == 0 || rest.max_samples < rest.samples {
                return Err(ConfigError::CalibrationSamples);
            }
        }
        Ok(())
    }
}

/// Values measured by [`calibrate`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Calibration {
    /// Gyro zero-rate bias in degrees per second.
    pub gyro_bias: Vector3,
    /// Average acceleration.
    pub gravity: Vector3,
    /// Roll measured from gravity, in degrees.
    pub roll: f32,
    /// Pitch measured from gravity, in degrees.
    pub pitch: f32,
}

/// Blocks until the accelerometer has been quiet for `rest.samples`
/// consecutive samples.
fn wait_for_rest<S: InertialSensor>(sensor: &mut S, rest: &RestDetection) -> Result<(), Error> {
    let mut previous = sensor.read().map_err(|_| Error::SensorUnavailable)?.accel;
    let mut quiet = 0;
    for _ in 0..rest.max_samples {
        let accel = sensor.read().map_err(|_| Error::SensorUnavailable)?.accel;
        let delta = accel.sub(&previous);
        previous = accel;
        if delta.x.abs() < rest.threshold
            && delta.y.abs() < rest.threshold
            && delta.z.abs() < rest.threshold
        {
            quiet += 1;
            if quiet >= rest.samples {
                return Ok(());
            }
        } else {
            if quiet > 0 {
                trace!("rest detection restarted after {} samples", quiet);
            }
            quiet = 0;
        }
    }
    Err(Error::NotAtRest {
        samples: rest.max_samples,
    })
}

/// Runs calibration against `sensor` and applies the result to `estimator`.
///
/// The gyro bias is always applied. With `gravity_reference` the initial
/// orientation is rotated by the measured roll and then the measured pitch.
pub fn calibrate<S: InertialSensor>(
    sensor: &mut S,
    estimator: &mut AttitudeEstimator,
    config: &CalibrationConfig,
) -> Result<Calibration, Error> {
    config.validate()?;
    info!("calibration started");

    if let Some(rest) = config.wait_for_rest {
        wait_for_rest(sensor, &rest)?;
    }

    let mut gyro_sum = Vector3::ZERO;
    let mut accel_sum = Vector3::ZERO;
    for _ in 0..config.samples {
        let sample = sensor.read().map_err(|_| Error::SensorUnavailable)?;
        gyro_sum = gyro_sum.add(&sample.gyro);
        accel_sum = accel_sum.add(&sample.accel);
    }
    let count = 1.0 / config.samples as f32;
    let gyro_bias = gyro_sum.scale(count);
    let gravity = accel_sum.scale(count);

    let level = gravity.sub(&estimator.config().accel_level);
    let norm = level.norm();
    if !(norm > NORM_EPSILON) || !norm.is_finite() {
        return Err(Error::ZeroGravity);
    }
    let roll = (level.y / norm).clamp(-1.0, 1.0).asin().to_degrees();
    let pitch = -(level.x / norm).clamp(-1.0, 1.0).asin().to_degrees();

    estimator.set_gyro_bias(gyro_bias);
    if config.gravity_reference {
        let orientation = estimator
            .config()
            .initial_orientation
            .rotate_roll(roll)
            .rotate_pitch(pitch);
        estimator.set_orientation(orientation);
    }

    info!(
        "calibration finished, gyro bias {} {} {}, roll {} pitch {}",
        gyro_bias.x,
        gyro_bias.y,
        gyro_bias.z,
        roll,
        pitch
    );

    Ok(Calibration {
        gyro_bias,
        gravity,
        roll,
        pitch,
    })
}
