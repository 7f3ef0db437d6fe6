// src/estimator.rs

//! # Attitude Estimator
//!
//! Integrates gyro rates into a persisted orientation quaternion and derives
//! roll, pitch and yaw each cycle. An optional complementary blend with the
//! accelerometer tilt bounds long term gyro drift.
//!
//! Sign conventions, body frame:
//! - gyro `x`, `y`, `z` are roll, pitch and yaw rates in degrees per second,
//!   positive `x` and `y` increase roll and pitch, positive `z` decreases yaw
//! - accelerometer tilt reads roll as `asin(ay / |a|)` and pitch as
//!   `-asin(ax / |a|)` after the level offsets are subtracted

use num_traits::Float;

use crate::math::{wrap_angle, EulerAttitude, Quaternion, Vector3, NORM_EPSILON};

pub mod calibration;
pub use calibration::*;

/// One inertial sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImuSample {
    /// Angular rate in degrees per second.
    pub gyro: Vector3,
    /// Linear acceleration in any consistent unit.
    pub accel: Vector3,
}

impl ImuSample {
    /// Creates a sample from its gyro and accelerometer vectors.
    pub const fn new(gyro: Vector3, accel: Vector3) -> Self {
        Self { gyro, accel }
    }
}

/// Source of inertial samples, implemented by the sensor driver.
pub trait InertialSensor {
    /// Driver error type.
    type Error;

    /// Reads the next sample, blocking until one is available.
    fn read(&mut self) -> Result<ImuSample, Self::Error>;
}

/// Per-axis sign inversion of the reported attitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisInvert {
    /// Invert roll.
    pub roll: bool,
    /// Invert pitch.
    pub pitch: bool,
    /// Invert yaw.
    pub yaw: bool,
}

/// Accelerometer drift fusion settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriftFusion {
    /// Weight of the gyro estimate in the blend, in [0, 1].
    pub gain: f32,
    /// Weight of the previous accelerometer tilt in its smoothing filter, in [0, 1].
    pub accel_gain: f32,
}

impl Default for DriftFusion {
    fn default() -> Self {
        Self {
            gain: 0.98,
            accel_gain: 0.9,
        }
    }
}

/// Attitude estimator settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EstimatorConfig {
    /// Orientation at power-on, before any gravity referencing.
    pub initial_orientation: Quaternion,
    /// Accelerometer reading when the airframe is level, minus gravity.
    pub accel_level: Vector3,
    /// Accelerometer drift fusion, disabled when `None`.
    pub drift_fusion: Option<DriftFusion>,
    /// Axis sign inversion applied to the reported attitude.
    pub invert: AxisInvert,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            initial_orientation: Quaternion::SIDE_MOUNTED,
            accel_level: Vector3::ZERO,
            drift_fusion: None,
            invert: AxisInvert::default(),
        }
    }
}

impl EstimatorConfig {
    /// Validates the fusion gains.
    pub fn validate(&self) -> Result<(), crate::ConfigError> {
        if let Some(fusion) = self.drift_fusion {
            let in_range = |gain: f32| (0.0..=1.0).contains(&gain);
            if !in_range(fusion.gain) || !in_range(fusion.accel_gain) {
                return Err(crate::ConfigError::FilterGain);
            }
        }
        Ok(())
    }
}

/// Quaternion attitude estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeEstimator {
    config: EstimatorConfig,
    orientation: Quaternion,
    gyro_bias: Vector3,
    reference_pitch: f32,
    accel_tilt: Option<(f32, f32)>,
    fused: Option<(f32, f32)>,
    last_gyro: (f32, f32),
    attitude: EulerAttitude,
}

impl AttitudeEstimator {
    /// Creates an estimator at its configured initial orientation with no gyro bias.
    pub fn new(config: EstimatorConfig) -> Self {
        let orientation = config.initial_orientation.normalized();
        let euler = orientation.euler();
        let mut estimator = Self {
            config,
            orientation,
            gyro_bias: Vector3::ZERO,
            reference_pitch: 0.0,
            accel_tilt: None,
            fused: None,
            last_gyro: (euler.roll, euler.pitch),
            attitude: EulerAttitude::default(),
        };
        estimator.attitude = estimator.invert(euler);
        estimator
    }

    /// Integrates one sample over `dt` seconds and returns the new attitude.
    pub fn update(&mut self, sample: &ImuSample, dt: f32) -> EulerAttitude {
        let omega = sample.gyro.sub(&self.gyro_bias).scale(core::f32::consts::PI / 180.0);
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        let rotation = Quaternion::from_angular_rate(&omega, dt);
        self.orientation = self.orientation.product(&rotation);

        let reference = if self.reference_pitch != 0.0 {
            self.orientation.rotate_pitch(self.reference_pitch)
        } else {
            self.orientation
        };
        let mut euler = reference.euler();

        if let Some(fusion) = self.config.drift_fusion {
            if let Some((roll_acc, pitch_acc)) = self.accel_tilt(&sample.accel, fusion.accel_gain) {
                let gyro = (euler.roll, euler.pitch);
                let (roll, pitch) = match self.fused {
                    Some((roll, pitch)) => (
                        wrap_angle(roll + wrap_angle(gyro.0 - self.last_gyro.0)),
                        pitch + (gyro.1 - self.last_gyro.1),
                    ),
                    None => gyro,
                };
                let blend = 1.0 - fusion.gain;
                let roll = wrap_angle(roll + blend * wrap_angle(roll_acc - roll));
                let pitch = (pitch + blend * (pitch_acc - pitch)).clamp(-90.0, 90.0);
                self.fused = Some((roll, pitch));
                self.last_gyro = gyro;
                euler.roll = roll;
                euler.pitch = pitch;
            }
        }

        self.attitude = self.invert(euler);
        self.attitude
    }

    /// Smoothed accelerometer tilt, or `None` for a zero acceleration vector.
    fn accel_tilt(&mut self, accel: &Vector3, accel_gain: f32) -> Option<(f32, f32)> {
        let accel = accel.sub(&self.config.accel_level);
        let norm = accel.norm();
        if !(norm > NORM_EPSILON) || !norm.is_finite() {
            return None;
        }
        let roll = (accel.y / norm).clamp(-1.0, 1.0).asin().to_degrees();
        let pitch = -(accel.x / norm).clamp(-1.0, 1.0).asin().to_degrees();
        let tilt = match self.accel_tilt {
            Some((r, p)) => (
                r * accel_gain + roll * (1.0 - accel_gain),
                p * accel_gain + pitch * (1.0 - accel_gain),
            ),
            None => (roll, pitch),
        };
        self.accel_tilt = Some(tilt);
        Some(tilt)
    }

    fn invert(&self, euler: EulerAttitude) -> EulerAttitude {
        let sign = |invert: bool, angle: f32| if invert { wrap_angle(-angle) } else { angle };
        EulerAttitude {
            roll: sign(self.config.invert.roll, euler.roll),
            pitch: sign(self.config.invert.pitch, euler.pitch),
            yaw: sign(self.config.invert.yaw, euler.yaw),
        }
    }

    /// Sets the pitch rotation, in degrees, applied before Euler extraction.
    ///
    /// A tilting wing uses this so level flight reads zero at every
    /// transition position. The persisted orientation is not changed.
    pub fn set_reference_pitch(&mut self, degrees: f32) {
        self.reference_pitch = degrees;
    }

    /// Replaces the orientation, for example after gravity referencing.
    pub fn set_orientation(&mut self, orientation: Quaternion) {
        self.orientation = orientation.normalized();
        self.fused = None;
        let euler = self.orientation.euler();
        self.last_gyro = (euler.roll, euler.pitch);
        self.attitude = self.invert(euler);
    }

    /// Sets the gyro zero-rate bias, in degrees per second.
    pub fn set_gyro_bias(&mut self, bias: Vector3) {
        self.gyro_bias = bias;
    }

    /// Current orientation quaternion.
    pub fn orientation(&self) -> Quaternion {
        self.orientation
    }

    /// Gyro zero-rate bias in use.
    pub fn gyro_bias(&self) -> Vector3 {
        self.gyro_bias
    }

    /// Attitude computed on the last update.
    pub fn attitude(&self) -> EulerAttitude {
        self.attitude
    }

    /// Estimator configuration.
    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }
}
