// src/math.rs

//! # Quaternion and Angle Math
//!
//! Pure functions over unit quaternions, vectors and angles in degrees.
//! Nothing in this module keeps state; the attitude estimator owns the
//! persisted orientation and threads it through these helpers.

use num_traits::Float;

/// Norm below which a vector or quaternion is treated as zero.
pub const NORM_EPSILON: f32 = 1e-9;

/// Three dimensional vector, used for gyro rates and accelerations.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vector3 {
    /// X (roll) axis component.
    pub x: f32,
    /// Y (pitch) axis component.
    pub y: f32,
    /// Z (yaw) axis component.
    pub z: f32,
}

impl Vector3 {
    /// The zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Creates a vector from its components.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Returns the magnitude of the vector.
    pub fn norm(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Multiplies every component by `factor`.
    pub fn scale(&self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// Component-wise difference `self - other`.
    pub fn sub(&self, other: &Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    /// Component-wise sum `self + other`.
    pub fn add(&self, other: &Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

/// Orientation expressed as a quaternion `(w, x, y, z)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quaternion {
    /// Scalar part.
    pub w: f32,
    /// X vector part.
    pub x: f32,
    /// Y vector part.
    pub y: f32,
    /// Z vector part.
    pub z: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    /// The identity rotation.
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 0.0);

    /// A board mounted on its side: rotated 90 degrees about the roll axis.
    /// Euler extraction shifts roll so this orientation reads level.
    pub const SIDE_MOUNTED: Self = Self::new(
        core::f32::consts::FRAC_1_SQRT_2,
        core::f32::consts::FRAC_1_SQRT_2,
        0.0,
        0.0,
    );

    /// Creates a quaternion from its components.
    pub const fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// Returns the magnitude of the quaternion.
    pub fn norm(&self) -> f32 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Scales every component by the norm so the result has unit length.
    ///
    /// A degenerate (zero) quaternion normalizes to the identity.
    pub fn normalized(&self) -> Self {
        let l = self.norm();
        if !(l > NORM_EPSILON) || !l.is_finite() {
            return Self::IDENTITY;
        }
        Self::new(self.w / l, self.x / l, self.y / l, self.z / l)
    }

    /// Hamilton product `self * q`, renormalized to unit length.
    pub fn product(&self, q: &Self) -> Self {
        let p = self;
        Self::new(
            p.w * q.w - p.x * q.x - p.y * q.y - p.z * q.z,
            p.w * q.x + p.x * q.w + p.y * q.z - p.z * q.y,
            p.w * q.y - p.x * q.z + p.y * q.w + p.z * q.x,
            p.w * q.z + p.x * q.y - p.y * q.x + p.z * q.w,
        )
        .normalized()
    }

    /// Rotation by `|omega| * dt` radians about the axis `omega / |omega|`.
    ///
    /// `omega` is an angular rate in rad/s. A rate with zero norm yields the
    /// identity rotation.
    pub fn from_angular_rate(omega: &Vector3, dt: f32) -> Self {
        let w_norm = omega.norm();
        if !(w_norm > NORM_EPSILON) {
            return Self::IDENTITY;
        }
        let half = 0.5 * w_norm * dt;
        let s = half.sin() / w_norm;
        Self::new(half.cos(), omega.x * s, omega.y * s, omega.z * s)
    }

    /// Rotates this orientation about the body roll axis by `angle` degrees.
    pub fn rotate_roll(&self, angle: f32) -> Self {
        let half = 0.5 * angle.to_radians();
        self.product(&Self::new(half.cos(), half.sin(), 0.0, 0.0))
    }

    /// Rotates this orientation about the body pitch axis by `angle` degrees.
    pub fn rotate_pitch(&self, angle: f32) -> Self {
        let half = 0.5 * angle.to_radians();
        self.product(&Self::new(half.cos(), 0.0, half.sin(), 0.0))
    }

    /// Roll angle in degrees, in (-180, 180].
    ///
    /// The atan2 branch is shifted by 90 degrees so that
    /// [`Quaternion::SIDE_MOUNTED`] reads zero.
    pub fn roll(&self) -> f32 {
        let q = self;
        let roll = (2.0 * q.x * q.w - 2.0 * q.y * q.z)
            .atan2(1.0 - 2.0 * q.x * q.x - 2.0 * q.z * q.z)
            .to_degrees();
        let shifted = if roll < -90.0 { roll + 270.0 } else { roll - 90.0 };
        wrap_angle(shifted)
    }

    /// Pitch angle in degrees, in [-90, 90].
    pub fn pitch(&self) -> f32 {
        let q = self;
        let s = (2.0 * q.x * q.y + 2.0 * q.z * q.w).clamp(-1.0, 1.0);
        s.asin().to_degrees()
    }

    /// Yaw angle in degrees, in (-180, 180].
    pub fn yaw(&self) -> f32 {
        let q = self;
        let yaw = (2.0 * q.y * q.w - 2.0 * q.x * q.z)
            .atan2(1.0 - 2.0 * q.y * q.y - 2.0 * q.z * q.z)
            .to_degrees();
        wrap_angle(yaw)
    }

    /// Extracts all three Euler angles.
    pub fn euler(&self) -> EulerAttitude {
        EulerAttitude {
            roll: self.roll(),
            pitch: self.pitch(),
            yaw: self.yaw(),
        }
    }
}

/// Roll, pitch and yaw in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EulerAttitude {
    /// Roll angle in degrees.
    pub roll: f32,
    /// Pitch angle in degrees.
    pub pitch: f32,
    /// Yaw angle in degrees.
    pub yaw: f32,
}

impl EulerAttitude {
    /// Creates an attitude from its three angles.
    pub const fn new(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self { roll, pitch, yaw }
    }
}

/// A value per control axis, used for stick commands and PID outputs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Axes {
    /// Roll axis value.
    pub roll: f32,
    /// Pitch axis value.
    pub pitch: f32,
    /// Yaw axis value.
    pub yaw: f32,
}

impl Axes {
    /// Creates a value set from its three axes.
    pub const fn new(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self { roll, pitch, yaw }
    }
}

/// Wraps an angle in degrees into (-180, 180].
pub fn wrap_angle(angle: f32) -> f32 {
    let mut wrapped = angle % 360.0;
    if wrapped > 180.0 {
        wrapped -= 360.0;
    } else if wrapped <= -180.0 {
        wrapped += 360.0;
    }
    wrapped
}

/// Linearly maps `val` from `[min_from, max_from]` onto `[min_to, max_to]`.
///
/// The result is not clamped. An empty source range maps to `min_to`.
pub fn interpolate(val: f32, min_from: f32, max_from: f32, min_to: f32, max_to: f32) -> f32 {
    let span = max_from - min_from;
    if span == 0.0 {
        return min_to;
    }
    ((val - min_from) / span) * (max_to - min_to) + min_to
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    /// Test that the side mounted orientation reads level.
    #[test]
    fn test_side_mounted_reads_level() {
        let attitude = Quaternion::SIDE_MOUNTED.euler();
        assert!(
            vector_close((0.0, 0.0, 0.0), (attitude.roll, attitude.pitch, attitude.yaw)),
            "Side mounted orientation should read zero roll, pitch and yaw."
        );
    }

    /// Test that a zero angular rate produces the identity rotation.
    #[test]
    fn test_zero_rate_is_identity() {
        let rotation = Quaternion::from_angular_rate(&Vector3::ZERO, 0.004);
        assert_eq!(Quaternion::IDENTITY, rotation);
    }

    /// Test that the product rescales every component, including y.
    #[test]
    fn test_product_renormalizes_every_component() {
        let p = Quaternion::new(2.0, 0.0, 0.0, 0.0);
        let q = Quaternion::new(0.0, 0.0, 3.0, 0.0);
        let r = p.product(&q);
        assert!(value_close(1.0, r.norm()), "Product should have unit norm.");
        assert!(value_close(1.0, r.y), "Y component should be divided by the norm.");
    }

    /// Test that the quaternion norm stays at one across many updates.
    #[test]
    fn test_norm_stays_unit_after_updates() {
        let mut q = Quaternion::SIDE_MOUNTED;
        let rates = [
            Vector3::new(1.0, -2.0, 0.5),
            Vector3::ZERO,
            Vector3::new(-7.0, 3.0, 9.0),
            Vector3::new(0.0, 0.0, 1e-12),
        ];
        for i in 0..2000 {
            let rotation = Quaternion::from_angular_rate(&rates[i % rates.len()], 0.004);
            q = q.product(&rotation);
            assert!(
                (q.norm() - 1.0).abs() < 1e-4,
                "Quaternion norm drifted from one."
            );
        }
    }

    /// Test that rotating about the pitch axis reads back as pitch.
    #[test]
    fn test_rotate_pitch_reads_back() {
        let q = Quaternion::IDENTITY.rotate_pitch(30.0);
        // Identity orientation uses the unshifted yaw formula for the pitch axis.
        assert!((q.yaw() - 30.0).abs() < 1e-3, "Rotation about y should read 30 degrees.");
    }

    /// Test that rotating a level board about roll reads back as roll.
    #[test]
    fn test_rotate_roll_reads_back() {
        let q = Quaternion::SIDE_MOUNTED.rotate_roll(20.0);
        assert!((q.roll() - 20.0).abs() < 1e-3, "Roll should read 20 degrees.");
    }

    /// Test the wrap range and idempotence over a sweep of angles.
    #[test]
    fn test_wrap_angle_range_and_idempotence() {
        let mut a = -1000.0;
        while a < 1000.0 {
            let w = wrap_angle(a);
            assert!(-180.0 < w && w <= 180.0, "Wrapped angle out of range.");
            assert_eq!(w, wrap_angle(w), "Wrapping should be idempotent.");
            a += 7.3;
        }
        assert_eq!(180.0, wrap_angle(-180.0));
        assert_eq!(180.0, wrap_angle(180.0));
        assert!(value_close(-170.0, wrap_angle(190.0)));
    }

    /// Test interpolation and the degenerate source range.
    #[test]
    fn test_interpolate() {
        assert!(value_close(20.0, interpolate(50.0, -100.0, 100.0, -40.0, 40.0)));
        assert!(value_close(-40.0, interpolate(-100.0, -100.0, 100.0, -40.0, 40.0)));
        assert!(value_close(3.0, interpolate(5.0, 1.0, 1.0, 3.0, 9.0)));
    }
}
