// src/number.rs

//! Numeric trait shared by the generic parts of the flight core.
//!
//! The estimator, mixers and PID bank run on `f32`. The FIR smoothing filter is
//! generic so it can also run on fixed-point hardware without an FPU.

use piddiy::Number as PiddiyNumber;

/// Custom trait to encapsulate base number requirements.
pub trait Number: PiddiyNumber {
    /// Clamps generic PartialOrd values within a given range.
    fn clamp(self, min: Self, max: Self) -> Self {
        if self < min {
            min
        } else if max < self {
            max
        } else {
            self
        }
    }
}

impl<T: PiddiyNumber> Number for T {}
