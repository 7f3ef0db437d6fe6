// src/pid/axis.rs

//! # Single-Axis Attitude PID
//!
//! This module provides a compute function and control data structure for
//! one attitude axis, and the controller that owns the per-axis state:
//! timing, the derivative filter and the first-call handling.

use crate::filter::{FirFilter, FIR_TAPS};
use crate::math::wrap_angle;
use crate::pid::Gains;
use piddiy::PidController;

/// Control data for the attitude PID compute callback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisControlData {
    /// Error for this cycle, already wrapped and trimmed.
    pub error: f32,
    /// Smoothed derivative of the error.
    pub derivative: f32,
    /// The time delta since the last computation, in seconds.
    pub dt: f32,
    /// Bound on the raw integrator.
    pub integral_limit: f32,
}

/// Attitude PID compute callback.
pub fn compute_axis(
    pid: &mut PidController<f32, AxisControlData>,
    data: AxisControlData,
) -> (f32, f32, f32) {
    let integral = (pid.integral + data.error * data.dt)
        .clamp(-data.integral_limit, data.integral_limit);

    (data.error, integral, data.derivative)
}

/// `target - current` plus `trim`, wrapped into (-180, 180] for angular axes.
pub fn axis_error(target: f32, current: f32, trim: f32, angular: bool) -> f32 {
    let error = target - current;
    if angular {
        wrap_angle(error) + trim
    } else {
        error + trim
    }
}

/// Per-axis settings that do not change with the flight regime.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisOptions {
    /// Constant offset added to the error.
    pub trim: f32,
    /// Wrap the error as an angle.
    pub angular: bool,
    /// Symmetric output limit.
    pub output_limit: f32,
    /// Output returned on the first call.
    pub initial_output: f32,
    /// FIR tap weights for the derivative term.
    pub derivative_response: [f32; FIR_TAPS],
}

impl Default for AxisOptions {
    fn default() -> Self {
        Self {
            trim: 0.0,
            angular: true,
            output_limit: 100.0,
            initial_output: 0.0,
            derivative_response: crate::filter::DERIVATIVE_RESPONSE,
        }
    }
}

/// One axis controller and its persistent state.
pub struct AxisController {
    pid: PidController<f32, AxisControlData>,
    derivative_filter: FirFilter<f32, FIR_TAPS>,
    options: AxisOptions,
    last_time_us: Option<u64>,
    output: f32,
}

impl AxisController {
    /// Creates a controller that has not run yet.
    pub fn new(options: AxisOptions) -> Self {
        let mut pid = PidController::new();
        pid.compute_fn(compute_axis)
            .set_point(0.0)
            .kp(0.0)
            .ki(0.0)
            .kd(0.0);

        Self {
            pid,
            derivative_filter: FirFilter::new(options.derivative_response),
            options,
            last_time_us: None,
            output: options.initial_output,
        }
    }

    /// Computes the output for this cycle.
    ///
    /// `dt` is measured between successive `time_us` stamps. The first call
    /// only seeds the error history and returns the initial output. A stamp
    /// that does not advance repeats the previous output.
    ///
    /// # Arguments
    /// * `target` - The set point.
    /// * `current` - The measured value.
    /// * `gains` - The gains scheduled for this cycle.
    /// * `time_us` - The timestamp of this call in microseconds.
    ///
    /// # Returns
    /// The controller output, clamped to `±output_limit`.
    pub fn update(&mut self, target: f32, current: f32, gains: &Gains, time_us: u64) -> f32 {
        let error = axis_error(target, current, self.options.trim, self.options.angular);

        let last_time_us = match self.last_time_us {
            Some(last) => last,
            None => {
                self.last_time_us = Some(time_us);
                self.pid.error = error;
                self.output = self.options.initial_output;
                return self.output;
            }
        };
        let elapsed_us = match time_us.checked_sub(last_time_us) {
            Some(elapsed) if elapsed > 0 => elapsed,
            _ => return self.output,
        };
        self.last_time_us = Some(time_us);
        let dt = elapsed_us as f32 * 1e-6;

        let derivative = self
            .derivative_filter
            .calculate((error - self.pid.error) / dt);

        self.pid.set_point(target).kp(gains.p).ki(gains.i).kd(gains.d);
        let data = AxisControlData {
            error,
            derivative,
            dt,
            integral_limit: gains.integral_limit(),
        };
        let limit = self.options.output_limit;
        self.output = self.pid.compute(data).clamp(-limit, limit);
        self.output
    }

    /// Error of the last call.
    pub fn error(&self) -> f32 {
        self.pid.error
    }

    /// Raw integrator value.
    pub fn integral(&self) -> f32 {
        self.pid.integral
    }

    /// Output of the last call.
    pub fn output(&self) -> f32 {
        self.output
    }
}
