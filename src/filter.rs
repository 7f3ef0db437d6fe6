// src/filter.rs

//! # FIR Smoothing Filter
//!
//! Fixed-length finite impulse response filter used to smooth stick input
//! and the PID derivative term. The filter is generic over [`Number`] so it
//! runs on `f32` as well as on fixed-point types.

use crate::Number;

/// Number of taps used by the stick and derivative filters.
pub const FIR_TAPS: usize = 10;

/// Tap weights applied to stick input before target generation.
pub const STICK_RESPONSE: [f32; FIR_TAPS] = [0.3, 0.2, 0.2, 0.2, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0];

/// Tap weights applied to the PID derivative term. Delay is under 20 ms at 50 Hz.
pub const DERIVATIVE_RESPONSE: [f32; FIR_TAPS] =
    [0.4, 0.3, 0.2, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];

/// Finite impulse response filter with `N` taps.
///
/// `response[0]` weights the newest sample, `response[N - 1]` the oldest.
/// Until the history holds `N` samples the filter passes its input through
/// unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirFilter<T: Number, const N: usize> {
    response: [T; N],
    buffer: [T; N],
    front: usize,
    startup_counter: usize,
}

impl<T: Number, const N: usize> FirFilter<T, N> {
    /// Creates a filter with the given tap weights and an empty history.
    pub fn new(response: [T; N]) -> Self {
        Self {
            response,
            buffer: [T::zero(); N],
            front: 0,
            startup_counter: 0,
        }
    }

    /// Pushes `input` into the history and returns the filtered value.
    pub fn calculate(&mut self, input: T) -> T {
        if N == 0 {
            return input;
        }
        self.front = (self.front + 1) % N;
        self.buffer[self.front] = input;

        if self.startup_counter < N {
            self.startup_counter += 1;
            return input;
        }

        let mut result = T::zero();
        for (i, weight) in self.response.iter().enumerate() {
            let index = (self.front + N - i) % N;
            result = result + self.buffer[index] * *weight;
        }
        result
    }

    /// Forgets the history so the next `N` samples pass through unchanged.
    pub fn flush(&mut self) {
        self.startup_counter = 0;
    }

    /// Returns the tap weights.
    pub fn response(&self) -> &[T; N] {
        &self.response
    }
}
