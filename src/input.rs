// src/input.rs

//! Pilot input types and pulsewidth conversion.
//!
//! The flight core works in normalized units: every stick and switch channel
//! spans [`MIN_INPUT`, `MAX_INPUT`] with [`CENTER_INPUT`] as neutral.
//! Radio receivers and servo drivers speak microsecond pulsewidths, which
//! [`PulseRange`] converts to and from.

use crate::ConfigError;

/// Lowest normalized channel value.
pub const MIN_INPUT: f32 = -100.0;
/// Neutral normalized channel value.
pub const CENTER_INPUT: f32 = 0.0;
/// Highest normalized channel value.
pub const MAX_INPUT: f32 = 100.0;

/// Per-cycle stick and switch positions in normalized units.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StickInput {
    /// Throttle, `MIN_INPUT` is no thrust.
    pub throttle: f32,
    /// Roll (aileron) stick.
    pub roll: f32,
    /// Pitch (elevator) stick.
    pub pitch: f32,
    /// Yaw (rudder) stick.
    pub yaw: f32,
    /// Three position flight-mode switch (gear channel).
    pub flight_mode_switch: f32,
    /// Three position control-mode switch (aux channel).
    pub control_mode_switch: f32,
}

impl Default for StickInput {
    fn default() -> Self {
        Self::failsafe(CENTER_INPUT, CENTER_INPUT)
    }
}

impl StickInput {
    /// Minimum throttle and centered sticks, keeping the given switch positions.
    pub const fn failsafe(flight_mode_switch: f32, control_mode_switch: f32) -> Self {
        Self {
            throttle: MIN_INPUT,
            roll: CENTER_INPUT,
            pitch: CENTER_INPUT,
            yaw: CENTER_INPUT,
            flight_mode_switch,
            control_mode_switch,
        }
    }

    /// Converts raw receiver pulsewidths, in channel order throttle, roll,
    /// pitch, yaw, flight-mode switch, control-mode switch.
    pub fn from_pulses(pulses: [u16; 6], range: &PulseRange) -> Self {
        Self {
            throttle: range.to_normalized(pulses[0]),
            roll: range.to_normalized(pulses[1]),
            pitch: range.to_normalized(pulses[2]),
            yaw: range.to_normalized(pulses[3]),
            flight_mode_switch: range.to_normalized(pulses[4]),
            control_mode_switch: range.to_normalized(pulses[5]),
        }
    }
}

/// Pulsewidth endpoints of a radio channel or servo, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PulseRange {
    /// Pulsewidth at `MIN_INPUT`.
    pub min: u16,
    /// Pulsewidth at `CENTER_INPUT`.
    pub center: u16,
    /// Pulsewidth at `MAX_INPUT`.
    pub max: u16,
}

impl Default for PulseRange {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl PulseRange {
    /// The common 1000-1500-2000 us hobby servo range.
    pub const STANDARD: Self = Self {
        min: 1000,
        center: 1500,
        max: 2000,
    };

    /// Checks `min <= center <= max` with `min < max`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min <= self.center && self.center <= self.max && self.min < self.max {
            Ok(())
        } else {
            Err(ConfigError::ActuatorRange)
        }
    }

    /// Clamps `pulse` between the endpoints, whichever order they are in.
    fn bound(&self, pulse: u16) -> u16 {
        if self.min <= self.max {
            pulse.clamp(self.min, self.max)
        } else {
            pulse.clamp(self.max, self.min)
        }
    }

    /// Converts a pulsewidth to normalized units, clamped to the input range.
    ///
    /// Each half of the range is scaled separately so an off-center `center`
    /// still maps to `CENTER_INPUT`.
    pub fn to_normalized(&self, pulse: u16) -> f32 {
        let pulse = f32::from(self.bound(pulse));
        let center = f32::from(self.center);
        let value = if pulse >= center {
            let span = f32::from(self.max) - center;
            if span > 0.0 {
                (pulse - center) / span * MAX_INPUT
            } else {
                CENTER_INPUT
            }
        } else {
            let span = center - f32::from(self.min);
            if span > 0.0 {
                (pulse - center) / span * -MIN_INPUT
            } else {
                CENTER_INPUT
            }
        };
        value.clamp(MIN_INPUT, MAX_INPUT)
    }

    /// Converts a normalized value to the nearest pulsewidth within the range.
    pub fn to_pulse(&self, value: f32) -> u16 {
        let value = if value.is_nan() {
            CENTER_INPUT
        } else {
            value.clamp(MIN_INPUT, MAX_INPUT)
        };
        let center = f32::from(self.center);
        let pulse = if value >= CENTER_INPUT {
            center + value / MAX_INPUT * (f32::from(self.max) - center)
        } else {
            center + value / -MIN_INPUT * (center - f32::from(self.min))
        };
        // pulse is within [min, max] so the cast cannot truncate
        let rounded = (pulse + 0.5) as u16;
        self.bound(rounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    /// Test the standard range endpoints.
    #[test]
    fn test_pulse_range_endpoints() {
        let range = PulseRange::STANDARD;
        assert!(value_close(MIN_INPUT, range.to_normalized(1000)));
        assert!(value_close(CENTER_INPUT, range.to_normalized(1500)));
        assert!(value_close(MAX_INPUT, range.to_normalized(2000)));
        assert!(value_close(50.0, range.to_normalized(1750)));
        assert_eq!(1000, range.to_pulse(MIN_INPUT));
        assert_eq!(1500, range.to_pulse(CENTER_INPUT));
        assert_eq!(2000, range.to_pulse(MAX_INPUT));
    }

    /// Test that out of range pulses and values are clamped.
    #[test]
    fn test_pulse_range_clamps() {
        let range = PulseRange::STANDARD;
        assert!(value_close(MAX_INPUT, range.to_normalized(2400)));
        assert!(value_close(MIN_INPUT, range.to_normalized(800)));
        assert_eq!(2000, range.to_pulse(250.0));
        assert_eq!(1000, range.to_pulse(-250.0));
        assert_eq!(1500, range.to_pulse(f32::NAN));
    }

    /// Test an asymmetric servo range keeps its center.
    #[test]
    fn test_pulse_range_asymmetric() {
        let range = PulseRange {
            min: 940,
            center: 1570,
            max: 2120,
        };
        assert!(value_close(CENTER_INPUT, range.to_normalized(1570)));
        assert_eq!(1570, range.to_pulse(0.0));
        assert_eq!(2120, range.to_pulse(100.0));
        assert_eq!(940, range.to_pulse(-100.0));
    }

    /// Test that inverted endpoints are rejected and never panic on conversion.
    #[test]
    fn test_pulse_range_validation() {
        assert_eq!(Ok(()), PulseRange::STANDARD.validate());
        let inverted = PulseRange {
            min: 2000,
            center: 1500,
            max: 1000,
        };
        assert_eq!(Err(ConfigError::ActuatorRange), inverted.validate());
        let off_center = PulseRange {
            center: 2100,
            ..PulseRange::STANDARD
        };
        assert_eq!(Err(ConfigError::ActuatorRange), off_center.validate());

        let pulse = inverted.to_pulse(100.0);
        assert!((1000..=2000).contains(&pulse));
        let value = inverted.to_normalized(2400);
        assert!((MIN_INPUT..=MAX_INPUT).contains(&value));
    }

    /// Test conversion of a full receiver frame.
    #[test]
    fn test_sticks_from_pulses() {
        let sticks = StickInput::from_pulses([1000, 1500, 2000, 1250, 1000, 2000], &PulseRange::STANDARD);
        assert!(value_close(-100.0, sticks.throttle));
        assert!(value_close(0.0, sticks.roll));
        assert!(value_close(100.0, sticks.pitch));
        assert!(value_close(-50.0, sticks.yaw));
        assert!(value_close(-100.0, sticks.flight_mode_switch));
        assert!(value_close(100.0, sticks.control_mode_switch));
    }
}
