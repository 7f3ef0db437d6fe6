// src/mode.rs

//! # Flight-Mode and Control-Mode State Machine
//!
//! Decodes the two three-position switches, applies the fail-safe policy and
//! tracks the transition progress that drives tilt actuators, gain scheduling
//! and mixing.
//!
//! Two transition styles share one engine:
//!
//! - **Discrete**: the aircraft moves through `ToForward`, `ToSlow` and
//!   `ToVertical` states and only settles once progress reaches the bound of
//!   the commanded mode. Progress usually spans `[-T, T]`.
//! - **Continuous**: the reported flight mode is the commanded mode and the
//!   progress value alone tracks the mechanical state. Progress usually spans
//!   `[0, T]`.
//!
//! In both styles progress moves at most one step per cycle.

use core::ops::{BitOr, BitOrAssign};

use crate::input::StickInput;

/// Failure conditions reported to the flight core for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FailureFlags(u8);

impl FailureFlags {
    /// No failures.
    pub const NONE: Self = Self(0);
    /// The radio receiver lost its link.
    pub const RX_FAILED: Self = Self(1 << 0);
    /// The inertial sensor could not be read.
    pub const IMU_FAILED: Self = Self(1 << 1);
    /// Some other sensor could not be read.
    pub const OTHER_SENSOR_FAILED: Self = Self(1 << 2);
    /// The previous control cycle exceeded its period.
    pub const LOOP_OVERRUN: Self = Self(1 << 3);

    /// Builds flags from raw bits, dropping unknown bits.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & 0x0f)
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Returns true if every flag in `other` is set.
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if no flag is set.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Sets every flag in `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clears every flag in `other`.
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for FailureFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for FailureFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Flight regime of the aircraft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlightMode {
    /// Wing-borne horizontal flight.
    Forward,
    /// Tilting from slow flight towards forward flight.
    ToForward,
    /// Tilting towards slow flight, from either side.
    ToSlow,
    /// Partially tilted slow flight.
    #[default]
    Slow,
    /// Tilting from slow flight towards hover.
    ToVertical,
    /// Thrust-borne hover.
    Vertical,
    /// Outputs disabled after a double failure.
    Disabled,
}

impl FlightMode {
    /// Decodes the flight-mode switch: below `low` is forward flight, below
    /// `high` is slow flight, anything else is vertical flight.
    pub fn from_switch(value: f32, thresholds: &SwitchThresholds) -> Self {
        if value < thresholds.low {
            FlightMode::Forward
        } else if value < thresholds.high {
            FlightMode::Slow
        } else {
            FlightMode::Vertical
        }
    }

    /// Returns true for the `To*` states.
    pub fn is_transitional(&self) -> bool {
        matches!(
            self,
            FlightMode::ToForward | FlightMode::ToSlow | FlightMode::ToVertical
        )
    }

    /// Progress value this mode is heading towards, or `None` when disabled.
    pub fn bound(&self, transition: &TransitionConfig) -> Option<i16> {
        match self {
            FlightMode::Forward | FlightMode::ToForward => Some(transition.min),
            FlightMode::Slow | FlightMode::ToSlow => Some(transition.mid),
            FlightMode::Vertical | FlightMode::ToVertical => Some(transition.max),
            FlightMode::Disabled => None,
        }
    }
}

/// How the pilot's stick input is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ControlMode {
    /// Sticks drive the actuators directly.
    #[default]
    Manual,
    /// Sticks command angular rates.
    Rate,
    /// Sticks command roll and pitch angles; yaw is a rate.
    Autolevel,
}

impl ControlMode {
    /// Decodes the control-mode switch: below `low` is manual, below `high`
    /// is rate, anything else is autolevel.
    pub fn from_switch(value: f32, thresholds: &SwitchThresholds) -> Self {
        if value < thresholds.low {
            ControlMode::Manual
        } else if value < thresholds.high {
            ControlMode::Rate
        } else {
            ControlMode::Autolevel
        }
    }
}

/// Applies the fail-safe policy to the switch-derived modes.
///
/// - radio and IMU failed: flight mode `Disabled`, control mode `Manual`
/// - radio failed: flight mode `Forward`, control mode `Autolevel`
/// - IMU failed: flight mode `Forward`, control mode `Manual`
///
/// Returns the forced flight mode, if any, and the resulting control mode.
pub fn apply_failure_policy(
    control_mode: ControlMode,
    flags: FailureFlags,
) -> (Option<FlightMode>, ControlMode) {
    let rx_failed = flags.contains(FailureFlags::RX_FAILED);
    let imu_failed = flags.contains(FailureFlags::IMU_FAILED);

    let mut control = control_mode;
    if rx_failed {
        control = ControlMode::Autolevel;
    }
    if imu_failed {
        control = ControlMode::Manual;
    }

    let flight = if rx_failed && imu_failed {
        Some(FlightMode::Disabled)
    } else if rx_failed || imu_failed {
        Some(FlightMode::Forward)
    } else {
        None
    };

    (flight, control)
}

/// Thresholds splitting a three-position switch in normalized units.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SwitchThresholds {
    /// Boundary between the low and middle positions.
    pub low: f32,
    /// Boundary between the middle and high positions.
    pub high: f32,
}

impl Default for SwitchThresholds {
    fn default() -> Self {
        Self {
            low: -40.0,
            high: 40.0,
        }
    }
}

/// Bounds and style of the transition progress counter.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransitionConfig {
    /// Progress in forward flight.
    pub min: i16,
    /// Progress in slow flight.
    pub mid: i16,
    /// Progress in vertical flight.
    pub max: i16,
    /// Use the `To*` intermediate states.
    pub discrete: bool,
}

impl TransitionConfig {
    /// Symmetric discrete transition over `[-time, time]` cycles.
    pub const fn discrete(time: i16) -> Self {
        Self {
            min: -time,
            mid: 0,
            max: time,
            discrete: true,
        }
    }

    /// Continuous transition over `[0, max]` with slow flight at the midpoint.
    pub const fn continuous(max: i16) -> Self {
        Self {
            min: 0,
            mid: max / 2,
            max,
            discrete: false,
        }
    }
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self::discrete(50)
    }
}

/// Settings for the mode state machine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModeConfig {
    /// Thresholds of the flight-mode switch.
    pub flight_switch: SwitchThresholds,
    /// Thresholds of the control-mode switch.
    pub control_switch: SwitchThresholds,
    /// Transition progress bounds and style.
    pub transition: TransitionConfig,
}

fn step_toward(progress: i16, bound: i16) -> i16 {
    if progress < bound {
        progress + 1
    } else if progress > bound {
        progress - 1
    } else {
        progress
    }
}

/// Transition state heading towards `target` from a progress value that is
/// off the current mode's bound, as left behind by a fail-safe override.
///
/// Progress on the far side of `mid` heads to slow flight first, so travel
/// towards the target stays monotonic.
fn recovery_heading(progress: i16, target: FlightMode, config: &TransitionConfig) -> FlightMode {
    match target {
        FlightMode::Forward if progress <= config.mid => FlightMode::ToForward,
        FlightMode::Vertical if progress >= config.mid => FlightMode::ToVertical,
        _ => FlightMode::ToSlow,
    }
}

/// Computes `(next_mode, next_progress)` from the current mode, the current
/// progress and the commanded target mode.
///
/// Progress moves one step towards the bound of the mode heading; a `To*`
/// state settles into its destination on the cycle progress reaches that
/// destination's bound. `Forward`, `Vertical` or `Disabled` holding a
/// progress value off their bound, after a fail-safe override, resume
/// towards `target` without reversing.
///
/// # Arguments
/// * `mode` - The current flight mode.
/// * `progress` - The current transition progress.
/// * `target` - The commanded mode, one of `Forward`, `Slow` or `Vertical`.
/// * `config` - Transition bounds and style.
///
/// # Returns
/// The flight mode and transition progress for the next cycle. Progress
/// differs from `progress` by at most one and stays within the bounds.
pub fn transition(
    mode: FlightMode,
    progress: i16,
    target: FlightMode,
    config: &TransitionConfig,
) -> (FlightMode, i16) {
    use FlightMode::*;

    if !config.discrete {
        let next_progress = match target.bound(config) {
            Some(bound) => step_toward(progress, bound),
            None => progress,
        };
        return (target, next_progress.clamp(config.min, config.max));
    }

    let heading = match mode {
        Forward if progress != config.min => recovery_heading(progress, target, config),
        Forward => {
            if target == Forward {
                Forward
            } else {
                ToSlow
            }
        }
        ToForward => {
            if target == Forward {
                ToForward
            } else {
                ToSlow
            }
        }
        ToSlow => match target {
            Forward if progress <= config.mid => ToForward,
            Vertical if progress >= config.mid => ToVertical,
            _ => ToSlow,
        },
        Slow => match target {
            Forward => ToForward,
            Vertical => ToVertical,
            _ => Slow,
        },
        ToVertical => {
            if target == Vertical {
                ToVertical
            } else {
                ToSlow
            }
        }
        Vertical if progress != config.max => recovery_heading(progress, target, config),
        Vertical => {
            if target == Vertical {
                Vertical
            } else {
                ToSlow
            }
        }
        Disabled => {
            // Leaving Disabled always spends a cycle in a transition state.
            let heading = recovery_heading(progress, target, config);
            let next_progress = match heading.bound(config) {
                Some(bound) => step_toward(progress, bound),
                None => progress,
            };
            return (heading, next_progress.clamp(config.min, config.max));
        }
    };

    let next_progress = match heading.bound(config) {
        Some(bound) => step_toward(progress, bound),
        None => progress,
    }
    .clamp(config.min, config.max);

    let next_mode = match heading {
        ToForward if next_progress == config.min => Forward,
        ToVertical if next_progress == config.max => Vertical,
        ToSlow if target == Slow && next_progress == config.mid => Slow,
        other => other,
    };

    (next_mode, next_progress)
}

/// Result of one state machine update.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModeState {
    /// Flight mode after transitions and fail-safe overrides.
    pub flight_mode: FlightMode,
    /// Control mode after fail-safe overrides.
    pub control_mode: ControlMode,
    /// Transition progress after this cycle.
    pub progress: i16,
    /// True if progress moved this cycle.
    pub progress_changed: bool,
}

/// Persistent flight-mode state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeStateMachine {
    config: ModeConfig,
    flight_mode: FlightMode,
    control_mode: ControlMode,
    progress: i16,
    started: bool,
}

impl ModeStateMachine {
    /// Creates a state machine that settles into the commanded mode on its
    /// first update, without a transition.
    pub fn new(config: ModeConfig) -> Self {
        Self {
            config,
            flight_mode: FlightMode::Slow,
            control_mode: ControlMode::Manual,
            progress: config.transition.mid,
            started: false,
        }
    }

    /// Creates a state machine already settled in `mode`.
    pub fn starting_in(config: ModeConfig, mode: FlightMode) -> Self {
        let progress = mode.bound(&config.transition).unwrap_or(config.transition.mid);
        Self {
            config,
            flight_mode: mode,
            control_mode: ControlMode::Manual,
            progress,
            started: true,
        }
    }

    /// Decodes the switches, applies the fail-safe policy and advances the
    /// transition by one cycle.
    pub fn update(&mut self, sticks: &StickInput, flags: FailureFlags) -> ModeState {
        let transition_config = self.config.transition;
        let target = FlightMode::from_switch(sticks.flight_mode_switch, &self.config.flight_switch);
        let switch_control =
            ControlMode::from_switch(sticks.control_mode_switch, &self.config.control_switch);
        let (forced, control_mode) = apply_failure_policy(switch_control, flags);

        let previous_mode = self.flight_mode;
        let previous_progress = self.progress;

        if !self.started {
            self.started = true;
            self.progress = target
                .bound(&transition_config)
                .unwrap_or(transition_config.mid);
            self.flight_mode = forced.unwrap_or(target);
        } else if let Some(forced_mode) = forced {
            if forced_mode != previous_mode {
                warn!("fail-safe forcing flight mode {}", forced_mode);
            }
            self.flight_mode = forced_mode;
            if let Some(bound) = forced_mode.bound(&transition_config) {
                self.progress = step_toward(self.progress, bound)
                    .clamp(transition_config.min, transition_config.max);
            }
        } else {
            let (mode, progress) =
                transition(self.flight_mode, self.progress, target, &transition_config);
            self.flight_mode = mode;
            self.progress = progress;
        }

        if self.flight_mode != previous_mode {
            debug!(
                "flight mode {} -> {} at progress {}",
                previous_mode,
                self.flight_mode,
                self.progress
            );
        }
        self.control_mode = control_mode;

        ModeState {
            flight_mode: self.flight_mode,
            control_mode: self.control_mode,
            progress: self.progress,
            progress_changed: self.progress != previous_progress,
        }
    }

    /// Current flight mode.
    pub fn flight_mode(&self) -> FlightMode {
        self.flight_mode
    }

    /// Control mode decided on the last update.
    pub fn control_mode(&self) -> ControlMode {
        self.control_mode
    }

    /// Current transition progress.
    pub fn progress(&self) -> i16 {
        self.progress
    }

    /// Configuration of this state machine.
    pub fn config(&self) -> &ModeConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    const T: i16 = 5;

    fn discrete_config() -> ModeConfig {
        ModeConfig {
            transition: TransitionConfig::discrete(T),
            ..ModeConfig::default()
        }
    }

    fn sticks_with_flight_switch(value: f32) -> StickInput {
        StickInput {
            flight_mode_switch: value,
            ..centered_sticks()
        }
    }

    const FORWARD_SWITCH: f32 = -100.0;
    const SLOW_SWITCH: f32 = 0.0;
    const VERTICAL_SWITCH: f32 = 100.0;

    /// Test switch decoding for both switches.
    #[test]
    fn test_switch_decoding() {
        let thresholds = SwitchThresholds::default();
        assert_eq!(FlightMode::Forward, FlightMode::from_switch(-41.0, &thresholds));
        assert_eq!(FlightMode::Slow, FlightMode::from_switch(-40.0, &thresholds));
        assert_eq!(FlightMode::Vertical, FlightMode::from_switch(40.0, &thresholds));
        assert_eq!(ControlMode::Manual, ControlMode::from_switch(-100.0, &thresholds));
        assert_eq!(ControlMode::Rate, ControlMode::from_switch(0.0, &thresholds));
        assert_eq!(ControlMode::Autolevel, ControlMode::from_switch(100.0, &thresholds));
    }

    /// Test the fail-safe policy table.
    #[test]
    fn test_failure_policy() {
        let both = FailureFlags::RX_FAILED | FailureFlags::IMU_FAILED;
        assert_eq!(
            (Some(FlightMode::Disabled), ControlMode::Manual),
            apply_failure_policy(ControlMode::Rate, both)
        );
        assert_eq!(
            (Some(FlightMode::Forward), ControlMode::Autolevel),
            apply_failure_policy(ControlMode::Manual, FailureFlags::RX_FAILED)
        );
        assert_eq!(
            (Some(FlightMode::Forward), ControlMode::Manual),
            apply_failure_policy(ControlMode::Autolevel, FailureFlags::IMU_FAILED)
        );
        assert_eq!(
            (None, ControlMode::Rate),
            apply_failure_policy(ControlMode::Rate, FailureFlags::LOOP_OVERRUN)
        );
    }

    /// Test the policy through the state machine on the failing cycle.
    #[test]
    fn test_state_machine_failure_overrides() {
        let mut machine = ModeStateMachine::starting_in(discrete_config(), FlightMode::Vertical);
        let sticks = StickInput {
            control_mode_switch: 0.0,
            ..sticks_with_flight_switch(VERTICAL_SWITCH)
        };

        let state = machine.update(&sticks, FailureFlags::RX_FAILED | FailureFlags::IMU_FAILED);
        assert_eq!(FlightMode::Disabled, state.flight_mode);
        assert_eq!(T, state.progress, "Disabled should hold progress.");

        let state = machine.update(&sticks, FailureFlags::RX_FAILED);
        assert_eq!(FlightMode::Forward, state.flight_mode);
        assert_eq!(ControlMode::Autolevel, state.control_mode);
        assert_eq!(T - 1, state.progress, "Forced mode should still move one step.");

        let state = machine.update(&sticks, FailureFlags::IMU_FAILED);
        assert_eq!(ControlMode::Manual, state.control_mode);

        let state = machine.update(&sticks, FailureFlags::NONE);
        assert_eq!(ControlMode::Rate, state.control_mode);
        assert_eq!(FlightMode::ToVertical, state.flight_mode);
        assert_eq!(T - 1, state.progress, "Recovery should resume towards vertical.");
    }

    /// Test that progress resumes towards the commanded mode without reversing
    /// once a fail-safe override clears.
    #[test]
    fn test_recovery_after_failsafe_is_monotonic() {
        let mut machine = ModeStateMachine::starting_in(discrete_config(), FlightMode::Vertical);
        let vertical = sticks_with_flight_switch(VERTICAL_SWITCH);
        machine.update(&vertical, FailureFlags::RX_FAILED);
        let state = machine.update(&vertical, FailureFlags::RX_FAILED);
        assert_eq!(T - 2, state.progress);

        let mut previous = state.progress;
        for _ in 0..2 {
            let state = machine.update(&vertical, FailureFlags::NONE);
            assert_eq!(previous + 1, state.progress, "Progress should only climb back.");
            previous = state.progress;
        }
        assert_eq!(FlightMode::Vertical, machine.flight_mode());
        assert_eq!(T, machine.progress());

        // Forced forward far past the midpoint, then the pilot commands forward.
        let mut machine = ModeStateMachine::starting_in(discrete_config(), FlightMode::Vertical);
        let forward = sticks_with_flight_switch(FORWARD_SWITCH);
        machine.update(&vertical, FailureFlags::RX_FAILED);
        let mut previous = machine.progress();
        for _ in 0..(3 * T) {
            let state = machine.update(&forward, FailureFlags::NONE);
            assert!(state.progress <= previous, "Progress should only fall.");
            assert!(previous - state.progress <= 1);
            previous = state.progress;
        }
        assert_eq!(FlightMode::Forward, machine.flight_mode());
        assert_eq!(-T, machine.progress());
    }

    /// Test leaving Disabled on the far side of the midpoint.
    #[test]
    fn test_recovery_from_disabled() {
        let config = TransitionConfig::discrete(T);
        let (mode, progress) = transition(FlightMode::Disabled, T, FlightMode::Forward, &config);
        assert_eq!(FlightMode::ToSlow, mode);
        assert_eq!(T - 1, progress);

        let (mode, progress) = transition(FlightMode::Disabled, -2, FlightMode::Forward, &config);
        assert_eq!(FlightMode::ToForward, mode);
        assert_eq!(-3, progress);

        let (mode, progress) = transition(FlightMode::Disabled, 0, FlightMode::Slow, &config);
        assert_eq!(FlightMode::ToSlow, mode);
        assert_eq!(0, progress);
    }

    /// Test the first update settles into the commanded mode.
    #[test]
    fn test_first_update_settles() {
        let mut machine = ModeStateMachine::new(discrete_config());
        let state = machine.update(&sticks_with_flight_switch(FORWARD_SWITCH), FailureFlags::NONE);
        assert_eq!(FlightMode::Forward, state.flight_mode);
        assert_eq!(-T, state.progress);
    }

    /// Test vertical to forward steps down by one per cycle and settles at the bound.
    #[test]
    fn test_vertical_to_forward_monotonic() {
        let mut machine = ModeStateMachine::starting_in(discrete_config(), FlightMode::Vertical);
        let sticks = sticks_with_flight_switch(FORWARD_SWITCH);
        let mut previous = machine.progress();
        let mut cycles = 0;
        loop {
            let state = machine.update(&sticks, FailureFlags::NONE);
            cycles += 1;
            assert_eq!(previous - 1, state.progress, "Progress should drop one per cycle.");
            previous = state.progress;
            if state.progress == -T {
                assert_eq!(FlightMode::Forward, state.flight_mode);
                break;
            }
            assert!(state.flight_mode.is_transitional());
        }
        assert_eq!(2 * T, cycles);
    }

    /// Test reversing the switch mid-transition reverses from the current progress.
    #[test]
    fn test_reversal_mid_transition() {
        let mut machine = ModeStateMachine::starting_in(discrete_config(), FlightMode::Slow);
        let vertical = sticks_with_flight_switch(VERTICAL_SWITCH);
        let forward = sticks_with_flight_switch(FORWARD_SWITCH);

        machine.update(&vertical, FailureFlags::NONE);
        machine.update(&vertical, FailureFlags::NONE);
        assert_eq!(2, machine.progress());

        let state = machine.update(&forward, FailureFlags::NONE);
        assert_eq!(FlightMode::ToSlow, state.flight_mode);
        assert_eq!(1, state.progress);
    }

    /// Test that settling into slow flight happens at the midpoint.
    #[test]
    fn test_settles_in_slow() {
        let mut machine = ModeStateMachine::starting_in(discrete_config(), FlightMode::Forward);
        let slow = sticks_with_flight_switch(SLOW_SWITCH);
        let mut state = machine.update(&slow, FailureFlags::NONE);
        assert_eq!(FlightMode::ToSlow, state.flight_mode);
        while state.progress != 0 {
            state = machine.update(&slow, FailureFlags::NONE);
        }
        assert_eq!(FlightMode::Slow, state.flight_mode);
    }

    /// Test rate and bound invariants and the forward/vertical interlock under
    /// an oscillating switch.
    #[test]
    fn test_invariants_under_oscillation() {
        let mut machine = ModeStateMachine::new(discrete_config());
        let switches = [FORWARD_SWITCH, VERTICAL_SWITCH, SLOW_SWITCH];
        let mut previous_progress: Option<i16> = None;
        let mut previous_mode: Option<FlightMode> = None;
        // pseudo random switch sequence
        let mut seed: u32 = 12345;
        for _ in 0..5000 {
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            let switch = switches[(seed >> 16) as usize % switches.len()];
            let state = machine.update(&sticks_with_flight_switch(switch), FailureFlags::NONE);

            assert!(-T <= state.progress && state.progress <= T);
            if let Some(previous) = previous_progress {
                assert!((state.progress - previous).abs() <= 1);
            }
            if let Some(previous) = previous_mode {
                let jump = matches!(
                    (previous, state.flight_mode),
                    (FlightMode::Forward, FlightMode::Vertical)
                        | (FlightMode::Vertical, FlightMode::Forward)
                );
                assert!(!jump, "Forward and vertical must pass through a transition state.");
            }
            match state.flight_mode {
                FlightMode::Forward => assert_eq!(-T, state.progress),
                FlightMode::Vertical => assert_eq!(T, state.progress),
                FlightMode::Slow => assert_eq!(0, state.progress),
                _ => {}
            }
            previous_progress = Some(state.progress);
            previous_mode = Some(state.flight_mode);
        }
    }

    /// Test the continuous style reports the commanded mode and ramps progress.
    #[test]
    fn test_continuous_transition() {
        let config = ModeConfig {
            transition: TransitionConfig::continuous(90),
            ..ModeConfig::default()
        };
        let mut machine = ModeStateMachine::starting_in(config, FlightMode::Forward);
        let vertical = sticks_with_flight_switch(VERTICAL_SWITCH);
        for expected in 1..=90 {
            let state = machine.update(&vertical, FailureFlags::NONE);
            assert_eq!(FlightMode::Vertical, state.flight_mode);
            assert_eq!(expected, state.progress);
            assert!(state.progress_changed);
        }
        let state = machine.update(&vertical, FailureFlags::NONE);
        assert_eq!(90, state.progress);
        assert!(!state.progress_changed);

        let slow = sticks_with_flight_switch(SLOW_SWITCH);
        let state = machine.update(&slow, FailureFlags::NONE);
        assert_eq!(89, state.progress);
    }

    /// Test the pure transition function from a disabled state.
    #[test]
    fn test_transition_from_disabled() {
        let config = TransitionConfig::discrete(T);
        let (mode, progress) = transition(FlightMode::Disabled, T, FlightMode::Vertical, &config);
        assert_eq!(FlightMode::ToVertical, mode);
        assert_eq!(T, progress);
    }

    /// Test flag set operations.
    #[test]
    fn test_failure_flags() {
        let mut flags = FailureFlags::NONE;
        assert!(flags.is_empty());
        flags |= FailureFlags::LOOP_OVERRUN;
        flags.insert(FailureFlags::RX_FAILED);
        assert!(flags.contains(FailureFlags::RX_FAILED | FailureFlags::LOOP_OVERRUN));
        assert!(!flags.contains(FailureFlags::IMU_FAILED));
        flags.remove(FailureFlags::RX_FAILED);
        assert_eq!(FailureFlags::LOOP_OVERRUN, flags);
        assert_eq!(0x0f, FailureFlags::from_bits_truncate(0xff).bits());
    }
}
