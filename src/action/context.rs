//! Execution context handed to every action call

use super::effects::{EffectError, EffectSink, UiEvent};
use crate::config::TimingSettings;
use crate::control::{ControlId, DirectionMode, Reason, TriggeringControl};
use crate::state::{StateDefinitions, StateVector};
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::warn;

/// Analog deflection of a control, each axis in -1.0..=1.0
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Deflection {
    pub x: f32,
    pub y: f32,
}

impl Deflection {
    pub const CENTER: Deflection = Deflection { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: x.clamp(-1.0, 1.0),
            y: y.clamp(-1.0, 1.0),
        }
    }

    pub fn is_centered(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// The event that triggered an action list, retained across ticks
#[derive(Clone, Debug, PartialEq)]
pub struct ActionEvent {
    pub state: StateVector,
    pub control: TriggeringControl,
    pub reason: Reason,
    pub deflection: Deflection,
    pub received_at: DateTime<Local>,
}

impl ActionEvent {
    pub fn new(state: StateVector, control: TriggeringControl, reason: Reason) -> Self {
        Self {
            state,
            control,
            reason,
            deflection: Deflection::CENTER,
            received_at: Local::now(),
        }
    }

    pub fn with_deflection(mut self, deflection: Deflection) -> Self {
        self.deflection = deflection;
        self
    }
}

/// Auto-repeat timing for one control
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RepeatTiming {
    /// Hold time before the first repeat
    pub delay: Duration,
    pub interval: Duration,
}

/// Settings applied by passive actions while their state is active
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PassiveSettings {
    direction_modes: HashMap<ControlId, DirectionMode>,
    repeat: HashMap<ControlId, RepeatTiming>,
}

impl PassiveSettings {
    pub fn direction_mode(&self, control: ControlId) -> Option<DirectionMode> {
        self.direction_modes.get(&control).copied()
    }

    pub fn set_direction_mode(&mut self, control: ControlId, mode: DirectionMode) {
        self.direction_modes.insert(control, mode);
    }

    pub fn clear_direction_mode(&mut self, control: ControlId) {
        self.direction_modes.remove(&control);
    }

    pub fn repeat(&self, control: ControlId) -> Option<RepeatTiming> {
        self.repeat.get(&control).copied()
    }

    pub fn set_repeat(&mut self, control: ControlId, timing: RepeatTiming) {
        self.repeat.insert(control, timing);
    }

    pub fn clear_repeat(&mut self, control: ControlId) {
        self.repeat.remove(&control);
    }

    pub fn clear(&mut self) {
        self.direction_modes.clear();
        self.repeat.clear();
    }
}

/// Everything an action may touch during one call
///
/// `now` is supplied by the driver once per tick so that all actions in a tick agree on
/// the time, and tests can step time explicitly.
pub struct ActionContext<'a> {
    pub now: Instant,
    pub timing: &'a TimingSettings,
    pub states: &'a dyn StateDefinitions,
    pub effects: &'a mut dyn EffectSink,
    pub passive: &'a mut PassiveSettings,
    requested_state: Option<StateVector>,
}

impl<'a> ActionContext<'a> {
    pub fn new(
        now: Instant,
        timing: &'a TimingSettings,
        states: &'a dyn StateDefinitions,
        effects: &'a mut dyn EffectSink,
        passive: &'a mut PassiveSettings,
    ) -> Self {
        Self {
            now,
            timing,
            states,
            effects,
            passive,
            requested_state: None,
        }
    }

    /// Asks the driver to switch state once the current call returns. The last request
    /// in a call wins.
    pub fn request_state(&mut self, state: StateVector) {
        self.requested_state = Some(state);
    }

    pub fn take_requested_state(&mut self) -> Option<StateVector> {
        self.requested_state.take()
    }

    /// Time since `since`, zero if the clock went backwards
    pub fn elapsed_since(&self, since: Instant) -> Duration {
        self.now.saturating_duration_since(since)
    }

    /// Reports a failed effect to the UI side instead of propagating it
    pub fn report(&mut self, action: &str, error: EffectError) {
        warn!("{} action failed: {}", action, error);
        self.effects
            .submit(UiEvent::error(format!("{} failed: {}", action, error)));
    }
}
