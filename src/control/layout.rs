//! Concrete control definitions loaded from a profile

use super::{ControlDefinitions, ControlId, DirectionMode};
use crate::state::StateVector;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ControlEntry {
    pub id: ControlId,
    #[serde(default)]
    pub mode: DirectionMode,
}

/// Direction mode configured for a control within part of the state hierarchy
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ModeOverride {
    pub state: StateVector,
    pub id: ControlId,
    pub mode: DirectionMode,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct ControlLayout {
    #[serde(default)]
    pub controls: Vec<ControlEntry>,
    #[serde(default)]
    pub overrides: Vec<ModeOverride>,
}

impl ControlLayout {
    /// Eight face/shoulder buttons, start/select, triggers, stick clicks, a four-way pad,
    /// a continuous left stick and an eight-way right stick.
    pub fn standard_gamepad() -> Self {
        use ControlId::*;

        let mut layout = Self::default();
        for id in [
            Button1,
            Button2,
            Button3,
            Button4,
            Button5,
            Button6,
            Button7,
            Button8,
            Start,
            Select,
            LeftShoulder,
            RightShoulder,
            LeftTrigger,
            RightTrigger,
            LeftStickClick,
            RightStickClick,
            DPad,
            RightStick,
        ] {
            layout.insert(id, id.default_direction_mode());
        }
        layout.insert(LeftStick, DirectionMode::Continuous);
        layout
    }

    pub fn insert(&mut self, id: ControlId, mode: DirectionMode) {
        self.controls.retain(|entry| entry.id != id);
        self.controls.push(ControlEntry { id, mode });
    }

    pub fn remove(&mut self, id: ControlId) -> bool {
        let before = self.controls.len();
        self.controls.retain(|entry| entry.id != id);
        self.overrides.retain(|entry| entry.id != id);
        before != self.controls.len()
    }

    pub fn set_override(&mut self, state: StateVector, id: ControlId, mode: DirectionMode) {
        self.overrides
            .retain(|entry| !(entry.id == id && entry.state == state));
        self.overrides.push(ModeOverride { state, id, mode });
    }

    fn base_mode(&self, id: ControlId) -> Option<DirectionMode> {
        self.controls
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.mode)
    }
}

impl ControlDefinitions for ControlLayout {
    fn control_exists(&self, id: ControlId) -> bool {
        self.base_mode(id).is_some()
    }

    fn direction_mode(&self, state: &StateVector, id: ControlId) -> Option<DirectionMode> {
        let base = self.base_mode(id)?;

        // Narrowest override whose state contains the queried state wins
        let mut best: Option<&ModeOverride> = None;
        for entry in self
            .overrides
            .iter()
            .filter(|entry| entry.id == id && entry.state.contains(state))
        {
            match best {
                Some(current) if !current.state.contains(&entry.state) => {}
                _ => best = Some(entry),
            }
        }

        Some(best.map(|entry| entry.mode).unwrap_or(base))
    }
}
