//! Input controls and trigger reasons
//!
//! Controls are identified by [`ControlId`]. A directional control additionally carries
//! a [`Direction`], and every binding records which [`SettingKind`] (button, discrete
//! directions, continuous analog) it was made for. [`Reason`] says why a control fired.
//!
//! ```text
//! ControlId + Direction            ──► InputControl      (lookup key)
//! ControlId + Direction + Setting  ──► TriggeringControl (binding identity)
//! ```

pub mod layout;

pub use layout::ControlLayout;

use crate::state::StateVector;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ControlId {
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
    LeftStick,
    RightStick,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlKind {
    Button,
    /// Analog trigger reported as a button once past its threshold
    Trigger,
    DPad,
    Stick,
}

impl ControlId {
    pub const ALL: [ControlId; 19] = [
        ControlId::Button1,
        ControlId::Button2,
        ControlId::Button3,
        ControlId::Button4,
        ControlId::Button5,
        ControlId::Button6,
        ControlId::Button7,
        ControlId::Button8,
        ControlId::Start,
        ControlId::Select,
        ControlId::LeftShoulder,
        ControlId::RightShoulder,
        ControlId::LeftTrigger,
        ControlId::RightTrigger,
        ControlId::LeftStickClick,
        ControlId::RightStickClick,
        ControlId::DPad,
        ControlId::LeftStick,
        ControlId::RightStick,
    ];

    pub fn kind(&self) -> ControlKind {
        match self {
            ControlId::LeftTrigger | ControlId::RightTrigger => ControlKind::Trigger,
            ControlId::DPad => ControlKind::DPad,
            ControlId::LeftStick | ControlId::RightStick => ControlKind::Stick,
            _ => ControlKind::Button,
        }
    }

    pub fn is_directional(&self) -> bool {
        matches!(self.kind(), ControlKind::DPad | ControlKind::Stick)
    }

    pub fn is_analog_stick(&self) -> bool {
        self.kind() == ControlKind::Stick
    }

    /// Direction mode a control uses when the layout does not say otherwise
    pub fn default_direction_mode(&self) -> DirectionMode {
        match self.kind() {
            ControlKind::Button | ControlKind::Trigger => DirectionMode::None,
            ControlKind::DPad => DirectionMode::FourWay,
            ControlKind::Stick => DirectionMode::EightWay,
        }
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    None,
    Up,
    UpRight,
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
    UpLeft,
}

impl Direction {
    pub const ALL: [Direction; 9] = [
        Direction::None,
        Direction::Up,
        Direction::UpRight,
        Direction::Right,
        Direction::DownRight,
        Direction::Down,
        Direction::DownLeft,
        Direction::Left,
        Direction::UpLeft,
    ];

    pub fn is_diagonal(&self) -> bool {
        matches!(
            self,
            Direction::UpRight | Direction::DownRight | Direction::DownLeft | Direction::UpLeft
        )
    }
}

/// How a directional control currently reports its position
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DirectionMode {
    /// Not directional (buttons, triggers)
    #[default]
    None,
    FourWay,
    EightWay,
    /// Raw analog deflection, reported on every update
    Continuous,
}

impl DirectionMode {
    pub fn setting_kind(&self) -> SettingKind {
        match self {
            DirectionMode::None => SettingKind::Button,
            DirectionMode::FourWay | DirectionMode::EightWay => SettingKind::Discrete,
            DirectionMode::Continuous => SettingKind::Continuous,
        }
    }

    pub fn allows(&self, direction: Direction) -> bool {
        match self {
            DirectionMode::None | DirectionMode::Continuous => direction == Direction::None,
            DirectionMode::FourWay => !direction.is_diagonal(),
            DirectionMode::EightWay => true,
        }
    }

    pub fn supports(&self, reason: Reason) -> bool {
        match self.setting_kind() {
            SettingKind::Button => matches!(
                reason,
                Reason::Pressed | Reason::PressedLong | Reason::PressRepeated | Reason::Released
            ),
            SettingKind::Discrete => matches!(
                reason,
                Reason::Directed | Reason::DirectionRepeated | Reason::Undirected
            ),
            SettingKind::Continuous => matches!(reason, Reason::Updated | Reason::Undirected),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SettingKind {
    #[default]
    Button,
    Discrete,
    Continuous,
}

/// Why a control fired. The declaration order is the ordinal used to sort action lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Reason {
    Pressed,
    PressedLong,
    PressRepeated,
    Released,
    Directed,
    DirectionRepeated,
    Undirected,
    Updated,
}

impl Reason {
    pub const ALL: [Reason; 8] = [
        Reason::Pressed,
        Reason::PressedLong,
        Reason::PressRepeated,
        Reason::Released,
        Reason::Directed,
        Reason::DirectionRepeated,
        Reason::Undirected,
        Reason::Updated,
    ];

    /// Reasons fired on a timer while the control stays pressed or directed
    pub fn is_auto_repeat(&self) -> bool {
        matches!(self, Reason::PressRepeated | Reason::DirectionRepeated)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Reason::Pressed => "Press",
            Reason::PressedLong => "Long press",
            Reason::PressRepeated => "Repeat",
            Reason::Released => "Release",
            Reason::Directed => "Direct",
            Reason::DirectionRepeated => "Repeat direction",
            Reason::Undirected => "Center",
            Reason::Updated => "Move",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lookup key: one control, one direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InputControl {
    pub id: ControlId,
    #[serde(default)]
    pub direction: Direction,
}

impl InputControl {
    pub const fn button(id: ControlId) -> Self {
        Self {
            id,
            direction: Direction::None,
        }
    }

    pub const fn directed(id: ControlId, direction: Direction) -> Self {
        Self { id, direction }
    }
}

impl fmt::Display for InputControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::None => write!(f, "{}", self.id),
            direction => write!(f, "{} {:?}", self.id, direction),
        }
    }
}

/// The control a binding reacts to, including the setting kind it was made for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggeringControl {
    pub id: ControlId,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub setting: SettingKind,
}

impl TriggeringControl {
    pub const fn button(id: ControlId) -> Self {
        Self {
            id,
            direction: Direction::None,
            setting: SettingKind::Button,
        }
    }

    pub const fn discrete(id: ControlId, direction: Direction) -> Self {
        Self {
            id,
            direction,
            setting: SettingKind::Discrete,
        }
    }

    pub const fn continuous(id: ControlId) -> Self {
        Self {
            id,
            direction: Direction::None,
            setting: SettingKind::Continuous,
        }
    }

    pub fn input(&self) -> InputControl {
        InputControl {
            id: self.id,
            direction: self.direction,
        }
    }
}

impl fmt::Display for TriggeringControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.input())
    }
}

/// Queries against the authoritative control definitions of the input source
pub trait ControlDefinitions {
    fn control_exists(&self, id: ControlId) -> bool;

    /// Direction mode of `id` while the device is in `state`, `None` if the control
    /// does not exist.
    fn direction_mode(&self, state: &StateVector, id: ControlId) -> Option<DirectionMode>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_sort_by_declaration() {
        let mut reasons = vec![Reason::Updated, Reason::Released, Reason::Pressed];
        reasons.sort();
        assert_eq!(
            reasons,
            vec![Reason::Pressed, Reason::Released, Reason::Updated]
        );
    }

    #[test]
    fn four_way_rejects_diagonals() {
        assert!(DirectionMode::FourWay.allows(Direction::Up));
        assert!(!DirectionMode::FourWay.allows(Direction::UpLeft));
        assert!(DirectionMode::EightWay.allows(Direction::UpLeft));
        assert!(!DirectionMode::Continuous.allows(Direction::Up));
    }

    #[test]
    fn reason_support_follows_setting_kind() {
        assert!(DirectionMode::None.supports(Reason::PressRepeated));
        assert!(!DirectionMode::None.supports(Reason::Directed));
        assert!(DirectionMode::EightWay.supports(Reason::DirectionRepeated));
        assert!(!DirectionMode::Continuous.supports(Reason::Directed));
        assert!(DirectionMode::Continuous.supports(Reason::Updated));
    }
}
