//! Normalized control events fed into the dispatcher

use crate::action::Deflection;
use crate::control::{ControlId, Direction, InputControl, Reason};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One event of the input source after device normalization
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlInput {
    pub control: InputControl,
    pub reason: Reason,
    pub deflection: Deflection,
}

impl ControlInput {
    pub fn new(control: InputControl, reason: Reason) -> Self {
        Self {
            control,
            reason,
            deflection: Deflection::CENTER,
        }
    }

    pub fn pressed(id: ControlId) -> Self {
        Self::new(InputControl::button(id), Reason::Pressed)
    }

    pub fn released(id: ControlId) -> Self {
        Self::new(InputControl::button(id), Reason::Released)
    }

    pub fn directed(id: ControlId, direction: Direction) -> Self {
        Self::new(InputControl::directed(id, direction), Reason::Directed)
    }

    pub fn undirected(id: ControlId) -> Self {
        Self::new(InputControl::button(id), Reason::Undirected)
    }

    pub fn moved(id: ControlId, deflection: Deflection) -> Self {
        Self {
            deflection,
            ..Self::new(InputControl::button(id), Reason::Updated)
        }
    }
}

impl fmt::Display for ControlInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.control, self.reason)?;
        if self.reason == Reason::Updated {
            write!(f, " {} {}", self.deflection.x, self.deflection.y)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseInputError {
    #[error("Empty input line")]
    Empty,

    #[error("Unknown control: {0}")]
    UnknownControl(String),

    #[error("Unknown reason: {0}")]
    UnknownReason(String),

    #[error("Unknown direction: {0}")]
    UnknownDirection(String),

    #[error("Invalid deflection: {0}")]
    InvalidDeflection(String),
}

fn lookup<T: Copy + fmt::Debug>(candidates: &[T], word: &str) -> Option<T> {
    candidates
        .iter()
        .copied()
        .find(|candidate| format!("{:?}", candidate).eq_ignore_ascii_case(word))
}

/// Parses `<control> <reason> [direction | x y]`, e.g. `Button1 Pressed`,
/// `DPad Directed Up` or `LeftStick Updated 0.5 -0.25`. Case does not matter.
impl FromStr for ControlInput {
    type Err = ParseInputError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let control = words.next().ok_or(ParseInputError::Empty)?;
        let id = lookup(&ControlId::ALL, control)
            .ok_or_else(|| ParseInputError::UnknownControl(control.to_string()))?;

        let reason_word = words.next().unwrap_or("Pressed");
        let reason = lookup(&Reason::ALL, reason_word)
            .ok_or_else(|| ParseInputError::UnknownReason(reason_word.to_string()))?;

        let rest: Vec<&str> = words.collect();
        match reason {
            Reason::Updated => {
                let axis = |word: Option<&&str>| -> Result<f32, ParseInputError> {
                    let word = word.copied().unwrap_or("0");
                    word.parse()
                        .map_err(|_| ParseInputError::InvalidDeflection(word.to_string()))
                };
                let x = axis(rest.first())?;
                let y = axis(rest.get(1))?;
                Ok(Self::moved(id, Deflection::new(x, y)))
            }
            _ => {
                let direction = match rest.first() {
                    Some(word) => lookup(&Direction::ALL, word)
                        .ok_or_else(|| ParseInputError::UnknownDirection(word.to_string()))?,
                    None => Direction::None,
                };
                Ok(Self::new(InputControl::directed(id, direction), reason))
            }
        }
    }
}
