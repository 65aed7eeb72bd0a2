//! External effect primitives
//!
//! Actions never inject input themselves. They call an [`EffectSink`], which the host
//! implements on top of whatever platform API it uses. Every primitive may fail; actions
//! catch the failure and report it as [`UiEvent::Error`].

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by effect primitives
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EffectError {
    #[error("Effect not supported on this platform: {0}")]
    Unsupported(String),

    #[error("Window not found: {0}")]
    WindowNotFound(String),

    #[error("Failed to start process {program}: {reason}")]
    ProcessStart { program: String, reason: String },

    #[error("Input injection failed: {0}")]
    Injection(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Char(char),
    F(u8),
    Enter,
    Escape,
    Tab,
    Space,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Shift,
    Control,
    Alt,
    Meta,
}

impl KeyCode {
    /// Keys that destroy text
    pub fn is_deletion(&self) -> bool {
        matches!(self, KeyCode::Backspace | KeyCode::Delete)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyCode::Char(c) => write!(f, "{}", c.to_uppercase()),
            KeyCode::F(n) => write!(f, "F{}", n),
            other => write!(f, "{:?}", other),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub control: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        control: false,
        alt: false,
        meta: false,
    };

    pub const CONTROL: Modifiers = Modifiers {
        control: true,
        ..Modifiers::NONE
    };

    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ..Modifiers::NONE
    };

    /// Modifier keys in press order
    pub fn keys(&self) -> Vec<KeyCode> {
        let mut keys = Vec::new();
        if self.control {
            keys.push(KeyCode::Control);
        }
        if self.alt {
            keys.push(KeyCode::Alt);
        }
        if self.shift {
            keys.push(KeyCode::Shift);
        }
        if self.meta {
            keys.push(KeyCode::Meta);
        }
        keys
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerUnits {
    /// Fraction of the screen, 0.0 to 1.0 per axis
    #[default]
    Normalized,
    Pixels,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointerMotion {
    pub x: f64,
    pub y: f64,
    pub units: PointerUnits,
    pub relative: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowOp {
    Activate,
    Minimize,
    Maximize,
}

/// Selects a window by owning process and/or title substring
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowMatch {
    #[serde(default)]
    pub process: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl fmt::Display for WindowMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.process, &self.title) {
            (Some(process), Some(title)) => write!(f, "{} \"{}\"", process, title),
            (Some(process), None) => write!(f, "{}", process),
            (None, Some(title)) => write!(f, "\"{}\"", title),
            (None, None) => write!(f, "any window"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

/// Commands forwarded to the word prediction component
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionCommand {
    /// Insert the n-th suggestion (0 based)
    Select(usize),
    NextSuggestions,
    PreviousSuggestions,
    Clear,
}

/// Events for the user-facing side of the host
#[derive(Clone, Debug, PartialEq)]
pub enum UiEvent {
    Error {
        message: String,
        at: DateTime<Local>,
    },
    Text {
        text: String,
        at: DateTime<Local>,
    },
    LoadProfile {
        name: String,
        at: DateTime<Local>,
    },
}

impl UiEvent {
    pub fn error(message: impl Into<String>) -> Self {
        UiEvent::Error {
            message: message.into(),
            at: Local::now(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        UiEvent::Text {
            text: text.into(),
            at: Local::now(),
        }
    }

    pub fn load_profile(name: impl Into<String>) -> Self {
        UiEvent::LoadProfile {
            name: name.into(),
            at: Local::now(),
        }
    }
}

/// Effect primitives consumed by actions
pub trait EffectSink {
    fn set_key(&mut self, key: KeyCode, pressed: bool) -> Result<(), EffectError>;

    fn toggle_key(&mut self, key: KeyCode) -> Result<(), EffectError>;

    fn set_mouse_button(&mut self, button: MouseButton, pressed: bool) -> Result<(), EffectError>;

    fn toggle_mouse_button(&mut self, button: MouseButton) -> Result<(), EffectError>;

    fn move_pointer(&mut self, motion: PointerMotion) -> Result<(), EffectError>;

    fn wheel(&mut self, delta: i32) -> Result<(), EffectError>;

    fn window(&mut self, op: WindowOp, target: &WindowMatch) -> Result<(), EffectError>;

    fn start_process(&mut self, program: &ProgramSpec) -> Result<(), EffectError>;

    fn prediction(&mut self, command: &PredictionCommand) -> Result<(), EffectError>;

    /// Submitting never fails; the UI side is expected to queue
    fn submit(&mut self, event: UiEvent);
}

impl<T: EffectSink + ?Sized> EffectSink for Box<T> {
    fn set_key(&mut self, key: KeyCode, pressed: bool) -> Result<(), EffectError> {
        (**self).set_key(key, pressed)
    }

    fn toggle_key(&mut self, key: KeyCode) -> Result<(), EffectError> {
        (**self).toggle_key(key)
    }

    fn set_mouse_button(&mut self, button: MouseButton, pressed: bool) -> Result<(), EffectError> {
        (**self).set_mouse_button(button, pressed)
    }

    fn toggle_mouse_button(&mut self, button: MouseButton) -> Result<(), EffectError> {
        (**self).toggle_mouse_button(button)
    }

    fn move_pointer(&mut self, motion: PointerMotion) -> Result<(), EffectError> {
        (**self).move_pointer(motion)
    }

    fn wheel(&mut self, delta: i32) -> Result<(), EffectError> {
        (**self).wheel(delta)
    }

    fn window(&mut self, op: WindowOp, target: &WindowMatch) -> Result<(), EffectError> {
        (**self).window(op, target)
    }

    fn start_process(&mut self, program: &ProgramSpec) -> Result<(), EffectError> {
        (**self).start_process(program)
    }

    fn prediction(&mut self, command: &PredictionCommand) -> Result<(), EffectError> {
        (**self).prediction(command)
    }

    fn submit(&mut self, event: UiEvent) {
        (**self).submit(event)
    }
}
