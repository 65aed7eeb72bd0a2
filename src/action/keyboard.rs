//! Keyboard actions

use super::context::{ActionContext, ActionEvent};
use super::effects::{EffectError, KeyCode, Modifiers};
use super::{Description, Lifecycle};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// How a key or button action drives its target
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PressMode {
    /// Press, hold for the configured length, release
    #[default]
    Stroke,
    /// Press and keep pressed until a release action or state exit
    Press,
    Release,
    Toggle,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyAction {
    pub key: KeyCode,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub mode: PressMode,

    /// Set while a stroke waits for its release time
    #[serde(skip)]
    pressed_at: Option<Instant>,
    /// Key and modifiers are down because of this action
    #[serde(skip)]
    held: bool,
}

impl Default for KeyAction {
    fn default() -> Self {
        Self::stroke(KeyCode::Enter)
    }
}

impl KeyAction {
    pub fn new(key: KeyCode, mode: PressMode) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
            mode,
            pressed_at: None,
            held: false,
        }
    }

    pub fn stroke(key: KeyCode) -> Self {
        Self::new(key, PressMode::Stroke)
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn is_deletion(&self) -> bool {
        self.key.is_deletion()
    }

    fn press(&mut self, ctx: &mut ActionContext<'_>) -> Result<(), EffectError> {
        // Held from the first key on, so a partial press is still released on exit
        self.held = true;
        for modifier in self.modifiers.keys() {
            ctx.effects.set_key(modifier, true)?;
        }
        ctx.effects.set_key(self.key, true)?;
        Ok(())
    }

    fn release(&mut self, ctx: &mut ActionContext<'_>) -> Result<(), EffectError> {
        // Mark released first; a failing release must not be retried forever
        self.held = false;
        self.pressed_at = None;
        // Every key gets its release even if an earlier one fails
        let mut result = ctx.effects.set_key(self.key, false);
        for modifier in self.modifiers.keys().into_iter().rev() {
            let released = ctx.effects.set_key(modifier, false);
            if result.is_ok() {
                result = released;
            }
        }
        result
    }

    fn chord(&self) -> String {
        let mut parts: Vec<String> = self
            .modifiers
            .keys()
            .iter()
            .map(|key| key.to_string())
            .collect();
        parts.push(self.key.to_string());
        parts.join("+")
    }
}

impl Lifecycle for KeyAction {
    fn deactivate(&mut self, ctx: &mut ActionContext<'_>, _event: &ActionEvent) {
        if self.held {
            if let Err(e) = self.release(ctx) {
                ctx.report("Key release", e);
            }
        }
    }

    fn start(&mut self, ctx: &mut ActionContext<'_>, _event: &ActionEvent) {
        let result = match self.mode {
            PressMode::Stroke => {
                let pressed = self.press(ctx);
                if pressed.is_ok() {
                    self.pressed_at = Some(ctx.now);
                }
                pressed
            }
            PressMode::Press => self.press(ctx),
            PressMode::Release => self.release(ctx),
            PressMode::Toggle => ctx.effects.toggle_key(self.key),
        };

        if let Err(e) = result {
            ctx.report("Key", e);
            self.cancel();
        }
    }

    fn resume(&mut self, ctx: &mut ActionContext<'_>, _event: &ActionEvent) {
        let Some(pressed_at) = self.pressed_at else {
            return;
        };
        if ctx.elapsed_since(pressed_at) >= ctx.timing.keystroke_length() {
            if let Err(e) = self.release(ctx) {
                ctx.report("Key", e);
            }
        }
    }

    fn is_ongoing(&self) -> bool {
        self.pressed_at.is_some()
    }

    fn cancel(&mut self) {
        self.pressed_at = None;
    }

    fn describe(&self) -> Description {
        let chord = self.chord();
        let verb = match self.mode {
            PressMode::Stroke => "Type",
            PressMode::Press => "Hold",
            PressMode::Release => "Release",
            PressMode::Toggle => "Toggle",
        };
        Description {
            text: format!("{} key {}", verb, chord),
            short: format!("{} {}", verb, chord),
            tiny: chord,
            icon: Some("keyboard"),
        }
    }
}
