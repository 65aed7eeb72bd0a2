//! Effect sink that only logs
//!
//! Used by the binary when no platform backend is wired in. UI events are logged and,
//! if a channel is attached, forwarded to the host.

use crate::action::effects::{
    EffectError, EffectSink, KeyCode, MouseButton, PointerMotion, PredictionCommand,
    ProgramSpec, UiEvent, WindowMatch, WindowOp,
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Debug, Default)]
pub struct TracingEffects {
    ui_sender: Option<mpsc::UnboundedSender<UiEvent>>,
}

impl TracingEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ui_channel(ui_sender: mpsc::UnboundedSender<UiEvent>) -> Self {
        Self {
            ui_sender: Some(ui_sender),
        }
    }
}

impl EffectSink for TracingEffects {
    fn set_key(&mut self, key: KeyCode, pressed: bool) -> Result<(), EffectError> {
        info!("Key {} {}", key, if pressed { "down" } else { "up" });
        Ok(())
    }

    fn toggle_key(&mut self, key: KeyCode) -> Result<(), EffectError> {
        info!("Key {} toggled", key);
        Ok(())
    }

    fn set_mouse_button(&mut self, button: MouseButton, pressed: bool) -> Result<(), EffectError> {
        info!(
            "Mouse {:?} {}",
            button,
            if pressed { "down" } else { "up" }
        );
        Ok(())
    }

    fn toggle_mouse_button(&mut self, button: MouseButton) -> Result<(), EffectError> {
        info!("Mouse {:?} toggled", button);
        Ok(())
    }

    fn move_pointer(&mut self, motion: PointerMotion) -> Result<(), EffectError> {
        info!(
            "Pointer {} ({}, {}) {:?}",
            if motion.relative { "by" } else { "to" },
            motion.x,
            motion.y,
            motion.units
        );
        Ok(())
    }

    fn wheel(&mut self, delta: i32) -> Result<(), EffectError> {
        info!("Wheel {}", delta);
        Ok(())
    }

    fn window(&mut self, op: WindowOp, target: &WindowMatch) -> Result<(), EffectError> {
        info!("Window {:?} on {}", op, target);
        Ok(())
    }

    fn start_process(&mut self, program: &ProgramSpec) -> Result<(), EffectError> {
        info!("Start {} {:?}", program.program, program.args);
        Ok(())
    }

    fn prediction(&mut self, command: &PredictionCommand) -> Result<(), EffectError> {
        info!("Prediction {:?}", command);
        Ok(())
    }

    fn submit(&mut self, event: UiEvent) {
        match &event {
            UiEvent::Error { message, .. } => error!("{}", message),
            UiEvent::Text { text, .. } => info!("Text: {}", text),
            UiEvent::LoadProfile { name, .. } => info!("Profile {} requested", name),
        }
        if let Some(sender) = &self.ui_sender {
            if sender.send(event).is_err() {
                warn!("UI channel closed, dropping event");
                self.ui_sender = None;
            }
        }
    }
}
