//! Passive actions
//!
//! These do nothing when their control fires. They apply a setting for their control
//! while the state they are bound to is active, and withdraw it on exit.

use super::context::{ActionContext, ActionEvent, RepeatTiming};
use super::{Description, Lifecycle};
use crate::control::DirectionMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Overrides how the bound control reports directions
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionModeAction {
    pub mode: DirectionMode,
}

impl Lifecycle for DirectionModeAction {
    fn activate(&mut self, ctx: &mut ActionContext<'_>, event: &ActionEvent) {
        ctx.passive.set_direction_mode(event.control.id, self.mode);
    }

    fn deactivate(&mut self, ctx: &mut ActionContext<'_>, event: &ActionEvent) {
        ctx.passive.clear_direction_mode(event.control.id);
    }

    fn start(&mut self, _ctx: &mut ActionContext<'_>, _event: &ActionEvent) {}

    fn describe(&self) -> Description {
        let mode = format!("{:?}", self.mode);
        Description {
            text: format!("Direction mode {}", mode),
            short: mode.clone(),
            tiny: mode,
            icon: Some("settings"),
        }
    }
}

/// Overrides the hold time and interval of auto-repeat for the bound control
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepeatSettingsAction {
    pub delay_ms: u64,
    pub interval_ms: u64,
}

impl Default for RepeatSettingsAction {
    fn default() -> Self {
        Self {
            delay_ms: 500,
            interval_ms: 150,
        }
    }
}

impl Lifecycle for RepeatSettingsAction {
    fn activate(&mut self, ctx: &mut ActionContext<'_>, event: &ActionEvent) {
        ctx.passive.set_repeat(
            event.control.id,
            RepeatTiming {
                delay: Duration::from_millis(self.delay_ms),
                interval: Duration::from_millis(self.interval_ms.max(1)),
            },
        );
    }

    fn deactivate(&mut self, ctx: &mut ActionContext<'_>, event: &ActionEvent) {
        ctx.passive.clear_repeat(event.control.id);
    }

    fn start(&mut self, _ctx: &mut ActionContext<'_>, _event: &ActionEvent) {}

    fn describe(&self) -> Description {
        Description {
            text: format!(
                "Repeat after {} ms every {} ms",
                self.delay_ms, self.interval_ms
            ),
            short: format!("Repeat {}ms", self.interval_ms),
            tiny: "Rep".to_string(),
            icon: Some("settings"),
        }
    }
}
