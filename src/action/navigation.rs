//! Actions that move the device to another state

use super::context::{ActionContext, ActionEvent};
use super::effects::UiEvent;
use super::{Description, Lifecycle};
use crate::state::tree::describe_relative;
use crate::state::{StateDefinitions, StateVector, CURRENT, NEXT, PREVIOUS};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Resolves `target` against the state the event fired in and asks the driver to
/// switch there. Returns false if the target does not exist.
fn request_resolved(
    ctx: &mut ActionContext<'_>,
    event: &ActionEvent,
    target: &StateVector,
) -> bool {
    match ctx.states.resolve(&event.state, target) {
        Some(resolved) if !resolved.is_relative() => {
            debug!("Requesting state {} from {}", resolved, event.state);
            ctx.request_state(resolved);
            true
        }
        _ => {
            warn!(
                "Target {} cannot be reached from {}",
                target, event.state
            );
            ctx.effects.submit(UiEvent::error(format!(
                "Target state {} does not exist",
                target
            )));
            false
        }
    }
}

/// Switches to another (possibly relative) state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeSituationAction {
    pub target: StateVector,
    /// Cached name of the target, refreshed by validation
    #[serde(default)]
    pub display_name: String,
}

impl Default for ChangeSituationAction {
    fn default() -> Self {
        Self::new(StateVector::new(CURRENT, NEXT, CURRENT))
    }
}

impl ChangeSituationAction {
    pub fn new(target: StateVector) -> Self {
        Self {
            target,
            display_name: String::new(),
        }
    }

    /// Rewrites the target against the state the binding belongs to.
    ///
    /// Axes that the binding state fixes are made absolute; axes it leaves open stay
    /// relative. Returns false if the target no longer exists.
    pub fn revalidate(&mut self, bound: &StateVector, states: &dyn StateDefinitions) -> bool {
        let Some(resolved) = states.resolve(bound, &self.target) else {
            return false;
        };
        self.target = resolved;
        self.display_name = if resolved.is_relative() {
            describe_relative(&resolved)
        } else {
            states
                .display_name(&resolved)
                .unwrap_or_else(|| resolved.to_string())
        };
        true
    }

    fn target_label(&self) -> String {
        if !self.display_name.is_empty() {
            self.display_name.clone()
        } else if self.target.is_relative() {
            describe_relative(&self.target)
        } else {
            self.target.to_string()
        }
    }
}

impl Lifecycle for ChangeSituationAction {
    fn start(&mut self, ctx: &mut ActionContext<'_>, event: &ActionEvent) {
        request_resolved(ctx, event, &self.target);
    }

    fn describe(&self) -> Description {
        let label = self.target_label();
        Description {
            text: format!("Go to {}", label),
            short: format!("Go to {}", label),
            tiny: label,
            icon: Some("state"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellStep {
    #[default]
    Next,
    Previous,
}

/// Moves to the neighbouring cell of the current page, wrapping around
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigateCellsAction {
    #[serde(default)]
    pub step: CellStep,
}

impl NavigateCellsAction {
    fn target(&self) -> StateVector {
        let cell = match self.step {
            CellStep::Next => NEXT,
            CellStep::Previous => PREVIOUS,
        };
        StateVector::new(CURRENT, CURRENT, cell)
    }
}

impl Lifecycle for NavigateCellsAction {
    fn start(&mut self, ctx: &mut ActionContext<'_>, event: &ActionEvent) {
        request_resolved(ctx, event, &self.target());
    }

    fn describe(&self) -> Description {
        let (text, tiny) = match self.step {
            CellStep::Next => ("Next cell", ">"),
            CellStep::Previous => ("Previous cell", "<"),
        };
        Description {
            text: text.to_string(),
            short: text.to_string(),
            tiny: tiny.to_string(),
            icon: Some("state"),
        }
    }
}
