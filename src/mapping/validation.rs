//! Structural and security validation of a collection
//!
//! `validate` prunes bindings that no longer match the state and control
//! definitions. `validate_security` rewrites bindings that could produce runaway or
//! destructive input. Neither reports errors; both return what they changed.

use super::collection::{ActionSetCollection, ActionSetId};
use crate::action::Action;
use crate::config::SecuritySettings;
use crate::control::ControlDefinitions;
use crate::state::StateDefinitions;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Sets whose state, control or direction no longer exists, or that ended up empty
    pub removed_sets: Vec<ActionSetId>,
    /// Lists whose reason the control no longer supports
    pub removed_lists: usize,
    /// Change-situation actions whose target no longer exists
    pub removed_actions: usize,
    pub rewritten_targets: usize,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.removed_sets.is_empty()
            && self.removed_lists == 0
            && self.removed_actions == 0
            && self.rewritten_targets == 0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SecurityReport {
    pub truncated_actions: usize,
    /// Sets cleared because they mix a deletion key with other text input
    pub cleared_sets: Vec<ActionSetId>,
    pub stripped_repeat_actions: usize,
}

impl SecurityReport {
    pub fn is_clean(&self) -> bool {
        self.truncated_actions == 0
            && self.cleared_sets.is_empty()
            && self.stripped_repeat_actions == 0
    }
}

impl ActionSetCollection {
    /// Prunes bindings against the current definitions.
    ///
    /// A set is removed if its control, state or direction is gone. A list is removed
    /// if the control's direction mode in the set's state no longer supports its reason.
    /// Change-situation targets are re-resolved against the set's state; unresolvable
    /// ones are dropped. Sets left without actions are removed.
    pub fn validate(
        &mut self,
        states: &dyn StateDefinitions,
        controls: &dyn ControlDefinitions,
    ) -> ValidationReport {
        let mut report = ValidationReport::default();

        for (id, set) in self.sets.iter_mut() {
            let state = set.state();
            let control = set.triggering();

            let mode = if !states.state_exists(&state) {
                None
            } else {
                controls.direction_mode(&state, control.id)
            };
            let Some(mode) = mode.filter(|mode| mode.allows(control.direction)) else {
                debug!("Dropping action set {} for {} in {}", id, control, state);
                report.removed_sets.push(*id);
                continue;
            };

            let lists = set.lists_mut();
            let before = lists.len();
            lists.retain(|list| mode.supports(list.reason()));
            report.removed_lists += before - lists.len();

            let mut rewritten = 0;
            for list in lists.iter_mut() {
                let before = list.len();
                list.actions.retain_mut(|action| {
                    let Action::ChangeSituation(change) = action else {
                        return true;
                    };
                    let old = change.target;
                    if !change.revalidate(&state, states) {
                        return false;
                    }
                    if change.target != old {
                        rewritten += 1;
                    }
                    true
                });
                report.removed_actions += before - list.len();
            }
            report.rewritten_targets += rewritten;
            set.updated();

            if set.is_empty() {
                report.removed_sets.push(*id);
            }
        }

        for id in &report.removed_sets {
            self.sets.remove(id);
        }
        self.invalidate();

        if report.is_clean() {
            debug!("Validation found nothing to prune");
        } else {
            info!(
                "Validation removed {} sets, {} lists and {} actions, rewrote {} targets",
                report.removed_sets.len(),
                report.removed_lists,
                report.removed_actions,
                report.rewritten_targets
            );
        }
        report
    }

    /// Enforces the input safety rules. Always applied before a profile runs.
    ///
    /// 1. Every list is cut to `max_actions_per_list`.
    /// 2. A set that combines a Delete or Backspace keystroke with any other keystroke,
    ///    typed text or program start is cleared completely.
    /// 3. Auto-repeat lists keep only state navigation actions.
    pub fn validate_security(&mut self, security: &SecuritySettings) -> SecurityReport {
        let mut report = SecurityReport::default();

        for (id, set) in self.sets.iter_mut() {
            for list in set.lists_mut().iter_mut() {
                report.truncated_actions += list.truncate(security.max_actions_per_list);
            }

            let mut deletions = 0;
            let mut relevant = 0;
            for action in set.lists().iter().flat_map(|list| list.actions.iter()) {
                if action.is_deletion_key() {
                    deletions += 1;
                }
                if action.is_relevant() {
                    relevant += 1;
                }
            }
            if deletions > 0 && relevant > 1 {
                warn!(
                    "Clearing action set {} for {} in {}: deletion key mixed with other input",
                    id,
                    set.triggering(),
                    set.state()
                );
                set.clear();
                report.cleared_sets.push(*id);
                continue;
            }

            let lists = set.lists_mut();
            for list in lists.iter_mut().filter(|list| list.reason().is_auto_repeat()) {
                report.stripped_repeat_actions += list.retain(Action::allowed_on_auto_repeat);
            }
            lists.retain(|list| !list.is_empty());
            set.updated();
        }

        self.invalidate();

        if !report.is_clean() {
            info!(
                "Security pass truncated {} actions, cleared {} sets, stripped {} repeat actions",
                report.truncated_actions,
                report.cleared_sets.len(),
                report.stripped_repeat_actions
            );
        }
        report
    }
}
