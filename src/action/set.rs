//! All reactions configured for one (state, control) pair

use super::context::{ActionContext, ActionEvent};
use super::list::ActionList;
use super::Lifecycle;
use crate::control::{Reason, TriggeringControl};
use crate::state::StateVector;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;

/// Texts shown for a whole binding
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub description: String,
    pub short: String,
    pub tiny: String,
    pub icon: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionSet {
    state: StateVector,
    triggering: TriggeringControl,
    /// Sorted by reason, at most one list per reason
    #[serde(default)]
    lists: Vec<ActionList>,
    /// Replaces the computed description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_icon: Option<String>,

    #[serde(skip)]
    active: bool,
    #[serde(skip)]
    activation_pending: bool,
    #[serde(skip)]
    annotation: OnceCell<Annotation>,
}

impl ActionSet {
    pub fn new(state: StateVector, triggering: TriggeringControl) -> Self {
        Self {
            state,
            triggering,
            lists: Vec::new(),
            alt_text: None,
            alt_icon: None,
            active: false,
            activation_pending: false,
            annotation: OnceCell::new(),
        }
    }

    /// The exact state this binding applies to
    pub fn state(&self) -> StateVector {
        self.state
    }

    pub fn triggering(&self) -> TriggeringControl {
        self.triggering
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_activation_pending(&self) -> bool {
        self.activation_pending
    }

    pub fn mark_activation_pending(&mut self) {
        self.activation_pending = true;
    }

    /// True if no list holds an action
    pub fn is_empty(&self) -> bool {
        self.lists.iter().all(ActionList::is_empty)
    }

    pub fn lists(&self) -> &[ActionList] {
        &self.lists
    }

    pub fn reasons(&self) -> impl Iterator<Item = Reason> + '_ {
        self.lists.iter().map(ActionList::reason)
    }

    /// Replaces, inserts or (with `None`) removes the list for `reason`
    pub fn set_actions(&mut self, reason: Reason, list: Option<ActionList>) {
        let position = self.lists.binary_search_by_key(&reason, ActionList::reason);
        match (position, list) {
            (Ok(index), Some(mut list)) => {
                list.set_reason(reason);
                self.lists[index] = list;
            }
            (Err(index), Some(mut list)) => {
                list.set_reason(reason);
                self.lists.insert(index, list);
            }
            (Ok(index), None) => {
                self.lists.remove(index);
            }
            (Err(_), None) => {}
        }
        self.updated();
    }

    pub fn actions(&self, reason: Reason) -> Option<&ActionList> {
        self.lists.iter().find(|list| list.reason() == reason)
    }

    /// Mutable access for execution. Call [`Self::updated`] after editing actions.
    pub fn actions_mut(&mut self, reason: Reason) -> Option<&mut ActionList> {
        self.lists.iter_mut().find(|list| list.reason() == reason)
    }

    pub(crate) fn lists_mut(&mut self) -> &mut Vec<ActionList> {
        &mut self.lists
    }

    /// Removes every list
    pub fn clear(&mut self) {
        self.lists.clear();
        self.updated();
    }

    /// Restores ordering after deserialization. Duplicate reasons keep the first list.
    pub(crate) fn normalize(&mut self) {
        self.lists.sort_by_key(ActionList::reason);
        self.lists.dedup_by_key(|list| list.reason());
        self.updated();
    }

    /// Drops the cached annotation. Call after any structural change.
    pub fn updated(&mut self) {
        self.annotation = OnceCell::new();
    }

    pub fn annotation(&self) -> &Annotation {
        self.annotation.get_or_init(|| self.build_annotation())
    }

    fn build_annotation(&self) -> Annotation {
        let first = self.lists.iter().find_map(|list| list.actions.first());
        let described = first.map(|action| action.describe());

        let icon = self
            .alt_icon
            .clone()
            .or_else(|| described.as_ref().and_then(|d| d.icon.map(str::to_string)));

        if let Some(text) = &self.alt_text {
            return Annotation {
                description: text.clone(),
                short: text.clone(),
                tiny: text.chars().take(8).collect(),
                icon,
            };
        }

        let description = self
            .lists
            .iter()
            .filter(|list| !list.is_empty())
            .map(|list| format!("{}: {}", list.reason(), list.describe()))
            .collect::<Vec<_>>()
            .join("; ");
        let (short, tiny) = described
            .map(|d| (d.short, d.tiny))
            .unwrap_or_default();

        Annotation {
            description,
            short,
            tiny,
            icon,
        }
    }

    fn event_for(&self, state: StateVector, reason: Reason) -> ActionEvent {
        ActionEvent::new(state, self.triggering, reason)
    }

    /// Enters the state: forwards to every list, so passive settings take effect
    pub fn activate(&mut self, ctx: &mut ActionContext<'_>, current: StateVector) {
        self.active = true;
        self.activation_pending = false;
        for index in 0..self.lists.len() {
            let event = self.event_for(current, self.lists[index].reason());
            self.lists[index].activate(ctx, &event);
        }
    }

    /// Leaves the state: releases held keys and buttons and cancels running lists
    pub fn deactivate(&mut self, ctx: &mut ActionContext<'_>, current: StateVector) {
        self.active = false;
        self.activation_pending = false;
        for index in 0..self.lists.len() {
            let event = self.event_for(current, self.lists[index].reason());
            self.lists[index].deactivate(ctx, &event);
        }
    }

    pub fn is_ongoing(&self) -> bool {
        self.lists.iter().any(ActionList::is_ongoing)
    }
}
