//! Per-state lookup table with inherited parents

use super::collection::ActionSetId;
use crate::control::InputControl;
use crate::state::StateVector;
use std::collections::HashMap;
use std::sync::Arc;

/// Snapshot of the bindings of one exact state, linked to its parents' tables
///
/// Tables store [`ActionSetId`]s rather than references, so a table outliving a
/// structural change resolves removed sets to nothing instead of dangling.
#[derive(Debug, Default)]
pub struct ActionMappingTable {
    state: StateVector,
    inputs: HashMap<InputControl, ActionSetId>,
    /// One per entry of `state.parent_states()`, same order
    parents: Vec<Arc<ActionMappingTable>>,
}

impl ActionMappingTable {
    pub fn new(
        state: StateVector,
        inputs: HashMap<InputControl, ActionSetId>,
        parents: Vec<Arc<ActionMappingTable>>,
    ) -> Self {
        Self {
            state,
            inputs,
            parents,
        }
    }

    pub fn state(&self) -> StateVector {
        self.state
    }

    pub fn parents(&self) -> &[Arc<ActionMappingTable>] {
        &self.parents
    }

    /// Exact entries of this state only
    pub fn own_entries(&self) -> impl Iterator<Item = (&InputControl, &ActionSetId)> {
        self.inputs.iter()
    }

    /// Looks up `control`, optionally through the parents.
    ///
    /// Parents are searched in two phases. First every parent's own exact entry, in
    /// parent order. Only if none has one, every parent recursively. A nearer parent's
    /// own binding therefore beats anything found deeper in the hierarchy, even
    /// through the first parent.
    pub fn get_actions(
        &self,
        control: &InputControl,
        include_defaults: bool,
    ) -> Option<ActionSetId> {
        if let Some(id) = self.inputs.get(control) {
            return Some(*id);
        }
        if !include_defaults {
            return None;
        }

        self.parents
            .iter()
            .find_map(|parent| parent.get_actions(control, false))
            .or_else(|| {
                self.parents
                    .iter()
                    .find_map(|parent| parent.get_actions(control, true))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlId;
    use crate::state::ANY;

    const BUTTON: InputControl = InputControl::button(ControlId::Button1);

    fn table(
        state: StateVector,
        entry: Option<u64>,
        parents: Vec<Arc<ActionMappingTable>>,
    ) -> Arc<ActionMappingTable> {
        let inputs = entry
            .map(|id| HashMap::from([(BUTTON, ActionSetId(id))]))
            .unwrap_or_default();
        Arc::new(ActionMappingTable::new(state, inputs, parents))
    }

    #[test]
    fn exact_entry_wins() {
        let parent = table(StateVector::mode_level(1), Some(1), Vec::new());
        let child = table(StateVector::page_level(1, 2), Some(2), vec![parent]);
        assert_eq!(child.get_actions(&BUTTON, true), Some(ActionSetId(2)));
    }

    #[test]
    fn without_defaults_parents_are_ignored() {
        let parent = table(StateVector::mode_level(1), Some(1), Vec::new());
        let child = table(StateVector::page_level(1, 2), None, vec![parent]);
        assert_eq!(child.get_actions(&BUTTON, false), None);
        assert_eq!(child.get_actions(&BUTTON, true), Some(ActionSetId(1)));
    }

    #[test]
    fn any_page_parent_beats_any_cell_parent() {
        let any_page = table(StateVector::new(1, ANY, 3), Some(10), Vec::new());
        let any_cell = table(StateVector::new(1, 2, ANY), Some(20), Vec::new());
        let cell = table(StateVector::new(1, 2, 3), None, vec![any_page, any_cell]);
        assert_eq!(cell.get_actions(&BUTTON, true), Some(ActionSetId(10)));
    }

    #[test]
    fn parent_own_entry_beats_deeper_recursion() {
        let mode = table(StateVector::mode_level(1), Some(1), Vec::new());
        let any_page = table(StateVector::new(1, ANY, 3), None, vec![mode]);
        let any_cell = table(StateVector::new(1, 2, ANY), Some(2), Vec::new());
        let cell = table(StateVector::new(1, 2, 3), None, vec![any_page, any_cell]);

        // Phase A finds (1, 2, *) before phase B would reach (1, *, *)
        assert_eq!(cell.get_actions(&BUTTON, true), Some(ActionSetId(2)));
    }

    #[test]
    fn recursion_reaches_grandparents() {
        let global = table(StateVector::GLOBAL, Some(7), Vec::new());
        let mode = table(StateVector::mode_level(1), None, vec![global]);
        let page = table(StateVector::page_level(1, 1), None, vec![mode]);
        assert_eq!(page.get_actions(&BUTTON, true), Some(ActionSetId(7)));
        assert_eq!(
            page.get_actions(&InputControl::button(ControlId::Button2), true),
            None
        );
    }
}
