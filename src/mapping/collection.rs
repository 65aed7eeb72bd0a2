//! Authoritative store of every binding of one input source

use super::cache::{ControlKey, ResolutionCache, TableKey};
use super::table::ActionMappingTable;
use crate::action::{Action, ActionList, ActionSet};
use crate::control::{InputControl, Reason, SettingKind, TriggeringControl};
use crate::state::StateVector;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Stable handle of an [`ActionSet`] inside its collection
///
/// Ids are handed out in increasing order and never reused, so iteration order is
/// insertion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionSetId(pub u64);

impl fmt::Display for ActionSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct ActionSetCollection {
    pub(super) sets: BTreeMap<ActionSetId, ActionSet>,
    next_id: u64,
    pub(super) cache: ResolutionCache,
}

impl ActionSetCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sets(sets: impl IntoIterator<Item = ActionSet>) -> Self {
        let mut collection = Self::new();
        for set in sets {
            collection.add_action_set(set);
        }
        collection
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActionSetId, &ActionSet)> {
        self.sets.iter().map(|(id, set)| (*id, set))
    }

    pub fn ids(&self) -> Vec<ActionSetId> {
        self.sets.keys().copied().collect()
    }

    pub fn action_set(&self, id: ActionSetId) -> Option<&ActionSet> {
        self.sets.get(&id)
    }

    /// Mutable access for execution. State and control of a set cannot change through
    /// this, so the caches stay valid; structural edits go through
    /// [`Self::update_action_set`].
    pub fn action_set_mut(&mut self, id: ActionSetId) -> Option<&mut ActionSet> {
        self.sets.get_mut(&id)
    }

    pub fn find(&self, state: &StateVector, triggering: &TriggeringControl) -> Option<ActionSetId> {
        self.sets
            .iter()
            .find(|(_, set)| set.state() == *state && set.triggering() == *triggering)
            .map(|(id, _)| *id)
    }

    /// Adds a set, replacing an existing set bound to the same state and control
    pub fn add_action_set(&mut self, mut set: ActionSet) -> ActionSetId {
        set.normalize();
        let id = match self.find(&set.state(), &set.triggering()) {
            Some(existing) => {
                debug!(
                    "Replacing action set {} for {} in {}",
                    existing,
                    set.triggering(),
                    set.state()
                );
                existing
            }
            None => {
                let id = ActionSetId(self.next_id);
                self.next_id += 1;
                id
            }
        };
        self.sets.insert(id, set);
        self.invalidate();
        id
    }

    pub fn remove_action_set(&mut self, id: ActionSetId) -> Option<ActionSet> {
        let removed = self.sets.remove(&id);
        if removed.is_some() {
            self.invalidate();
        }
        removed
    }

    /// Applies a structural edit to one set. Returns false if the id is unknown.
    pub fn update_action_set(
        &mut self,
        id: ActionSetId,
        edit: impl FnOnce(&mut ActionSet),
    ) -> bool {
        let Some(set) = self.sets.get_mut(&id) else {
            return false;
        };
        edit(set);
        set.updated();
        self.invalidate();
        true
    }

    /// Binds `actions` to `reason` of the (state, control) pair, creating the set if
    /// needed. An empty `actions` removes the list.
    pub fn bind(
        &mut self,
        state: StateVector,
        triggering: TriggeringControl,
        reason: Reason,
        actions: Vec<Action>,
    ) -> ActionSetId {
        let list = (!actions.is_empty()).then(|| ActionList::new(reason, actions));
        match self.find(&state, &triggering) {
            Some(id) => {
                self.update_action_set(id, |set| set.set_actions(reason, list));
                id
            }
            None => {
                let mut set = ActionSet::new(state, triggering);
                set.set_actions(reason, list);
                self.add_action_set(set)
            }
        }
    }

    /// Drops every memo. Called by every structural change.
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Sets whose state contains `state`, i.e. every binding that applies there
    pub fn sets_containing(&self, state: &StateVector) -> Vec<ActionSetId> {
        self.sets
            .iter()
            .filter(|(_, set)| set.state().contains(state))
            .map(|(id, _)| *id)
            .collect()
    }

    fn categorized(&mut self, control: &InputControl) -> Vec<ActionSetId> {
        if self.cache.categorization().is_none() {
            let mut index: HashMap<InputControl, Vec<ActionSetId>> = HashMap::new();
            for (id, set) in &self.sets {
                index.entry(set.triggering().input()).or_default().push(*id);
            }
            debug!("Categorized {} action sets into {} controls", self.sets.len(), index.len());
            self.cache.set_categorization(index);
        }
        self.cache
            .categorization()
            .and_then(|index| index.get(control))
            .cloned()
            .unwrap_or_default()
    }

    /// Lookup table for `state`
    ///
    /// With `include_defaults` the table links to tables of every parent state. Only
    /// the first parent is expanded further; the others contribute their exact
    /// bindings, so ancestors shared by two parents are not searched twice.
    pub fn get_actions_for_state(
        &mut self,
        state: &StateVector,
        include_defaults: bool,
    ) -> Arc<ActionMappingTable> {
        let key = TableKey {
            state: state.id(),
            include_defaults,
        };
        if let Some(table) = self.cache.table(&key) {
            return table;
        }

        let mut inputs = HashMap::new();
        for (id, set) in &self.sets {
            if set.state() == *state {
                inputs.entry(set.triggering().input()).or_insert(*id);
            }
        }

        let parents = if include_defaults {
            state
                .parent_states()
                .iter()
                .enumerate()
                .map(|(index, parent)| self.get_actions_for_state(parent, index == 0))
                .collect()
        } else {
            Vec::new()
        };

        let table = Arc::new(ActionMappingTable::new(*state, inputs, parents));
        self.cache.insert_table(key, table.clone());
        table
    }

    /// Resolves the binding for one control in `state`.
    ///
    /// Without defaults only a set bound to exactly `state` counts. With defaults the
    /// narrowest set whose state contains `state` wins; between equally narrow sets the
    /// first in insertion order wins, unless a later one was made for the control's
    /// current setting kind. An inherited analog stick binding is rejected when exactly
    /// one side of it is continuous.
    pub fn get_actions_for_input_control(
        &mut self,
        state: &StateVector,
        control: &TriggeringControl,
        include_defaults: bool,
    ) -> Option<ActionSetId> {
        let key = ControlKey {
            state: state.id(),
            control: *control,
            include_defaults,
        };
        if let Some(cached) = self.cache.control(&key) {
            return cached;
        }

        let result = self.resolve_control(state, control, include_defaults);
        self.cache.insert_control(key, result);
        result
    }

    fn resolve_control(
        &mut self,
        state: &StateVector,
        control: &TriggeringControl,
        include_defaults: bool,
    ) -> Option<ActionSetId> {
        let candidates = self.categorized(&control.input());

        if !include_defaults {
            let exact = |setting_matches: bool| {
                candidates.iter().copied().find(|id| {
                    self.sets.get(id).is_some_and(|set| {
                        set.state() == *state
                            && (!setting_matches || set.triggering().setting == control.setting)
                    })
                })
            };
            return exact(true).or_else(|| exact(false));
        }

        let mut best: Option<(ActionSetId, &ActionSet)> = None;
        for id in &candidates {
            let Some(set) = self.sets.get(id) else {
                continue;
            };
            if !set.state().contains(state) {
                continue;
            }
            best = match best {
                None => Some((*id, set)),
                Some((_, current))
                    if current.state() != set.state()
                        && current.state().contains(&set.state()) =>
                {
                    Some((*id, set))
                }
                Some((_, current))
                    if current.state() == set.state()
                        && current.triggering().setting != control.setting
                        && set.triggering().setting == control.setting =>
                {
                    Some((*id, set))
                }
                keep => keep,
            };
        }

        let (id, set) = best?;
        if set.state() != *state && control.id.is_analog_stick() {
            let bound_continuous = set.triggering().setting == SettingKind::Continuous;
            let queried_continuous = control.setting == SettingKind::Continuous;
            if bound_continuous != queried_continuous {
                debug!(
                    "Not inheriting {} binding from {} into {}: continuous and discrete differ",
                    control,
                    set.state(),
                    state
                );
                return None;
            }
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::effects::KeyCode;
    use crate::action::{ActionType, ChangeSituationAction, KeyAction};
    use crate::control::{ControlId, Direction};
    use crate::state::{ANY, CURRENT, NEXT};

    const BUTTON1: TriggeringControl = TriggeringControl::button(ControlId::Button1);

    fn change() -> Vec<Action> {
        vec![Action::ChangeSituation(ChangeSituationAction::new(
            StateVector::new(CURRENT, NEXT, ANY),
        ))]
    }

    fn key(code: KeyCode) -> Vec<Action> {
        vec![Action::Key(KeyAction::stroke(code))]
    }

    #[test]
    fn mode_level_binding_reaches_cell() {
        let mut collection = ActionSetCollection::new();
        let mode = collection.bind(StateVector::mode_level(1), BUTTON1, Reason::Pressed, change());
        collection.bind(
            StateVector::page_level(1, 2),
            TriggeringControl::button(ControlId::Button2),
            Reason::Pressed,
            key(KeyCode::Enter),
        );

        let query = StateVector::new(1, 2, 3);
        assert_eq!(
            collection.get_actions_for_input_control(&query, &BUTTON1, true),
            Some(mode)
        );
        assert_eq!(
            collection
                .get_actions_for_state(&query, true)
                .get_actions(&BUTTON1.input(), true),
            Some(mode)
        );
        assert_eq!(
            collection.get_actions_for_input_control(&query, &BUTTON1, false),
            None
        );

        let set = collection.action_set(mode).unwrap();
        assert!(matches!(
            set.actions(Reason::Pressed).unwrap().actions.as_slice(),
            [Action::ChangeSituation(_)]
        ));
    }

    #[test]
    fn most_specific_binding_wins() {
        let mut collection = ActionSetCollection::new();
        // Narrow one first, so insertion order cannot explain the result
        let page = collection.bind(
            StateVector::page_level(1, 2),
            BUTTON1,
            Reason::Pressed,
            key(KeyCode::Tab),
        );
        collection.bind(StateVector::mode_level(1), BUTTON1, Reason::Pressed, key(KeyCode::Enter));
        collection.bind(StateVector::GLOBAL, BUTTON1, Reason::Pressed, key(KeyCode::Escape));

        assert_eq!(
            collection.get_actions_for_input_control(&StateVector::new(1, 2, 3), &BUTTON1, true),
            Some(page)
        );
    }

    #[test]
    fn equally_narrow_candidates_keep_scan_order() {
        let mut collection = ActionSetCollection::new();
        let any_page = collection.bind(
            StateVector::new(1, ANY, 3),
            BUTTON1,
            Reason::Pressed,
            key(KeyCode::Tab),
        );
        collection.bind(
            StateVector::page_level(1, 2),
            BUTTON1,
            Reason::Pressed,
            key(KeyCode::Enter),
        );

        assert_eq!(
            collection.get_actions_for_input_control(&StateVector::new(1, 2, 3), &BUTTON1, true),
            Some(any_page)
        );
    }

    #[test]
    fn table_prefers_any_page_parent() {
        let mut collection = ActionSetCollection::new();
        let any_page = collection.bind(
            StateVector::new(1, ANY, 3),
            BUTTON1,
            Reason::Pressed,
            key(KeyCode::Tab),
        );
        collection.bind(
            StateVector::page_level(1, 2),
            BUTTON1,
            Reason::Pressed,
            key(KeyCode::Enter),
        );

        let table = collection.get_actions_for_state(&StateVector::new(1, 2, 3), true);
        assert_eq!(table.get_actions(&BUTTON1.input(), true), Some(any_page));
        assert_eq!(table.parents().len(), 2);
        // Only the first parent is expanded
        assert_eq!(table.parents()[0].parents().len(), 1);
        assert!(table.parents()[1].parents().is_empty());
    }

    #[test]
    fn cache_follows_add_and_remove() {
        let mut collection = ActionSetCollection::new();
        let query = StateVector::new(1, 2, 3);
        let mode = collection.bind(
            StateVector::mode_level(1),
            BUTTON1,
            Reason::Pressed,
            key(KeyCode::Tab),
        );
        assert_eq!(collection.get_actions_for_input_control(&query, &BUTTON1, true), Some(mode));
        assert!(!collection.cache().is_empty());

        let mut narrow = ActionSet::new(StateVector::page_level(1, 2), BUTTON1);
        narrow.set_actions(
            Reason::Pressed,
            Some(ActionList::new(Reason::Pressed, key(KeyCode::Enter))),
        );
        let page = collection.add_action_set(narrow);
        assert!(collection.cache().is_empty());
        assert_eq!(collection.get_actions_for_input_control(&query, &BUTTON1, true), Some(page));
        assert_eq!(
            collection.get_actions_for_state(&query, true).get_actions(&BUTTON1.input(), true),
            Some(page)
        );

        collection.remove_action_set(page);
        assert_eq!(collection.get_actions_for_input_control(&query, &BUTTON1, true), Some(mode));

        collection.remove_action_set(mode);
        assert_eq!(collection.get_actions_for_input_control(&query, &BUTTON1, true), None);
    }

    #[test]
    fn add_replaces_same_binding() {
        let mut collection = ActionSetCollection::new();
        let first = collection.bind(
            StateVector::mode_level(1),
            BUTTON1,
            Reason::Pressed,
            key(KeyCode::Tab),
        );
        let mut replacement = ActionSet::new(StateVector::mode_level(1), BUTTON1);
        replacement.set_actions(
            Reason::Released,
            Some(ActionList::new(Reason::Released, key(KeyCode::Enter))),
        );

        assert_eq!(collection.add_action_set(replacement), first);
        assert_eq!(collection.len(), 1);
        let set = collection.action_set(first).unwrap();
        assert!(set.actions(Reason::Pressed).is_none());
        assert!(set.actions(Reason::Released).is_some());
    }

    #[test]
    fn bind_with_no_actions_removes_list() {
        let mut collection = ActionSetCollection::new();
        let id = collection.bind(StateVector::GLOBAL, BUTTON1, Reason::Pressed, key(KeyCode::Tab));
        collection.bind(StateVector::GLOBAL, BUTTON1, Reason::Pressed, Vec::new());
        assert!(collection.action_set(id).unwrap().is_empty());
    }

    #[test]
    fn stick_bindings_do_not_cross_setting_kinds() {
        let mut collection = ActionSetCollection::new();
        let continuous = TriggeringControl::continuous(ControlId::LeftStick);
        let discrete_center = TriggeringControl {
            setting: SettingKind::Discrete,
            ..continuous
        };
        let steer = vec![Action::from_type(ActionType::SteerPointer)];
        let mode = collection.bind(StateVector::mode_level(1), continuous, Reason::Updated, steer);

        let query = StateVector::new(1, 1, 1);
        assert_eq!(collection.get_actions_for_input_control(&query, &continuous, true), Some(mode));
        assert_eq!(collection.get_actions_for_input_control(&query, &discrete_center, true), None);

        // Exact matches are never rejected
        assert_eq!(
            collection.get_actions_for_input_control(
                &StateVector::mode_level(1),
                &discrete_center,
                true,
            ),
            Some(mode)
        );

        let up = TriggeringControl::discrete(ControlId::LeftStick, Direction::Up);
        assert_eq!(collection.get_actions_for_input_control(&query, &up, true), None);
    }

    #[test]
    fn exact_lookup_prefers_matching_setting() {
        let mut collection = ActionSetCollection::new();
        let continuous = TriggeringControl::continuous(ControlId::RightStick);
        let discrete_center = TriggeringControl {
            setting: SettingKind::Discrete,
            ..continuous
        };
        let state = StateVector::mode_level(2);
        collection.bind(state, continuous, Reason::Undirected, key(KeyCode::Tab));
        let discrete = collection.bind(
            state,
            discrete_center,
            Reason::Undirected,
            key(KeyCode::Enter),
        );

        assert_eq!(
            collection.get_actions_for_input_control(&state, &discrete_center, false),
            Some(discrete)
        );
        assert_eq!(
            collection.get_actions_for_input_control(&state, &discrete_center, true),
            Some(discrete)
        );
    }
}
