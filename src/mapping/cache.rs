//! Derived lookup structures of an [`ActionSetCollection`](super::ActionSetCollection)
//!
//! All three memos are dropped together on any structural change.

use super::collection::ActionSetId;
use super::table::ActionMappingTable;
use crate::control::{InputControl, TriggeringControl};
use crate::state::StateId;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TableKey {
    pub state: StateId,
    pub include_defaults: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ControlKey {
    pub state: StateId,
    pub control: TriggeringControl,
    pub include_defaults: bool,
}

#[derive(Debug, Default)]
pub struct ResolutionCache {
    /// Built lazily on first access after invalidation
    categorization: Option<HashMap<InputControl, Vec<ActionSetId>>>,
    tables: HashMap<TableKey, Arc<ActionMappingTable>>,
    controls: HashMap<ControlKey, Option<ActionSetId>>,
}

impl ResolutionCache {
    pub fn clear(&mut self) {
        self.categorization = None;
        self.tables.clear();
        self.controls.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.categorization.is_none() && self.tables.is_empty() && self.controls.is_empty()
    }

    pub fn categorization(&self) -> Option<&HashMap<InputControl, Vec<ActionSetId>>> {
        self.categorization.as_ref()
    }

    pub fn set_categorization(&mut self, index: HashMap<InputControl, Vec<ActionSetId>>) {
        self.categorization = Some(index);
    }

    pub fn table(&self, key: &TableKey) -> Option<Arc<ActionMappingTable>> {
        self.tables.get(key).cloned()
    }

    pub fn insert_table(&mut self, key: TableKey, table: Arc<ActionMappingTable>) {
        self.tables.insert(key, table);
    }

    /// `Some(None)` is a cached miss
    pub fn control(&self, key: &ControlKey) -> Option<Option<ActionSetId>> {
        self.controls.get(key).copied()
    }

    pub fn insert_control(&mut self, key: ControlKey, result: Option<ActionSetId>) {
        self.controls.insert(key, result);
    }
}
