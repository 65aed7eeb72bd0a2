//! Authoritative state hierarchy
//!
//! The resolution engine never owns the list of existing modes, pages and cells. It
//! asks a [`StateDefinitions`] implementation instead. [`StateTree`] is the concrete
//! implementation loaded from a profile document; sibling order is the declaration
//! order in the document.

use super::vector::{
    is_relative_axis, StateVector, CURRENT, MAX_CELL_ID, MAX_MODE_ID, MAX_PAGE_ID, NEXT,
    PREVIOUS,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Queries against the authoritative state hierarchy
pub trait StateDefinitions {
    /// True if the state (or pattern, for wildcard axes) names existing nodes.
    /// Relative axes are treated like wildcards.
    fn state_exists(&self, state: &StateVector) -> bool;

    /// Resolves relative axes of `target` against `reference`.
    ///
    /// Axes whose reference value is not concrete stay relative, so a binding made on a
    /// wildcard state keeps its "next page" target until it runs in a concrete state.
    /// Returns `None` if the result does not exist.
    fn resolve(&self, reference: &StateVector, target: &StateVector) -> Option<StateVector>;

    /// Human readable name, e.g. `Desktop / Main / Browser`
    fn display_name(&self, state: &StateVector) -> Option<String>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateTreeError {
    /// Ids must be positive and fit the packed state key
    #[error("{axis} id {id} is outside 1..={max}")]
    IdOutOfRange {
        axis: &'static str,
        id: i32,
        max: i32,
    },
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct StateTree {
    #[serde(default)]
    pub modes: Vec<ModeNode>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ModeNode {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub pages: Vec<PageNode>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct PageNode {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub cells: Vec<CellNode>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct CellNode {
    pub id: i32,
    pub name: String,
}

impl StateTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a rectangular tree with generated names ("Mode 1", "Page 2", "Cell 3").
    pub fn grid(modes: i32, pages: i32, cells: i32) -> Self {
        let mut tree = Self::new();
        for m in 1..=modes {
            let mode = tree.add_mode(m, format!("Mode {}", m));
            for p in 1..=pages {
                let page = mode.add_page(p, format!("Page {}", p));
                for c in 1..=cells {
                    page.add_cell(c, format!("Cell {}", c));
                }
            }
        }
        tree
    }

    pub fn add_mode(&mut self, id: i32, name: impl Into<String>) -> &mut ModeNode {
        self.modes.retain(|mode| mode.id != id);
        self.modes.push(ModeNode {
            id,
            name: name.into(),
            pages: Vec::new(),
        });
        let last = self.modes.len() - 1;
        &mut self.modes[last]
    }

    pub fn remove_mode(&mut self, id: i32) -> bool {
        let before = self.modes.len();
        self.modes.retain(|mode| mode.id != id);
        before != self.modes.len()
    }

    pub fn mode(&self, id: i32) -> Option<&ModeNode> {
        self.modes.iter().find(|mode| mode.id == id)
    }

    pub fn mode_mut(&mut self, id: i32) -> Option<&mut ModeNode> {
        self.modes.iter_mut().find(|mode| mode.id == id)
    }

    /// Checks that every declared id is usable as a state axis value.
    pub fn check_ids(&self) -> Result<(), StateTreeError> {
        for mode in &self.modes {
            check_id("mode", mode.id, MAX_MODE_ID)?;
            for page in &mode.pages {
                check_id("page", page.id, MAX_PAGE_ID)?;
                for cell in &page.cells {
                    check_id("cell", cell.id, MAX_CELL_ID)?;
                }
            }
        }
        Ok(())
    }

    /// Turns a state pattern into a concrete device state.
    ///
    /// Wildcard axes take the first declared child with a usable id; levels without
    /// such children stay wildcards. Returns `None` for relative or missing states.
    pub fn settle(&self, state: &StateVector) -> Option<StateVector> {
        if state.is_relative() || !self.state_exists(state) {
            return None;
        }

        let mode = match concrete(state.mode) {
            Some(id) => self.mode(id)?,
            None => match self.modes.iter().find(|m| (1..=MAX_MODE_ID).contains(&m.id)) {
                Some(mode) => mode,
                None => return Some(*state),
            },
        };
        let mut settled = state.with_mode(mode.id);

        let page = match concrete(state.page) {
            Some(id) => mode.page(id)?,
            None => match mode.pages.iter().find(|p| (1..=MAX_PAGE_ID).contains(&p.id)) {
                Some(page) => page,
                None => return Some(settled),
            },
        };
        settled = settled.with_page(page.id);

        if !is_concrete(state.cell) {
            if let Some(cell) = page.cells.iter().find(|c| (1..=MAX_CELL_ID).contains(&c.id)) {
                settled = settled.with_cell(cell.id);
            }
        }
        Some(settled)
    }

    fn candidate_modes(&self, mode: i32) -> Vec<&ModeNode> {
        if is_concrete(mode) {
            self.mode(mode).into_iter().collect()
        } else {
            self.modes.iter().collect()
        }
    }

    fn candidate_pages(&self, mode: i32, page: i32) -> Vec<&PageNode> {
        self.candidate_modes(mode)
            .into_iter()
            .flat_map(|m| m.pages.iter())
            .filter(|p| !is_concrete(page) || p.id == page)
            .collect()
    }

    fn sibling_ids(&self, reference: &StateVector, axis: Axis) -> Option<Vec<i32>> {
        match axis {
            Axis::Mode => Some(self.modes.iter().map(|m| m.id).collect()),
            Axis::Page => {
                let mode = self.mode(concrete(reference.mode)?)?;
                Some(mode.pages.iter().map(|p| p.id).collect())
            }
            Axis::Cell => {
                let mode = self.mode(concrete(reference.mode)?)?;
                let page = mode.page(concrete(reference.page)?)?;
                Some(page.cells.iter().map(|c| c.id).collect())
            }
        }
    }
}

impl ModeNode {
    pub fn add_page(&mut self, id: i32, name: impl Into<String>) -> &mut PageNode {
        self.pages.retain(|page| page.id != id);
        self.pages.push(PageNode {
            id,
            name: name.into(),
            cells: Vec::new(),
        });
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    pub fn remove_page(&mut self, id: i32) -> bool {
        let before = self.pages.len();
        self.pages.retain(|page| page.id != id);
        before != self.pages.len()
    }

    pub fn page(&self, id: i32) -> Option<&PageNode> {
        self.pages.iter().find(|page| page.id == id)
    }

    pub fn page_mut(&mut self, id: i32) -> Option<&mut PageNode> {
        self.pages.iter_mut().find(|page| page.id == id)
    }
}

impl PageNode {
    pub fn add_cell(&mut self, id: i32, name: impl Into<String>) -> &mut Self {
        self.cells.retain(|cell| cell.id != id);
        self.cells.push(CellNode {
            id,
            name: name.into(),
        });
        self
    }

    pub fn remove_cell(&mut self, id: i32) -> bool {
        let before = self.cells.len();
        self.cells.retain(|cell| cell.id != id);
        before != self.cells.len()
    }

    pub fn cell(&self, id: i32) -> Option<&CellNode> {
        self.cells.iter().find(|cell| cell.id == id)
    }
}

impl StateDefinitions for StateTree {
    fn state_exists(&self, state: &StateVector) -> bool {
        if !state.fits_id() {
            return false;
        }
        if state.is_global() {
            return true;
        }
        let modes = self.candidate_modes(state.mode);
        if modes.is_empty() {
            return false;
        }
        if !is_concrete(state.page) && !is_concrete(state.cell) {
            return true;
        }
        let pages = self.candidate_pages(state.mode, state.page);
        if pages.is_empty() {
            return false;
        }
        !is_concrete(state.cell) || pages.iter().any(|page| page.cell(state.cell).is_some())
    }

    fn resolve(&self, reference: &StateVector, target: &StateVector) -> Option<StateVector> {
        let mut resolved = *target;
        resolved.mode = self.resolve_axis(reference, &resolved, Axis::Mode)?;
        resolved.page = self.resolve_axis(reference, &resolved, Axis::Page)?;
        resolved.cell = self.resolve_axis(reference, &resolved, Axis::Cell)?;

        if self.state_exists(&resolved) {
            Some(resolved)
        } else {
            None
        }
    }

    fn display_name(&self, state: &StateVector) -> Option<String> {
        if !self.state_exists(state) {
            return None;
        }
        if state.is_global() {
            return Some("Global".to_string());
        }

        let mut parts = Vec::new();
        if let Some(mode) = concrete(state.mode).and_then(|id| self.mode(id)) {
            parts.push(mode.name.clone());
        }
        if let Some(page_id) = concrete(state.page) {
            if let Some(page) = self.candidate_pages(state.mode, page_id).first() {
                parts.push(page.name.clone());
            }
        }
        if let Some(cell_id) = concrete(state.cell) {
            let cell = self
                .candidate_pages(state.mode, state.page)
                .into_iter()
                .find_map(|page| page.cell(cell_id));
            if let Some(cell) = cell {
                parts.push(cell.name.clone());
            }
        }
        Some(parts.join(" / "))
    }
}

#[derive(Clone, Copy, Debug)]
enum Axis {
    Mode,
    Page,
    Cell,
}

impl StateTree {
    /// Resolves one axis of `target`. Higher axes of `target` must already be resolved
    /// because sibling lists depend on them.
    fn resolve_axis(
        &self,
        reference: &StateVector,
        target: &StateVector,
        axis: Axis,
    ) -> Option<i32> {
        let (wanted, current) = match axis {
            Axis::Mode => (target.mode, reference.mode),
            Axis::Page => (target.page, reference.page),
            Axis::Cell => (target.cell, reference.cell),
        };

        if !is_relative_axis(wanted) || !is_concrete(current) {
            return Some(wanted);
        }

        match wanted {
            CURRENT => Some(current),
            NEXT | PREVIOUS => {
                // Higher axes of `target` are resolved, so its siblings are the new scope.
                let Some(siblings) = self.sibling_ids(target, axis) else {
                    return Some(wanted);
                };
                let position = siblings.iter().position(|id| *id == current)?;
                let len = siblings.len();
                let index = if wanted == NEXT {
                    (position + 1) % len
                } else {
                    (position + len - 1) % len
                };
                Some(siblings[index])
            }
            _ => None,
        }
    }
}

fn check_id(axis: &'static str, id: i32, max: i32) -> Result<(), StateTreeError> {
    if (1..=max).contains(&id) {
        Ok(())
    } else {
        Err(StateTreeError::IdOutOfRange { axis, id, max })
    }
}

fn is_concrete(value: i32) -> bool {
    value > 0
}

fn concrete(value: i32) -> Option<i32> {
    if is_concrete(value) {
        Some(value)
    } else {
        None
    }
}

/// Used by the display code for targets that are still partly relative.
pub fn describe_relative(target: &StateVector) -> String {
    let label = |value: i32, noun: &str| match value {
        NEXT => Some(format!("next {}", noun)),
        PREVIOUS => Some(format!("previous {}", noun)),
        _ => None,
    };
    [
        label(target.mode, "mode"),
        label(target.page, "page"),
        label(target.cell, "cell"),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::vector::ANY;

    fn tree() -> StateTree {
        let mut tree = StateTree::new();
        let desktop = tree.add_mode(1, "Desktop");
        desktop
            .add_page(1, "Main")
            .add_cell(1, "Browser")
            .add_cell(2, "Mail");
        desktop.add_page(2, "Media").add_cell(1, "Player");
        tree.add_mode(2, "Game").add_page(1, "Driving");
        tree
    }

    #[test]
    fn existence_handles_wildcards() {
        let tree = tree();
        assert!(tree.state_exists(&StateVector::GLOBAL));
        assert!(tree.state_exists(&StateVector::mode_level(1)));
        assert!(tree.state_exists(&StateVector::new(1, 1, 2)));
        assert!(tree.state_exists(&StateVector::new(1, ANY, 2)));
        assert!(!tree.state_exists(&StateVector::new(1, 2, 2)));
        assert!(!tree.state_exists(&StateVector::mode_level(3)));
        assert!(tree.state_exists(&StateVector::new(ANY, 1, ANY)));
    }

    #[test]
    fn ids_that_do_not_pack_are_rejected() {
        let mut tree = tree();
        assert_eq!(tree.check_ids(), Ok(()));

        tree.add_mode(3, "Wide").add_page(200, "Far").add_cell(1, "Only");
        assert_eq!(
            tree.check_ids(),
            Err(StateTreeError::IdOutOfRange {
                axis: "page",
                id: 200,
                max: MAX_PAGE_ID,
            })
        );
        assert!(!tree.state_exists(&StateVector::new(3, 200, 1)));
        assert_eq!(tree.settle(&StateVector::new(3, 200, 1)), None);
        // Only the unusable page below mode 3, so the page axis stays open
        assert_eq!(
            tree.settle(&StateVector::mode_level(3)),
            Some(StateVector::mode_level(3))
        );
    }

    #[test]
    fn resolves_next_page_with_wrap() {
        let tree = tree();
        let reference = StateVector::new(1, 2, 1);
        let target = StateVector::new(CURRENT, NEXT, ANY);
        assert_eq!(
            tree.resolve(&reference, &target),
            Some(StateVector::page_level(1, 1))
        );
    }

    #[test]
    fn resolves_previous_cell() {
        let tree = tree();
        let reference = StateVector::new(1, 1, 1);
        let target = StateVector::new(CURRENT, CURRENT, PREVIOUS);
        assert_eq!(
            tree.resolve(&reference, &target),
            Some(StateVector::new(1, 1, 2))
        );
    }

    #[test]
    fn relative_axes_stay_relative_on_wildcard_reference() {
        let tree = tree();
        let reference = StateVector::mode_level(1);
        let target = StateVector::new(CURRENT, NEXT, ANY);
        assert_eq!(
            tree.resolve(&reference, &target),
            Some(StateVector::new(1, NEXT, ANY))
        );
    }

    #[test]
    fn missing_target_does_not_resolve() {
        let tree = tree();
        let reference = StateVector::new(2, 1, ANY);
        assert_eq!(tree.resolve(&reference, &StateVector::new(CURRENT, 5, ANY)), None);
    }

    #[test]
    fn settle_fills_wildcards_with_first_child() {
        let tree = tree();
        assert_eq!(
            tree.settle(&StateVector::GLOBAL),
            Some(StateVector::new(1, 1, 1))
        );
        assert_eq!(
            tree.settle(&StateVector::page_level(1, 2)),
            Some(StateVector::new(1, 2, 1))
        );
        // Driving has no cells
        assert_eq!(
            tree.settle(&StateVector::mode_level(2)),
            Some(StateVector::page_level(2, 1))
        );
        assert_eq!(tree.settle(&StateVector::mode_level(3)), None);
        assert_eq!(tree.settle(&StateVector::new(1, NEXT, ANY)), None);
    }

    #[test]
    fn display_names_join_levels() {
        let tree = tree();
        assert_eq!(
            tree.display_name(&StateVector::new(1, 1, 2)).as_deref(),
            Some("Desktop / Main / Mail")
        );
        assert_eq!(
            tree.display_name(&StateVector::GLOBAL).as_deref(),
            Some("Global")
        );
        assert_eq!(tree.display_name(&StateVector::mode_level(9)), None);
    }
}
