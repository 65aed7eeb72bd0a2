//! Hierarchical state identifier
//!
//! A [`StateVector`] names the logical situation a control is evaluated in. The three
//! axes form a hierarchy (mode > page > cell) and any axis may be left as the [`ANY`]
//! wildcard, which turns the vector into a pattern matching every value on that axis.
//!
//! ```text
//!                 (ANY, ANY, ANY)
//!                        │
//!                  (1, ANY, ANY)
//!                  ╱            ╲
//!         (1, ANY, 3)        (1, 2, ANY)
//!                  ╲            ╱
//!                    (1, 2, 3)
//! ```
//!
//! A cell-level vector with a specific page has two parents. The "any page" parent is
//! always listed first; lookups rely on that ordering.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wildcard: matches every value on its axis.
pub const ANY: i32 = -1;
/// Relative reference to the same axis value of the reference state.
pub const CURRENT: i32 = 0;
/// Relative reference to the next sibling of the reference state's axis value.
pub const NEXT: i32 = -2;
/// Relative reference to the previous sibling of the reference state's axis value.
pub const PREVIOUS: i32 = -3;

/// Largest mode id that survives packing into a [`StateId`]
pub const MAX_MODE_ID: i32 = i16::MAX as i32;
/// Largest page or cell id that survives packing into a [`StateId`]
pub const MAX_PAGE_ID: i32 = i8::MAX as i32;
pub const MAX_CELL_ID: i32 = i8::MAX as i32;

/// Packed 32-bit state key (16 bits mode, 8 bits page, 8 bits cell)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateVector {
    pub mode: i32,
    pub page: i32,
    pub cell: i32,
}

impl Default for StateVector {
    fn default() -> Self {
        Self::GLOBAL
    }
}

impl StateVector {
    /// The all-wildcard state. Bindings here apply everywhere.
    pub const GLOBAL: StateVector = StateVector {
        mode: ANY,
        page: ANY,
        cell: ANY,
    };

    pub const fn new(mode: i32, page: i32, cell: i32) -> Self {
        Self { mode, page, cell }
    }

    pub const fn mode_level(mode: i32) -> Self {
        Self::new(mode, ANY, ANY)
    }

    pub const fn page_level(mode: i32, page: i32) -> Self {
        Self::new(mode, page, ANY)
    }

    pub const fn with_mode(self, mode: i32) -> Self {
        Self { mode, ..self }
    }

    pub const fn with_page(self, page: i32) -> Self {
        Self { page, ..self }
    }

    pub const fn with_cell(self, cell: i32) -> Self {
        Self { cell, ..self }
    }

    /// True if all three axes hold concrete (positive) values
    pub fn is_specific(&self) -> bool {
        self.mode > 0 && self.page > 0 && self.cell > 0
    }

    /// True if any axis is the wildcard
    pub fn is_wildcard(&self) -> bool {
        self.mode == ANY || self.page == ANY || self.cell == ANY
    }

    pub fn is_global(&self) -> bool {
        *self == Self::GLOBAL
    }

    /// True if any axis holds a relative reference rather than a value or wildcard
    pub fn is_relative(&self) -> bool {
        [self.mode, self.page, self.cell]
            .iter()
            .any(|axis| is_relative_axis(*axis))
    }

    /// True if every axis fits its packed width, so [`Self::id`] is unique.
    pub fn fits_id(&self) -> bool {
        i16::try_from(self.mode).is_ok()
            && i8::try_from(self.page).is_ok()
            && i8::try_from(self.cell).is_ok()
    }

    /// Packs the vector into a cache key.
    ///
    /// The mode must fit in 16 bits and page/cell in 8 bits each (two's complement, so
    /// the sentinels survive packing). Larger values alias; state definitions reject
    /// such states, see [`Self::fits_id`].
    pub fn id(&self) -> StateId {
        debug_assert!(self.fits_id(), "state {} does not fit a packed id", self);

        let mode = u32::from(self.mode as i16 as u16);
        let page = u32::from(self.page as i8 as u8);
        let cell = u32::from(self.cell as i8 as u8);
        StateId(mode << 16 | page << 8 | cell)
    }

    /// Returns true if every non-wildcard axis of `self` equals the same axis of `other`.
    pub fn contains(&self, other: &StateVector) -> bool {
        axis_contains(self.mode, other.mode)
            && axis_contains(self.page, other.page)
            && axis_contains(self.cell, other.cell)
    }

    /// Immediate, strictly more general parents.
    ///
    /// With page and cell both set the result is `[(m, ANY, c), (m, p, ANY)]`. Otherwise
    /// the most specific non-wildcard axis is cleared. The global state has no parents.
    pub fn parent_states(&self) -> Vec<StateVector> {
        if self.cell != ANY && self.page != ANY {
            vec![self.with_page(ANY), self.with_cell(ANY)]
        } else if self.cell != ANY {
            vec![self.with_cell(ANY)]
        } else if self.page != ANY {
            vec![self.with_page(ANY)]
        } else if self.mode != ANY {
            vec![self.with_mode(ANY)]
        } else {
            Vec::new()
        }
    }

    /// Every ancestor, nearest first, without duplicates.
    pub fn ancestors(&self) -> Vec<StateVector> {
        let mut result: Vec<StateVector> = Vec::new();
        let mut frontier = self.parent_states();
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for state in frontier {
                if !result.contains(&state) {
                    result.push(state);
                    next.extend(state.parent_states());
                }
            }
            frontier = next;
        }
        result
    }
}

impl fmt::Display for StateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            axis_label(self.mode),
            axis_label(self.page),
            axis_label(self.cell)
        )
    }
}

pub fn is_relative_axis(value: i32) -> bool {
    value <= 0 && value != ANY
}

fn axis_contains(pattern: i32, value: i32) -> bool {
    pattern == ANY || pattern == value
}

fn axis_label(value: i32) -> String {
    match value {
        ANY => "*".to_string(),
        CURRENT => "=".to_string(),
        NEXT => ">".to_string(),
        PREVIOUS => "<".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_is_reflexive() {
        for state in [
            StateVector::GLOBAL,
            StateVector::mode_level(1),
            StateVector::page_level(1, 2),
            StateVector::new(1, 2, 3),
            StateVector::new(1, ANY, 3),
        ] {
            assert!(state.contains(&state), "{} should contain itself", state);
        }
    }

    #[test]
    fn parents_contain_child() {
        let state = StateVector::new(4, 2, 7);
        for parent in state.ancestors() {
            assert!(parent.contains(&state), "{} should contain {}", parent, state);
            assert_ne!(parent, state);
        }
    }

    #[test]
    fn cell_state_lists_any_page_parent_first() {
        let parents = StateVector::new(1, 2, 3).parent_states();
        assert_eq!(
            parents,
            vec![StateVector::new(1, ANY, 3), StateVector::new(1, 2, ANY)]
        );
    }

    #[test]
    fn parent_chain_ends_at_global() {
        assert_eq!(
            StateVector::new(1, ANY, 3).parent_states(),
            vec![StateVector::mode_level(1)]
        );
        assert_eq!(
            StateVector::page_level(1, 2).parent_states(),
            vec![StateVector::mode_level(1)]
        );
        assert_eq!(
            StateVector::mode_level(1).parent_states(),
            vec![StateVector::GLOBAL]
        );
        assert!(StateVector::GLOBAL.parent_states().is_empty());
    }

    #[test]
    fn ancestors_are_deduplicated() {
        let ancestors = StateVector::new(1, 2, 3).ancestors();
        assert_eq!(
            ancestors,
            vec![
                StateVector::new(1, ANY, 3),
                StateVector::new(1, 2, ANY),
                StateVector::mode_level(1),
                StateVector::GLOBAL,
            ]
        );
    }

    #[test]
    fn wildcard_does_not_match_in_reverse() {
        let general = StateVector::mode_level(1);
        let specific = StateVector::new(1, 2, 3);
        assert!(general.contains(&specific));
        assert!(!specific.contains(&general));
        assert!(!StateVector::mode_level(2).contains(&specific));
    }

    #[test]
    fn packed_ids_are_distinct_for_sentinels() {
        let any = StateVector::new(1, ANY, 3).id();
        assert_ne!(StateVector::new(1, CURRENT, 3).id(), any);
        assert_ne!(StateVector::new(1, NEXT, 3).id(), any);
        assert_ne!(StateVector::new(1, PREVIOUS, 3).id(), any);
        assert_eq!(StateVector::GLOBAL.id(), StateId(0xFFFF_FFFF));
        assert_ne!(StateVector::new(1, 2, 3).id(), StateVector::new(2, 1, 3).id());
        assert_eq!(StateVector::new(1, 2, 3).id(), StateId(0x0001_0203));
    }

    #[test]
    fn wide_axes_do_not_fit_a_packed_id() {
        assert!(StateVector::new(MAX_MODE_ID, MAX_PAGE_ID, MAX_CELL_ID).fits_id());
        assert!(StateVector::new(1, NEXT, PREVIOUS).fits_id());
        assert!(StateVector::GLOBAL.fits_id());
        assert!(!StateVector::new(1, 200, 1).fits_id());
        assert!(!StateVector::new(1, 1, 255).fits_id());
        assert!(!StateVector::mode_level(MAX_MODE_ID + 1).fits_id());
    }

    #[test]
    fn specific_requires_all_axes_positive() {
        assert!(StateVector::new(1, 2, 3).is_specific());
        assert!(!StateVector::new(1, 2, ANY).is_specific());
        assert!(!StateVector::new(1, CURRENT, 3).is_specific());
        assert!(StateVector::new(1, NEXT, 3).is_relative());
        assert!(!StateVector::new(1, ANY, 3).is_relative());
    }
}
