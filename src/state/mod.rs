//! Logical device states
//!
//! 1. [`vector`] - the (mode, page, cell) identifier and its containment algebra
//! 2. [`tree`] - the authoritative hierarchy the identifiers refer to

pub mod tree;
pub mod vector;

pub use tree::{StateDefinitions, StateTree, StateTreeError};
pub use vector::{
    StateId, StateVector, ANY, CURRENT, MAX_CELL_ID, MAX_MODE_ID, MAX_PAGE_ID, NEXT, PREVIOUS,
};
