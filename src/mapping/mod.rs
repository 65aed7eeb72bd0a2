//! State-scoped resolution of bindings
//!
//! The [`ActionSetCollection`] owns every [`ActionSet`](crate::action::ActionSet) of an
//! input source and answers two questions:
//!
//! - which set handles control X in state S
//!   ([`ActionSetCollection::get_actions_for_input_control`])
//! - what does the whole lookup table of state S look like
//!   ([`ActionSetCollection::get_actions_for_state`])
//!
//! Both walk the state hierarchy from the queried state towards the global state and
//! memoize their results in a [`ResolutionCache`] that is dropped on every change.
//!
//! ```text
//!                 ┌──────────────────────┐
//! (state, ctrl) ─►│ ActionSetCollection  │──► ActionSetId ──► ActionSet
//!                 │  ├ sets (BTreeMap)   │
//!                 │  └ ResolutionCache   │
//!                 │     ├ categorization │
//!                 │     ├ tables         │──► ActionMappingTable ─► parents ...
//!                 │     └ controls       │
//!                 └──────────────────────┘
//! ```

pub mod cache;
pub mod collection;
pub mod table;
pub mod validation;

pub use cache::ResolutionCache;
pub use collection::{ActionSetCollection, ActionSetId};
pub use table::ActionMappingTable;
pub use validation::{SecurityReport, ValidationReport};
