//! State-scoped action resolution and execution
//!
//! Control events of an input device are resolved against a hierarchical state
//! (mode, page, cell) into bundles of actions, which then run as resumable sequences
//! over several ticks.
//!
//! ```text
//! state ──► control ──► mapping ──► action ──► EffectSink
//!                          ▲           ▲
//!                          └─ engine ──┘   (dispatcher, lifecycle, tokio task)
//! ```

pub mod action;
pub mod config;
pub mod control;
pub mod engine;
pub mod mapping;
pub mod persistence;
pub mod state;
