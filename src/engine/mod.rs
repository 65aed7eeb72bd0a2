//! Driving a profile
//!
//! 1. [`input`] - normalized control events and their text form
//! 2. [`dispatcher`] - single-threaded driver: current state, held controls, ongoing lists
//! 3. [`machine`] - statum lifecycle of a profile and the tokio task running it
//! 4. [`tracing_effects`] - an effect sink that logs

pub mod dispatcher;
pub mod error;
pub mod input;
pub mod machine;
pub mod tracing_effects;

pub use dispatcher::Dispatcher;
pub use error::EngineError;
pub use input::{ControlInput, ParseInputError};
pub use machine::{BoxedEffects, EngineHandle, ProfileEngine};
pub use tracing_effects::TracingEffects;
