//! # graphflow-model
//!
//! Shared domain types for the graphflow workflow execution engine: the
//! workflow graph (`Step`, `Edge`), the per-execution `State` document, and
//! the untyped `Value` representation they're all built from.

pub mod edge;
pub mod state;
pub mod step;
pub mod value;

pub use edge::{Edge, Operator};
pub use state::{Message, OUTPUT_WINDOW, Role, State, StateData, StepRecord, StepStatus};
pub use step::{ROOT_STEP_ID, Step};
pub use value::{Args, Value};
