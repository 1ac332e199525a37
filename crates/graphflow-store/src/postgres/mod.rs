//! PostgreSQL-backed `GraphStore` implementation.

mod entities;
mod store;

pub use entities::{EdgeRow, SessionRow, StepRow};
pub use store::PgGraphStore;
