//! # graphflow-store
//!
//! Concrete `GraphStore` backends: an in-memory one used by tests and local
//! development, and a Postgres-backed one (behind the `postgres` feature)
//! for production use.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryGraphStore;
