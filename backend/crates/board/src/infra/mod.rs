//! Infrastructure Layer
//!
//! Repository implementations.

pub mod memory;
pub mod sqlite;

#[cfg(test)]
pub(crate) mod conformance;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
