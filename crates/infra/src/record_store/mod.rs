//! Record store adapters.
//!
//! Implementations of `cachebind_core::RecordStore` for development/tests
//! (in-memory) and production (Postgres).

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryRecordStore, StoredRecord};
pub use postgres::{KeyKind, PostgresRecordStore, TableMapping, TableMappings};
