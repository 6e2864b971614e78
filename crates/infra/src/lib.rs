//! Infrastructure layer: record stores and configuration.

pub mod config;
pub mod record_store;


pub use config::{BindingConfig, ConfigError, RecordTypeConfig};
pub use record_store::{InMemoryRecordStore, KeyKind, PostgresRecordStore, StoredRecord, TableMapping};
