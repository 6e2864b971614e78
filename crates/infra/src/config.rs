//! Configuration loading and representation.
//!
//! Configuration can come from a JSON document, from environment variables,
//! or both (the file named by `CACHEBIND_CONFIG` is loaded first and the
//! other variables override it):
//!
//! | variable                    | meaning                                        |
//! |-----------------------------|------------------------------------------------|
//! | `CACHEBIND_CONFIG`          | path to a JSON config file                     |
//! | `CACHEBIND_IDENTITY_FIELDS` | default identity fields, comma separated       |
//! | `CACHEBIND_RECORD_TYPES`    | record types using the defaults, comma separated |
//! | `DATABASE_URL`              | Postgres connection string                     |

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cachebind_core::{
    DEFAULT_IDENTITY_FIELDS, FieldName, IdentityFactory, InMemoryTypeRegistry, RecordStore,
    StoreError,
};

use crate::record_store::{InMemoryRecordStore, PostgresRecordStore, TableMapping};

pub const CONFIG_PATH_VAR: &str = "CACHEBIND_CONFIG";
pub const IDENTITY_FIELDS_VAR: &str = "CACHEBIND_IDENTITY_FIELDS";
pub const RECORD_TYPES_VAR: &str = "CACHEBIND_RECORD_TYPES";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to open record store: {0}")]
    Store(#[from] StoreError),
}

/// Per-type configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordTypeConfig {
    pub name: String,
    /// Ordered identity fields; `None` means "use the defaults".
    #[serde(default)]
    pub identity_fields: Option<Vec<String>>,
    /// Table mapping for the Postgres store.
    #[serde(default)]
    pub table: Option<TableMapping>,
}

impl RecordTypeConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity_fields: None,
            table: None,
        }
    }
}

/// Identity binding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    pub default_identity_fields: Vec<String>,
    pub record_types: Vec<RecordTypeConfig>,
    pub database_url: Option<String>,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            default_identity_fields: DEFAULT_IDENTITY_FIELDS.iter().map(|f| f.to_string()).collect(),
            record_types: Vec::new(),
            database_url: None,
        }
    }
}

impl BindingConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_PATH_VAR) {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };

        if let Some(fields) = lookup(IDENTITY_FIELDS_VAR) {
            config.default_identity_fields = split_list(&fields);
        }

        if let Some(types) = lookup(RECORD_TYPES_VAR) {
            for name in split_list(&types) {
                if !config.record_types.iter().any(|t| t.name == name) {
                    config.record_types.push(RecordTypeConfig::new(name));
                }
            }
        }

        if let Some(url) = lookup(DATABASE_URL_VAR) {
            config.database_url = Some(url);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_identity_fields.iter().any(|f| f.trim().is_empty()) {
            return Err(ConfigError::Invalid("empty default identity field name".into()));
        }

        let mut seen = HashSet::new();
        for record_type in &self.record_types {
            if record_type.name.trim().is_empty() {
                return Err(ConfigError::Invalid("empty record type name".into()));
            }
            if !seen.insert(record_type.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "record type '{}' configured more than once",
                    record_type.name
                )));
            }
            let fields = record_type.identity_fields.iter().flatten();
            if fields.clone().any(|f| f.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "empty identity field name for record type '{}'",
                    record_type.name
                )));
            }
        }
        Ok(())
    }

    /// Build a type registry with every configured record type registered.
    pub fn build_registry(&self) -> InMemoryTypeRegistry {
        let registry = InMemoryTypeRegistry::with_default_fields(
            self.default_identity_fields.iter().cloned().map(FieldName::from),
        );

        for record_type in &self.record_types {
            match &record_type.identity_fields {
                Some(fields) => registry.register(record_type.name.clone(), fields.iter().cloned()),
                None => registry.register_default(record_type.name.clone()),
            }
        }
        registry
    }

    /// Connect a Postgres store and apply every configured table mapping.
    pub fn build_postgres_store(&self) -> Result<PostgresRecordStore, ConfigError> {
        let url = self
            .database_url
            .as_deref()
            .ok_or_else(|| ConfigError::Invalid(format!("{DATABASE_URL_VAR} is not set")))?;

        let store = PostgresRecordStore::connect(url)?;
        for record_type in &self.record_types {
            match &record_type.table {
                Some(mapping) => store.map(record_type.name.clone(), mapping.clone()),
                None => tracing::warn!(
                    record_type = %record_type.name,
                    "record type has no table mapping; bindings with identity fields will fail"
                ),
            }
        }
        Ok(store)
    }

    /// Wire a factory: Postgres when a database URL is configured, otherwise
    /// an empty in-memory store.
    pub fn build_factory(&self) -> Result<IdentityFactory, ConfigError> {
        let registry = Arc::new(self.build_registry());
        let store: Arc<dyn RecordStore> = if self.database_url.is_some() {
            Arc::new(self.build_postgres_store()?)
        } else {
            tracing::warn!("{DATABASE_URL_VAR} not set; using in-memory record store");
            Arc::new(InMemoryRecordStore::new())
        };
        Ok(IdentityFactory::new(registry, store))
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use cachebind_core::{RecordType, TypeRegistry};

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_to_id_field() {
        let config = BindingConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.default_identity_fields, vec!["id".to_string()]);
        assert!(config.record_types.is_empty());
        assert!(config.database_url.is_none());
    }

    #[test]
    fn env_vars_populate_registry() {
        let config = BindingConfig::from_lookup(lookup(&[
            (IDENTITY_FIELDS_VAR, "id, external_ref"),
            (RECORD_TYPES_VAR, "Order,Invoice,"),
        ]))
        .unwrap();

        let registry = config.build_registry();
        assert!(registry.is_supported(&RecordType::from("Order")));
        assert!(registry.is_supported(&RecordType::from("Invoice")));
        assert_eq!(
            registry.identity_fields(&RecordType::from("Order")),
            vec![FieldName::from("id"), FieldName::from("external_ref")]
        );
    }

    #[test]
    fn json_config_with_per_type_fields() {
        let config = BindingConfig::from_json_str(
            r#"{
                "record_types": [
                    {"name": "Order", "identity_fields": ["id", "external_ref"],
                     "table": {"table": "orders", "primary_key": "id", "updated_at": "updated_at"}},
                    {"name": "Tag", "identity_fields": []},
                    {"name": "User"}
                ]
            }"#,
        )
        .unwrap();

        let registry = config.build_registry();
        assert_eq!(registry.identity_fields(&RecordType::from("Order")).len(), 2);
        assert!(registry.is_supported(&RecordType::from("Tag")));
        assert!(registry.identity_fields(&RecordType::from("Tag")).is_empty());
        assert_eq!(
            registry.identity_fields(&RecordType::from("User")),
            vec![FieldName::from("id")]
        );
        assert_eq!(config.record_types[0].table, Some(TableMapping::new("orders")));
    }

    #[test]
    fn rejects_duplicate_record_types() {
        let err = BindingConfig::from_json_str(
            r#"{"record_types": [{"name": "Order"}, {"name": "Order"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("more than once")));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = BindingConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn postgres_store_requires_database_url() {
        let err = BindingConfig::default().build_postgres_store().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains(DATABASE_URL_VAR)));
    }

    #[test]
    fn factory_without_database_uses_in_memory_store() {
        let config = BindingConfig::from_lookup(lookup(&[(RECORD_TYPES_VAR, "Order")])).unwrap();
        let factory = config.build_factory().unwrap();

        let identity = factory.for_handle("Order", "X123").unwrap();
        assert_eq!(identity.binding().unwrap(), None);
    }
}
