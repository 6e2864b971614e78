//! Type registry: which record types are queryable, and by which fields.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::condition::FieldName;
use crate::record::RecordType;

/// Identity fields used when a type is registered without its own list.
pub const DEFAULT_IDENTITY_FIELDS: &[&str] = &["id"];

/// Capability check for persisted record types.
pub trait TypeRegistry: Send + Sync {
    /// Whether `record_type` is registered as a queryable persisted type.
    fn is_supported(&self, record_type: &RecordType) -> bool;

    /// Ordered identity fields for `record_type` (empty if none configured).
    fn identity_fields(&self, record_type: &RecordType) -> Vec<FieldName>;
}

impl<R> TypeRegistry for Arc<R>
where
    R: TypeRegistry + ?Sized,
{
    fn is_supported(&self, record_type: &RecordType) -> bool {
        (**self).is_supported(record_type)
    }

    fn identity_fields(&self, record_type: &RecordType) -> Vec<FieldName> {
        (**self).identity_fields(record_type)
    }
}

/// In-memory registry.
#[derive(Debug)]
pub struct InMemoryTypeRegistry {
    default_fields: Vec<FieldName>,
    types: RwLock<HashMap<RecordType, Vec<FieldName>>>,
}

impl InMemoryTypeRegistry {
    pub fn new() -> Self {
        Self::with_default_fields(DEFAULT_IDENTITY_FIELDS.iter().copied().map(FieldName::from))
    }

    pub fn with_default_fields(fields: impl IntoIterator<Item = FieldName>) -> Self {
        Self {
            default_fields: fields.into_iter().collect(),
            types: RwLock::new(HashMap::new()),
        }
    }

    pub fn default_fields(&self) -> &[FieldName] {
        &self.default_fields
    }

    /// Register `record_type` with an explicit, ordered identity-field list.
    ///
    /// Re-registering replaces the previous list. An empty list is allowed and
    /// makes every identity of that type resolve to no binding.
    pub fn register<F>(&self, record_type: impl Into<RecordType>, fields: impl IntoIterator<Item = F>)
    where
        F: Into<FieldName>,
    {
        let fields: Vec<FieldName> = fields.into_iter().map(Into::into).collect();
        let record_type = record_type.into();
        tracing::debug!(record_type = %record_type, fields = ?fields, "registered record type");

        let mut types = self.types.write().unwrap_or_else(|e| e.into_inner());
        types.insert(record_type, fields);
    }

    /// Register `record_type` with the registry's default identity fields.
    pub fn register_default(&self, record_type: impl Into<RecordType>) {
        self.register(record_type, self.default_fields.clone());
    }

    pub fn unregister(&self, record_type: &RecordType) {
        let mut types = self.types.write().unwrap_or_else(|e| e.into_inner());
        types.remove(record_type);
    }
}

impl Default for InMemoryTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry for InMemoryTypeRegistry {
    fn is_supported(&self, record_type: &RecordType) -> bool {
        let types = self.types.read().unwrap_or_else(|e| e.into_inner());
        types.contains_key(record_type)
    }

    fn identity_fields(&self, record_type: &RecordType) -> Vec<FieldName> {
        let types = self.types.read().unwrap_or_else(|e| e.into_inner());
        types.get(record_type).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_types_are_unsupported() {
        let registry = InMemoryTypeRegistry::new();
        assert!(!registry.is_supported(&RecordType::from("Order")));
        assert!(registry.identity_fields(&RecordType::from("Order")).is_empty());
    }

    #[test]
    fn register_keeps_field_order() {
        let registry = InMemoryTypeRegistry::new();
        registry.register("Order", ["id", "external_ref"]);

        assert!(registry.is_supported(&RecordType::from("Order")));
        assert_eq!(
            registry.identity_fields(&RecordType::from("Order")),
            vec![FieldName::from("id"), FieldName::from("external_ref")]
        );
    }

    #[test]
    fn register_default_uses_configured_defaults() {
        let registry = InMemoryTypeRegistry::with_default_fields([FieldName::from("_id")]);
        registry.register_default("Invoice");

        assert_eq!(
            registry.identity_fields(&RecordType::from("Invoice")),
            vec![FieldName::from("_id")]
        );
    }

    #[test]
    fn empty_field_list_is_still_supported() {
        let registry = InMemoryTypeRegistry::new();
        registry.register("Order", Vec::<FieldName>::new());

        assert!(registry.is_supported(&RecordType::from("Order")));
        assert!(registry.identity_fields(&RecordType::from("Order")).is_empty());
    }

    #[test]
    fn unregister_removes_support() {
        let registry = InMemoryTypeRegistry::new();
        registry.register_default("Order");
        registry.unregister(&RecordType::from("Order"));
        assert!(!registry.is_supported(&RecordType::from("Order")));
    }
}
