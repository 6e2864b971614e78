//! Identity construction.

use std::sync::Arc;

use crate::condition::Condition;
use crate::error::{IdentityError, IdentityResult};
use crate::handle::Handle;
use crate::identity::Identity;
use crate::record::{PersistedRecord, RecordType};
use crate::registry::TypeRegistry;
use crate::store::RecordStore;

/// Builds identities against one registry and one store.
///
/// Construction validates the record type and computes match conditions
/// eagerly; it never touches the store.
#[derive(Clone)]
pub struct IdentityFactory {
    registry: Arc<dyn TypeRegistry>,
    store: Arc<dyn RecordStore>,
}

impl IdentityFactory {
    pub fn new(registry: Arc<dyn TypeRegistry>, store: Arc<dyn RecordStore>) -> Self {
        Self { registry, store }
    }

    pub fn registry(&self) -> &Arc<dyn TypeRegistry> {
        &self.registry
    }

    /// Build an identity for `handle` within `record_type`.
    ///
    /// `None` denotes "no record": the identity is valid but its binding is
    /// always `None`. Fails with `IdentityError::Configuration` if the
    /// registry does not support `record_type`.
    pub fn from_type_and_handle(
        &self,
        record_type: impl Into<RecordType>,
        handle: Option<Handle>,
    ) -> IdentityResult<Identity> {
        let record_type = record_type.into();
        if !self.registry.is_supported(&record_type) {
            tracing::warn!(record_type = %record_type, "rejected unsupported record type");
            return Err(IdentityError::unsupported_type(record_type.name()));
        }

        let fields = self.registry.identity_fields(&record_type);
        let conditions = Condition::for_handle(&fields, handle.as_ref());

        tracing::debug!(
            record_type = %record_type,
            handle = ?handle,
            predicates = conditions.predicates().len(),
            "identity constructed"
        );

        Ok(Identity::new(record_type, handle, conditions, Arc::clone(&self.store)))
    }

    /// Shorthand for a present handle of any scalar kind.
    pub fn for_handle(
        &self,
        record_type: impl Into<RecordType>,
        handle: impl Into<Handle>,
    ) -> IdentityResult<Identity> {
        self.from_type_and_handle(record_type, Some(handle.into()))
    }

    /// Typed shorthand for `for_handle(R::record_type(), handle)`.
    pub fn for_record<R: PersistedRecord>(&self, handle: impl Into<Handle>) -> IdentityResult<Identity> {
        self.for_handle(R::record_type(), handle)
    }
}

impl core::fmt::Debug for IdentityFactory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IdentityFactory").finish_non_exhaustive()
    }
}
