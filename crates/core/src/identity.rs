//! Identity: a `(record type, handle)` pair that resolves lazily to a binding.

use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Serialize, Serializer};

use crate::binding::CacheBinding;
use crate::condition::Condition;
use crate::error::IdentityResult;
use crate::handle::Handle;
use crate::record::{RecordProxy, RecordType};
use crate::store::{RecordQuery, RecordStore};

/// Resolve-once memo slot.
#[derive(Debug, Clone)]
enum BindingSlot {
    Unresolved,
    Resolved(Option<RecordProxy>),
}

/// Canonical reference to one stored record, resolved on demand.
///
/// ## Resolution
///
/// `binding()` queries the store at most once per instance. Both a found
/// record and "not found" are memoized; later changes to the stored record
/// are not observed. Build a new `Identity` when freshness matters.
///
/// Store failures are returned to the caller and leave the slot unresolved,
/// so the next call to `binding()` queries again.
///
/// ## Equality
///
/// Two identities are equal iff their record type and handle are equal.
/// Resolution state never participates in equality, hashing, or the cache
/// token.
pub struct Identity {
    record_type: RecordType,
    handle: Option<Handle>,
    conditions: Condition,
    store: Arc<dyn RecordStore>,
    slot: Mutex<BindingSlot>,
}

impl Identity {
    /// Assemble an identity from pre-validated parts.
    ///
    /// Crate-private: callers go through `IdentityFactory`, which performs the
    /// registry check and builds `conditions`.
    pub(crate) fn new(
        record_type: RecordType,
        handle: Option<Handle>,
        conditions: Condition,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            record_type,
            handle,
            conditions,
            store,
            slot: Mutex::new(BindingSlot::Unresolved),
        }
    }

    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    pub fn handle(&self) -> Option<&Handle> {
        self.handle.as_ref()
    }

    pub fn conditions(&self) -> &Condition {
        &self.conditions
    }

    /// Whether the memo slot has settled (found or not found).
    pub fn is_resolved(&self) -> bool {
        matches!(*self.lock_slot(), BindingSlot::Resolved(_))
    }

    /// Resolve the minimal record projection this identity refers to.
    ///
    /// The slot lock is held across the store query, so concurrent callers
    /// wait for the first resolution instead of issuing their own query.
    pub fn binding(&self) -> IdentityResult<Option<RecordProxy>> {
        let mut slot = self.lock_slot();
        if let BindingSlot::Resolved(binding) = &*slot {
            return Ok(binding.clone());
        }

        let resolved = match &self.handle {
            None => None,
            Some(handle) => self.fetch(handle)?,
        };

        *slot = BindingSlot::Resolved(resolved.clone());
        Ok(resolved)
    }

    /// Deterministic `"<TypeName>/handle=<handle>"` token.
    ///
    /// Never triggers resolution. An absent handle renders as an empty string,
    /// so `None` and `Some("")` share a token even though the identities are
    /// unequal (only the latter queries the store). Callers that can receive
    /// empty handles should normalize them before building an identity.
    pub fn to_cache_token(&self) -> String {
        match &self.handle {
            Some(handle) => format!("{}/handle={}", self.record_type, handle),
            None => format!("{}/handle=", self.record_type),
        }
    }

    fn fetch(&self, handle: &Handle) -> IdentityResult<Option<RecordProxy>> {
        let span = tracing::debug_span!(
            "identity.resolve",
            record_type = %self.record_type,
            handle = %handle,
        );
        let _enter = span.enter();

        let query = RecordQuery::binding(self.record_type.clone(), self.conditions.clone());
        let rows = self.store.query(&query).map_err(|err| {
            tracing::warn!(error = %err, "binding query failed");
            err
        })?;

        let binding = rows.into_iter().next();
        tracing::debug!(found = binding.is_some(), "binding resolved");
        Ok(binding)
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, BindingSlot> {
        // The slot is only ever assigned a complete value, so a poisoned lock
        // still guards a consistent state.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CacheBinding for Identity {
    fn cache_token(&self) -> String {
        self.to_cache_token()
    }

    fn proxy_binding(&self) -> IdentityResult<Option<RecordProxy>> {
        self.binding()
    }
}

impl Clone for Identity {
    /// The clone starts from a snapshot of the current memo slot.
    fn clone(&self) -> Self {
        Self {
            record_type: self.record_type.clone(),
            handle: self.handle.clone(),
            conditions: self.conditions.clone(),
            store: Arc::clone(&self.store),
            slot: Mutex::new(self.lock_slot().clone()),
        }
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.record_type == other.record_type && self.handle == other.handle
    }
}

impl Eq for Identity {}

impl Hash for Identity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.record_type.hash(state);
        self.handle.hash(state);
    }
}

impl core::fmt::Debug for Identity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Identity")
            .field("record_type", &self.record_type)
            .field("handle", &self.handle)
            .field("conditions", &self.conditions)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl core::fmt::Display for Identity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.to_cache_token())
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_cache_token())
    }
}
