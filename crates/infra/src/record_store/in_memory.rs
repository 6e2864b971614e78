use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use cachebind_core::{
    FieldName, FieldSource, Handle, RecordProxy, RecordQuery, RecordStore, RecordType, StoreError,
};

/// Field under which a stored record's primary key is also matchable.
const PRIMARY_KEY_FIELD: &str = "id";

/// A full record as held by the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub primary_key: Handle,
    /// Stored type discriminator; defaults to the record type on insert.
    pub type_discriminator: Option<String>,
    pub updated_at: DateTime<Utc>,
    fields: HashMap<FieldName, Handle>,
}

impl StoredRecord {
    pub fn new(primary_key: impl Into<Handle>, updated_at: DateTime<Utc>) -> Self {
        let primary_key = primary_key.into();
        let mut fields = HashMap::new();
        fields.insert(FieldName::from(PRIMARY_KEY_FIELD), primary_key.clone());
        Self {
            primary_key,
            type_discriminator: None,
            updated_at,
            fields,
        }
    }

    pub fn with_field(mut self, field: impl Into<FieldName>, value: impl Into<Handle>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Single-table-inheritance style discriminator (e.g. a subtype name).
    pub fn with_discriminator(mut self, discriminator: impl Into<String>) -> Self {
        self.type_discriminator = Some(discriminator.into());
        self
    }

    fn project(&self, record_type: &RecordType) -> RecordProxy {
        RecordProxy {
            primary_key: self.primary_key.clone(),
            type_discriminator: self
                .type_discriminator
                .clone()
                .unwrap_or_else(|| record_type.name().to_string()),
            last_modified: self.updated_at,
        }
    }
}

impl FieldSource for StoredRecord {
    fn field_value(&self, field: &FieldName) -> Option<&Handle> {
        self.fields.get(field)
    }
}

/// In-memory record store.
///
/// Intended for tests/dev. Queries scan records of the requested type in
/// insertion order.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<RecordType, Vec<StoredRecord>>>,
    queries: AtomicU64,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace (by primary key) a record of `record_type`.
    pub fn insert(&self, record_type: impl Into<RecordType>, record: StoredRecord) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let rows = records.entry(record_type.into()).or_default();
        match rows.iter_mut().find(|r| r.primary_key == record.primary_key) {
            Some(existing) => *existing = record,
            None => rows.push(record),
        }
    }

    /// Remove a record by primary key. Returns whether a record was removed.
    pub fn remove(&self, record_type: &RecordType, primary_key: &Handle) -> bool {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let Some(rows) = records.get_mut(record_type) else {
            return false;
        };
        let before = rows.len();
        rows.retain(|r| &r.primary_key != primary_key);
        rows.len() != before
    }

    pub fn clear(&self) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.clear();
    }

    /// Number of queries executed so far.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }
}

impl RecordStore for InMemoryRecordStore {
    fn query(&self, query: &RecordQuery) -> Result<Vec<RecordProxy>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        if query.condition.is_unsatisfiable() || query.limit == 0 {
            return Ok(vec![]);
        }

        let records = self
            .records
            .read()
            .map_err(|_| StoreError::backend("lock poisoned"))?;

        let Some(rows) = records.get(&query.record_type) else {
            return Ok(vec![]);
        };

        Ok(rows
            .iter()
            .filter(|r| query.condition.matches(*r))
            .take(query.limit)
            .map(|r| r.project(&query.record_type))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachebind_core::{Condition, RecordQuery};
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    fn query(fields: &[&str], handle: &str) -> RecordQuery {
        let fields: Vec<FieldName> = fields.iter().map(|f| FieldName::from(*f)).collect();
        RecordQuery::binding(
            RecordType::from("Order"),
            Condition::for_handle(&fields, Some(&Handle::from(handle))),
        )
    }

    #[test]
    fn matches_alternate_field_and_projects() {
        let store = InMemoryRecordStore::new();
        store.insert("Order", StoredRecord::new(77i64, ts()).with_field("external_ref", "X123"));

        let rows = store.query(&query(&["id", "external_ref"], "X123")).unwrap();
        assert_eq!(rows, vec![RecordProxy::new(77i64, "Order", ts())]);
        assert_eq!(store.query_count(), 1);
    }

    #[test]
    fn primary_key_matches_textual_handle() {
        let store = InMemoryRecordStore::new();
        store.insert("Order", StoredRecord::new(77i64, ts()));

        let rows = store.query(&query(&["id"], "77")).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn honours_limit() {
        let store = InMemoryRecordStore::new();
        store.insert("Order", StoredRecord::new(1i64, ts()).with_field("batch", "B"));
        store.insert("Order", StoredRecord::new(2i64, ts()).with_field("batch", "B"));

        let rows = store.query(&query(&["batch"], "B")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].primary_key, Handle::from(1i64));
    }

    #[test]
    fn unsatisfiable_condition_returns_nothing() {
        let store = InMemoryRecordStore::new();
        store.insert("Order", StoredRecord::new(1i64, ts()));

        assert!(store.query(&query(&[], "1")).unwrap().is_empty());
        assert_eq!(store.query_count(), 1);
    }

    #[test]
    fn discriminator_overrides_type_name() {
        let store = InMemoryRecordStore::new();
        store.insert("Order", StoredRecord::new(5i64, ts()).with_discriminator("RushOrder"));

        let rows = store.query(&query(&["id"], "5")).unwrap();
        assert_eq!(rows[0].type_discriminator, "RushOrder");
    }

    #[test]
    fn insert_replaces_and_remove_deletes() {
        let store = InMemoryRecordStore::new();
        let later = ts() + chrono::Duration::seconds(10);
        store.insert("Order", StoredRecord::new(5i64, ts()));
        store.insert("Order", StoredRecord::new(5i64, later));

        let rows = store.query(&query(&["id"], "5")).unwrap();
        assert_eq!(rows[0].last_modified, later);

        assert!(store.remove(&RecordType::from("Order"), &Handle::from(5i64)));
        assert!(!store.remove(&RecordType::from("Order"), &Handle::from(5i64)));
        assert!(store.query(&query(&["id"], "5")).unwrap().is_empty());
    }
}
