//! Postgres-backed record store.
//!
//! Executes binding queries with SQLx against per-type table mappings.
//!
//! ## Synchronous boundary
//!
//! `RecordStore` is a synchronous trait. This adapter owns a current-thread
//! tokio runtime and blocks on each query, so it must not be called from
//! inside another tokio runtime's worker (use `spawn_blocking` there).
//!
//! ## Query shape
//!
//! ```sql
//! SELECT "id"::bigint AS pk, "type"::text AS disc, "updated_at"::timestamptz AS updated_at
//! FROM "orders"
//! WHERE ("id"::text = $1 OR "external_ref"::text = $2)
//! LIMIT 1
//! ```
//!
//! Identity fields are compared as text so one handle can match columns of
//! differing SQL types.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

use cachebind_core::{
    Handle, Predicate, RecordProxy, RecordQuery, RecordStore, RecordType, StoreError,
};

/// SQL type of a table's primary key column.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    #[default]
    Int,
    Uuid,
    Text,
}

/// How one record type maps onto a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMapping {
    /// Table name, optionally schema-qualified (`billing.orders`).
    pub table: String,
    pub primary_key: String,
    #[serde(default)]
    pub key_kind: KeyKind,
    /// Discriminator column for single-table inheritance, if any.
    #[serde(default)]
    pub discriminator: Option<String>,
    pub updated_at: String,
}

impl TableMapping {
    /// Mapping with conventional column names: `id` (bigint) and `updated_at`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: "id".to_string(),
            key_kind: KeyKind::Int,
            discriminator: None,
            updated_at: "updated_at".to_string(),
        }
    }

    pub fn primary_key(mut self, column: impl Into<String>, kind: KeyKind) -> Self {
        self.primary_key = column.into();
        self.key_kind = kind;
        self
    }

    pub fn discriminator(mut self, column: impl Into<String>) -> Self {
        self.discriminator = Some(column.into());
        self
    }

    pub fn updated_at(mut self, column: impl Into<String>) -> Self {
        self.updated_at = column.into();
        self
    }
}

/// Per-type table mappings, and the planning step that turns a
/// `RecordQuery` into SQL.
#[derive(Debug, Default)]
pub struct TableMappings {
    inner: RwLock<HashMap<RecordType, TableMapping>>,
}

impl TableMappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the table mapping for `record_type`.
    pub fn insert(&self, record_type: impl Into<RecordType>, mapping: TableMapping) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.insert(record_type.into(), mapping);
    }

    pub fn get(&self, record_type: &RecordType) -> Option<TableMapping> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.get(record_type).cloned()
    }

    /// Plan a binding query: `None` when nothing can match.
    ///
    /// An unsatisfiable query plans to `None` even for an unmapped record
    /// type, so types without identity fields need no table mapping.
    pub fn plan(&self, query: &RecordQuery) -> Result<Option<(TableMapping, String)>, StoreError> {
        if query.condition.is_unsatisfiable() || query.limit == 0 {
            return Ok(None);
        }

        let mapping = self
            .get(&query.record_type)
            .ok_or_else(|| StoreError::UnknownRecordType(query.record_type.name().to_string()))?;

        Ok(build_binding_sql(&mapping, query)?.map(|sql| (mapping, sql)))
    }
}

/// Postgres record store.
pub struct PostgresRecordStore {
    pool: PgPool,
    runtime: tokio::runtime::Runtime,
    mappings: TableMappings,
}

impl PostgresRecordStore {
    /// Connect a small pool to `database_url`.
    pub fn connect(database_url: &str) -> Result<Self, StoreError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StoreError::connection(format!("failed to start runtime: {e}")))?;

        let pool = runtime
            .block_on(PgPoolOptions::new().max_connections(5).connect(database_url))
            .map_err(map_sqlx_error)?;

        tracing::info!("connected postgres record store");

        Ok(Self {
            pool,
            runtime,
            mappings: TableMappings::new(),
        })
    }

    /// Register (or replace) the table mapping for `record_type`.
    pub fn map(&self, record_type: impl Into<RecordType>, mapping: TableMapping) {
        self.mappings.insert(record_type, mapping);
    }
}

impl core::fmt::Debug for PostgresRecordStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PostgresRecordStore").finish_non_exhaustive()
    }
}

impl RecordStore for PostgresRecordStore {
    fn query(&self, query: &RecordQuery) -> Result<Vec<RecordProxy>, StoreError> {
        // An empty disjunction matches nothing; don't round-trip for it.
        let Some((mapping, sql)) = self.mappings.plan(query)? else {
            return Ok(vec![]);
        };

        tracing::debug!(record_type = %query.record_type, sql = %sql, "executing binding query");

        let mut statement = sqlx::query(&sql);
        for predicate in query.condition.predicates() {
            let Predicate::Eq { value, .. } = predicate;
            statement = statement.bind(value.to_string());
        }

        let rows = self
            .runtime
            .block_on(statement.fetch_all(&self.pool))
            .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| decode_row(row, &mapping, &query.record_type))
            .collect()
    }
}

/// Render the SQL for a binding query, or `None` if the condition is
/// unsatisfiable or the limit is zero.
pub(crate) fn build_binding_sql(
    mapping: &TableMapping,
    query: &RecordQuery,
) -> Result<Option<String>, StoreError> {
    if query.condition.is_unsatisfiable() || query.limit == 0 {
        return Ok(None);
    }

    let pk_cast = match mapping.key_kind {
        KeyKind::Int => "bigint",
        KeyKind::Uuid => "uuid",
        KeyKind::Text => "text",
    };
    let disc = match &mapping.discriminator {
        Some(column) => format!("{}::text", quote_ident(column)?),
        None => "NULL::text".to_string(),
    };

    let clauses = query
        .condition
        .predicates()
        .iter()
        .enumerate()
        .map(|(idx, predicate)| {
            Ok(format!("{}::text = ${}", quote_ident(predicate.field().as_str())?, idx + 1))
        })
        .collect::<Result<Vec<_>, StoreError>>()?;

    Ok(Some(format!(
        "SELECT {pk}::{pk_cast} AS pk, {disc} AS disc, {ts}::timestamptz AS updated_at \
         FROM {table} WHERE ({clauses}) LIMIT {limit}",
        pk = quote_ident(&mapping.primary_key)?,
        ts = quote_ident(&mapping.updated_at)?,
        table = quote_table(&mapping.table)?,
        clauses = clauses.join(" OR "),
        limit = query.limit,
    )))
}

fn decode_row(
    row: &PgRow,
    mapping: &TableMapping,
    record_type: &RecordType,
) -> Result<RecordProxy, StoreError> {
    let decode = |e: sqlx::Error| StoreError::backend(format!("failed to decode row: {e}"));

    let primary_key = match mapping.key_kind {
        KeyKind::Int => Handle::Int(row.try_get::<i64, _>("pk").map_err(decode)?),
        KeyKind::Uuid => Handle::Uuid(row.try_get::<Uuid, _>("pk").map_err(decode)?),
        KeyKind::Text => Handle::Text(row.try_get::<String, _>("pk").map_err(decode)?),
    };
    let discriminator = row.try_get::<Option<String>, _>("disc").map_err(decode)?;
    let last_modified = row
        .try_get::<DateTime<Utc>, _>("updated_at")
        .map_err(decode)?;

    Ok(assemble_proxy(primary_key, discriminator, last_modified, record_type))
}

/// A NULL (or unmapped) discriminator falls back to the record type name.
fn assemble_proxy(
    primary_key: Handle,
    discriminator: Option<String>,
    last_modified: DateTime<Utc>,
    record_type: &RecordType,
) -> RecordProxy {
    RecordProxy {
        primary_key,
        type_discriminator: discriminator.unwrap_or_else(|| record_type.name().to_string()),
        last_modified,
    }
}

fn quote_ident(name: &str) -> Result<String, StoreError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(StoreError::malformed(format!("invalid identifier '{name}'")));
    }
    Ok(format!("\"{name}\""))
}

fn quote_table(name: &str) -> Result<String, StoreError> {
    let parts = name
        .split('.')
        .map(quote_ident)
        .collect::<Result<Vec<_>, _>>()?;
    if parts.len() > 2 {
        return Err(StoreError::malformed(format!("invalid table name '{name}'")));
    }
    Ok(parts.join("."))
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Configuration(_) => StoreError::connection(err.to_string()),
        sqlx::Error::Database(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::malformed(err.to_string())
        }
        other => StoreError::backend(other.to_string()),
    }
}
