//! Record store boundary.
//!
//! The identity layer never talks to a database directly. It hands a
//! [`RecordQuery`] to a [`RecordStore`] and receives zero or more projected
//! [`RecordProxy`] rows back.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::error::StoreError;
use crate::record::{Projection, RecordProxy, RecordType};

/// A bounded, projected query against one record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordQuery {
    pub record_type: RecordType,
    pub condition: Condition,
    pub projection: Projection,
    pub limit: usize,
}

impl RecordQuery {
    /// The single-row binding lookup issued by `Identity::binding`.
    pub fn binding(record_type: RecordType, condition: Condition) -> Self {
        Self {
            record_type,
            condition,
            projection: Projection::binding(),
            limit: 1,
        }
    }
}

/// Store collaborator executing binding queries.
///
/// Implementations must honour `query.limit` and must return no rows for an
/// unsatisfiable condition.
pub trait RecordStore: Send + Sync {
    fn query(&self, query: &RecordQuery) -> Result<Vec<RecordProxy>, StoreError>;
}

impl<S> RecordStore for Arc<S>
where
    S: RecordStore + ?Sized,
{
    fn query(&self, query: &RecordQuery) -> Result<Vec<RecordProxy>, StoreError> {
        (**self).query(query)
    }
}
