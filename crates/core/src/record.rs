//! Record types and the minimal record projection used for binding.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::handle::Handle;

/// Descriptor of a queryable record kind.
///
/// Identified by its fully-qualified type name (e.g. `"Order"` or
/// `"billing::Invoice"`). Whether the type is actually supported is decided
/// by a `TypeRegistry`, never by the descriptor itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordType(Cow<'static, str>);

impl RecordType {
    /// Descriptor usable in `const` position (see `PersistedRecord::RECORD_TYPE`).
    pub const fn new_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for RecordType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for RecordType {
    fn from(value: &'static str) -> Self {
        Self::new_static(value)
    }
}

impl From<String> for RecordType {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A Rust type backed by a persisted record kind.
///
/// Implemented by domain types so callers can build identities without
/// spelling out the type name.
pub trait PersistedRecord {
    const RECORD_TYPE: RecordType;

    fn record_type() -> RecordType {
        Self::RECORD_TYPE
    }
}

/// Lightweight stand-in for a stored record.
///
/// Carries only what a caching layer needs for versioning and invalidation:
/// the primary key, the stored type discriminator, and the last-modified time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordProxy {
    pub primary_key: Handle,
    pub type_discriminator: String,
    pub last_modified: DateTime<Utc>,
}

impl RecordProxy {
    pub fn new(
        primary_key: impl Into<Handle>,
        type_discriminator: impl Into<String>,
        last_modified: DateTime<Utc>,
    ) -> Self {
        Self {
            primary_key: primary_key.into(),
            type_discriminator: type_discriminator.into(),
            last_modified,
        }
    }
}

/// Projected fields a binding query returns.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectedField {
    PrimaryKey,
    TypeDiscriminator,
    LastModified,
}

/// Field projection of a binding query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    fields: Vec<ProjectedField>,
}

impl Projection {
    /// `{primary key, type discriminator, last-modified timestamp}` and nothing else.
    pub fn binding() -> Self {
        Self {
            fields: vec![
                ProjectedField::PrimaryKey,
                ProjectedField::TypeDiscriminator,
                ProjectedField::LastModified,
            ],
        }
    }

    pub fn fields(&self) -> &[ProjectedField] {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Order;

    impl PersistedRecord for Order {
        const RECORD_TYPE: RecordType = RecordType::new_static("Order");
    }

    #[test]
    fn static_and_owned_descriptors_compare_equal() {
        assert_eq!(Order::record_type(), RecordType::new("Order"));
        assert_eq!(RecordType::from("Order").to_string(), "Order");
    }

    #[test]
    fn binding_projection_is_minimal() {
        assert_eq!(
            Projection::binding().fields(),
            &[
                ProjectedField::PrimaryKey,
                ProjectedField::TypeDiscriminator,
                ProjectedField::LastModified
            ]
        );
    }
}
