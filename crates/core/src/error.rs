//! Identity error model.

use thiserror::Error;

/// Result type used across the identity layer.
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Identity-level error.
///
/// "Not found" is deliberately absent: a handle that matches no record is a
/// valid (memoized) `None` binding, not a failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The record type is not a supported persisted-record type.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The store failed while resolving a binding.
    #[error("store query failed: {0}")]
    StoreQuery(#[from] StoreError),
}

impl IdentityError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Construction-time rejection of an unregistered record type.
    pub fn unsupported_type(type_name: &str) -> Self {
        Self::Configuration(format!(
            "must instantiate from a supported persisted-record type (got '{type_name}')"
        ))
    }
}

/// Store operation error.
///
/// These are **infrastructure errors** raised by a `RecordStore` adapter.
/// They pass through the identity layer unmodified.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("malformed query: {0}")]
    MalformedQuery(String),
    #[error("unknown record type: {0}")]
    UnknownRecordType(String),
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedQuery(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}
