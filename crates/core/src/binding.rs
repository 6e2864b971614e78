//! Cache binding protocol: what a caching layer reads from a bound object.

use crate::error::IdentityResult;
use crate::record::RecordProxy;

/// Read-only view a caching layer binds against.
///
/// The caching layer composes full keys from `cache_token` and decides
/// invalidation from the proxy (typically by comparing `last_modified`).
pub trait CacheBinding {
    /// Deterministic key fragment. Must not require store access.
    fn cache_token(&self) -> String;

    /// Minimal projection of the bound record, or `None` if there is none.
    fn proxy_binding(&self) -> IdentityResult<Option<RecordProxy>>;
}
