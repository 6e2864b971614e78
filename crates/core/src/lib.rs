//! `cachebind-core` — identity abstraction for cache binding.
//!
//! An [`Identity`] names one stored record by `(record type, handle)`. It can
//! be compared and turned into a cache token without any IO, and resolves on
//! demand (at most once) to a minimal [`RecordProxy`] used for versioning.
//!
//! This crate contains no storage adapters; see `cachebind-infra`.

pub mod binding;
pub mod condition;
pub mod error;
pub mod factory;
pub mod handle;
pub mod identity;
pub mod record;
pub mod registry;
pub mod store;

pub use binding::CacheBinding;
pub use condition::{Condition, FieldName, FieldSource, Predicate, build_predicates};
pub use error::{IdentityError, IdentityResult, StoreError};
pub use factory::IdentityFactory;
pub use handle::Handle;
pub use identity::Identity;
pub use record::{PersistedRecord, ProjectedField, Projection, RecordProxy, RecordType};
pub use registry::{DEFAULT_IDENTITY_FIELDS, InMemoryTypeRegistry, TypeRegistry};
pub use store::{RecordQuery, RecordStore};
