//! Process-wide tracing/logging setup.

/// Tracing subscriber installation.
pub mod tracing;

pub use self::tracing::{LogFormat, init_with};

/// Initialize process-wide tracing with JSON logs.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    self::tracing::init();
}
