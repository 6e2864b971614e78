//! `cachebind` — resolve one identity from the command line.
//!
//! ```text
//! cachebind <RecordType> [handle]
//! ```
//!
//! Prints the cache token and the resolved binding as JSON. Configuration is
//! read from the environment (see `cachebind_infra::config`).

use anyhow::{Context, bail};
use cachebind_core::Handle;
use cachebind_infra::BindingConfig;

fn main() -> anyhow::Result<()> {
    cachebind_observability::init();

    let mut args = std::env::args().skip(1);
    let Some(record_type) = args.next() else {
        bail!("usage: cachebind <RecordType> [handle]");
    };
    let handle = args.next().map(|raw| {
        raw.parse::<Handle>()
            .unwrap_or_else(|never| match never {})
    });

    let config = BindingConfig::from_env().context("failed to load configuration")?;
    let factory = config.build_factory().context("failed to wire identity factory")?;

    let identity = factory
        .from_type_and_handle(record_type, handle)
        .context("failed to construct identity")?;
    let binding = identity.binding().context("failed to resolve binding")?;

    tracing::info!(token = %identity, found = binding.is_some(), "resolved identity");

    let output = serde_json::json!({
        "token": identity.to_cache_token(),
        "binding": binding,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
