//! Tracing subscriber set-up
//!
//! `RUST_LOG` takes precedence; otherwise the filter comes from
//! [`StoreConfig::log_filter`]. Installation is skipped when the embedding
//! application already set a global subscriber.

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter for `config`
pub fn filter(config: &StoreConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.log_filter).map_err(|e| {
            StoreError::Config(format!("Invalid log filter {:?}: {}", config.log_filter, e))
        }),
    }
}

/// Install a global fmt subscriber.
///
/// Returns `Ok(false)` if a global subscriber was already installed.
pub fn init(config: &StoreConfig) -> Result<bool> {
    let installed = tracing_subscriber::registry()
        .with(filter(config)?)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!("Logging initialised with filter {:?}", config.log_filter);
    }
    Ok(installed)
}
