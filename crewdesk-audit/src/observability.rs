//! Structured logging setup
//!
//! Audit events are emitted on the `crewdesk_audit::events` target and
//! capture failures on `crewdesk_audit::diagnostics`, so both can be routed
//! or silenced with ordinary EnvFilter directives, e.g.
//! `info,crewdesk_audit::events=off`.

use tracing_subscriber::EnvFilter;

use crate::{
    config::Config,
    error::{Error, Result},
};

/// Initialize JSON tracing for the service
///
/// `service.log_level` accepts either a bare level or a full filter
/// directive. An unparsable value falls back to `info`.
pub fn init_tracing(config: &Config) -> Result<()> {
    let log_level = config.service.log_level.clone();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()
        .map_err(|e| Error::Internal(format!("failed to install tracing subscriber: {e}")))?;

    tracing::info!(
        environment = %config.service.environment,
        "Tracing initialized for service: {}",
        config.service.name
    );

    Ok(())
}

/// Flush and shut down tracing
pub fn shutdown_tracing() {
    tracing::info!("Tracing shutdown complete");
}
