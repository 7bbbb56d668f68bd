//! Application state management

use std::sync::Arc;

use crate::{
    audit::{AuditEventStore, AuditService, RequestAuditor},
    config::Config,
    error::Result,
};

/// Application state shared across handlers
///
/// Owns the single audit trail for the process. Clones share it.
#[derive(Debug, Clone)]
pub struct AppState {
    config: Arc<Config>,
    audit: AuditService,
    auditor: RequestAuditor,
}

impl AppState {
    /// Create a new AppState with the given configuration
    ///
    /// Fails if a configured audit path prefix cannot be compiled.
    pub fn new(config: Config) -> Result<Self> {
        let audit = AuditService::new(AuditEventStore::new(config.audit.capacity));
        let auditor = RequestAuditor::from_config(audit.clone(), &config.audit)?;

        tracing::debug!(
            capacity = audit.store().capacity(),
            enabled = config.audit.enabled,
            "Audit trail initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            audit,
            auditor,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle for recording and querying audit events
    pub fn audit(&self) -> &AuditService {
        &self.audit
    }

    /// The request classifier used by the audit middleware
    pub fn auditor(&self) -> &RequestAuditor {
        &self.auditor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditQuery, AuditRequest, Principal};

    #[test]
    fn test_state_uses_configured_capacity() {
        let mut config = Config::default();
        config.audit.capacity = 5;

        let state = AppState::new(config).unwrap();
        assert_eq!(state.audit().store().capacity(), 5);
        assert_eq!(state.config().service.port, 8080);
    }

    #[test]
    fn test_auditor_and_service_share_store() {
        let state = AppState::new(Config::default()).unwrap();
        let request = AuditRequest::new("GET", "/api/protected/clients/42")
            .with_principal(Principal::new(7, "dana@example.com"));

        state
            .auditor()
            .observe(&request, http::StatusCode::OK, None);

        assert_eq!(state.audit().get_events(&AuditQuery::new()).len(), 1);
    }
}
