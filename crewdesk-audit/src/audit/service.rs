//! Audit service: request-scoped logging helpers over the event store
//!
//! `AuditService` is the handle request handlers and the audit middleware
//! use to record events. It is cheap to clone; all clones share one store.
//! Every helper is infallible from the caller's point of view.

use std::sync::Arc;

use super::details::{AuditDetails, DetailValue};
use super::diagnostics::AuditDiagnostics;
use super::event::{AuditEvent, AuditEventType, NewAuditEvent};
use super::query::AuditQuery;
use super::request::AuditRequest;
use super::store::{AuditEventStore, StoreStats};

/// Handle to the process-wide audit trail
#[derive(Debug, Clone)]
pub struct AuditService {
    store: Arc<AuditEventStore>,
}

impl Default for AuditService {
    fn default() -> Self {
        Self::new(AuditEventStore::default())
    }
}

impl AuditService {
    pub fn new(store: AuditEventStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Create a service with a fresh store of the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(AuditEventStore::new(capacity))
    }

    pub fn store(&self) -> &AuditEventStore {
        &self.store
    }

    pub fn diagnostics(&self) -> &AuditDiagnostics {
        self.store.diagnostics()
    }

    /// Append an arbitrary event
    pub fn log_event(&self, event: NewAuditEvent) -> AuditEvent {
        self.store.log_event(event)
    }

    /// Record the outcome of a login or other authentication request
    pub fn log_authentication(&self, req: &AuditRequest, success: bool) {
        let event_type = if success {
            AuditEventType::AuthenticationSuccess
        } else {
            AuditEventType::AuthenticationFailure
        };
        self.store
            .log_event(Self::base(event_type, req).with_success(success));
    }

    /// Record a read of a single resource
    ///
    /// No-op for unauthenticated requests.
    pub fn log_data_access(
        &self,
        req: &AuditRequest,
        resource_type: &str,
        resource_id: i64,
        success: bool,
    ) {
        if !req.is_authenticated() {
            return;
        }
        self.store.log_event(
            Self::base(AuditEventType::DataAccess, req)
                .with_resource(resource_type, resource_id)
                .with_success(success),
        );
    }

    /// Record a create or update of a single resource
    ///
    /// No-op for unauthenticated requests.
    pub fn log_data_modification(
        &self,
        req: &AuditRequest,
        resource_type: &str,
        resource_id: i64,
        details: Option<AuditDetails>,
        success: bool,
    ) {
        if !req.is_authenticated() {
            return;
        }
        let mut event = Self::base(AuditEventType::DataModification, req)
            .with_resource(resource_type, resource_id)
            .with_success(success);
        event.details = details;
        self.store.log_event(event);
    }

    /// Record a deletion of a single resource
    ///
    /// No-op for unauthenticated requests.
    pub fn log_data_deletion(
        &self,
        req: &AuditRequest,
        resource_type: &str,
        resource_id: i64,
        success: bool,
    ) {
        if !req.is_authenticated() {
            return;
        }
        self.store.log_event(
            Self::base(AuditEventType::DataDeletion, req)
                .with_resource(resource_type, resource_id)
                .with_success(success),
        );
    }

    /// Record a denied request against another tenant's resource
    ///
    /// Always recorded as a failure. No-op for unauthenticated requests.
    pub fn log_cross_tenant_attempt(
        &self,
        req: &AuditRequest,
        resource_type: &str,
        resource_id: i64,
        details: Option<AuditDetails>,
    ) {
        if !req.is_authenticated() {
            return;
        }
        let mut event = Self::base(AuditEventType::CrossTenantAccessAttempt, req)
            .with_resource(resource_type, resource_id);
        event.details = details;
        self.store.log_event(event);
    }

    /// Record a failed permission check that is not tied to one resource
    pub fn log_authorization_failure(&self, req: &AuditRequest, reason: impl Into<String>) {
        let mut details = AuditDetails::new();
        details.insert("path".to_string(), DetailValue::from(req.path.as_str()));
        details.insert("reason".to_string(), DetailValue::from(reason.into()));
        self.store.log_event(
            Self::base(AuditEventType::AuthorizationFailure, req).with_details(details),
        );
    }

    /// Record a denied request for a resource within the caller's own tenant
    ///
    /// No-op for unauthenticated requests.
    pub fn log_access_denied(&self, req: &AuditRequest, resource_type: &str, resource_id: i64) {
        if !req.is_authenticated() {
            return;
        }
        self.store.log_event(
            Self::base(AuditEventType::ResourceAccessDenied, req)
                .with_resource(resource_type, resource_id),
        );
    }

    pub fn get_events(&self, query: &AuditQuery) -> Vec<AuditEvent> {
        self.store.get_events(query)
    }

    pub fn unauthorized_access_attempts(&self, limit: Option<usize>) -> Vec<AuditEvent> {
        self.store.unauthorized_access_attempts(limit)
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    fn base(event_type: AuditEventType, req: &AuditRequest) -> NewAuditEvent {
        NewAuditEvent::new(event_type, req.method.clone())
            .with_principal(req.principal.as_ref())
            .with_ip(req.ip.clone())
    }
}
