//! Request classification
//!
//! `RequestAuditor` turns one finished request/response exchange into zero,
//! one or two audit events:
//!
//! 1. Static assets and health checks are ignored.
//! 2. Unauthenticated requests only produce authentication events, and only
//!    on login or auth paths (2xx is a success, anything else a failure).
//! 3. Authenticated requests to a protected resource with an id produce
//!    `DATA_ACCESS` (GET), `DATA_MODIFICATION` (POST, PATCH, PUT, with the
//!    request body) or `DATA_DELETION` (DELETE).
//! 4. Independently, a 403 on any resource with an id produces a
//!    `CROSS_TENANT_ACCESS_ATTEMPT`, so a forbidden DELETE yields two events.

use axum::http::{Method, StatusCode};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use super::config::AuditConfig;
use super::details::{AuditDetails, DetailValue};
use super::diagnostics::AuditError;
use super::request::AuditRequest;
use super::rules::AuditRules;
use super::service::AuditService;

/// Classifies finished exchanges and records the resulting events
#[derive(Debug, Clone)]
pub struct RequestAuditor {
    service: AuditService,
    rules: Arc<AuditRules>,
    enabled: bool,
    capture_limit: usize,
}

impl RequestAuditor {
    pub fn new(service: AuditService, rules: AuditRules) -> Self {
        Self {
            service,
            rules: Arc::new(rules),
            enabled: true,
            capture_limit: AuditConfig::default().max_capture_bytes,
        }
    }

    /// Build an auditor from the `[audit]` configuration section
    pub fn from_config(service: AuditService, config: &AuditConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            service,
            rules: Arc::new(AuditRules::from_config(config)?),
            enabled: config.enabled,
            capture_limit: config.max_capture_bytes,
        })
    }

    pub fn service(&self) -> &AuditService {
        &self.service
    }

    pub fn rules(&self) -> &AuditRules {
        &self.rules
    }

    /// Most body bytes kept in event details
    pub fn capture_limit(&self) -> usize {
        self.capture_limit
    }

    /// Whether requests to `path` are audited at all
    pub fn observes(&self, path: &str) -> bool {
        self.enabled && !self.rules.is_ignored(path)
    }

    /// Whether the request body is needed for a `DATA_MODIFICATION` event
    pub fn needs_request_body(&self, method: &Method, path: &str, authenticated: bool) -> bool {
        authenticated
            && is_modification(method)
            && self.rules.is_protected(path)
            && self.has_scoped_resource(path)
    }

    /// Whether the response body is needed for a `CROSS_TENANT_ACCESS_ATTEMPT` event
    pub fn needs_response_body(&self, path: &str, status: StatusCode, authenticated: bool) -> bool {
        authenticated && status == StatusCode::FORBIDDEN && self.has_scoped_resource(path)
    }

    /// Record the events for a finished exchange
    ///
    /// Never panics and never fails; problems are reported to the
    /// diagnostics sink.
    pub fn observe(&self, req: &AuditRequest, status: StatusCode, response_body: Option<DetailValue>) {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.classify(req, status, response_body)
        }));

        if let Err(panic) = outcome {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            self.service
                .diagnostics()
                .record(&AuditError::Panicked(message));
        }
    }

    fn classify(&self, req: &AuditRequest, status: StatusCode, response_body: Option<DetailValue>) {
        if !self.observes(&req.path) {
            return;
        }

        let success = status.is_success();

        if !req.is_authenticated() {
            if self.rules.is_auth_path(&req.path) {
                self.service.log_authentication(req, success);
            }
            return;
        }

        let Some(resource) = self.rules.parse_resource(&req.path) else {
            return;
        };
        let Some((resource_type, resource_id)) = resource.scoped() else {
            return;
        };

        if self.rules.is_protected(&req.path) {
            match req.method.as_str() {
                "GET" => {
                    self.service
                        .log_data_access(req, resource_type, resource_id, success);
                }
                "POST" | "PATCH" | "PUT" => {
                    let mut details = AuditDetails::new();
                    details.insert(
                        "body".to_string(),
                        req.body.clone().unwrap_or(DetailValue::Null),
                    );
                    self.service.log_data_modification(
                        req,
                        resource_type,
                        resource_id,
                        Some(details),
                        success,
                    );
                }
                "DELETE" => {
                    self.service
                        .log_data_deletion(req, resource_type, resource_id, success);
                }
                _ => {}
            }
        }

        if status == StatusCode::FORBIDDEN {
            let mut details = AuditDetails::new();
            details.insert("path".to_string(), DetailValue::from(req.path.as_str()));
            details.insert(
                "responseBody".to_string(),
                response_body.unwrap_or(DetailValue::Null),
            );
            self.service.log_cross_tenant_attempt(
                req,
                resource_type,
                resource_id,
                Some(details),
            );
        }
    }

    fn has_scoped_resource(&self, path: &str) -> bool {
        self.rules
            .parse_resource(path)
            .is_some_and(|resource| resource.resource_id.is_some())
    }
}

fn is_modification(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PATCH || *method == Method::PUT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::event::AuditEventType;
    use crate::audit::query::AuditQuery;
    use crate::audit::request::Principal;

    fn auditor() -> RequestAuditor {
        RequestAuditor::new(AuditService::with_capacity(100), AuditRules::default())
    }

    fn as_user(id: i64, method: &str, path: &str) -> AuditRequest {
        AuditRequest::new(method, path).with_principal(Principal::new(id, format!("u{id}@example.com")))
    }

    fn events(auditor: &RequestAuditor) -> Vec<crate::audit::AuditEvent> {
        auditor.service().get_events(&AuditQuery::new())
    }

    #[test]
    fn test_authenticated_read_logs_data_access() {
        let auditor = auditor();
        auditor.observe(&as_user(7, "GET", "/api/protected/clients/42"), StatusCode::OK, None);

        let events = events(&auditor);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, AuditEventType::DataAccess);
        assert_eq!(events[0].resource_type.as_deref(), Some("clients"));
        assert_eq!(events[0].resource_id, Some(42));
        assert_eq!(events[0].user_id, Some(7));
        assert!(events[0].success);
    }

    #[test]
    fn test_forbidden_delete_logs_two_events() {
        let auditor = auditor();
        auditor.observe(
            &as_user(3, "DELETE", "/api/protected/projects/9"),
            StatusCode::FORBIDDEN,
            Some(DetailValue::Text("Forbidden".into())),
        );

        let events = events(&auditor);
        assert_eq!(events.len(), 2);
        let kinds: Vec<_> = events.iter().map(|e| e.event_type).collect();
        assert!(kinds.contains(&AuditEventType::DataDeletion));
        assert!(kinds.contains(&AuditEventType::CrossTenantAccessAttempt));
        for event in &events {
            assert!(!event.success);
            assert_eq!(event.resource_type.as_deref(), Some("projects"));
            assert_eq!(event.resource_id, Some(9));
        }

        let attempt = events
            .iter()
            .find(|e| e.event_type == AuditEventType::CrossTenantAccessAttempt)
            .unwrap();
        let details = attempt.details.as_ref().unwrap();
        assert_eq!(details["path"], DetailValue::Text("/api/protected/projects/9".into()));
        assert_eq!(details["responseBody"], DetailValue::Text("Forbidden".into()));
    }

    #[test]
    fn test_failed_login_logs_authentication_failure() {
        let auditor = auditor();
        auditor.observe(&AuditRequest::new("POST", "/api/login"), StatusCode::UNAUTHORIZED, None);

        let events = events(&auditor);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, AuditEventType::AuthenticationFailure);
        assert!(!events[0].success);
        assert!(events[0].resource_type.is_none());
    }

    #[test]
    fn test_successful_auth_segment_logs_success() {
        let auditor = auditor();
        auditor.observe(&AuditRequest::new("GET", "/api/auth/callback"), StatusCode::FOUND, None);
        auditor.observe(&AuditRequest::new("POST", "/api/auth/token"), StatusCode::CREATED, None);

        let events = events(&auditor);
        assert_eq!(events[0].event_type, AuditEventType::AuthenticationSuccess);
        // 302 is not 2xx
        assert_eq!(events[1].event_type, AuditEventType::AuthenticationFailure);
    }

    #[test]
    fn test_static_assets_are_ignored() {
        let auditor = auditor();
        auditor.observe(&as_user(1, "GET", "/static/logo.png"), StatusCode::FORBIDDEN, None);
        auditor.observe(&AuditRequest::new("GET", "/static/logo.png"), StatusCode::OK, None);
        auditor.observe(&as_user(1, "GET", "/health"), StatusCode::OK, None);

        assert!(auditor.service().store().is_empty());
    }

    #[test]
    fn test_collection_route_logs_nothing() {
        let auditor = auditor();
        auditor.observe(&as_user(1, "GET", "/api/protected/clients"), StatusCode::OK, None);
        auditor.observe(&as_user(1, "GET", "/api/protected/clients"), StatusCode::FORBIDDEN, None);

        assert!(auditor.service().store().is_empty());
    }

    #[test]
    fn test_unauthenticated_resource_requests_log_nothing() {
        let auditor = auditor();
        auditor.observe(
            &AuditRequest::new("GET", "/api/protected/clients/42"),
            StatusCode::FORBIDDEN,
            None,
        );
        auditor.observe(&AuditRequest::new("GET", "/api/public/estimates/3"), StatusCode::OK, None);

        assert!(auditor.service().store().is_empty());
    }

    #[test]
    fn test_modification_attaches_request_body() {
        let auditor = auditor();
        let req = as_user(4, "PATCH", "/api/protected/invoices/12")
            .with_body(DetailValue::from(serde_json::json!({"status": "paid"})));
        auditor.observe(&req, StatusCode::OK, None);

        let events = events(&auditor);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, AuditEventType::DataModification);
        let body = &events[0].details.as_ref().unwrap()["body"];
        assert_eq!(body, &DetailValue::from(serde_json::json!({"status": "paid"})));
    }

    #[test]
    fn test_public_forbidden_logs_only_cross_tenant_attempt() {
        let auditor = auditor();
        auditor.observe(&as_user(5, "GET", "/api/public/estimates/3"), StatusCode::FORBIDDEN, None);

        let events = events(&auditor);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, AuditEventType::CrossTenantAccessAttempt);
        assert_eq!(
            events[0].details.as_ref().unwrap()["responseBody"],
            DetailValue::Null
        );
    }

    #[test]
    fn test_other_methods_log_nothing_unless_forbidden() {
        let auditor = auditor();
        auditor.observe(&as_user(1, "OPTIONS", "/api/protected/clients/1"), StatusCode::OK, None);
        assert!(auditor.service().store().is_empty());

        auditor.observe(&as_user(1, "HEAD", "/api/protected/clients/1"), StatusCode::FORBIDDEN, None);
        assert_eq!(auditor.service().stats().size, 1);
    }

    #[test]
    fn test_disabled_auditor_observes_nothing() {
        let config = AuditConfig {
            enabled: false,
            ..AuditConfig::default()
        };
        let auditor = RequestAuditor::from_config(AuditService::default(), &config).unwrap();
        assert!(!auditor.observes("/api/protected/clients/1"));

        auditor.observe(&as_user(7, "GET", "/api/protected/clients/42"), StatusCode::OK, None);
        auditor.observe(&as_user(7, "DELETE", "/api/protected/clients/42"), StatusCode::FORBIDDEN, None);
        auditor.observe(&AuditRequest::new("POST", "/api/login"), StatusCode::UNAUTHORIZED, None);
        assert!(auditor.service().store().is_empty());
    }

    #[test]
    fn test_panic_while_recording_is_contained_and_counted() {
        use tracing_subscriber::layer::{Context, SubscriberExt};

        /// Log sink that fails on every audit event line
        struct FailingEventSink;

        impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FailingEventSink {
            fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
                if event.metadata().target() == "crewdesk_audit::events" {
                    panic!("log sink unavailable");
                }
            }
        }

        let auditor = auditor();
        let subscriber = tracing_subscriber::registry().with(FailingEventSink);
        tracing::subscriber::with_default(subscriber, || {
            auditor.observe(&as_user(7, "GET", "/api/protected/clients/42"), StatusCode::OK, None);
        });

        assert_eq!(auditor.service().diagnostics().failures_total(), 1);

        // Later exchanges are still recorded
        auditor.observe(&as_user(7, "GET", "/api/protected/clients/43"), StatusCode::OK, None);
        assert_eq!(auditor.service().diagnostics().failures_total(), 1);
        assert_eq!(auditor.service().store().len(), 2);
    }

    #[test]
    fn test_capture_decisions() {
        let auditor = auditor();
        assert!(auditor.needs_request_body(&Method::POST, "/api/protected/clients/1", true));
        assert!(!auditor.needs_request_body(&Method::POST, "/api/protected/clients", true));
        assert!(!auditor.needs_request_body(&Method::POST, "/api/protected/clients/1", false));
        assert!(!auditor.needs_request_body(&Method::GET, "/api/protected/clients/1", true));
        assert!(!auditor.needs_request_body(&Method::PUT, "/api/public/clients/1", true));

        assert!(auditor.needs_response_body("/api/public/clients/1", StatusCode::FORBIDDEN, true));
        assert!(!auditor.needs_response_body("/api/public/clients/1", StatusCode::NOT_FOUND, true));
        assert!(!auditor.needs_response_body("/api/protected/clients/1", StatusCode::FORBIDDEN, false));
    }
}
