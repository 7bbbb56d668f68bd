//! Audit report endpoints
//!
//! Read-only JSON views over the audit trail for an admin or reporting
//! surface. The host decides where to mount them and who may call them:
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .nest("/api/admin/audit", audit_routes(state.audit().clone()));
//! ```

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::event::AuditEvent;
use super::query::AuditQuery;
use super::service::AuditService;
use super::store::StoreStats;
use crate::error::{Error, Result};

/// Default mount point used by the CLI
pub const DEFAULT_REPORT_PATH: &str = "/api/admin/audit";

/// Store counters plus the diagnostics failure count
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditStatsResponse {
    #[serde(flatten)]
    pub store: StoreStats,
    pub audit_log_failures_total: u64,
}

#[derive(Debug, Deserialize)]
struct LimitParams {
    limit: Option<usize>,
}

/// Routes: `GET /events`, `GET /unauthorized`, `GET /stats`
pub fn audit_routes<S>(service: AuditService) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/events", get(list_events))
        .route("/unauthorized", get(list_unauthorized))
        .route("/stats", get(stats))
        .with_state(service)
}

async fn list_events(
    State(service): State<AuditService>,
    query: std::result::Result<Query<AuditQuery>, QueryRejection>,
) -> Result<Json<Vec<AuditEvent>>> {
    let Query(query) = query.map_err(|e| Error::BadRequest(e.body_text()))?;
    Ok(Json(service.get_events(&query)))
}

async fn list_unauthorized(
    State(service): State<AuditService>,
    params: std::result::Result<Query<LimitParams>, QueryRejection>,
) -> Result<Json<Vec<AuditEvent>>> {
    let Query(params) = params.map_err(|e| Error::BadRequest(e.body_text()))?;
    Ok(Json(service.unauthorized_access_attempts(params.limit)))
}

async fn stats(State(service): State<AuditService>) -> Json<AuditStatsResponse> {
    Json(AuditStatsResponse {
        store: service.stats(),
        audit_log_failures_total: service.diagnostics().failures_total(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::event::{AuditEventType, NewAuditEvent};
    use crate::audit::request::{AuditRequest, Principal};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn seeded() -> AuditService {
        let service = AuditService::with_capacity(100);
        for (user, resource, id) in [(7, "clients", 1), (7, "projects", 2), (8, "clients", 3)] {
            let req = AuditRequest::new("GET", format!("/api/protected/{resource}/{id}"))
                .with_principal(Principal::new(user, format!("u{user}@example.com")));
            service.log_data_access(&req, resource, id, true);
        }
        service.log_event(
            NewAuditEvent::new(AuditEventType::CrossTenantAccessAttempt, "GET")
                .with_resource("estimates", 4),
        );
        service
    }

    async fn get_json(service: &AuditService, uri: &str) -> (StatusCode, serde_json::Value) {
        let app: Router = audit_routes(service.clone());
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_list_events_applies_filters() {
        let service = seeded();
        let (status, body) =
            get_json(&service, "/events?userId=7&resourceType=clients").await;

        assert_eq!(status, StatusCode::OK);
        let events: Vec<AuditEvent> = serde_json::from_value(body).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].resource_id, Some(1));
    }

    #[tokio::test]
    async fn test_list_events_newest_first_with_limit() {
        let service = seeded();
        let (_, body) = get_json(&service, "/events?limit=2").await;

        let events: Vec<AuditEvent> = serde_json::from_value(body).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, AuditEventType::CrossTenantAccessAttempt);
        assert_eq!(events[1].resource_id, Some(3));
    }

    #[tokio::test]
    async fn test_invalid_event_type_is_bad_request() {
        let service = seeded();
        let (status, body) = get_json(&service, "/events?eventType=LOGIN").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_unauthorized_endpoint() {
        let service = seeded();
        let (status, body) = get_json(&service, "/unauthorized").await;

        assert_eq!(status, StatusCode::OK);
        let events: Vec<AuditEvent> = serde_json::from_value(body).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].resource_type.as_deref(), Some("estimates"));
        assert!(!events[0].success);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let service = seeded();
        let (_, body) = get_json(&service, "/stats").await;

        assert_eq!(body["size"], 4);
        assert_eq!(body["capacity"], 100);
        assert_eq!(body["totalAppended"], 4);
        assert_eq!(body["auditLogFailuresTotal"], 0);
    }
}
