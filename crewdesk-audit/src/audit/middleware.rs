//! Audit middleware for HTTP request logging
//!
//! Wraps the inner service, waits for the final response, and hands the
//! finished exchange to the [`RequestAuditor`]. Request and response bodies
//! are buffered only when an event needs them and are passed on unchanged.
//!
//! The host's authentication layer must run before this one (be layered
//! outside it) so that the [`Principal`] extension is visible here.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
    Router,
};
use std::net::SocketAddr;

use super::auditor::RequestAuditor;
use super::body::{capture, Captured};
use super::details::DetailValue;
use super::diagnostics::AuditError;
use super::request::{AuditRequest, Principal};

/// Attach the audit middleware to a router
///
/// # Example
///
/// ```rust,ignore
/// let app = with_audit(business_routes(), state.auditor().clone())
///     // authentication must wrap the audit layer
///     .layer(axum::middleware::from_fn(authenticate));
/// ```
pub fn with_audit<S>(router: Router<S>, auditor: RequestAuditor) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(axum::middleware::from_fn_with_state(auditor, audit_middleware))
}

/// Audit middleware function
///
/// Runs once per request. The audit outcome never changes the response the
/// client receives: captured bodies are replayed as read, read errors
/// included, so the handler's own rejection (e.g. 413 from a body limit
/// layered outside) still reaches the client.
pub async fn audit_middleware(
    State(auditor): State<RequestAuditor>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    if !auditor.observes(&path) {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let principal = request.extensions().get::<Principal>().cloned();
    let authenticated = principal.is_some();

    let mut audit_request = AuditRequest {
        path,
        method: method.to_string(),
        ip: client_ip(&request),
        principal,
        body: None,
    };

    let request = if auditor.needs_request_body(&method, &audit_request.path, authenticated) {
        let (parts, body) = request.into_parts();
        let (captured, body) = capture(body, auditor.capture_limit()).await;
        audit_request.body = captured_detail(&auditor, captured, "request");
        Request::from_parts(parts, body)
    } else {
        request
    };

    let response = next.run(request).await;
    let status = response.status();

    let (response, response_body) =
        if auditor.needs_response_body(&audit_request.path, status, authenticated) {
            let (parts, body) = response.into_parts();
            let (captured, body) = capture(body, auditor.capture_limit()).await;
            let detail = captured_detail(&auditor, captured, "response");
            (Response::from_parts(parts, body), detail)
        } else {
            (response, None)
        };

    auditor.observe(&audit_request, status, response_body);

    response
}

/// Detail value for a captured body; read failures are counted and leave no body
fn captured_detail(
    auditor: &RequestAuditor,
    captured: Captured,
    which: &'static str,
) -> Option<DetailValue> {
    match captured {
        Captured::Complete(bytes) => Some(DetailValue::from_body(&bytes)),
        Captured::Truncated(preview) => Some(DetailValue::truncated_body(&preview)),
        Captured::Failed(message) => {
            auditor
                .service()
                .diagnostics()
                .record(&AuditError::BodyRead { which, message });
            None
        }
    }
}

/// Client address: proxy headers first, then the socket peer
fn client_ip(request: &Request) -> Option<String> {
    request
        .headers()
        .get("x-forwarded-for")
        .or_else(|| request.headers().get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
}
