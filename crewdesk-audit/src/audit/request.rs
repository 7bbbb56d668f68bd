//! Request metadata observed by the audit subsystem

use serde::{Deserialize, Serialize};

use super::details::DetailValue;

/// Authenticated principal attached to a request
///
/// The host's authentication layer inserts this as a request extension
/// before the audit middleware runs. Its absence marks the request as
/// unauthenticated.
///
/// # Example
///
/// ```rust,ignore
/// async fn authenticate(mut request: Request, next: Next) -> Response {
///     if let Some(user) = lookup_session(&request).await {
///         request.extensions_mut().insert(Principal::new(user.id, user.email));
///     }
///     next.run(request).await
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub email: String,
}

impl Principal {
    pub fn new(id: i64, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}

/// The parts of an HTTP request the audit helpers need
#[derive(Debug, Clone, Default)]
pub struct AuditRequest {
    /// URI path without the query string
    pub path: String,
    /// HTTP method, upper case
    pub method: String,
    /// Client address, if known
    pub ip: Option<String>,
    /// Acting principal, `None` when unauthenticated
    pub principal: Option<Principal>,
    /// Decoded request body, when it was captured
    pub body: Option<DetailValue>,
}

impl AuditRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            ..Self::default()
        }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn with_body(mut self, body: DetailValue) -> Self {
        self.body = Some(body);
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }
}
