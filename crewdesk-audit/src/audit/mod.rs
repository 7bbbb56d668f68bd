//! Security audit capture and query
//!
//! Records security-relevant events (authentication outcomes, data access,
//! modification and deletion, denied cross-tenant requests) observed on HTTP
//! traffic, and keeps the most recent ones in a bounded in-memory buffer.
//!
//! # Architecture
//!
//! - [`AuditEventStore`]: FIFO ring buffer (default 1000 events) behind a
//!   single mutex, with filtered, newest-first queries.
//! - [`AuditService`]: cloneable handle with request-scoped helpers. The data
//!   helpers do nothing for unauthenticated requests.
//! - [`RequestAuditor`]: classifies a finished request/response exchange.
//! - [`audit_middleware`]: axum middleware feeding the auditor.
//! - [`audit_routes`]: JSON report endpoints.
//!
//! Audit logging is best effort: failures go to [`AuditDiagnostics`] and
//! never reach the client.

pub mod auditor;
mod body;
pub mod config;
pub mod details;
pub mod diagnostics;
pub mod event;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod request;
pub mod rules;
pub mod service;
pub mod store;

pub use auditor::RequestAuditor;
pub use config::AuditConfig;
pub use details::{AuditDetails, DetailValue};
pub use diagnostics::{AuditDiagnostics, AuditError};
pub use event::{AuditEvent, AuditEventType, NewAuditEvent, ParseEventTypeError};
pub use handlers::{audit_routes, AuditStatsResponse, DEFAULT_REPORT_PATH};
pub use middleware::{audit_middleware, with_audit};
pub use query::{AuditQuery, DEFAULT_UNAUTHORIZED_LIMIT};
pub use request::{AuditRequest, Principal};
pub use rules::{AuditRules, ResourceRef};
pub use service::AuditService;
pub use store::{AuditEventStore, StoreStats, DEFAULT_CAPACITY};
