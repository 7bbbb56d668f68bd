//! Audit event query filters
//!
//! Every supplied filter must match (logical AND). An empty query matches
//! every event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::{AuditEvent, AuditEventType};

/// Default result cap for unauthorized access reports
pub const DEFAULT_UNAUTHORIZED_LIMIT: usize = 100;

/// Filters for [`AuditEventStore::get_events`](super::AuditEventStore::get_events)
///
/// Deserializes from a query string such as
/// `?userId=7&resourceType=clients&startDate=2026-01-01T00:00:00Z&limit=20`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<AuditEventType>,
    /// Inclusive lower bound on `timestamp`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `timestamp`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    /// Keep at most this many of the most recent matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    pub fn event_type(mut self, event_type: AuditEventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    pub fn start_date(mut self, start: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self
    }

    pub fn end_date(mut self, end: DateTime<Utc>) -> Self {
        self.end_date = Some(end);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query for cross-tenant access attempts
    pub fn unauthorized(limit: usize) -> Self {
        Self::new()
            .event_type(AuditEventType::CrossTenantAccessAttempt)
            .limit(limit)
    }

    /// Whether `event` satisfies every filter in this query
    ///
    /// `limit` is not a predicate and is ignored here.
    pub fn matches(&self, event: &AuditEvent) -> bool {
        if let Some(user_id) = self.user_id {
            if event.user_id != Some(user_id) {
                return false;
            }
        }
        if let Some(ref resource_type) = self.resource_type {
            if event.resource_type.as_deref() != Some(resource_type.as_str()) {
                return false;
            }
        }
        if let Some(event_type) = self.event_type {
            if event.event_type != event_type {
                return false;
            }
        }
        if let Some(start) = self.start_date {
            if event.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if event.timestamp > end {
                return false;
            }
        }
        true
    }
}
