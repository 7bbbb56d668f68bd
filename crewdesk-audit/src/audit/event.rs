//! Audit event types
//!
//! Core types for security-relevant events: authentication outcomes, data
//! access and mutation, and denied cross-tenant requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::details::AuditDetails;
use super::request::Principal;

/// A single audit trail event
///
/// Events are immutable once the store has stamped them. Callers build a
/// [`NewAuditEvent`] and hand it to the store, which assigns `id` and
/// `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// Unique event identifier (UUIDv7, time ordered)
    pub id: Uuid,
    /// When the store accepted the event
    pub timestamp: DateTime<Utc>,
    /// Category of the event
    pub event_type: AuditEventType,
    /// Acting principal, absent for unauthenticated requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    /// Origin address of the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// Kind of resource touched, taken from the URL (e.g. `clients`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    /// Resource instance identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<i64>,
    /// HTTP method of the triggering request
    pub action: String,
    /// Forensic context (request body, response body, path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<AuditDetails>,
    /// Outcome flag
    pub success: bool,
}

/// An event as submitted to the store, before it is stamped
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEvent {
    pub event_type: AuditEventType,
    pub user_id: Option<i64>,
    pub user_email: Option<String>,
    pub ip_address: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<i64>,
    pub action: String,
    pub details: Option<AuditDetails>,
    pub success: bool,
}

impl NewAuditEvent {
    /// Create an event of the given type for the given HTTP method
    ///
    /// Starts out unsuccessful with no principal, resource or details.
    pub fn new(event_type: AuditEventType, action: impl Into<String>) -> Self {
        Self {
            event_type,
            user_id: None,
            user_email: None,
            ip_address: None,
            resource_type: None,
            resource_id: None,
            action: action.into(),
            details: None,
            success: false,
        }
    }

    /// Attach the acting principal, if any
    pub fn with_principal(mut self, principal: Option<&Principal>) -> Self {
        self.user_id = principal.map(|p| p.id);
        self.user_email = principal.map(|p| p.email.clone());
        self
    }

    pub fn with_ip(mut self, ip: Option<String>) -> Self {
        self.ip_address = ip;
        self
    }

    /// Set the resource this event is scoped to
    pub fn with_resource(mut self, resource_type: impl Into<String>, resource_id: i64) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id);
        self
    }

    pub fn with_details(mut self, details: AuditDetails) -> Self {
        self.details = Some(details);
        self
    }

    /// Set the outcome flag
    ///
    /// Event types that always record a failure ignore `true`.
    pub fn with_success(mut self, success: bool) -> Self {
        self.success = success && !self.event_type.always_fails();
        self
    }

    /// Stamp the event, producing the immutable record
    pub(crate) fn stamp(self, id: Uuid, timestamp: DateTime<Utc>) -> AuditEvent {
        let success = self.success && !self.event_type.always_fails();
        AuditEvent {
            id,
            timestamp,
            event_type: self.event_type,
            user_id: self.user_id,
            user_email: self.user_email,
            ip_address: self.ip_address,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            action: self.action,
            details: self.details,
            success,
        }
    }
}

/// Categories of audit events
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    AuthenticationSuccess,
    AuthenticationFailure,
    AuthorizationFailure,
    DataAccess,
    DataModification,
    DataDeletion,
    ResourceAccessDenied,
    /// A 403 against a resource path, treated as a possible attempt to reach
    /// another tenant's data
    CrossTenantAccessAttempt,
}

impl AuditEventType {
    /// Every variant, in declaration order
    pub const ALL: [AuditEventType; 8] = [
        Self::AuthenticationSuccess,
        Self::AuthenticationFailure,
        Self::AuthorizationFailure,
        Self::DataAccess,
        Self::DataModification,
        Self::DataDeletion,
        Self::ResourceAccessDenied,
        Self::CrossTenantAccessAttempt,
    ];

    /// Wire name (`DATA_ACCESS`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess => "AUTHENTICATION_SUCCESS",
            Self::AuthenticationFailure => "AUTHENTICATION_FAILURE",
            Self::AuthorizationFailure => "AUTHORIZATION_FAILURE",
            Self::DataAccess => "DATA_ACCESS",
            Self::DataModification => "DATA_MODIFICATION",
            Self::DataDeletion => "DATA_DELETION",
            Self::ResourceAccessDenied => "RESOURCE_ACCESS_DENIED",
            Self::CrossTenantAccessAttempt => "CROSS_TENANT_ACCESS_ATTEMPT",
        }
    }

    /// Whether events of this type are failures by definition
    pub fn always_fails(&self) -> bool {
        matches!(self, Self::CrossTenantAccessAttempt)
    }
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown event type name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown audit event type: {0}")]
pub struct ParseEventTypeError(pub String);

impl FromStr for AuditEventType {
    type Err = ParseEventTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ParseEventTypeError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_event_defaults() {
        let event = NewAuditEvent::new(AuditEventType::DataAccess, "GET");
        assert_eq!(event.action, "GET");
        assert!(!event.success);
        assert!(event.user_id.is_none());
        assert!(event.resource_type.is_none());
    }

    #[test]
    fn test_with_principal_copies_identity() {
        let principal = Principal::new(7, "dana@example.com");
        let event = NewAuditEvent::new(AuditEventType::DataAccess, "GET")
            .with_principal(Some(&principal))
            .with_resource("clients", 42)
            .with_success(true);

        assert_eq!(event.user_id, Some(7));
        assert_eq!(event.user_email.as_deref(), Some("dana@example.com"));
        assert_eq!(event.resource_type.as_deref(), Some("clients"));
        assert_eq!(event.resource_id, Some(42));
        assert!(event.success);
    }

    #[test]
    fn test_cross_tenant_attempt_is_never_successful() {
        let event = NewAuditEvent::new(AuditEventType::CrossTenantAccessAttempt, "GET")
            .with_success(true);
        assert!(!event.success);

        let mut forced = NewAuditEvent::new(AuditEventType::CrossTenantAccessAttempt, "GET");
        forced.success = true;
        let stamped = forced.stamp(Uuid::now_v7(), Utc::now());
        assert!(!stamped.success);
    }

    #[test]
    fn test_event_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&AuditEventType::CrossTenantAccessAttempt).unwrap(),
            "\"CROSS_TENANT_ACCESS_ATTEMPT\""
        );
        assert_eq!(AuditEventType::DataDeletion.to_string(), "DATA_DELETION");
    }

    #[test]
    fn test_event_type_from_str() {
        assert_eq!(
            "data_access".parse::<AuditEventType>().unwrap(),
            AuditEventType::DataAccess
        );
        assert_eq!(
            "cross-tenant-access-attempt".parse::<AuditEventType>().unwrap(),
            AuditEventType::CrossTenantAccessAttempt
        );
        assert!("LOGIN".parse::<AuditEventType>().is_err());
    }

    #[test]
    fn test_serialized_event_uses_camel_case_and_omits_absent_fields() {
        let event = NewAuditEvent::new(AuditEventType::AuthenticationFailure, "POST")
            .stamp(Uuid::now_v7(), Utc::now());
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["eventType"], "AUTHENTICATION_FAILURE");
        assert_eq!(json["success"], false);
        assert!(json.get("resourceType").is_none());
        assert!(json.get("userId").is_none());
    }
}
