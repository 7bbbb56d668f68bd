//! Diagnostic side channel for audit logging failures
//!
//! Audit logging is best effort. Failures are never returned to request
//! handlers; they are counted here and logged so operators can still notice a
//! systemic problem.

use std::sync::atomic::{AtomicU64, Ordering};

/// Failures that can occur while composing or recording an audit event
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// The request or response body could not be read for capture
    #[error("failed to read {which} body: {message}")]
    BodyRead {
        which: &'static str,
        message: String,
    },

    /// Event details could not be serialized for the structured log line
    #[error("failed to serialize audit details: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Classification panicked
    #[error("audit classification panicked: {0}")]
    Panicked(String),
}

/// Counter of audit logging failures (`audit_log_failures_total`)
#[derive(Debug, Default)]
pub struct AuditDiagnostics {
    failures: AtomicU64,
}

impl AuditDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure and log it on the diagnostics target
    pub fn record(&self, error: &AuditError) {
        let total = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::warn!(
            target: "crewdesk_audit::diagnostics",
            audit_log_failures_total = total,
            error = %error,
            "Audit logging failure"
        );
    }

    /// Total failures recorded since start
    pub fn failures_total(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}
