//! Bounded in-memory audit event store
//!
//! A FIFO ring buffer of recent events. Appends and evictions happen in one
//! critical section under a single mutex; reads filter a consistent view
//! under the same lock and sort outside it. Nothing here performs I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use super::diagnostics::{AuditDiagnostics, AuditError};
use super::event::{AuditEvent, NewAuditEvent};
use super::query::{AuditQuery, DEFAULT_UNAUTHORIZED_LIMIT};

/// Number of events retained when no capacity is configured
pub const DEFAULT_CAPACITY: usize = 1000;

/// Mutable store state, only touched while the lock is held
#[derive(Debug, Default)]
struct StoreState {
    /// Events in append order, oldest at the front
    events: VecDeque<AuditEvent>,
    /// Timestamp of the most recent append
    last_timestamp: Option<DateTime<Utc>>,
    /// Total events ever appended (including evicted ones)
    total_appended: u64,
    /// Events dropped from the front to stay within capacity
    evicted_total: u64,
}

/// Point-in-time counters for the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub size: usize,
    pub capacity: usize,
    pub total_appended: u64,
    pub evicted_total: u64,
}

/// Capacity-bounded, append-only log of audit events
///
/// Create one per process and share it through an `Arc` (usually inside
/// [`AuditService`](super::AuditService)).
#[derive(Debug)]
pub struct AuditEventStore {
    state: Mutex<StoreState>,
    capacity: usize,
    diagnostics: Arc<AuditDiagnostics>,
}

impl Default for AuditEventStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl AuditEventStore {
    /// Create a store retaining at most `capacity` events (minimum 1)
    pub fn new(capacity: usize) -> Self {
        Self::with_diagnostics(capacity, Arc::new(AuditDiagnostics::new()))
    }

    /// Create a store that reports failures to a shared diagnostics sink
    pub fn with_diagnostics(capacity: usize, diagnostics: Arc<AuditDiagnostics>) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(StoreState {
                events: VecDeque::with_capacity(capacity),
                ..StoreState::default()
            }),
            capacity,
            diagnostics,
        }
    }

    // The buffer only ever holds fully constructed events, so a poisoned lock
    // is still safe to use.
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stamp and append an event, evicting the oldest events beyond capacity
    ///
    /// Timestamps never go backwards in append order: if the wall clock
    /// steps back, the previous timestamp is reused.
    pub fn log_event(&self, event: NewAuditEvent) -> AuditEvent {
        let stored = {
            let mut state = self.lock();

            let now = Utc::now();
            let timestamp = match state.last_timestamp {
                Some(last) if last > now => last,
                _ => now,
            };
            state.last_timestamp = Some(timestamp);

            let stored = event.stamp(Uuid::now_v7(), timestamp);
            state.events.push_back(stored.clone());
            state.total_appended += 1;

            while state.events.len() > self.capacity {
                state.events.pop_front();
                state.evicted_total += 1;
            }

            stored
        }; // lock dropped here

        self.emit(&stored);
        stored
    }

    /// Events matching every filter in `query`, most recent first
    ///
    /// Equal timestamps are ordered by append order, newest first. `limit`
    /// keeps the first `limit` entries of the sorted result.
    pub fn get_events(&self, query: &AuditQuery) -> Vec<AuditEvent> {
        let mut matches: Vec<AuditEvent> = {
            let state = self.lock();
            state
                .events
                .iter()
                .rev()
                .filter(|event| query.matches(event))
                .cloned()
                .collect()
        };

        // Stable, so the newest-first append order breaks ties
        matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        if let Some(limit) = query.limit {
            matches.truncate(limit);
        }
        matches
    }

    /// Most recent cross-tenant access attempts
    pub fn unauthorized_access_attempts(&self, limit: Option<usize>) -> Vec<AuditEvent> {
        self.get_events(&AuditQuery::unauthorized(
            limit.unwrap_or(DEFAULT_UNAUTHORIZED_LIMIT),
        ))
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> StoreStats {
        let state = self.lock();
        StoreStats {
            size: state.events.len(),
            capacity: self.capacity,
            total_appended: state.total_appended,
            evicted_total: state.evicted_total,
        }
    }

    /// Diagnostics sink shared with the rest of the audit subsystem
    pub fn diagnostics(&self) -> &Arc<AuditDiagnostics> {
        &self.diagnostics
    }

    /// Structured log line for external aggregation
    fn emit(&self, event: &AuditEvent) {
        let details = match event.details.as_ref().map(serde_json::to_string).transpose() {
            Ok(details) => details,
            Err(e) => {
                self.diagnostics.record(&AuditError::from(e));
                None
            }
        };

        tracing::info!(
            target: "crewdesk_audit::events",
            event_id = %event.id,
            event_type = %event.event_type,
            user_id = ?event.user_id,
            user_email = ?event.user_email,
            ip_address = ?event.ip_address,
            resource_type = ?event.resource_type,
            resource_id = ?event.resource_id,
            action = %event.action,
            success = event.success,
            details = ?details,
            "Audit event recorded"
        );
    }
}
