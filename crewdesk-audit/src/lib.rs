//! # crewdesk-audit
//!
//! Security audit trail for the crewdesk field-services backend.
//!
//! ## Features
//!
//! - **Audit middleware**: classifies every HTTP exchange and records authentication,
//!   data access, modification, deletion and cross-tenant access attempts
//! - **Bounded event store**: in-memory FIFO buffer with filtered, newest-first queries
//! - **Report endpoints**: JSON views over the trail for admin tooling
//! - **Ambient stack**: layered configuration, JSON logging, request ids, graceful shutdown
//!
//! ## Example
//!
//! ```rust,no_run
//! use crewdesk_audit::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Load configuration
//!     let config = Config::load()?;
//!
//!     // Initialize tracing
//!     init_tracing(&config)?;
//!
//!     // Build application state (owns the audit trail)
//!     let state = AppState::new(config.clone())?;
//!
//!     // Business routes, audited. The host's auth layer goes on top of this.
//!     let business: Router<AppState> = Router::new()
//!         .route("/api/protected/clients/{id}", get(|| async { "client" }));
//!
//!     let app = Router::new()
//!         .merge(audited(business, &state))
//!         .nest(DEFAULT_REPORT_PATH, audit_routes(state.audit().clone()))
//!         .route("/health", get(health))
//!         .with_state(state);
//!
//!     // Run server
//!     Server::new(config).serve(app).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod config;
pub mod error;
pub mod health;
pub mod observability;
pub mod server;
pub mod state;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::audit::{
        audit_middleware, audit_routes, with_audit, AuditConfig, AuditDetails, AuditEvent,
        AuditEventType, AuditQuery, AuditRequest, AuditService, AuditStatsResponse, DetailValue,
        NewAuditEvent, Principal, RequestAuditor, DEFAULT_REPORT_PATH,
    };
    pub use crate::config::{Config, MiddlewareConfig, ServiceConfig};
    pub use crate::error::{Error, ErrorResponse, Result};
    pub use crate::health::{health, HealthResponse};
    pub use crate::observability::{init_tracing, shutdown_tracing};
    pub use crate::server::{audited, Server};
    pub use crate::state::AppState;

    pub use axum::{
        extract::{Path, Query, State},
        http::StatusCode,
        response::{IntoResponse, Json, Response},
        routing::{delete, get, patch, post, put},
        Extension, Router,
    };

    pub use serde::{Deserialize, Serialize};

    // Re-export tracing macros
    pub use tracing::{debug, error, info, warn};

    pub use tokio;

    pub use chrono::{DateTime, Utc};
}
