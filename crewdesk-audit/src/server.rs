//! HTTP server with graceful shutdown

use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{audit::with_audit, config::Config, error::Result, state::AppState};

/// Headers masked in request logs
pub const SENSITIVE_HEADERS: &[http::HeaderName] = &[
    http::header::AUTHORIZATION,
    http::header::COOKIE,
    http::header::SET_COOKIE,
    http::header::PROXY_AUTHORIZATION,
];

/// Attach the audit middleware from `state` to a router
///
/// Apply the host's authentication layer after this call so it wraps the
/// audit layer and the principal is set before auditing runs.
pub fn audited<S>(router: Router<S>, state: &AppState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    with_audit(router, state.auditor().clone())
}

/// Server instance
pub struct Server {
    config: Config,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the server with the given router
    ///
    /// The peer address is exposed to handlers and the audit middleware
    /// through `ConnectInfo<SocketAddr>`.
    pub async fn serve(self, app: Router) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.service.port));

        tracing::info!("Starting {} on {}", self.config.service.name, addr);

        self.log_middleware_config();

        // Layers are applied in reverse order (last added is outermost)
        let body_limit = self.config.middleware.body_limit_bytes();

        let app = match self.build_cors_layer() {
            // CORS is the outermost layer when enabled
            Some(cors) => app.layer(cors),
            None => app,
        };

        let app = app
            .layer(CompressionLayer::new())
            .layer(TimeoutLayer::with_status_code(
                http::StatusCode::REQUEST_TIMEOUT,
                self.config.service.timeout(),
            ))
            .layer(RequestBodyLimitLayer::new(body_limit))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(true))
                    .on_response(DefaultOnResponse::new().include_headers(true)),
            )
            .layer(SetSensitiveRequestHeadersLayer::new(
                SENSITIVE_HEADERS.iter().cloned(),
            ))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            // Panic recovery (innermost layer)
            .layer(CatchPanicLayer::new());

        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }

    /// Log middleware configuration for debugging
    fn log_middleware_config(&self) {
        let audit = &self.config.audit;

        tracing::info!("Middleware configuration:");
        tracing::info!("  - Panic recovery: enabled");
        tracing::info!("  - Request ID tracking: enabled");
        tracing::info!("  - Sensitive header masking: enabled");
        tracing::info!(
            "  - Request body limit: {} MB",
            self.config.middleware.body_limit_mb
        );
        tracing::info!("  - Compression: enabled");
        tracing::info!("  - CORS mode: {}", self.config.middleware.cors_mode);
        tracing::info!(
            "  - Request timeout: {} seconds",
            self.config.service.timeout_secs
        );

        if audit.enabled {
            tracing::info!("  - Audit logging: enabled (capacity {})", audit.capacity);
            tracing::info!("    - Protected prefix: {}", audit.protected_prefix);
            tracing::info!("    - Public prefix: {}", audit.public_prefix);
        } else {
            tracing::info!("  - Audit logging: disabled");
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// CORS layer for the configured mode, or `None` when CORS is off
    ///
    /// `restrictive` adds the layer with nothing allowed, so preflights get
    /// no CORS headers back. `disabled` leaves responses untouched. Unknown
    /// modes are treated as `restrictive`.
    fn build_cors_layer(&self) -> Option<CorsLayer> {
        let mode = self.config.middleware.cors_mode.as_str();
        match mode {
            "permissive" => {
                tracing::debug!("CORS: permissive");
                Some(CorsLayer::permissive())
            }
            "restrictive" => {
                tracing::debug!("CORS: restrictive, no origins allowed");
                Some(CorsLayer::new())
            }
            "disabled" => {
                tracing::debug!("CORS: disabled, no CORS layer installed");
                None
            }
            other => {
                tracing::warn!("Unknown CORS mode {:?}, using restrictive", other);
                Some(CorsLayer::new())
            }
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
///
/// If a handler cannot be installed, that signal source is ignored and the
/// server keeps running on the other.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    tracing::info!("Shutdown signal received, draining requests...");
}
