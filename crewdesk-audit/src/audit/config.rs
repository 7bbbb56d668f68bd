//! Audit logging configuration
//!
//! Loaded from the `[audit]` section of config.toml or environment variables
//! (`CREWDESK_AUDIT__CAPACITY=500`).

use serde::{Deserialize, Serialize};

use super::store::DEFAULT_CAPACITY;

/// Audit logging configuration
///
/// Controls retention and the URL conventions used to classify requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable the audit middleware (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Number of events kept in memory (default: 1000)
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Path prefixes for static assets, never audited
    #[serde(default = "default_static_prefixes")]
    pub static_prefixes: Vec<String>,

    /// Exact health-check paths, never audited
    #[serde(default = "default_health_paths")]
    pub health_paths: Vec<String>,

    /// Exact login endpoint paths
    #[serde(default = "default_login_paths")]
    pub login_paths: Vec<String>,

    /// Path segments that mark an authentication endpoint (e.g. `/api/auth/callback`)
    #[serde(default = "default_auth_segments")]
    pub auth_segments: Vec<String>,

    /// Prefix of tenant-scoped resource routes: `<prefix><type>[/<id>]`
    #[serde(default = "default_protected_prefix")]
    pub protected_prefix: String,

    /// Prefix of public resource routes: `<prefix><type>/<id>`
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,

    /// Bytes of a request or response body kept in event details (default: 64 KiB)
    ///
    /// Longer bodies are still passed through whole; the event records a
    /// truncated preview.
    #[serde(default = "default_max_capture_bytes")]
    pub max_capture_bytes: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: default_capacity(),
            static_prefixes: default_static_prefixes(),
            health_paths: default_health_paths(),
            login_paths: default_login_paths(),
            auth_segments: default_auth_segments(),
            protected_prefix: default_protected_prefix(),
            public_prefix: default_public_prefix(),
            max_capture_bytes: default_max_capture_bytes(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_static_prefixes() -> Vec<String> {
    vec!["/static/".to_string(), "/assets/".to_string()]
}

fn default_health_paths() -> Vec<String> {
    vec!["/health".to_string(), "/api/health".to_string()]
}

fn default_login_paths() -> Vec<String> {
    vec!["/api/login".to_string()]
}

fn default_auth_segments() -> Vec<String> {
    vec!["auth".to_string()]
}

fn default_protected_prefix() -> String {
    "/api/protected/".to_string()
}

fn default_public_prefix() -> String {
    "/api/public/".to_string()
}

fn default_max_capture_bytes() -> usize {
    64 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_config_defaults() {
        let config = AuditConfig::default();
        assert!(config.enabled);
        assert_eq!(config.capacity, 1000);
        assert_eq!(config.static_prefixes, vec!["/static/", "/assets/"]);
        assert_eq!(config.health_paths, vec!["/health", "/api/health"]);
        assert_eq!(config.login_paths, vec!["/api/login"]);
        assert_eq!(config.protected_prefix, "/api/protected/");
        assert_eq!(config.public_prefix, "/api/public/");
        assert_eq!(config.max_capture_bytes, 65536);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AuditConfig = serde_json::from_str(r#"{"capacity": 250}"#).unwrap();
        assert_eq!(config.capacity, 250);
        assert!(config.enabled);
        assert_eq!(config.auth_segments, vec!["auth"]);
    }
}
