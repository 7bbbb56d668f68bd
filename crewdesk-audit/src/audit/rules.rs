//! URL conventions used to classify requests
//!
//! Decides which paths are ignored outright (static assets, health checks),
//! which are authentication endpoints, and extracts the resource type and id
//! from resource routes:
//!
//! - protected: `/api/protected/<type>[/<id>]`
//! - public: `/api/public/<type>/<id>`
//!
//! `<type>` is a lowercase, hyphenated segment and `<id>` a decimal integer.
//! Both must end at a `/` or at the end of the path.

use regex::Regex;

use super::config::AuditConfig;

/// Resource reference parsed from a request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub resource_type: String,
    /// Absent for collection routes such as `/api/protected/clients`
    pub resource_id: Option<i64>,
}

impl ResourceRef {
    /// Type and id, when both are known
    pub fn scoped(&self) -> Option<(&str, i64)> {
        self.resource_id
            .map(|id| (self.resource_type.as_str(), id))
    }
}

/// Compiled path rules
#[derive(Debug, Clone)]
pub struct AuditRules {
    static_prefixes: Vec<String>,
    health_paths: Vec<String>,
    login_paths: Vec<String>,
    auth_segments: Vec<String>,
    protected_prefix: String,
    protected: Regex,
    public: Regex,
}

impl AuditRules {
    /// Compile the rules described by `config`
    pub fn from_config(config: &AuditConfig) -> Result<Self, regex::Error> {
        let protected_prefix = with_trailing_slash(&config.protected_prefix);
        let public_prefix = with_trailing_slash(&config.public_prefix);

        let protected = Regex::new(&format!(
            r"^{}([a-z-]+)(?:/([0-9]+))?(?:/|$)",
            regex::escape(&protected_prefix)
        ))?;
        let public = Regex::new(&format!(
            r"^{}([a-z-]+)/([0-9]+)(?:/|$)",
            regex::escape(&public_prefix)
        ))?;

        Ok(Self {
            static_prefixes: config.static_prefixes.clone(),
            health_paths: config.health_paths.clone(),
            login_paths: config.login_paths.clone(),
            auth_segments: config.auth_segments.clone(),
            protected_prefix,
            protected,
            public,
        })
    }

    /// Static assets and health checks are never audited
    pub fn is_ignored(&self, path: &str) -> bool {
        self.static_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
            || self.health_paths.iter().any(|health| path == health)
    }

    /// Login endpoints and any path with an auth segment
    pub fn is_auth_path(&self, path: &str) -> bool {
        self.login_paths.iter().any(|login| path == login)
            || path
                .split('/')
                .any(|segment| self.auth_segments.iter().any(|auth| segment == auth))
    }

    pub fn is_protected(&self, path: &str) -> bool {
        path.starts_with(&self.protected_prefix)
    }

    /// Extract the resource a path refers to
    ///
    /// The protected shape is tried first, then the public one. An id that
    /// does not fit in an `i64` is treated as absent.
    pub fn parse_resource(&self, path: &str) -> Option<ResourceRef> {
        if let Some(caps) = self.protected.captures(path) {
            return Some(ResourceRef {
                resource_type: caps[1].to_string(),
                resource_id: caps.get(2).and_then(|m| m.as_str().parse().ok()),
            });
        }

        let caps = self.public.captures(path)?;
        let resource_id = caps[2].parse().ok()?;
        Some(ResourceRef {
            resource_type: caps[1].to_string(),
            resource_id: Some(resource_id),
        })
    }
}

impl Default for AuditRules {
    fn default() -> Self {
        // The default prefixes are escaped literals, so compilation cannot fail
        Self::from_config(&AuditConfig::default()).expect("default audit rules compile")
    }
}

fn with_trailing_slash(prefix: &str) -> String {
    if prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{prefix}/")
    }
}
