use anyhow::{Context, Result};
use clap::Args;
use serde::de::DeserializeOwned;

pub mod audit;
pub mod health;

/// Base URL used when neither `--url` nor `CREWDESK_URL` is given
pub const DEFAULT_URL: &str = "http://localhost:8080";

/// Where the service and its audit reports live
#[derive(Debug, Args)]
pub struct Target {
    /// Service base URL
    #[arg(long, env = "CREWDESK_URL", default_value = DEFAULT_URL)]
    pub url: String,

    /// Mount point of the audit report routes
    #[arg(long, default_value = crewdesk_audit::audit::DEFAULT_REPORT_PATH)]
    pub audit_path: String,

    /// Print the raw JSON response
    #[arg(long)]
    pub json: bool,
}

impl Target {
    /// Full URL of an audit report endpoint
    pub fn endpoint(&self, name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.url.trim_end_matches('/'),
            self.audit_path.trim_matches('/'),
            name
        )
    }
}

pub(crate) fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .context("Failed to create HTTP client")
}

/// Send a prepared GET and decode the JSON body, keeping the raw text
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<(T, String)> {
    let response = request.send().await.context("Failed to send request")?;
    let status = response.status();

    let body = response
        .text()
        .await
        .context("Failed to read response body")?;

    if !status.is_success() {
        // The service answers with {"error": ..., "code": ..., "status": ...}
        let message = serde_json::from_str::<crewdesk_audit::error::ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        anyhow::bail!(
            "HTTP {} {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown"),
            message
        );
    }

    let parsed = serde_json::from_str(&body).context("Unexpected response format")?;
    Ok((parsed, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_segments() {
        let target = Target {
            url: "http://localhost:8080/".to_string(),
            audit_path: "/api/admin/audit/".to_string(),
            json: false,
        };
        assert_eq!(
            target.endpoint("events"),
            "http://localhost:8080/api/admin/audit/events"
        );
    }
}
