use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use colored::Colorize;
use crewdesk_audit::audit::{
    AuditEvent, AuditEventType, AuditQuery, AuditStatsResponse, DEFAULT_UNAUTHORIZED_LIMIT,
};

use super::{fetch_json, http_client, Target};
use crate::utils::format::events_table;

#[derive(Subcommand)]
pub enum AuditCommands {
    /// List audit events, newest first
    Events {
        #[command(flatten)]
        filters: EventFilters,

        #[command(flatten)]
        target: Target,
    },
    /// List denied cross-tenant access attempts
    Unauthorized {
        /// Maximum number of attempts to show
        #[arg(long, default_value_t = DEFAULT_UNAUTHORIZED_LIMIT)]
        limit: usize,

        #[command(flatten)]
        target: Target,
    },
    /// Show audit store counters
    Stats {
        #[command(flatten)]
        target: Target,
    },
}

/// Filters for `audit events`; all given filters must match
#[derive(Debug, Args)]
pub struct EventFilters {
    /// Only events by this user
    #[arg(long, value_name = "ID")]
    pub user_id: Option<i64>,

    /// Only events on this resource type (e.g. clients)
    #[arg(long, value_name = "TYPE")]
    pub resource_type: Option<String>,

    /// Only events of this type (e.g. DATA_ACCESS or data-access)
    #[arg(long, value_name = "TYPE")]
    pub event_type: Option<AuditEventType>,

    /// Only events at or after this RFC 3339 timestamp
    #[arg(long, value_name = "TIMESTAMP")]
    pub since: Option<DateTime<Utc>>,

    /// Only events at or before this RFC 3339 timestamp
    #[arg(long, value_name = "TIMESTAMP")]
    pub until: Option<DateTime<Utc>>,

    /// Show at most this many events
    #[arg(long)]
    pub limit: Option<usize>,
}

impl EventFilters {
    pub fn to_query(&self) -> AuditQuery {
        AuditQuery {
            user_id: self.user_id,
            resource_type: self.resource_type.clone(),
            event_type: self.event_type,
            start_date: self.since,
            end_date: self.until,
            limit: self.limit,
        }
    }
}

pub async fn execute(command: AuditCommands) -> Result<()> {
    match command {
        AuditCommands::Events { filters, target } => events(&filters, &target).await,
        AuditCommands::Unauthorized { limit, target } => unauthorized(limit, &target).await,
        AuditCommands::Stats { target } => stats(&target).await,
    }
}

async fn events(filters: &EventFilters, target: &Target) -> Result<()> {
    let request = http_client()?
        .get(target.endpoint("events"))
        .query(&filters.to_query());
    let (events, raw): (Vec<AuditEvent>, String) = fetch_json(request).await?;

    if target.json {
        println!("{}", raw);
        return Ok(());
    }

    print_events(&events, "event");
    Ok(())
}

async fn unauthorized(limit: usize, target: &Target) -> Result<()> {
    let request = http_client()?
        .get(target.endpoint("unauthorized"))
        .query(&[("limit", limit)]);
    let (events, raw): (Vec<AuditEvent>, String) = fetch_json(request).await?;

    if target.json {
        println!("{}", raw);
        return Ok(());
    }

    if events.is_empty() {
        println!("{}", "No unauthorized access attempts recorded".green());
        return Ok(());
    }

    print_events(&events, "attempt");
    Ok(())
}

async fn stats(target: &Target) -> Result<()> {
    let request = http_client()?.get(target.endpoint("stats"));
    let (stats, raw): (AuditStatsResponse, String) = fetch_json(request).await?;

    if target.json {
        println!("{}", raw);
        return Ok(());
    }

    println!("{}", "Audit store".bold());
    println!("  Events held:     {} / {}", stats.store.size, stats.store.capacity);
    println!("  Total appended:  {}", stats.store.total_appended);
    println!("  Evicted:         {}", stats.store.evicted_total);

    let failures = stats.audit_log_failures_total.to_string();
    let failures = if stats.audit_log_failures_total == 0 {
        failures.green()
    } else {
        failures.yellow().bold()
    };
    println!("  Logging failures: {}", failures);

    Ok(())
}

fn print_events(events: &[AuditEvent], noun: &str) {
    if events.is_empty() {
        println!("{}", "No matching audit events".yellow());
        return;
    }

    print!("{}", events_table(events));
    println!();

    let failed = events.iter().filter(|e| !e.success).count();
    let plural = if events.len() == 1 { "" } else { "s" };
    println!(
        "{} {}{} ({} failed)",
        events.len().to_string().bold(),
        noun,
        plural,
        if failed == 0 {
            failed.to_string().normal()
        } else {
            failed.to_string().red()
        }
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_map_onto_query() {
        let since: DateTime<Utc> = "2026-03-01T00:00:00Z".parse().unwrap();
        let filters = EventFilters {
            user_id: Some(7),
            resource_type: Some("clients".to_string()),
            event_type: Some(AuditEventType::DataAccess),
            since: Some(since),
            until: None,
            limit: Some(10),
        };

        let query = filters.to_query();
        assert_eq!(
            query,
            AuditQuery::new()
                .user_id(7)
                .resource_type("clients")
                .event_type(AuditEventType::DataAccess)
                .start_date(since)
                .limit(10)
        );
    }
}
