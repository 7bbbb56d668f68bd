use anyhow::Result;
use colored::Colorize;
use crewdesk_audit::health::HealthResponse;

use super::{fetch_json, http_client};

pub async fn execute(url: &str, verbose: bool) -> Result<()> {
    println!("{}", "Checking service health...".bold());
    println!();

    let health_url = format!("{}/health", url.trim_end_matches('/'));
    print!("Health endpoint ({})... ", health_url);

    let request = http_client()?.get(&health_url);
    match fetch_json::<HealthResponse>(request).await {
        Ok((response, raw)) => {
            println!("{}", "✓ OK".green().bold());
            if verbose {
                println!("  Status: {}", response.status);
                println!("  Service: {}", response.service);
                if let Some(version) = response.version {
                    println!("  Version: {}", version);
                }
                println!("  Response: {}", raw);
            }
        }
        Err(e) => {
            println!("{}", "✗ FAILED".red().bold());
            println!("  Error: {}", e);
            return Err(e);
        }
    }

    println!();
    println!("{}", "Service is healthy!".green().bold());

    Ok(())
}
