use clap::{Parser, Subcommand};
use colored::Colorize;

mod commands;
mod utils;

use commands::audit::AuditCommands;

/// crewdesk - audit trail client for the crewdesk backend
#[derive(Parser)]
#[command(name = "crewdesk")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query the audit trail of a running service
    Audit {
        #[command(subcommand)]
        command: AuditCommands,
    },
    /// Check that a running service is healthy
    Health {
        /// Service base URL
        #[arg(long, env = "CREWDESK_URL", default_value = commands::DEFAULT_URL)]
        url: String,

        /// Show HTTP status and raw response
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Audit { command } => commands::audit::execute(command).await,
        Commands::Health { url, verbose } => commands::health::execute(&url, verbose).await,
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);

            if let Some(source) = e.source() {
                eprintln!("\n{} {}", "Caused by:".yellow(), source);
            }

            std::process::exit(1);
        }
    }
}
