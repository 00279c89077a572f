use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gate-cli")]
#[command(about = "Inspection CLI for the rate-gate admin API", long_about = None)]
struct Cli {
    /// Admin API base URL
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    /// Admin API key
    #[arg(short, long, env = "RATE_GATE_ADMIN_KEY")]
    key: String,

    /// Print compact JSON instead of pretty-printing
    #[arg(long)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gate status and uptime
    Status,
    /// Tracked clients by state, with the active limits
    Stats,
    /// List every tracked client
    Clients,
    /// Show one client's window
    Client {
        /// Client identifier (usually an IP address)
        identifier: String,
    },
}

impl Commands {
    fn path(&self) -> String {
        match self {
            Commands::Status => "/admin/status".to_string(),
            Commands::Stats => "/admin/stats".to_string(),
            Commands::Clients => "/admin/clients".to_string(),
            Commands::Client { identifier } => format!("/admin/clients/{}", identifier),
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let url = format!("{}{}", cli.url.trim_end_matches('/'), cli.command.path());

    let res = reqwest::Client::new()
        .get(url)
        .bearer_auth(&cli.key)
        .send()
        .await?;

    let status = res.status();
    if !status.is_success() {
        let text = res.text().await.unwrap_or_default();
        eprintln!("admin API returned {}", status);
        if !text.is_empty() {
            eprintln!("{}", text);
        }
        return Ok(ExitCode::FAILURE);
    }

    let json: Value = res.json().await?;
    let rendered = if cli.compact {
        serde_json::to_string(&json)?
    } else {
        serde_json::to_string_pretty(&json)?
    };
    println!("{}", rendered);
    Ok(ExitCode::SUCCESS)
}
