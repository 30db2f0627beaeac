//! Waitline CLI - join, serve and watch a queue through the daemon

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9528";
const DEFAULT_QUEUE: &str = "myQueue";

#[derive(Parser)]
#[command(name = "waitline")]
#[command(about = "Waitline queue CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "WAITLINE_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,

    /// Queue to operate on
    #[arg(short, long, env = "WAITLINE_QUEUE", default_value = DEFAULT_QUEUE)]
    queue: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Join the back of the line
    Join {
        /// Name shown to everyone in the line
        name: String,
    },

    /// Serve the next participant
    Next,

    /// Show who is still waiting
    Show,

    /// Keep showing the line as it changes
    Watch {
        /// Polling interval in milliseconds
        #[arg(long, default_value = "1000")]
        interval_ms: u64,
    },
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Deserialize, Tabled)]
struct EnrollResult {
    ticket_id: String,
    queue: String,
    display_name: String,
    position: i64,
}

#[derive(Deserialize)]
struct AdvanceResult {
    queue: String,
    current_position: i64,
    last_issued_position: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct ViewResult {
    queue: String,
    current_position: i64,
    waiting: Vec<WaitingRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Tabled)]
struct WaitingRow {
    #[tabled(rename = "#")]
    position: i64,
    #[tabled(rename = "name")]
    display_name: String,
}

async fn call_rpc(url: &str, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

/// Reject blank names before any request is sent
fn validate_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        anyhow::bail!("Name must not be empty");
    }
    Ok(trimmed)
}

async fn fetch_view(cli: &Cli) -> Result<ViewResult> {
    let result = call_rpc(&cli.rpc_url, "queue.view.v1", json!({ "queue": cli.queue })).await?;
    Ok(serde_json::from_value(result)?)
}

fn render_view(view: &ViewResult) -> String {
    let header = format!(
        "Queue {} (now serving #{})",
        view.queue, view.current_position
    )
    .cyan()
    .bold()
    .to_string();

    if view.waiting.is_empty() {
        return format!("{}\n{}", header, "Nobody is waiting".yellow());
    }
    format!("{}\n{}", header, Table::new(&view.waiting))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Join { name } => {
            let name = validate_name(name)?;
            let params = json!({
                "queue": cli.queue,
                "display_name": name,
            });

            let result = call_rpc(&cli.rpc_url, "queue.enroll.v1", params).await?;
            let enrolled: EnrollResult = serde_json::from_value(result)?;

            println!(
                "{}",
                format!("✓ {} joined at position {}", enrolled.display_name, enrolled.position)
                    .green()
                    .bold()
            );
            println!();
            println!("{}", Table::new(vec![enrolled]));
        }

        Commands::Next => {
            let result =
                call_rpc(&cli.rpc_url, "queue.advance.v1", json!({ "queue": cli.queue })).await?;
            let advanced: AdvanceResult = serde_json::from_value(result)?;

            let mut message = format!(
                "✓ {} now serving #{}",
                advanced.queue, advanced.current_position
            );
            if advanced.current_position >= advanced.last_issued_position {
                message.push_str(" (line is empty)");
            }
            println!("{}", message.green().bold());
        }

        Commands::Show => {
            let view = fetch_view(&cli).await?;
            println!("{}", render_view(&view));
        }

        Commands::Watch { interval_ms } => {
            let mut ticker = tokio::time::interval(Duration::from_millis((*interval_ms).max(100)));
            let mut last: Option<ViewResult> = None;

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    _ = ticker.tick() => {
                        match fetch_view(&cli).await {
                            Ok(view) if last.as_ref() != Some(&view) => {
                                println!("{}\n", render_view(&view));
                                last = Some(view);
                            }
                            Ok(_) => {}
                            Err(e) => eprintln!("{}", format!("✗ {}", e).red()),
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
