use clap::Subcommand;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Health check a running server via its /health endpoint")]
    Ping {
        #[arg(help = "Server base URL (defaults to http://localhost:$PORT)")]
        url: Option<String>,

        #[arg(long, default_value_t = 5, help = "Timeout in seconds")]
        timeout: u64,
    },
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Ping { url, timeout } => {
            let base = url.unwrap_or_else(|| format!("http://localhost:{}", crate::config::config().api.port));
            let health_url = health_url(&base);

            match ping(&health_url, Duration::from_secs(timeout)).await {
                Ok((elapsed, body)) => output_success(
                    &output_format,
                    &format!("{} is up ({} ms)", base, elapsed.as_millis()),
                    Some(json!({ "url": health_url, "response_time_ms": elapsed.as_millis() as u64, "health": body })),
                ),
                Err(e) => {
                    output_error(&output_format, &format!("{} is down: {}", base, e), Some("SERVER_UNREACHABLE"))?;
                    Err(e)
                }
            }
        }
    }
}

pub fn health_url(base: &str) -> String {
    format!("{}/health", base.trim_end_matches('/'))
}

/// `GET /health`; any non-success status counts as down
pub async fn ping(url: &str, timeout: Duration) -> anyhow::Result<(Duration, Value)> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let started = Instant::now();

    let response = client.get(url).send().await?;
    let elapsed = started.elapsed();
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if !status.is_success() {
        anyhow::bail!("HTTP {}", status);
    }
    Ok((elapsed, body))
}
