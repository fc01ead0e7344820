use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use klaxon_assist::AssistantGateway;
use klaxon_core::config::KlaxonConfig;
use klaxon_core::events::{NotificationEvent, Severity};
use klaxon_notify::NotificationRouter;
use klaxon_telemetry::{init_telemetry, TelemetryConfig};

#[derive(Parser)]
#[command(name = "klaxon", about = "Bounded event delivery core for the trading dashboard")]
struct Args {
    /// Path to the dashboard-supplied JSON configuration.
    #[arg(long, default_value = "klaxon.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let telemetry = init_telemetry(TelemetryConfig::default());
    tracing::info!("starting klaxon");

    let config = load_config(&args.config)?;
    config.validate().context("invalid configuration")?;

    let mut router =
        NotificationRouter::from_config(&config.notify).context("building notification router")?;
    if let Some(metrics) = telemetry.metrics() {
        router = router.with_metrics(metrics);
    }

    let outcome = router
        .submit(NotificationEvent::new(
            Severity::Warning,
            "startup",
            "Klaxon online",
            "notification core started",
        ))
        .await;
    tracing::info!(dispatched = outcome.is_dispatched(), "startup event submitted");

    let gateway = if config.assist.api_key.is_some() {
        Some(AssistantGateway::from_config(&config.assist).context("building assistant gateway")?)
    } else {
        tracing::warn!("assistant disabled: no credential configured");
        None
    };

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        shutdown.cancel();
    });

    match gateway {
        Some(gateway) => run_assistant_loop(&gateway, &cancel).await?,
        None => cancel.cancelled().await,
    }

    tracing::info!("shutting down");
    Ok(())
}

/// Read user messages from stdin and print assistant replies until EOF or
/// ctrl-c.
async fn run_assistant_loop(
    gateway: &AssistantGateway,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => {
                match line.context("reading stdin")? {
                    Some(line) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match gateway.converse(line, cancel).await {
                            Ok(reply) => println!("{reply}"),
                            Err(e) if e.is_fatal() => return Err(e.into()),
                            Err(e) => tracing::warn!(error = %e, "assistant call failed"),
                        }
                    }
                    None => break,
                }
            }
        }
    }
    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<KlaxonConfig> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "config file not found, using defaults");
        return Ok(KlaxonConfig::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}
