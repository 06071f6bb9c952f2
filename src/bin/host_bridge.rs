//! Headless host bridge binary for stdin/stdout JSON communication.
//!
//! Reads inbound events as newline-delimited JSON from stdin, runs the
//! proactive scheduler against them, and writes command replies and
//! proactive messages to stdout.
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON protocol channel.

use clap::Parser;
use rekindle::config::{ConfigHandle, ConfigIssueSeverity, RekindleConfig};
use rekindle::host::{BridgeOptions, MemoryConversationStore, run_stdio_bridge};
use rekindle::providers::StaticProviderRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Proactive re-engagement scheduler speaking JSON lines on stdin/stdout.
#[derive(Parser)]
#[command(name = "rekindle-host", version, about)]
struct Cli {
    /// Path to TOML configuration file. Defaults to the user config dir.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sender id allowed to run admin commands. May be repeated.
    #[arg(long = "admin", value_name = "SENDER_ID")]
    admins: Vec<String>,

    /// Conversation turns kept per session in memory.
    #[arg(long, default_value_t = 50)]
    history_turns: usize,
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<RekindleConfig> {
    match path {
        Some(path) => Ok(RekindleConfig::from_file(&path)?),
        None => {
            let path = RekindleConfig::default_config_path();
            if path.exists() {
                Ok(RekindleConfig::from_file(&path)?)
            } else {
                tracing::info!(path = %path.display(), "no config file, using defaults");
                Ok(RekindleConfig::default())
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise tracing to stderr only (stdout is reserved for the JSON
    // protocol).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rekindle=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config)?;

    for issue in config.validate() {
        match issue.severity {
            ConfigIssueSeverity::Error => {
                tracing::error!(id = %issue.id, "{}", issue.summary);
            }
            ConfigIssueSeverity::Warning => {
                tracing::warn!(id = %issue.id, "{}", issue.summary);
            }
        }
    }

    let registry = StaticProviderRegistry::from_endpoints(&config.endpoints);
    let store = Arc::new(MemoryConversationStore::new(cli.history_turns));

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received");
            ctrl_c.cancel();
        }
    });

    tracing::info!("rekindle-host starting");

    run_stdio_bridge(
        ConfigHandle::new(config),
        Arc::new(registry),
        store,
        BridgeOptions { admins: cli.admins },
        shutdown,
    )
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "rekindle-host exited with error");
        anyhow::anyhow!("rekindle-host failed: {e}")
    })?;

    tracing::info!("rekindle-host shut down cleanly");
    Ok(())
}
