//! Holo command-line driver.
//!
//! Plays a text file through the narrative playback pipeline and prints the
//! structured results as JSON, or runs a line-oriented session on stdin.
//!
//! ```bash
//! holo --config connectors.toml --user u1 story.txt
//! holo --config connectors.toml            # interactive, see #help
//! ```

mod headless;

use anyhow::{Context, Result};
use clap::Parser;
use holo_connect::config::ConnectorsConfig;
use holo_core::{Orchestrator, OrchestratorConfig, SegmentationStrategy, SessionId};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for holo
#[derive(Parser, Debug)]
#[command(name = "holo")]
#[command(about = "Multisensory narrative playback")]
#[command(version)]
struct Args {
    /// Connector configuration (TOML, or JSON with a .json extension)
    #[arg(short, long, env = "HOLO_CONFIG")]
    config: Option<PathBuf>,

    /// User whose preferences drive playback
    #[arg(short, long, default_value = "default", env = "HOLO_USER")]
    user: String,

    /// Segmentation strategy: sentence, paragraph or adaptive
    #[arg(short, long, default_value = "paragraph", value_parser = parse_strategy)]
    strategy: SegmentationStrategy,

    /// Send device events to the haptic and scent transports
    #[arg(long)]
    dispatch_devices: bool,

    /// Text file to play; reads commands from stdin when omitted
    file: Option<PathBuf>,
}

fn parse_strategy(s: &str) -> Result<SegmentationStrategy, String> {
    match s.to_lowercase().as_str() {
        "sentence" => Ok(SegmentationStrategy::Sentence),
        "paragraph" => Ok(SegmentationStrategy::Paragraph),
        "adaptive" => Ok(SegmentationStrategy::Adaptive),
        other => Err(format!("unknown strategy '{other}'")),
    }
}

fn load_connectors(path: &Path) -> Result<ConnectorsConfig> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = if path.extension().is_some_and(|ext| ext == "json") {
        ConnectorsConfig::from_json_str(&source)
    } else {
        ConnectorsConfig::from_toml_str(&source)
    };
    config.with_context(|| format!("Invalid connector configuration in {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "holo=info,holo_core=info,holo_connect=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let connectors = match &args.config {
        Some(path) => load_connectors(path)?,
        None => ConnectorsConfig::new(),
    };
    info!(connectors = connectors.connectors.len(), "configuration loaded");

    let config = OrchestratorConfig::new(connectors)
        .with_strategy(args.strategy)
        .with_dispatch_devices(args.dispatch_devices);
    let orchestrator = Orchestrator::new(config).context("Failed to build orchestrator")?;

    let result = match &args.file {
        Some(path) => play_file(&orchestrator, path, &args.user).await,
        None => headless::run_headless(&orchestrator, &args.user).await,
    };

    orchestrator.shutdown().await;
    result
}

async fn play_file(orchestrator: &Orchestrator, path: &Path, user: &str) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let session = SessionId::new();
    let played = orchestrator.play(session, &text, user).await;
    println!("{}", serde_json::to_string_pretty(&played)?);

    if played.is_started() {
        let summary = orchestrator.summary(session).await;
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}
