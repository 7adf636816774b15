use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slidepane_core::{EasingType, PanelConfig};

mod app;

#[derive(Parser)]
#[command(name = "slidepane-tui")]
#[command(version, about = "Drag a sliding panel around a fake screen")]
struct Cli {
    /// Path to a panel config TOML file (defaults to the standard path)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the tween duration in milliseconds
    #[arg(long)]
    duration: Option<u64>,

    /// Override the easing curve (linear, ease_in, ease_out, ease_in_out)
    #[arg(long)]
    easing: Option<String>,

    /// Write logs to this file instead of discarding them
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn parse_easing(name: &str) -> Result<EasingType> {
    match name {
        "linear" => Ok(EasingType::Linear),
        "ease_in" => Ok(EasingType::EaseIn),
        "ease_out" => Ok(EasingType::EaseOut),
        "ease_in_out" => Ok(EasingType::EaseInOut),
        other => anyhow::bail!("unknown easing curve: {other}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to a file so they do not corrupt the terminal UI.
    if let Some(path) = &cli.log_file {
        let file = std::fs::File::create(path)?;
        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new(
                std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".into()),
            ))
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
            .init();
    }

    let mut config = match &cli.config {
        Some(path) => PanelConfig::load_from(path)?,
        None => PanelConfig::load()?,
    };
    if let Some(duration) = cli.duration {
        config.animation_duration_ms = duration;
    }
    if let Some(easing) = &cli.easing {
        config.easing = parse_easing(easing)?;
    }

    app::run(config).await
}
