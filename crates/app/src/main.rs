use std::path::PathBuf;

use anyhow::Context;
use banter_app::{profile::Profile, runtime, tui, Settings};
use banter_foundation::ShutdownToken;
use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_logging(cli_level: &str) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "banter.log");
    let (non_blocking_file, _guard) = tracing_appender::non_blocking(file_appender);
    // Prefer CLI-provided level; fall back to RUST_LOG; then default to info
    let effective_level = if !cli_level.is_empty() {
        cli_level.to_string()
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
    };
    let env_filter = EnvFilter::try_new(effective_level).unwrap_or_else(|_| EnvFilter::new("info"));

    // The TUI owns the terminal, so logs go to the file only
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_thread_names(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();
    std::mem::forget(_guard);
    Ok(())
}

#[derive(Parser)]
#[command(author, version, about = "Terminal voice chat client")]
struct Cli {
    /// Assistant backend base URL (overrides configuration)
    #[arg(long = "base-url")]
    base_url: Option<String>,

    /// Path to a configuration file
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Log level filter (overrides RUST_LOG)
    #[arg(long = "log-level", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level).map_err(|e| anyhow::anyhow!("logging init failed: {}", e))?;
    tracing::info!("Starting banter");

    let mut settings = match &cli.config {
        Some(path) => Settings::from_path(path),
        None => Settings::new(),
    }
    .map_err(|e| anyhow::anyhow!(e))
    .context("invalid configuration")?;
    if let Some(base_url) = cli.base_url {
        settings.backend.base_url = base_url;
    }

    let profile = Profile::load(&settings.ui.profile_path);
    tracing::info!(
        backend = %settings.backend.base_url,
        user = %profile.display_name(),
        "Configuration loaded"
    );

    let shutdown = ShutdownToken::install();
    let app = runtime::start(&settings, &profile, shutdown.clone());

    let ui_result = tui::run(app.ui_commands.clone(), app.ui_state.clone(), shutdown.clone()).await;

    shutdown.request();
    app.shutdown().await;
    tracing::info!("Shutdown complete");

    ui_result.context("terminal ui failed")?;
    Ok(())
}
