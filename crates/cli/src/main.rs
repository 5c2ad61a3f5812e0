//! asyncterm demo console
//! Runs one pluggable command domain in the full-screen async console.

mod handlers;
mod settings;

use anyhow::{Context, Result};
use asyncterm_core::{
    CommandHandler, Console, ConsoleConfig, SessionReport, DEFAULT_STARTUP_MESSAGE,
};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::handlers::{calc, files, sleep, Calculator, FileInspector, Sleeper};

/// asyncterm - Asynchronous full-screen command console
#[derive(Parser, Debug)]
#[command(name = "asyncterm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Full-screen console running commands concurrently", long_about = None)]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Settings file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log file; the console owns the screen so logs never go to the terminal
    #[arg(long, default_value = "asyncterm.log")]
    log_file: PathBuf,

    /// Override the startup banner
    #[arg(long)]
    startup_message: Option<String>,

    /// Wait up to this many milliseconds for running commands on exit
    #[arg(long)]
    drain_ms: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Evaluate arithmetic expressions
    Calc,
    /// Report size and line count of files
    Files {
        /// Directory that relative paths are resolved against
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Echo after a delay: `<millis> [label]`
    Sleep,
}

impl Mode {
    fn startup_message(&self) -> &'static str {
        match self {
            Mode::Calc => calc::STARTUP_MESSAGE,
            Mode::Files { .. } => files::STARTUP_MESSAGE,
            Mode::Sleep => sleep::STARTUP_MESSAGE,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(&args.log_level, &args.log_file)?;

    info!("Starting asyncterm v{}", env!("CARGO_PKG_VERSION"));

    let config = build_config(&args)?;
    // Commands interleave on one cooperative scheduler
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let result = runtime.block_on(async move {
        match args.mode {
            Mode::Calc => run_console(Calculator, config).await,
            Mode::Files { root } => run_console(FileInspector::new(root), config).await,
            Mode::Sleep => run_console(Sleeper, config).await,
        }
    });

    // Stdin is read on a blocking thread that cannot be cancelled
    runtime.shutdown_background();

    let report = result?;
    println!(
        "\r\nSession ended: {} command(s) submitted, {} unfinished.",
        report.submitted, report.abandoned
    );
    info!("Shutdown complete");
    Ok(())
}

/// Merge settings file, mode defaults and command line overrides
fn build_config(args: &Args) -> Result<ConsoleConfig> {
    let mut config = settings::load(args.config.as_deref())?.unwrap_or_default();

    if let Some(message) = &args.startup_message {
        config.startup_message = message.clone();
    } else if config.startup_message == DEFAULT_STARTUP_MESSAGE {
        config.startup_message = args.mode.startup_message().to_string();
    }
    if let Some(ms) = args.drain_ms {
        config.drain_on_shutdown = Some(Duration::from_millis(ms));
    }
    Ok(config)
}

async fn run_console<H: CommandHandler>(
    handler: H,
    config: ConsoleConfig,
) -> Result<SessionReport> {
    let mut console = Console::new(handler).with_config(config);
    let report = console
        .run(shutdown_signal())
        .await
        .context("Console failed")?;
    info!(
        "Console stopped after {} command(s), {} abandoned",
        report.submitted, report.abandoned
    );
    Ok(report)
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl+C, shutting down...");
    }
}

/// Setup logging with tracing
fn setup_logging(level: &str, path: &Path) -> Result<()> {
    let log_level = level.parse::<Level>().unwrap_or(Level::INFO);

    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    let file = File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("asyncterm").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_mode_banner_replaces_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{}").unwrap();

        let args = args(&["--config", path.to_str().unwrap(), "calc"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.startup_message, calc::STARTUP_MESSAGE);
        assert_eq!(config.drain_on_shutdown, None);
    }

    #[test]
    fn test_command_line_overrides_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"startup_message":"From file","drain_on_shutdown":100}"#)
            .unwrap();

        let from_file =
            build_config(&args(&["--config", path.to_str().unwrap(), "sleep"])).unwrap();
        assert_eq!(from_file.startup_message, "From file");
        assert_eq!(from_file.drain_on_shutdown, Some(Duration::from_millis(100)));

        let overridden = build_config(&args(&[
            "--config",
            path.to_str().unwrap(),
            "--startup-message",
            "READY",
            "--drain-ms",
            "5",
            "files",
            "--root",
            "/tmp",
        ]))
        .unwrap();
        assert_eq!(overridden.startup_message, "READY");
        assert_eq!(overridden.drain_on_shutdown, Some(Duration::from_millis(5)));
    }
}
