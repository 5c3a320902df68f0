//! Feature flag cache command line.
//!
//! Loads the configured flag source into an evaluation cache, then either
//! reports on it, exports it as a JSON envelope, or keeps it refreshed until
//! interrupted.

mod error;

use crate::error::{ErrorKind, Result};
use clap::{Parser, Subcommand};
use exn::ResultExt;
use flagcache_cache::{EvalCache, Refresher};
use flagcache_config::Config;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "flagcache", version, about = "In-memory feature flag cache")]
struct Args {
    /// Config file (TOML, YAML or JSON)
    #[arg(short, long, value_name = "PATH", env = "FLAGCACHE_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Refresh once and report what was loaded
    Check,
    /// Refresh once and write every flag as a JSON envelope
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Keep the cache refreshed until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    setup_tracing(args.verbose);
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = ?err, "Command failed");
            ExitCode::FAILURE
        },
    }
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "flagcache=debug,info" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let cache = Arc::new(EvalCache::new(config.source_settings()));
    match args.command {
        Command::Check => check(&cache).await,
        Command::Export { output } => {
            cache.refresh().await.or_raise(|| ErrorKind::Cache)?;
            export(&cache, output.as_deref()).await
        },
        Command::Watch => watch(cache, config.refresh_interval()).await,
    }
}

async fn check(cache: &EvalCache) -> Result<()> {
    let stats = cache.refresh().await.or_raise(|| ErrorKind::Cache)?;
    println!(
        "{} flags fetched, {} by ID, {} by key ({}ms)",
        stats.fetched,
        stats.by_id,
        stats.by_key,
        stats.elapsed.as_millis()
    );
    Ok(())
}

async fn export(cache: &EvalCache, output: Option<&Path>) -> Result<()> {
    let envelope = cache.export();
    match output {
        Some(path) => {
            let target = || ErrorKind::Io(path.display().to_string());
            let file = tokio::fs::File::create(path).await.or_raise(target)?;
            envelope.write(file).await.or_raise(target)?;
            tracing::info!(path = %path.display(), flags = envelope.flags.len(), "Exported flags");
        },
        None => envelope.write(tokio::io::stdout()).await.or_raise(|| ErrorKind::Io("stdout".to_string()))?,
    }
    Ok(())
}

async fn watch(cache: Arc<EvalCache>, interval: Duration) -> Result<()> {
    let token = CancellationToken::new();
    let refresher = Refresher::new(cache, interval).start(token.clone()).await.or_raise(|| ErrorKind::Cache)?;
    tokio::signal::ctrl_c().await.or_raise(|| ErrorKind::Io("signal handler".to_string()))?;
    tracing::info!("Interrupted; stopping refresher");
    stop(&token, refresher).await
}

/// Cancel the refresher and wait for it to wind down. A panicked or aborted
/// task is reported as such, not as a refresh failure.
async fn stop(token: &CancellationToken, refresher: JoinHandle<()>) -> Result<()> {
    token.cancel();
    refresher.await.or_raise(|| ErrorKind::Task)
}
