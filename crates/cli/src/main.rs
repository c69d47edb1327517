//! Peerza CLI - skill-exchange marketplace client

mod commands;
mod config;
mod logging;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use commands::Commands;
use config::CliConfig;
use peerza_http::{ClientError, FileSessionStore, PeerzaClient, SessionEvent};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{Level, debug};

#[derive(Parser)]
#[command(name = "peerza")]
#[command(about = "Learn and teach skills with peers on Peerza")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true)]
    log_level: Option<LogLevel>,

    /// Configuration file (defaults to ./peerza.toml or the platform config dir)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the Peerza API
    #[arg(long, global = true, env = "PEERZA_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = CliConfig::load(cli.config.as_deref())?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }

    let log_level = match cli.log_level {
        Some(level) => level.into(),
        None => Level::from_str(&config.log_level).unwrap_or(Level::WARN),
    };
    logging::init_logging(log_level)?;

    let client = build_client(&config)?;
    let mut session_events = client.subscribe();

    let result = cli.command.execute(&client, &config).await;

    // The client only signals expiry; telling the user what to do is our job
    let mut expired = false;
    while let Ok(event) = session_events.try_recv() {
        debug!(?event, "Session event");
        expired |= event == SessionEvent::Expired;
    }

    if let Err(e) = result {
        for line in failure_report(&e, expired) {
            eprintln!("{line}");
        }
        std::process::exit(1);
    }

    Ok(())
}

/// Lines written to stderr when a command fails
fn failure_report(err: &anyhow::Error, expired: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let session_over = expired
        || err
            .downcast_ref::<ClientError>()
            .is_some_and(ClientError::is_session_expired);
    if session_over {
        lines.push("Your session has expired. Run `peerza login` to sign in again.".to_string());
    }
    lines.push(format!("error: {err:#}"));
    lines
}

fn build_client(config: &CliConfig) -> Result<PeerzaClient> {
    let store = match &config.session_file {
        Some(path) => FileSessionStore::open(path),
        None => FileSessionStore::open_default(),
    }
    .context("failed to open session store")?;
    debug!("Using session file {}", store.path().display());

    let mut builder = PeerzaClient::builder()
        .base_url(&config.api_url)
        .session(Arc::new(store));
    if let Some(timeout) = config.timeout() {
        builder = builder.timeout(timeout);
    }

    Ok(builder.build()?)
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}
