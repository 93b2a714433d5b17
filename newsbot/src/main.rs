//! newsbot
//!
//! Collects articles from RSS/Atom feeds, filters them through the allowlist
//! and dedup cache, and writes LLM-generated summaries of the new ones.

mod config;
mod dotenv;
mod run;

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{parse_flag, NewsbotConfig};

#[derive(Debug, Parser)]
#[command(name = "newsbot", about = "Summarize new articles from news feeds")]
struct Cli {
    /// Profile name; loads `.env.<profile>` on top of `.env`
    #[arg(long)]
    profile: Option<String>,
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,newsbot=debug"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Mutates the process environment, so it runs before any runtime thread exists
    let env = dotenv::load(cli.profile.as_deref());
    let config = NewsbotConfig::from_env();

    init_tracing(match &config {
        Ok(config) => config.json_logs,
        Err(_) => parse_flag(std::env::var("JSON_LOGS").ok()),
    });

    for warning in &env.warnings {
        warn!("{}", warning);
    }
    if let Some(profile) = &cli.profile {
        info!("Profile selected: {}", profile);
    }
    if let (Some(path), false) = (&env.profile_path, env.profile_loaded) {
        info!("Profile dotenv not found: {}", path.display());
    }

    info!("newsbot starting");

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };
    info!(
        "Configuration loaded: model={}, feeds={}, cache={}h",
        config.openai_model,
        config.rss_feeds.len(),
        config.cache_duration_hours
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match runtime.block_on(run::run(&config)) {
        Ok(code) => Ok(code),
        Err(e) => {
            error!("Run failed: {:#}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
