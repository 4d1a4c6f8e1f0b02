//! Hearth - event delivery for a small-footprint windowing server
//!
//! The `hearth` binary replays a recorded input scenario against the
//! delivery core and prints what every client would have received.
//!
//! # Features
//! - Pointer and keyboard routing with implicit button grabs
//! - Hotkey and exclusive key grabs
//! - Coalesced pointer position and exposure events
//! - Bounded, pooled per-client event queues
//! - TOML configuration and scenarios
//! - JSON-lines event dumps for diffing runs

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod scenario;

use hearth_core::config::Config;
use scenario::Scenario;

/// Hearth - replay input scenarios through the event core
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run in debug mode with verbose logging
    #[arg(short, long)]
    debug: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,

    /// Print default configuration to stdout
    #[arg(long)]
    print_default_config: bool,

    /// Stop after this many poll iterations (overrides the scenario)
    #[arg(long)]
    max_iterations: Option<u64>,

    /// Scenario file to replay
    scenario: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout carries the event dump
    let log_level = if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Hearth v{} starting...", env!("CARGO_PKG_VERSION"));

    if args.print_default_config {
        println!("{}", Config::default_config_string());
        return Ok(());
    }

    let config = match Config::load(args.config.as_deref()) {
        Ok(cfg) => {
            info!("Configuration loaded successfully");
            cfg
        },
        Err(e) => {
            warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        },
    };

    if args.validate {
        info!("Configuration is valid");
        return Ok(());
    }

    let Some(path) = args.scenario else {
        bail!("No scenario given; pass a scenario file to replay");
    };
    let mut scenario = Scenario::load(&path)?;
    if args.max_iterations.is_some() {
        scenario.max_iterations = args.max_iterations;
    }

    info!("Replaying {}", path.display());
    for line in scenario.run(config)? {
        println!("{line}");
    }
    Ok(())
}
