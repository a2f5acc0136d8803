//! Smug Relay
//!
//! Runs the brokers listed under `active-brokers` in a configuration file
//! until Ctrl+C, SIGTERM or a fatal broker error.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package smug-relay -- --config smug.yaml
//! cargo run --package smug-relay -- --config https://config.example/smug.yaml
//! ```
//!
//! A fatal broker error (such as rejected Slack credentials) ends the
//! process with a non-zero exit status.

use anyhow::{Context, Result};
use clap::Parser;
use smug::prelude::*;
use tracing::info;

/// Relays chat networks through the smug dispatcher.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Configuration file path or http(s) URL.
    #[arg(short, long, default_value = "smug.yaml")]
    config: String,

    /// Ignore SMUG_<BROKER>_<FIELD> environment overrides.
    #[arg(long)]
    no_env: bool,

    /// Load and validate the configuration, then exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = SmugRuntime::builder().config_location(&args.config);
    if args.no_env {
        builder = builder.without_env();
    }
    let runtime = builder
        .build()
        .await
        .with_context(|| format!("failed to load configuration from {}", args.config))?;
    smug::register_builtin_kinds(&runtime);

    if args.check {
        smug::runtime::config::validate_config(runtime.config())?;
        for name in &runtime.config().active_brokers {
            let kind = &runtime.config().brokers[name].kind;
            anyhow::ensure!(
                runtime.kinds().contains(&kind.as_str()),
                "broker '{name}' has unknown type '{kind}'"
            );
            println!("{name}: {kind}");
        }
        return Ok(());
    }

    info!(config = %args.config, "Starting relay");
    runtime.run().await?;
    Ok(())
}
