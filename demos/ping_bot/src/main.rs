//! Ping Bot
//!
//! A shell bot wired from `switchboard.toml`: the shell adapter plus a few
//! plugins showing both plugin shapes.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package ping-bot -- --config demos/ping_bot/switchboard.toml
//! ```
//!
//! Then type `ping`, `hubot echo hi`, `/decide`, `hubot hello` or
//! `hubot deploy`.

mod plugins;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use switchboard::prelude::*;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "ping-bot", about = "A Switchboard shell bot")]
struct Args {
    /// Configuration file; searched for in the current directory when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. `production`.
    #[arg(short, long)]
    profile: Option<String>,

    /// Log every inbound message (disables the unknown-command fallback).
    #[arg(long)]
    audit: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = SwitchboardRuntime::builder().on(LifecycleState::Running, |robot: &Robot| {
        info!(
            bot = robot.name(),
            adapters = ?robot.adapter_names(),
            listeners = robot.listener_count(),
            "Ping bot is up"
        );
    });
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = args.profile {
        builder = builder.profile(profile);
    }
    let runtime = builder.build()?;

    runtime.register_adapter::<ShellAdapter>();

    runtime.register_plugin(plugins::PING);
    runtime.register_plugin(plugins::GREETER);
    runtime.register_plugin(plugins::DEPLOY);
    if args.audit {
        runtime.register_plugin(plugins::AUDIT);
    }

    runtime.run().await?;

    Ok(())
}
