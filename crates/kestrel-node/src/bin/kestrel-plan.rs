// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! kestrel-plan - show what a configuration would build, without building it

use anyhow::{Context, Result};
use clap::Parser;
use kestrel_config::{load_config, validate_config};
use kestrel_node::{parse_overrides, PlanReport};
use kestrel_observability::{debug_flags_help, init_console_logging, parse_debug_flags};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "kestrel-plan", version, author, long_about = None, after_help = debug_flags_help())]
struct Args {
    /// Configuration file (searched for when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override a configuration value, e.g. --set exit_mode=CLOCK
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Print the report as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Log level for console output
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    // --debug-* flags are handled by the observability layer
    let debug_flags = parse_debug_flags();
    let args = Args::parse_from(std::env::args().filter(|arg| !arg.starts_with("--debug-")));

    let _logging = init_console_logging(&debug_flags, &args.log_level)?;

    let overrides = parse_overrides(&args.overrides)?;
    let config = load_config(args.config.as_deref(), Some(&overrides))
        .context("Failed to load configuration")?;
    validate_config(&config).context("Configuration is invalid")?;
    info!("[PLAN] Configuration valid");

    let report = PlanReport::from_config(&config);
    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report);
    }
    Ok(())
}
