// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Process logging for a node, driven by `[logging]`

use anyhow::Result;
use kestrel_config::LoggingConfig;
use kestrel_observability::{
    init_logging, CrateDebugFlags, LogFormat, LoggingGuard, ObservabilityConfig,
};
use tracing::info;

pub fn observability_config(logging: &LoggingConfig) -> ObservabilityConfig {
    ObservabilityConfig {
        level: logging.level.clone(),
        format: LogFormat::Text,
        log_dir: logging.log_dir.clone(),
        retention_days: logging.retention_days,
        retention_runs: logging.retention_runs,
    }
}

/// Install the global subscriber for a node process
///
/// With `logging.log_dir` set, log files go to a fresh `run_<timestamp>`
/// folder under it and older run folders are pruned. Call once, before
/// [`run_node`](crate::run_node); keep the guard alive until exit.
pub fn init_node_logging(
    logging: &LoggingConfig,
    debug_flags: &CrateDebugFlags,
) -> Result<LoggingGuard> {
    let guard = init_logging(debug_flags, &observability_config(logging))?;
    if let Some(run_folder) = guard.log_dir() {
        info!("[NODE] Logging to {}", run_folder.display());
    }
    Ok(guard)
}
