// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Dry-run report of what a configuration would build

use anyhow::{bail, Result};
use kestrel_config::KestrelConfig;
use kestrel_pipeline::{ConstructionPlan, ExitMode};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub robot_id: u32,
    pub exit_mode: ExitMode,
    pub use_sim_time: bool,
    pub extrinsics: &'static str,
    pub plan: ConstructionPlan,
}

impl PlanReport {
    pub fn from_config(config: &KestrelConfig) -> Self {
        Self {
            robot_id: config.node.robot_id,
            exit_mode: ExitMode::from_config_str(&config.node.exit_mode),
            use_sim_time: config.node.use_sim_time,
            extrinsics: config.reconstruction.extrinsics.mode_name(),
            plan: ConstructionPlan::from_config(config),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for PlanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "robot:      {}", self.robot_id)?;
        writeln!(
            f,
            "exit mode:  {}{}",
            self.exit_mode,
            if self.use_sim_time { " (sim time)" } else { "" }
        )?;
        writeln!(f, "extrinsics: {}", self.extrinsics)?;
        writeln!(f, "steps (* = required):")?;
        write!(f, "{}", self.plan)
    }
}

/// Parse repeated `key=value` arguments into an override map
///
/// A later occurrence of a key replaces an earlier one.
pub fn parse_overrides(pairs: &[String]) -> Result<HashMap<String, String>> {
    let mut overrides = HashMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Override '{}' is not of the form key=value", pair);
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("Override '{}' has an empty key", pair);
        }
        overrides.insert(key.to_string(), value.trim().to_string());
    }
    Ok(overrides)
}
