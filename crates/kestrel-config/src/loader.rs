// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, applied in order:
//! 1. TOML file (base values)
//! 2. Environment variables (deployment overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, KestrelConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const CONFIG_FILE_NAME: &str = "kestrel_configuration.toml";

/// Find the Kestrel configuration file
///
/// Search order:
/// 1. `KESTREL_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Up to five parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("KESTREL_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by KESTREL_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "Kestrel configuration file '{}' not found in any of these locations:\n{}\n\nSet KESTREL_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// * `config_path` - Optional path to config file. If `None`, the file is searched for.
/// * `cli_args` - Optional CLI argument overrides
///
/// Validation is a separate step; see [`crate::validate_config`].
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<KestrelConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: KestrelConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    Ok(config)
}

fn parse_flag(value: &str) -> bool {
    let lowered = value.to_lowercase();
    lowered == "true" || lowered == "1" || lowered == "yes"
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `KESTREL_EXIT_MODE` -> `node.exit_mode`
/// - `KESTREL_ROBOT_ID` -> `node.robot_id`
/// - `KESTREL_USE_SIM_TIME` -> `node.use_sim_time`
/// - `KESTREL_LOG_DIR` -> `logging.log_dir`
/// - `KESTREL_LOG_LEVEL` -> `logging.level`
/// - `KESTREL_TIMING_DISABLED` -> `timing.timing_disabled`
/// - `KESTREL_ENABLE_LCD` -> `pipeline.enable_lcd`
/// - `KESTREL_DO_RECONSTRUCTION` -> `pipeline.do_reconstruction`
///
/// Unparseable numeric values are ignored with a warning.
pub fn apply_environment_overrides(config: &mut KestrelConfig) {
    if let Ok(value) = env::var("KESTREL_EXIT_MODE") {
        config.node.exit_mode = value;
    }
    if let Ok(value) = env::var("KESTREL_ROBOT_ID") {
        match value.parse::<u32>() {
            Ok(id) => config.node.robot_id = id,
            Err(_) => warn!("[CONFIG] Ignoring KESTREL_ROBOT_ID={}: not an integer", value),
        }
    }
    if let Ok(value) = env::var("KESTREL_USE_SIM_TIME") {
        config.node.use_sim_time = parse_flag(&value);
    }
    if let Ok(value) = env::var("KESTREL_LOG_DIR") {
        config.logging.log_dir = Some(PathBuf::from(value));
    }
    if let Ok(value) = env::var("KESTREL_LOG_LEVEL") {
        config.logging.level = value;
    }
    if let Ok(value) = env::var("KESTREL_TIMING_DISABLED") {
        config.timing.timing_disabled = parse_flag(&value);
    }
    if let Ok(value) = env::var("KESTREL_ENABLE_LCD") {
        config.pipeline.enable_lcd = parse_flag(&value);
    }
    if let Ok(value) = env::var("KESTREL_DO_RECONSTRUCTION") {
        config.pipeline.do_reconstruction = parse_flag(&value);
    }
}

/// Apply CLI argument overrides to configuration
///
/// Recognized keys: `exit_mode`, `robot_id`, `log_dir`, `log_level`,
/// `enable_lcd`, `do_reconstruction`, `enable_frontend_output`.
///
/// # Errors
///
/// Unlike environment overrides, an explicit CLI value that cannot be parsed
/// or an unknown key is rejected with `ConfigError::InvalidValue`.
pub fn apply_cli_overrides(
    config: &mut KestrelConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    for (key, value) in cli_args {
        match key.as_str() {
            "exit_mode" => config.node.exit_mode = value.clone(),
            "robot_id" => {
                config.node.robot_id = value.parse::<u32>().map_err(|_| {
                    ConfigError::InvalidValue(format!("robot_id must be an integer, got '{}'", value))
                })?;
            }
            "log_dir" => config.logging.log_dir = Some(PathBuf::from(value)),
            "log_level" => config.logging.level = value.clone(),
            "enable_lcd" => config.pipeline.enable_lcd = parse_flag(value),
            "do_reconstruction" => config.pipeline.do_reconstruction = parse_flag(value),
            "enable_frontend_output" => config.pipeline.enable_frontend_output = parse_flag(value),
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "unknown override key '{}'",
                    other
                )))
            }
        }
    }
    Ok(())
}
