// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Kestrel Configuration System
//!
//! Type-safe configuration for the Kestrel perception pipeline with support for:
//! - TOML file parsing
//! - Environment variable overrides
//! - CLI argument overrides
//! - Aggregated validation before any stage is constructed
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kestrel_config::{load_config, validate_config};
//!
//! let config = load_config(None, None).expect("Failed to load config");
//! validate_config(&config).expect("Invalid config");
//!
//! println!("Exit mode: {}", config.node.exit_mode);
//! println!("Loop closure enabled: {}", config.pipeline.enable_lcd);
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod labels;
pub mod loader;
pub mod types;
pub mod validation;

pub use labels::parse_label_names;
pub use loader::{apply_cli_overrides, apply_environment_overrides, find_config_file, load_config};
pub use types::*;
pub use validation::{validate_config, validate_loop_closure, ConfigValidationError};

/// Re-export for convenience
pub use toml;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found. Searched: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax: {0}")]
    ParseError(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parses() {
        let config: KestrelConfig = toml::from_str(
            r#"
            [node]
            robot_id = 2
            exit_mode = "CLOCK"

            [pipeline]
            enable_lcd = true
            visualize_places = true

            [label_space]
            total_labels = 8
            dynamic_labels = [2]
            label_names = [{ label = 2, name = "person" }]

            [reconstruction.extrinsics]
            mode = "USE_KIMERA"
            extrinsics_file = "calib/left.yaml"
            "#,
        )
        .unwrap();

        assert_eq!(config.node.robot_id, 2);
        assert_eq!(config.node.exit_mode, "CLOCK");
        assert!(config.pipeline.enable_lcd);
        assert!(config.pipeline.do_reconstruction);
        assert_eq!(config.label_space.total_labels, 8);
        assert!(matches!(
            config.reconstruction.extrinsics,
            ExtrinsicsLookup::CalibrationFile { .. }
        ));
        assert_eq!(config.loop_closure.bow_queue_size, 100);
        assert_eq!(config.loop_closure.lcd_agent_horizon_s, 1.5);
    }

    #[test]
    fn test_parse_error_maps_to_config_error() {
        let err: ConfigError = toml::from_str::<KestrelConfig>("[node\nrobot_id = 1")
            .unwrap_err()
            .into();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
