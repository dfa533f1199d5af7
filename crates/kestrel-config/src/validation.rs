// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Every problem is collected before reporting, so a single run of
//! [`validate_config`] lists all of them.

use crate::{ConfigError, ConfigResult, ExtrinsicsLookup, KestrelConfig, LoopClosureConfig};

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
    LabelOutOfRange { field: String, label: u32, total_labels: usize },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
            Self::LabelOutOfRange {
                field,
                label,
                total_labels,
            } => write!(
                f,
                "Label {} in {} is outside the label space (total_labels = {})",
                label, field, total_labels
            ),
        }
    }
}

fn into_result(errors: Vec<ConfigValidationError>) -> ConfigResult<()> {
    if errors.is_empty() {
        return Ok(());
    }

    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

/// Validate the complete configuration
///
/// Checks for:
/// - Extrinsics companion values
/// - Label space consistency
/// - Visualizer namespaces
/// - Positive durations, queue sizes and thresholds
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` with details if validation fails
pub fn validate_config(config: &KestrelConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_extrinsics(config, &mut errors);
    validate_label_space(config, &mut errors);
    validate_namespaces(config, &mut errors);
    validate_value_ranges(config, &mut errors);
    validate_thresholds(&config.loop_closure, &mut errors);

    into_result(errors)
}

/// Validate the loop-closure section once its class count has been filled in
pub fn validate_loop_closure(config: &LoopClosureConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    if config.detector.num_semantic_classes == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "loop_closure.detector.num_semantic_classes".to_string(),
            reason: "must be positive".to_string(),
        });
    }
    validate_thresholds(config, &mut errors);

    into_result(errors)
}

fn validate_extrinsics(config: &KestrelConfig, errors: &mut Vec<ConfigValidationError>) {
    match &config.reconstruction.extrinsics {
        ExtrinsicsLookup::CalibrationFile { extrinsics_file } => {
            if extrinsics_file.as_os_str().is_empty() {
                errors.push(ConfigValidationError::MissingRequired {
                    field: "reconstruction.extrinsics.extrinsics_file".to_string(),
                });
            }
        }
        ExtrinsicsLookup::TransformLookup { sensor_frame } => {
            if sensor_frame.trim().is_empty() {
                errors.push(ConfigValidationError::MissingRequired {
                    field: "reconstruction.extrinsics.sensor_frame".to_string(),
                });
            }
        }
        ExtrinsicsLookup::LoadedParams => {}
    }
}

fn validate_label_space(config: &KestrelConfig, errors: &mut Vec<ConfigValidationError>) {
    let labels = &config.label_space;
    if labels.total_labels == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "label_space.total_labels".to_string(),
            reason: "must be positive".to_string(),
        });
        return;
    }

    for (field, ids) in [
        ("label_space.dynamic_labels", &labels.dynamic_labels),
        ("label_space.invalid_labels", &labels.invalid_labels),
    ] {
        for &label in ids {
            if label as usize >= labels.total_labels {
                errors.push(ConfigValidationError::LabelOutOfRange {
                    field: field.to_string(),
                    label,
                    total_labels: labels.total_labels,
                });
            }
        }
    }
}

fn validate_namespaces(config: &KestrelConfig, errors: &mut Vec<ConfigValidationError>) {
    let pipeline = &config.pipeline;
    if pipeline.visualize_places && pipeline.places_visualizer_namespace.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "pipeline.places_visualizer_namespace".to_string(),
        });
    }
    if pipeline.visualize_reconstruction && pipeline.reconstruction_visualizer_namespace.is_empty()
    {
        errors.push(ConfigValidationError::MissingRequired {
            field: "pipeline.reconstruction_visualizer_namespace".to_string(),
        });
    }
}

fn validate_value_ranges(config: &KestrelConfig, errors: &mut Vec<ConfigValidationError>) {
    let recon = &config.reconstruction;

    for (field, value) in [
        ("reconstruction.tf_wait_duration_s", recon.tf_wait_duration_s),
        ("reconstruction.tf_buffer_size_s", recon.tf_buffer_size_s),
        ("reconstruction.voxel_size", recon.voxel_size),
    ] {
        if value <= 0.0 {
            errors.push(ConfigValidationError::InvalidValue {
                field: field.to_string(),
                reason: "must be positive".to_string(),
            });
        }
    }

    if recon.pointcloud_separation_s < 0.0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "reconstruction.pointcloud_separation_s".to_string(),
            reason: "must not be negative".to_string(),
        });
    }

    if recon.image_queue_size == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "reconstruction.image_queue_size".to_string(),
            reason: "must be positive".to_string(),
        });
    }

    if config.loop_closure.bow_queue_size == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "loop_closure.bow_queue_size".to_string(),
            reason: "must be positive".to_string(),
        });
    }
}

fn validate_thresholds(config: &LoopClosureConfig, errors: &mut Vec<ConfigValidationError>) {
    for (field, value) in [
        (
            "loop_closure.detector.object_similarity_threshold",
            config.detector.object_similarity_threshold,
        ),
        (
            "loop_closure.detector.place_similarity_threshold",
            config.detector.place_similarity_threshold,
        ),
    ] {
        if value <= 0.0 || value > 1.0 {
            errors.push(ConfigValidationError::InvalidValue {
                field: field.to_string(),
                reason: "must be in (0.0, 1.0]".to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn validation_message(config: &KestrelConfig) -> String {
        match validate_config(config) {
            Err(ConfigError::ValidationError(msg)) => msg,
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = KestrelConfig::default();
        let result = validate_config(&config);
        if let Err(e) = &result {
            eprintln!("Validation error: {}", e);
        }
        assert!(result.is_ok());
    }

    #[test]
    fn test_empty_sensor_frame_rejected() {
        let mut config = KestrelConfig::default();
        config.reconstruction.extrinsics = ExtrinsicsLookup::TransformLookup {
            sensor_frame: "  ".to_string(),
        };

        assert!(validation_message(&config).contains("sensor_frame"));
    }

    #[test]
    fn test_empty_extrinsics_file_rejected() {
        let mut config = KestrelConfig::default();
        config.reconstruction.extrinsics = ExtrinsicsLookup::CalibrationFile {
            extrinsics_file: PathBuf::new(),
        };

        assert!(validation_message(&config).contains("extrinsics_file"));
    }

    #[test]
    fn test_zero_total_labels_rejected() {
        let mut config = KestrelConfig::default();
        config.label_space.total_labels = 0;

        assert!(validation_message(&config).contains("total_labels"));
    }

    #[test]
    fn test_label_out_of_range() {
        let mut config = KestrelConfig::default();
        config.label_space.total_labels = 4;
        config.label_space.dynamic_labels = vec![1, 4];

        let msg = validation_message(&config);
        assert!(msg.contains("Label 4"));
        assert!(msg.contains("dynamic_labels"));
    }

    #[test]
    fn test_namespace_required_only_when_visualizing() {
        let mut config = KestrelConfig::default();
        config.pipeline.places_visualizer_namespace.clear();
        assert!(validate_config(&config).is_ok());

        config.pipeline.visualize_places = true;
        assert!(validation_message(&config).contains("places_visualizer_namespace"));
    }

    #[test]
    fn test_errors_are_aggregated() {
        let mut config = KestrelConfig::default();
        config.reconstruction.tf_wait_duration_s = 0.0;
        config.reconstruction.image_queue_size = 0;
        config.loop_closure.detector.place_similarity_threshold = -0.1;

        let msg = validation_message(&config);
        assert!(msg.contains("tf_wait_duration_s"));
        assert!(msg.contains("image_queue_size"));
        assert!(msg.contains("place_similarity_threshold"));
    }

    #[test]
    fn test_loop_closure_requires_classes() {
        let config = LoopClosureConfig::default();
        assert!(validate_loop_closure(&config).is_err());

        let filled = KestrelConfig::default().loop_closure_with_labels(20);
        assert!(validate_loop_closure(&filled).is_ok());
    }
}
