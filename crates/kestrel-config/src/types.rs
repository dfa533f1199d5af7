// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `kestrel_configuration.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct KestrelConfig {
    pub node: NodeConfig,
    pub pipeline: PipelineConfig,
    pub label_space: LabelSpaceConfig,
    pub frontend: FrontendConfig,
    pub reconstruction: ReconstructionConfig,
    pub backend: BackendConfig,
    pub loop_closure: LoopClosureConfig,
    pub timing: TimingConfig,
    pub logging: LoggingConfig,
}

/// Process-level settings for the node that hosts the pipeline
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    pub robot_id: u32,
    /// Lifecycle policy selector: `CLOCK`, `SERVICE` or `NORMAL`.
    ///
    /// Kept as a raw string; unrecognized values fall back to `NORMAL` at
    /// selection time instead of failing the load.
    pub exit_mode: String,
    /// The transport clock is driven by the time source topic itself
    pub use_sim_time: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            robot_id: 0,
            exit_mode: "NORMAL".to_string(),
            use_sim_time: false,
        }
    }
}

/// Stage toggles and visualizer addressing
///
/// Toggles are independent of each other. A stage whose toggle is false is
/// never constructed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub enable_lcd: bool,
    pub use_ros_backend: bool,
    pub do_reconstruction: bool,
    pub enable_frontend_output: bool,
    pub visualize_places: bool,
    pub places_visualizer_namespace: String,
    pub visualize_reconstruction: bool,
    pub reconstruction_visualizer_namespace: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enable_lcd: false,
            use_ros_backend: false,
            do_reconstruction: true,
            enable_frontend_output: true,
            visualize_places: false,
            places_visualizer_namespace: "~places".to_string(),
            visualize_reconstruction: false,
            reconstruction_visualizer_namespace: "~reconstruction".to_string(),
        }
    }
}

/// Semantic label space shared by every stage
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LabelSpaceConfig {
    pub total_labels: usize,
    pub dynamic_labels: Vec<u32>,
    pub invalid_labels: Vec<u32>,
    /// Raw `[{label = N, name = "..."}]` entries.
    ///
    /// Parsed leniently by [`crate::labels::parse_label_names`] so that one
    /// malformed entry does not reject the whole file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_names: Option<toml::Value>,
}

impl Default for LabelSpaceConfig {
    fn default() -> Self {
        Self {
            total_labels: 20,
            dynamic_labels: Vec::new(),
            invalid_labels: Vec::new(),
            label_names: None,
        }
    }
}

/// Frontend stage settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FrontendConfig {
    /// Capacity of the queue the reconstruction stage feeds (0 = unbounded)
    pub input_queue_size: usize,
    pub enable_places: bool,
    pub min_object_vertices: usize,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            input_queue_size: 0,
            enable_places: true,
            min_object_vertices: 20,
        }
    }
}

/// How the reconstruction stage resolves the sensor pose relative to the body
///
/// Each variant carries exactly the companion value it needs, so a mode can
/// never be paired with the wrong companion field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "mode")]
pub enum ExtrinsicsLookup {
    /// Read the body-to-sensor transform from a calibration file
    #[serde(rename = "USE_KIMERA", alias = "CALIBRATION_FILE")]
    CalibrationFile { extrinsics_file: PathBuf },
    /// Query an external transform source for the named sensor frame
    #[serde(rename = "USE_TF", alias = "TRANSFORM_LOOKUP")]
    TransformLookup { sensor_frame: String },
    /// Use the extrinsics already present in the loaded parameters
    #[serde(rename = "USE_LOADED_PARAMS", alias = "LOADED_PARAMS")]
    LoadedParams,
}

impl Default for ExtrinsicsLookup {
    fn default() -> Self {
        ExtrinsicsLookup::LoadedParams
    }
}

impl ExtrinsicsLookup {
    /// Serialized discriminant, as written in the configuration file
    pub fn mode_name(&self) -> &'static str {
        match self {
            ExtrinsicsLookup::CalibrationFile { .. } => "USE_KIMERA",
            ExtrinsicsLookup::TransformLookup { .. } => "USE_TF",
            ExtrinsicsLookup::LoadedParams => "USE_LOADED_PARAMS",
        }
    }
}

/// Reconstruction stage settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconstructionConfig {
    pub voxel_size: f64,
    pub voxels_per_side: usize,
    pub use_image_receiver: bool,
    pub publish_pointcloud: bool,
    pub visualize_reconstruction: bool,
    pub topology_visualizer_ns: String,
    #[serde(rename = "publish_reconstruction_mesh")]
    pub publish_mesh: bool,
    #[serde(rename = "enable_reconstruction_output_queue")]
    pub enable_output_queue: bool,
    pub pointcloud_separation_s: f64,
    pub tf_wait_duration_s: f64,
    pub tf_buffer_size_s: f64,
    pub image_queue_size: usize,
    pub extrinsics: ExtrinsicsLookup,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            voxel_size: 0.1,
            voxels_per_side: 16,
            use_image_receiver: false,
            publish_pointcloud: false,
            visualize_reconstruction: true,
            topology_visualizer_ns: "~".to_string(),
            publish_mesh: false,
            enable_output_queue: false,
            pointcloud_separation_s: 0.1,
            tf_wait_duration_s: 0.1,
            tf_buffer_size_s: 30.0,
            image_queue_size: 10,
            extrinsics: ExtrinsicsLookup::default(),
        }
    }
}

/// Backend stage settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    pub optimize_on_lc: bool,
    pub enable_node_merging: bool,
    /// Capacity of the deformation-graph input queue (0 = unbounded)
    pub input_queue_size: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            optimize_on_lc: true,
            enable_node_merging: true,
            input_queue_size: 0,
        }
    }
}

/// Loop-closure detection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoopClosureConfig {
    pub detector: LcdDetectorConfig,
    /// Capacity of the inbound bag-of-words subscription
    pub bow_queue_size: usize,
    /// Seconds of agent history the detector matches against
    pub lcd_agent_horizon_s: f64,
}

/// Loop-closure detector settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LcdDetectorConfig {
    /// Filled from the label space at construction time
    pub num_semantic_classes: usize,
    pub enable_agent_registration: bool,
    pub object_similarity_threshold: f64,
    pub place_similarity_threshold: f64,
}

impl Default for LcdDetectorConfig {
    fn default() -> Self {
        Self {
            num_semantic_classes: 0,
            enable_agent_registration: false,
            object_similarity_threshold: 0.5,
            place_similarity_threshold: 0.5,
        }
    }
}

/// Elapsed-time recorder toggles
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TimingConfig {
    pub timing_disabled: bool,
    pub disable_timer_output: bool,
}

/// Log output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Destination for timing and stage output; `None` disables persistence
    pub log_dir: Option<PathBuf>,
    pub log_timing_incrementally: bool,
    pub retention_days: u64,
    pub retention_runs: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            log_timing_incrementally: false,
            retention_days: 30,
            retention_runs: 10,
        }
    }
}

impl KestrelConfig {
    /// Loop-closure settings with the detector class count taken from the label space
    pub fn loop_closure_with_labels(&self, total_labels: usize) -> LoopClosureConfig {
        let mut lcd = self.loop_closure.clone();
        lcd.detector.num_semantic_classes = total_labels;
        lcd
    }
}

impl Default for LoopClosureConfig {
    fn default() -> Self {
        Self {
            detector: LcdDetectorConfig::default(),
            bow_queue_size: 100,
            lcd_agent_horizon_s: 1.5,
        }
    }
}
