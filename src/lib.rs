// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Kestrel - Perception Pipeline Orchestration
//!
//! Kestrel builds, wires and drives a multi-stage robot perception pipeline:
//! reconstruction, a scene-graph frontend, an optimizing backend and optional
//! loop closure. The stages themselves are supplied by the application; Kestrel
//! decides which ones exist, in what order they are built, who receives their
//! outputs and how long the process keeps running.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! kestrel = "0.1"  # Default: full features
//! ```
//!
//! ## Feature Flags
//!
//! - **`full`** (default): Everything below
//! - **`pipeline`**: Stage interfaces, registry, controller, scheduler
//! - **`node`**: Node runner (requires `pipeline`)
//!
//! Configuration, observability and the state manager are always available.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kestrel::prelude::*;
//! use std::sync::Arc;
//!
//! # fn factory() -> Arc<dyn StageFactory> { unimplemented!() }
//! let config = kestrel::config::load_config(None, None)?;
//! let transport: Arc<dyn Transport> = Arc::new(LocalTransport::new());
//! let summary = kestrel::node::run_node(config, factory(), transport)?;
//! println!("ran {} stages", summary.stages.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: kestrel-config, kestrel-observability      │
//! │  (TOML config, logging, elapsed-time recording)         │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Infrastructure: kestrel-state-manager                  │
//! │  (Context, label space, shared queues, lifecycle)       │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Orchestration: kestrel-pipeline                        │
//! │  (Construction plan, registry, wiring, exit modes)      │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Application: kestrel-node                              │
//! │  (Process lifecycle, kestrel-plan CLI)                  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

// Re-export foundation
pub use kestrel_config as config;
pub use kestrel_observability as observability;

// Re-export infrastructure
pub use kestrel_state_manager as state_manager;

// Re-export orchestration
#[cfg(feature = "pipeline")]
pub use kestrel_pipeline as pipeline;

#[cfg(feature = "node")]
pub use kestrel_node as node;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::config::{load_config, validate_config, KestrelConfig};
    pub use crate::state_manager::{PipelineContext, PipelineState};

    #[cfg(feature = "pipeline")]
    pub use crate::pipeline::{
        ExitMode, LocalTransport, PerceptionPipeline, PipelineError, StageFactory, Transport,
    };

    #[cfg(feature = "node")]
    pub use crate::node::{init_node_logging, run_node, NodeSummary};
}
