// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # kestrel-observability
//!
//! Observability infrastructure shared by every Kestrel crate:
//! - `tracing` initialization with per-crate debug flags and file output
//! - [`LogSetup`], the run's output directory plus its exit callbacks
//! - [`ElapsedTimeRecorder`], the elapsed-time sink flushed on exit

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;
pub mod log_setup;
pub mod timing;

pub use cli::*;
pub use config::*;
pub use init::*;
pub use log_setup::{ExitCallback, LogSetup};
pub use timing::{
    configure_timers, save_timing_information, ElapsedTimeRecorder, ScopedTimer, TimingOptions,
    TimingStats,
};

/// Known Kestrel crate names for debug flags
///
/// These are tracing targets, so they use the underscore form of the crate name.
pub const KNOWN_CRATES: &[&str] = &[
    "kestrel_config",
    "kestrel_observability",
    "kestrel_state_manager",
    "kestrel_pipeline",
    "kestrel_node",
];
