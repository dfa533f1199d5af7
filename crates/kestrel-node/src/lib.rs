// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Kestrel node runner
//!
//! [`run_node`] hosts one perception pipeline for the lifetime of a process.
//! The embedding application supplies the stage factory and the transport,
//! and installs process logging with [`init_node_logging`] beforehand.

pub mod logging;
pub mod report;
pub mod runner;

pub use logging::{init_node_logging, observability_config};
pub use report::{parse_overrides, PlanReport};
pub use runner::{run_node, NodeSummary};
