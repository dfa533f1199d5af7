// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Stage interfaces
//!
//! Concrete perception algorithms live outside this crate. The controller only
//! needs the lifecycle hooks in [`Module`] and the wiring points each stage
//! kind exposes. All methods take `&self`; stages hold their mutable state
//! behind their own locks because they are shared through `Arc`.

use kestrel_observability::LogSetup;
use kestrel_state_manager::InputQueue;
use ndarray::ArrayView2;
use std::sync::Arc;

use crate::callbacks::{
    BackendOutputCallback, FrontendOutputCallback, PlacesVisualizationCallback,
    ReconstructionVisualizationCallback,
};
use crate::payload::{
    BackendInput, DeformationGraphSnapshot, PlacesSnapshot, Pose, ReconstructionOutput,
    SceneGraph, TimestampNs, VoxelLayerSnapshot,
};

/// Queue the frontend consumes and reconstruction feeds
pub type FrontendQueue = Arc<InputQueue<Arc<ReconstructionOutput>>>;

/// Lifecycle hooks shared by every registered entry
pub trait Module: Send + Sync {
    /// Begin processing; stages with worker threads spawn them here
    fn start(&self) {}

    /// Stop processing and join any worker threads
    fn stop(&self) {}

    /// Persist stage output under `log_setup`
    fn save(&self, _log_setup: &LogSetup) {}

    /// One-line human-readable status
    fn print_info(&self) -> String {
        String::new()
    }
}

pub trait FrontendModule: Module {
    /// The frontend's input queue; created by the frontend itself
    fn queue(&self) -> FrontendQueue;

    fn add_output_callback(&self, callback: FrontendOutputCallback);

    fn add_place_visualization_callback(&self, callback: PlacesVisualizationCallback);

    /// One flag per column of `positions` (3×N, meters): is the point at least
    /// `freespace_distance_m` from the nearest obstacle
    fn in_freespace(&self, positions: ArrayView2<'_, f64>, freespace_distance_m: f64) -> Vec<bool>;
}

pub trait ReconstructionModule: Module {
    fn add_visualization_callback(&self, callback: ReconstructionVisualizationCallback);
}

pub trait BackendModule: Module {
    fn add_output_callback(&self, callback: BackendOutputCallback);
}

/// Candidate alignment between two matched subgraphs
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationProblem {
    pub query_root: u64,
    pub match_root: u64,
    pub query_nodes: Vec<u64>,
    pub match_nodes: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationSolution {
    pub from_node: u64,
    pub to_node: u64,
    pub to_t_from: Pose,
}

/// Geometric verification of a loop-closure candidate
pub trait RegistrationSolver: Send + Sync {
    fn name(&self) -> &str;

    fn solve(&self, problem: &RegistrationProblem) -> Option<RegistrationSolution>;
}

pub trait LoopClosureModule: Module {
    /// Install `solver` for the hierarchy level `level` (0 = agent level)
    fn set_registration_solver(&self, level: usize, solver: Box<dyn RegistrationSolver>);
}

pub trait FrontendPublisher: Module {
    fn publish(&self, graph: &SceneGraph, backend_input: &BackendInput, timestamp_ns: &TimestampNs);
}

pub trait BackendPublisher: Module {
    fn publish(
        &self,
        graph: &SceneGraph,
        deformation_graph: &DeformationGraphSnapshot,
        timestamp_ns: &TimestampNs,
    );
}

pub trait PlacesVisualizer: Module {
    fn visualize(&self, timestamp_ns: &TimestampNs, gvd: &VoxelLayerSnapshot, places: &PlacesSnapshot);
}

pub trait ReconstructionVisualizer: Module {
    fn visualize(&self, timestamp_ns: &TimestampNs, world_t_body: &Pose, tsdf: &VoxelLayerSnapshot);
}
