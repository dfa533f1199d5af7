// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Stage construction seam
//!
//! The controller decides what to build and in which order; a [`StageFactory`]
//! supplies the concrete stages. Every method may refuse with a
//! [`StageBuildError`], and the controller decides whether that is fatal.

use kestrel_config::{KestrelConfig, LoopClosureConfig};
use kestrel_state_manager::PipelineContext;
use std::sync::Arc;

use crate::error::StageBuildError;
use crate::module::{
    BackendModule, BackendPublisher, FrontendModule, FrontendPublisher, FrontendQueue,
    LoopClosureModule, PlacesVisualizer, ReconstructionModule, ReconstructionVisualizer,
    RegistrationSolver,
};
use crate::payload::SharedSceneGraph;

/// Inputs every stage constructor can read
pub struct StageBuildContext<'a> {
    pub config: &'a KestrelConfig,
    pub context: &'a Arc<PipelineContext>,
    /// Graph the frontend writes and the backend reads
    pub frontend_graph: &'a SharedSceneGraph,
    /// Graph the backend optimizes
    pub backend_graph: &'a SharedSceneGraph,
}

pub type StageResult<T> = Result<Arc<T>, StageBuildError>;

pub trait StageFactory: Send + Sync {
    fn create_frontend(&self, build: &StageBuildContext<'_>) -> StageResult<dyn FrontendModule>;

    /// `output_queue` is the frontend's input queue, or `None` when no
    /// frontend queue could be found
    fn create_reconstruction(
        &self,
        build: &StageBuildContext<'_>,
        output_queue: Option<FrontendQueue>,
    ) -> StageResult<dyn ReconstructionModule>;

    fn create_backend(&self, build: &StageBuildContext<'_>) -> StageResult<dyn BackendModule>;

    /// `config` already carries the label-space class count
    fn create_loop_closure(
        &self,
        build: &StageBuildContext<'_>,
        config: &LoopClosureConfig,
    ) -> StageResult<dyn LoopClosureModule>;

    fn create_frontend_publisher(
        &self,
        build: &StageBuildContext<'_>,
    ) -> StageResult<dyn FrontendPublisher>;

    fn create_backend_publisher(
        &self,
        build: &StageBuildContext<'_>,
        backend: &Arc<dyn BackendModule>,
    ) -> StageResult<dyn BackendPublisher>;

    fn create_places_visualizer(
        &self,
        build: &StageBuildContext<'_>,
        namespace: &str,
    ) -> StageResult<dyn PlacesVisualizer>;

    fn create_reconstruction_visualizer(
        &self,
        build: &StageBuildContext<'_>,
        namespace: &str,
    ) -> StageResult<dyn ReconstructionVisualizer>;

    /// Solver for agent-level registration; `None` leaves the detector without one
    fn create_registration_solver(
        &self,
        _build: &StageBuildContext<'_>,
    ) -> Option<Box<dyn RegistrationSolver>> {
        None
    }
}
