// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Scripted stages and a recording factory for controller tests

#![allow(dead_code)]

use kestrel_config::{KestrelConfig, LoopClosureConfig};
use kestrel_observability::LogSetup;
use kestrel_pipeline::*;
use kestrel_state_manager::{InputQueue, PipelineContext};
use ndarray::ArrayView2;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Ordered record of everything the scripted stages observed
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.0.lock().iter().any(|e| e == entry)
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.lock().iter().position(|e| e == entry)
    }

    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .cloned()
            .collect()
    }
}

macro_rules! lifecycle {
    ($ty:ty, $name:expr) => {
        impl Module for $ty {
            fn start(&self) {
                self.journal.record(format!("start:{}", $name));
            }
            fn stop(&self) {
                self.journal.record(format!("stop:{}", $name));
            }
            fn save(&self, _log_setup: &LogSetup) {
                self.journal.record(format!("save:{}", $name));
            }
            fn print_info(&self) -> String {
                format!("scripted {}", $name)
            }
        }
    };
}

pub struct TestFrontend {
    pub journal: Journal,
    pub queue: FrontendQueue,
    pub output: OutputFanout<SceneGraph, BackendInput, TimestampNs>,
    pub places: OutputFanout<TimestampNs, VoxelLayerSnapshot, PlacesSnapshot>,
    pub freespace_calls: Mutex<usize>,
}

lifecycle!(TestFrontend, "frontend");

impl FrontendModule for TestFrontend {
    fn queue(&self) -> FrontendQueue {
        Arc::clone(&self.queue)
    }

    fn add_output_callback(&self, callback: FrontendOutputCallback) {
        self.output.subscribe(callback);
    }

    fn add_place_visualization_callback(&self, callback: PlacesVisualizationCallback) {
        self.places.subscribe(callback);
    }

    /// Free iff x > 0
    fn in_freespace(&self, positions: ArrayView2<'_, f64>, _distance: f64) -> Vec<bool> {
        *self.freespace_calls.lock() += 1;
        positions.columns().into_iter().map(|c| c[0] > 0.0).collect()
    }
}

pub struct TestReconstruction {
    pub journal: Journal,
    pub output_queue: Option<FrontendQueue>,
    pub visualization: OutputFanout<TimestampNs, Pose, VoxelLayerSnapshot>,
}

lifecycle!(TestReconstruction, "reconstruction");

impl ReconstructionModule for TestReconstruction {
    fn add_visualization_callback(&self, callback: ReconstructionVisualizationCallback) {
        self.visualization.subscribe(callback);
    }
}

pub struct TestBackend {
    pub journal: Journal,
    pub output: OutputFanout<SceneGraph, DeformationGraphSnapshot, TimestampNs>,
}

lifecycle!(TestBackend, "backend");

impl BackendModule for TestBackend {
    fn add_output_callback(&self, callback: BackendOutputCallback) {
        self.output.subscribe(callback);
    }
}

pub struct TestLoopClosure {
    pub journal: Journal,
    pub config: LoopClosureConfig,
    pub solvers: Mutex<Vec<(usize, String)>>,
}

lifecycle!(TestLoopClosure, "lcd");

impl LoopClosureModule for TestLoopClosure {
    fn set_registration_solver(&self, level: usize, solver: Box<dyn RegistrationSolver>) {
        self.solvers.lock().push((level, solver.name().to_string()));
    }
}

pub struct TestFrontendPublisher {
    pub journal: Journal,
}

lifecycle!(TestFrontendPublisher, "frontend_publisher");

impl FrontendPublisher for TestFrontendPublisher {
    fn publish(&self, graph: &SceneGraph, input: &BackendInput, timestamp_ns: &TimestampNs) {
        self.journal.record(format!(
            "publish:frontend:{}:{}:{}",
            graph.num_nodes(),
            input.new_agent_nodes.len(),
            timestamp_ns
        ));
    }
}

pub struct TestBackendPublisher {
    pub journal: Journal,
}

lifecycle!(TestBackendPublisher, "backend_publisher");

impl BackendPublisher for TestBackendPublisher {
    fn publish(
        &self,
        graph: &SceneGraph,
        deformation_graph: &DeformationGraphSnapshot,
        timestamp_ns: &TimestampNs,
    ) {
        self.journal.record(format!(
            "publish:backend:{}:{}:{}",
            graph.num_nodes(),
            deformation_graph.num_loop_closures,
            timestamp_ns
        ));
    }
}

pub struct TestPlacesVisualizer {
    pub journal: Journal,
    pub namespace: String,
}

lifecycle!(TestPlacesVisualizer, "places_visualizer");

impl PlacesVisualizer for TestPlacesVisualizer {
    fn visualize(&self, timestamp_ns: &TimestampNs, gvd: &VoxelLayerSnapshot, places: &PlacesSnapshot) {
        self.journal.record(format!(
            "visualize:places:{}:{}:{}",
            timestamp_ns,
            gvd.allocated_blocks.len(),
            places.num_places
        ));
    }
}

pub struct TestReconstructionVisualizer {
    pub journal: Journal,
    pub namespace: String,
}

lifecycle!(TestReconstructionVisualizer, "reconstruction_visualizer");

impl ReconstructionVisualizer for TestReconstructionVisualizer {
    fn visualize(&self, timestamp_ns: &TimestampNs, world_t_body: &Pose, tsdf: &VoxelLayerSnapshot) {
        self.journal.record(format!(
            "visualize:reconstruction:{}:{}:{}",
            timestamp_ns,
            world_t_body.translation[0],
            tsdf.voxel_size
        ));
    }
}

pub struct NamedSolver(pub &'static str);

impl RegistrationSolver for NamedSolver {
    fn name(&self) -> &str {
        self.0
    }

    fn solve(&self, _problem: &RegistrationProblem) -> Option<RegistrationSolution> {
        None
    }
}

/// Factory that records each construction and can be told to fail
#[derive(Default)]
pub struct ScriptedFactory {
    pub journal: Journal,
    failing: Mutex<HashSet<&'static str>>,
    pub frontend: Mutex<Option<Arc<TestFrontend>>>,
    pub reconstruction: Mutex<Option<Arc<TestReconstruction>>>,
    pub backend: Mutex<Option<Arc<TestBackend>>>,
    pub lcd: Mutex<Option<Arc<TestLoopClosure>>>,
    pub places_visualizer: Mutex<Option<Arc<TestPlacesVisualizer>>>,
    pub reconstruction_visualizer: Mutex<Option<Arc<TestReconstructionVisualizer>>>,
    pub label_count_seen: Mutex<Option<usize>>,
}

impl ScriptedFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the named constructor return an error
    pub fn failing(stages: &[&'static str]) -> Arc<Self> {
        let factory = Self::default();
        factory.failing.lock().extend(stages.iter().copied());
        Arc::new(factory)
    }

    fn attempt(&self, stage: &'static str) -> Result<(), StageBuildError> {
        self.journal.record(format!("create:{}", stage));
        if self.failing.lock().contains(stage) {
            return Err(StageBuildError::unavailable(stage, "scripted failure"));
        }
        Ok(())
    }

    pub fn frontend(&self) -> Arc<TestFrontend> {
        self.frontend.lock().clone().expect("frontend constructed")
    }

    pub fn backend(&self) -> Arc<TestBackend> {
        self.backend.lock().clone().expect("backend constructed")
    }
}

impl StageFactory for ScriptedFactory {
    fn create_frontend(&self, build: &StageBuildContext<'_>) -> StageResult<dyn FrontendModule> {
        self.attempt("frontend")?;
        *self.label_count_seen.lock() = Some(build.context.total_labels());
        let frontend = Arc::new(TestFrontend {
            journal: self.journal.clone(),
            queue: Arc::new(InputQueue::new(build.config.frontend.input_queue_size)),
            output: OutputFanout::new(),
            places: OutputFanout::new(),
            freespace_calls: Mutex::new(0),
        });
        *self.frontend.lock() = Some(Arc::clone(&frontend));
        Ok(frontend)
    }

    fn create_reconstruction(
        &self,
        _build: &StageBuildContext<'_>,
        output_queue: Option<FrontendQueue>,
    ) -> StageResult<dyn ReconstructionModule> {
        self.attempt("reconstruction")?;
        let reconstruction = Arc::new(TestReconstruction {
            journal: self.journal.clone(),
            output_queue,
            visualization: OutputFanout::new(),
        });
        *self.reconstruction.lock() = Some(Arc::clone(&reconstruction));
        Ok(reconstruction)
    }

    fn create_backend(&self, _build: &StageBuildContext<'_>) -> StageResult<dyn BackendModule> {
        self.attempt("backend")?;
        let backend = Arc::new(TestBackend {
            journal: self.journal.clone(),
            output: OutputFanout::new(),
        });
        *self.backend.lock() = Some(Arc::clone(&backend));
        Ok(backend)
    }

    fn create_loop_closure(
        &self,
        _build: &StageBuildContext<'_>,
        config: &LoopClosureConfig,
    ) -> StageResult<dyn LoopClosureModule> {
        self.attempt("lcd")?;
        let lcd = Arc::new(TestLoopClosure {
            journal: self.journal.clone(),
            config: config.clone(),
            solvers: Mutex::new(Vec::new()),
        });
        *self.lcd.lock() = Some(Arc::clone(&lcd));
        Ok(lcd)
    }

    fn create_frontend_publisher(
        &self,
        _build: &StageBuildContext<'_>,
    ) -> StageResult<dyn FrontendPublisher> {
        self.attempt("frontend_publisher")?;
        Ok(Arc::new(TestFrontendPublisher {
            journal: self.journal.clone(),
        }))
    }

    fn create_backend_publisher(
        &self,
        _build: &StageBuildContext<'_>,
        _backend: &Arc<dyn BackendModule>,
    ) -> StageResult<dyn BackendPublisher> {
        self.attempt("backend_publisher")?;
        Ok(Arc::new(TestBackendPublisher {
            journal: self.journal.clone(),
        }))
    }

    fn create_places_visualizer(
        &self,
        _build: &StageBuildContext<'_>,
        namespace: &str,
    ) -> StageResult<dyn PlacesVisualizer> {
        self.attempt("places_visualizer")?;
        let visualizer = Arc::new(TestPlacesVisualizer {
            journal: self.journal.clone(),
            namespace: namespace.to_string(),
        });
        *self.places_visualizer.lock() = Some(Arc::clone(&visualizer));
        Ok(visualizer)
    }

    fn create_reconstruction_visualizer(
        &self,
        _build: &StageBuildContext<'_>,
        namespace: &str,
    ) -> StageResult<dyn ReconstructionVisualizer> {
        self.attempt("reconstruction_visualizer")?;
        let visualizer = Arc::new(TestReconstructionVisualizer {
            journal: self.journal.clone(),
            namespace: namespace.to_string(),
        });
        *self.reconstruction_visualizer.lock() = Some(Arc::clone(&visualizer));
        Ok(visualizer)
    }

    fn create_registration_solver(
        &self,
        _build: &StageBuildContext<'_>,
    ) -> Option<Box<dyn RegistrationSolver>> {
        self.journal.record("create:registration_solver");
        Some(Box::new(NamedSolver("teaser")))
    }
}

pub fn detached_context() -> Arc<PipelineContext> {
    Arc::new(PipelineContext::detached(0))
}

/// Build a pipeline over a fresh local transport
pub fn build(
    config: KestrelConfig,
    factory: &Arc<ScriptedFactory>,
) -> (PipelineResult<PerceptionPipeline>, Arc<LocalTransport>) {
    let transport = Arc::new(LocalTransport::new());
    let pipeline = PerceptionPipeline::new(
        config,
        Arc::clone(factory) as Arc<dyn StageFactory>,
        Arc::clone(&transport) as Arc<dyn Transport>,
        detached_context(),
    );
    (pipeline, transport)
}
