// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Perception pipeline controller.

Builds every stage named by the [`ConstructionPlan`], wires stage outputs to
their publishers and visualizers, registers the transport endpoints and then
owns the stages for the rest of the run.

## Failure policy

- Label space, frontend, backend and the backend publisher are required: a
  failure aborts construction with [`PipelineError`].
- Everything else is optional: a failure is logged and construction carries on
  without that stage.
- Inputs that only feed loop closure are not subscribed when loop closure
  failed to build.
*/

use kestrel_config::{validate_config, validate_loop_closure, KestrelConfig};
use kestrel_state_manager::{LabelSpace, PipelineContext, PipelineState};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::bow::{ingest_bow_queries, BowQueries};
use crate::error::{PipelineError, PipelineResult, StageBuildError};
use crate::factory::{StageBuildContext, StageFactory};
use crate::freespace::freespace_handler;
use crate::module::{BackendModule, FrontendModule, ReconstructionModule};
use crate::payload::{
    shared_scene_graph, BackendInput, DeformationGraphSnapshot, PlacesSnapshot, Pose, SceneGraph,
    SharedSceneGraph, TimestampNs, VoxelLayerSnapshot,
};
use crate::plan::{ConstructionPlan, ConstructionStep};
use crate::registry::{names, PublisherHandle, StageHandle, StageRegistry, VisualizerHandle};
use crate::transport::{BowHandler, FreespaceHandler, Registration, Transport};

fn required(stage: &'static str, err: StageBuildError) -> PipelineError {
    PipelineError::RequiredStageMissing {
        stage,
        reason: err.to_string(),
    }
}

/// Owner of all constructed stages
pub struct PerceptionPipeline {
    config: KestrelConfig,
    plan: ConstructionPlan,
    context: Arc<PipelineContext>,
    transport: Arc<dyn Transport>,
    registry: StageRegistry,
    frontend_graph: SharedSceneGraph,
    backend_graph: SharedSceneGraph,
    registrations: Vec<Registration>,
}

impl PerceptionPipeline {
    /// Validate `config` and build every stage it enables
    ///
    /// # Errors
    ///
    /// - `PipelineError::Config` if the configuration is invalid
    /// - `PipelineError::RequiredStageMissing` if the frontend or backend
    ///   cannot be built
    /// - `PipelineError::State` if `context` was already used by a pipeline
    pub fn new(
        config: KestrelConfig,
        factory: Arc<dyn StageFactory>,
        transport: Arc<dyn Transport>,
        context: Arc<PipelineContext>,
    ) -> PipelineResult<Self> {
        validate_config(&config)?;
        let plan = ConstructionPlan::from_config(&config);
        context.set_state(PipelineState::Initializing)?;

        info!(
            "[PIPELINE] Constructing pipeline for robot {} ({} steps)",
            context.robot_id(),
            plan.len()
        );

        let mut pipeline = Self {
            config,
            plan,
            context,
            transport,
            registry: StageRegistry::new(),
            frontend_graph: shared_scene_graph(),
            backend_graph: shared_scene_graph(),
            registrations: Vec::new(),
        };

        if let Err(e) = pipeline.execute_plan(factory.as_ref()) {
            error!("[PIPELINE] Construction failed: {}", e);
            if let Err(state_err) = pipeline.context.set_state(PipelineState::Error) {
                warn!("[PIPELINE] {}", state_err);
            }
            return Err(e);
        }

        pipeline.context.set_state(PipelineState::Ready)?;
        info!(
            "[PIPELINE] Pipeline ready: {} stages, {} transport endpoints",
            pipeline.registry.len(),
            pipeline.registrations.len()
        );
        Ok(pipeline)
    }

    fn execute_plan(&mut self, factory: &dyn StageFactory) -> PipelineResult<()> {
        let timer = Arc::clone(self.context.timer());
        let steps = self.plan.steps().to_vec();
        for step in &steps {
            let _scope = timer.scoped(&format!("construct/{}", step.key()));
            debug!("[PIPELINE] Step: {}", step);
            self.execute_step(step, factory)?;
        }
        Ok(())
    }

    fn execute_step(
        &mut self,
        step: &ConstructionStep,
        factory: &dyn StageFactory,
    ) -> PipelineResult<()> {
        let build = StageBuildContext {
            config: &self.config,
            context: &self.context,
            frontend_graph: &self.frontend_graph,
            backend_graph: &self.backend_graph,
        };

        match step {
            ConstructionStep::PublishLabelSpace { .. } => {
                let label_space = LabelSpace::from_config(&self.config.label_space)?;
                self.context.set_label_space(label_space)?;
            }

            ConstructionStep::Frontend => {
                let frontend = factory
                    .create_frontend(&build)
                    .map_err(|e| required(names::FRONTEND, e))?;
                self.registry
                    .insert(names::FRONTEND, StageHandle::Frontend(frontend));
            }

            ConstructionStep::FrontendPublisher => {
                let Some(frontend) = self.registry.frontend(names::FRONTEND) else {
                    warn!("[PIPELINE] No frontend to publish from");
                    return Ok(());
                };
                match factory.create_frontend_publisher(&build) {
                    Ok(publisher) => {
                        let sink = Arc::clone(&publisher);
                        frontend.add_output_callback(Arc::new(
                            move |graph: &SceneGraph, input: &BackendInput, ts: &TimestampNs| {
                                sink.publish(graph, input, ts)
                            },
                        ));
                        self.registry.insert(
                            names::FRONTEND_PUBLISHER,
                            StageHandle::Publisher(PublisherHandle::Frontend(publisher)),
                        );
                    }
                    Err(e) => warn!("[PIPELINE] Frontend output disabled: {}", e),
                }
            }

            ConstructionStep::PlacesVisualizer { namespace } => {
                let Some(frontend) = self.registry.frontend(names::FRONTEND) else {
                    return Ok(());
                };
                match factory.create_places_visualizer(&build, namespace) {
                    Ok(visualizer) => {
                        let sink = Arc::clone(&visualizer);
                        frontend.add_place_visualization_callback(Arc::new(
                            move |ts: &TimestampNs,
                                  gvd: &VoxelLayerSnapshot,
                                  places: &PlacesSnapshot| {
                                sink.visualize(ts, gvd, places)
                            },
                        ));
                        self.registry.insert(
                            names::PLACES_VISUALIZER,
                            StageHandle::Visualizer(VisualizerHandle::Places(visualizer)),
                        );
                    }
                    Err(e) => warn!("[PIPELINE] Places visualizer disabled: {}", e),
                }
            }

            ConstructionStep::FreespaceService { service } => {
                let Some(frontend) = self.registry.frontend(names::FRONTEND) else {
                    return Ok(());
                };
                let handler: FreespaceHandler = Arc::new(freespace_handler(frontend));
                match self.transport.advertise_freespace_service(service, handler) {
                    Ok(registration) => {
                        info!("[PIPELINE] Advertised service '{}'", service);
                        self.registrations.push(registration);
                    }
                    Err(e) => warn!("[PIPELINE] Freespace service unavailable: {}", e),
                }
            }

            ConstructionStep::Reconstruction => {
                // Unreachable through a plan (frontend failure is fatal); kept so the
                // step never assumes a registry entry it did not check.
                let output_queue = match self.registry.frontend(names::FRONTEND) {
                    Some(frontend) => Some(frontend.queue()),
                    None => {
                        error!(
                            "[PIPELINE] Invalid frontend module: disabling reconstruction output queue"
                        );
                        None
                    }
                };
                match factory.create_reconstruction(&build, output_queue) {
                    Ok(reconstruction) => {
                        self.registry.insert(
                            names::RECONSTRUCTION,
                            StageHandle::Reconstruction(reconstruction),
                        );
                    }
                    Err(e) => warn!("[PIPELINE] Continuing without reconstruction: {}", e),
                }
            }

            ConstructionStep::ReconstructionVisualizer { namespace } => {
                let Some(reconstruction) = self.registry.reconstruction(names::RECONSTRUCTION)
                else {
                    debug!("[PIPELINE] No reconstruction stage to visualize");
                    return Ok(());
                };
                match factory.create_reconstruction_visualizer(&build, namespace) {
                    Ok(visualizer) => {
                        let sink = Arc::clone(&visualizer);
                        reconstruction.add_visualization_callback(Arc::new(
                            move |ts: &TimestampNs, pose: &Pose, tsdf: &VoxelLayerSnapshot| {
                                sink.visualize(ts, pose, tsdf)
                            },
                        ));
                        self.registry.insert(
                            names::RECONSTRUCTION_VISUALIZER,
                            StageHandle::Visualizer(VisualizerHandle::Reconstruction(visualizer)),
                        );
                    }
                    Err(e) => warn!("[PIPELINE] Reconstruction visualizer disabled: {}", e),
                }
            }

            ConstructionStep::Backend { .. } => {
                let backend = factory
                    .create_backend(&build)
                    .map_err(|e| required(names::BACKEND, e))?;
                self.registry
                    .insert(names::BACKEND, StageHandle::Backend(backend));
            }

            ConstructionStep::BackendPublisher => {
                let Some(backend) = self.registry.backend(names::BACKEND) else {
                    return Err(PipelineError::RequiredStageMissing {
                        stage: names::BACKEND_PUBLISHER,
                        reason: "no backend to publish from".to_string(),
                    });
                };
                let publisher = factory
                    .create_backend_publisher(&build, &backend)
                    .map_err(|e| required(names::BACKEND_PUBLISHER, e))?;
                let sink = Arc::clone(&publisher);
                backend.add_output_callback(Arc::new(
                    move |graph: &SceneGraph, dgraph: &DeformationGraphSnapshot, ts: &TimestampNs| {
                        sink.publish(graph, dgraph, ts)
                    },
                ));
                self.registry.insert(
                    names::BACKEND_PUBLISHER,
                    StageHandle::Publisher(PublisherHandle::Backend(publisher)),
                );
            }

            ConstructionStep::LoopClosure { .. } => {
                let lcd_config = self
                    .config
                    .loop_closure_with_labels(self.context.total_labels());
                validate_loop_closure(&lcd_config)?;

                self.context.shared().create_lcd_queue(0)?;
                self.context.notify_queue_created("lcd_queue");

                match factory.create_loop_closure(&build, &lcd_config) {
                    Ok(lcd) => {
                        self.registry
                            .insert(names::LOOP_CLOSURE, StageHandle::LoopClosure(lcd));
                    }
                    Err(e) => warn!("[PIPELINE] Continuing without loop closure: {}", e),
                }
            }

            ConstructionStep::BowSubscription { topic, queue_size } => {
                if self.registry.loop_closure(names::LOOP_CLOSURE).is_none() {
                    warn!(
                        "[PIPELINE] No loop closure stage: not subscribing to '{}'",
                        topic
                    );
                    return Ok(());
                }
                let visual_queue = self.context.shared().visual_lcd_queue();
                let handler: BowHandler = Arc::new(move |batch: &BowQueries| {
                    ingest_bow_queries(&visual_queue, batch);
                });
                match self
                    .transport
                    .subscribe_bow_queries(topic, *queue_size, handler)
                {
                    Ok(registration) => {
                        info!("[PIPELINE] Subscribed to '{}'", topic);
                        self.registrations.push(registration);
                    }
                    Err(e) => warn!("[PIPELINE] Visual loop closure input unavailable: {}", e),
                }
            }

            ConstructionStep::AgentRegistration => {
                let Some(lcd) = self.registry.loop_closure(names::LOOP_CLOSURE) else {
                    return Ok(());
                };
                match factory.create_registration_solver(&build) {
                    Some(solver) => {
                        info!("[PIPELINE] Agent registration solver: {}", solver.name());
                        lcd.set_registration_solver(0, solver);
                    }
                    None => warn!("[PIPELINE] Agent registration enabled but no solver available"),
                }
            }
        }

        Ok(())
    }

    /// Start every stage in construction order
    ///
    /// # Errors
    ///
    /// `PipelineError::State` unless the pipeline is ready.
    pub fn start(&self) -> PipelineResult<()> {
        self.context.set_state(PipelineState::Running)?;
        for (name, handle) in self.registry.iter() {
            debug!("[PIPELINE] Starting {}", name);
            handle.start();
        }
        info!("[PIPELINE] Started {} stages", self.registry.len());
        Ok(())
    }

    /// Withdraw transport endpoints and stop every stage in reverse order
    ///
    /// Does nothing once stopped.
    pub fn stop(&mut self) {
        let state = self.context.state();
        if !matches!(
            state,
            PipelineState::Ready | PipelineState::Running | PipelineState::Error
        ) {
            return;
        }
        if let Err(e) = self.context.set_state(PipelineState::Stopping) {
            warn!("[PIPELINE] {}", e);
            return;
        }

        self.registrations.clear();
        let handles: Vec<(String, StageHandle)> = self
            .registry
            .iter()
            .map(|(name, handle)| (name.to_string(), handle.clone()))
            .collect();
        for (name, handle) in handles.iter().rev() {
            debug!("[PIPELINE] Stopping {}", name);
            handle.stop();
        }

        if let Err(e) = self.context.set_state(PipelineState::Stopped) {
            warn!("[PIPELINE] {}", e);
        }
        info!("[PIPELINE] Stopped");
    }

    /// Ask every stage to persist its output under the context's log setup
    pub fn save(&self) {
        let log_setup = self.context.log_setup();
        if !log_setup.valid() {
            debug!("[PIPELINE] No valid log directory; skipping save");
            return;
        }
        for (name, handle) in self.registry.iter() {
            debug!("[PIPELINE] Saving {}", name);
            handle.save(log_setup);
        }
    }

    /// One line per stage: name, kind and the stage's own status
    pub fn print_info(&self) -> String {
        let mut report = String::new();
        for (name, handle) in self.registry.iter() {
            let detail = handle.print_info();
            if detail.is_empty() {
                report.push_str(&format!("{} ({})\n", name, handle.kind()));
            } else {
                report.push_str(&format!("{} ({}): {}\n", name, handle.kind(), detail));
            }
        }
        info!("[PIPELINE] Active stages:\n{}", report);
        report
    }

    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    pub fn context(&self) -> &Arc<PipelineContext> {
        &self.context
    }

    pub fn config(&self) -> &KestrelConfig {
        &self.config
    }

    pub fn plan(&self) -> &ConstructionPlan {
        &self.plan
    }

    pub fn frontend_graph(&self) -> &SharedSceneGraph {
        &self.frontend_graph
    }

    pub fn backend_graph(&self) -> &SharedSceneGraph {
        &self.backend_graph
    }

    pub fn frontend(&self) -> Option<Arc<dyn FrontendModule>> {
        self.registry.frontend(names::FRONTEND)
    }

    pub fn backend(&self) -> Option<Arc<dyn BackendModule>> {
        self.registry.backend(names::BACKEND)
    }

    pub fn reconstruction(&self) -> Option<Arc<dyn ReconstructionModule>> {
        self.registry.reconstruction(names::RECONSTRUCTION)
    }
}

impl Drop for PerceptionPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}
