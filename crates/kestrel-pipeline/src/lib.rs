// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# Kestrel Pipeline

Stage orchestration for the Kestrel perception node.

## Responsibilities

- Derive a [`ConstructionPlan`] from configuration
- Build stages through a [`StageFactory`] and keep them in a [`StageRegistry`]
- Wire three-argument stage outputs to publishers and visualizers
- Answer freespace queries and ingest bag-of-words batches over a [`Transport`]
- Keep the node alive according to its [`ExitMode`]

Concrete perception algorithms and the message bus are supplied by the
embedding application.
*/

pub mod bow;
pub mod callbacks;
pub mod error;
pub mod factory;
pub mod freespace;
pub mod module;
pub mod payload;
pub mod pipeline;
pub mod plan;
pub mod registry;
pub mod scheduler;
pub mod transport;

pub use bow::{ingest_bow_queries, BowQueries, BOW_TOPIC};
pub use callbacks::{
    BackendOutputCallback, FrontendOutputCallback, OutputCallback, OutputFanout,
    PlacesVisualizationCallback, ReconstructionVisualizationCallback,
};
pub use error::{
    FreespaceError, PipelineError, PipelineResult, StageBuildError, TransportError,
};
pub use factory::{StageBuildContext, StageFactory, StageResult};
pub use freespace::{
    freespace_handler, handle_freespace_query, FreespaceRequest, FreespaceResponse,
    FREESPACE_SERVICE,
};
pub use module::{
    BackendModule, BackendPublisher, FrontendModule, FrontendPublisher, FrontendQueue,
    LoopClosureModule, Module, PlacesVisualizer, ReconstructionModule, ReconstructionVisualizer,
    RegistrationProblem, RegistrationSolution, RegistrationSolver,
};
pub use payload::*;
pub use pipeline::PerceptionPipeline;
pub use plan::{ConstructionPlan, ConstructionStep};
pub use registry::{names, PublisherHandle, StageHandle, StageRegistry, VisualizerHandle};
pub use scheduler::{
    spin_and_wait, spin_until_exit_requested, spin_while_clock_present, ExitMode, SPIN_PERIOD,
};
pub use transport::{
    BowHandler, FreespaceHandler, LocalTransport, Registration, ShutdownHandler, Transport,
    CLOCK_TOPIC, SHUTDOWN_SERVICE,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
