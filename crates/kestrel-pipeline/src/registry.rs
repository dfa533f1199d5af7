// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Name-keyed registry of constructed stages
//!
//! Entries are tagged by kind, so a typed lookup either yields the stage with
//! the expected interface or nothing. No runtime downcasting is involved.

use ahash::AHashMap;
use kestrel_observability::LogSetup;
use std::sync::Arc;
use tracing::debug;

use crate::module::{
    BackendModule, BackendPublisher, FrontendModule, FrontendPublisher, LoopClosureModule,
    PlacesVisualizer, ReconstructionModule, ReconstructionVisualizer,
};

/// Well-known registry names
pub mod names {
    pub const FRONTEND: &str = "frontend";
    pub const BACKEND: &str = "backend";
    pub const RECONSTRUCTION: &str = "reconstruction";
    pub const LOOP_CLOSURE: &str = "lcd";
    pub const FRONTEND_PUBLISHER: &str = "frontend_publisher";
    pub const BACKEND_PUBLISHER: &str = "backend_publisher";
    pub const PLACES_VISUALIZER: &str = "places_visualizer";
    pub const RECONSTRUCTION_VISUALIZER: &str = "reconstruction_visualizer";
}

#[derive(Clone)]
pub enum PublisherHandle {
    Frontend(Arc<dyn FrontendPublisher>),
    Backend(Arc<dyn BackendPublisher>),
}

#[derive(Clone)]
pub enum VisualizerHandle {
    Places(Arc<dyn PlacesVisualizer>),
    Reconstruction(Arc<dyn ReconstructionVisualizer>),
}

/// Registry entry
#[derive(Clone)]
pub enum StageHandle {
    Frontend(Arc<dyn FrontendModule>),
    Backend(Arc<dyn BackendModule>),
    Reconstruction(Arc<dyn ReconstructionModule>),
    LoopClosure(Arc<dyn LoopClosureModule>),
    Publisher(PublisherHandle),
    Visualizer(VisualizerHandle),
}

macro_rules! each_module {
    ($handle:expr, $module:ident => $body:expr) => {
        match $handle {
            StageHandle::Frontend($module) => $body,
            StageHandle::Backend($module) => $body,
            StageHandle::Reconstruction($module) => $body,
            StageHandle::LoopClosure($module) => $body,
            StageHandle::Publisher(PublisherHandle::Frontend($module)) => $body,
            StageHandle::Publisher(PublisherHandle::Backend($module)) => $body,
            StageHandle::Visualizer(VisualizerHandle::Places($module)) => $body,
            StageHandle::Visualizer(VisualizerHandle::Reconstruction($module)) => $body,
        }
    };
}

impl StageHandle {
    pub fn kind(&self) -> &'static str {
        match self {
            StageHandle::Frontend(_) => "frontend",
            StageHandle::Backend(_) => "backend",
            StageHandle::Reconstruction(_) => "reconstruction",
            StageHandle::LoopClosure(_) => "loop_closure",
            StageHandle::Publisher(_) => "publisher",
            StageHandle::Visualizer(_) => "visualizer",
        }
    }

    pub fn start(&self) {
        each_module!(self, module => module.start())
    }

    pub fn stop(&self) {
        each_module!(self, module => module.stop())
    }

    pub fn save(&self, log_setup: &LogSetup) {
        each_module!(self, module => module.save(log_setup))
    }

    pub fn print_info(&self) -> String {
        each_module!(self, module => module.print_info())
    }
}

impl std::fmt::Debug for StageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StageHandle::{}", self.kind())
    }
}

/// Stage instances addressed by name
#[derive(Debug, Default)]
pub struct StageRegistry {
    entries: AHashMap<String, StageHandle>,
    /// Insertion order, used for start/stop sequencing
    order: Vec<String>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `handle` under `name`, replacing any previous entry
    ///
    /// The last write wins; the replaced handle is returned.
    pub fn insert(&mut self, name: &str, handle: StageHandle) -> Option<StageHandle> {
        let previous = self.entries.insert(name.to_string(), handle);
        match &previous {
            Some(old) => debug!(
                "[REGISTRY] Replacing '{}' ({}) with a new {}",
                name,
                old.kind(),
                self.entries.get(name).map(StageHandle::kind).unwrap_or("entry")
            ),
            None => self.order.push(name.to_string()),
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<&StageHandle> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names, in first-insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Entries in first-insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StageHandle)> {
        self.order
            .iter()
            .filter_map(|name| self.entries.get(name).map(|h| (name.as_str(), h)))
    }

    pub fn frontend(&self, name: &str) -> Option<Arc<dyn FrontendModule>> {
        match self.get(name)? {
            StageHandle::Frontend(module) => Some(Arc::clone(module)),
            _ => None,
        }
    }

    pub fn backend(&self, name: &str) -> Option<Arc<dyn BackendModule>> {
        match self.get(name)? {
            StageHandle::Backend(module) => Some(Arc::clone(module)),
            _ => None,
        }
    }

    pub fn reconstruction(&self, name: &str) -> Option<Arc<dyn ReconstructionModule>> {
        match self.get(name)? {
            StageHandle::Reconstruction(module) => Some(Arc::clone(module)),
            _ => None,
        }
    }

    pub fn loop_closure(&self, name: &str) -> Option<Arc<dyn LoopClosureModule>> {
        match self.get(name)? {
            StageHandle::LoopClosure(module) => Some(Arc::clone(module)),
            _ => None,
        }
    }

    pub fn publisher(&self, name: &str) -> Option<PublisherHandle> {
        match self.get(name)? {
            StageHandle::Publisher(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    pub fn visualizer(&self, name: &str) -> Option<VisualizerHandle> {
        match self.get(name)? {
            StageHandle::Visualizer(handle) => Some(handle.clone()),
            _ => None,
        }
    }
}
