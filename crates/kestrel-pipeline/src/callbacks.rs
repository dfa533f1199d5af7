// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Three-argument output fan-out
//!
//! A stage owns one [`OutputFanout`] per output kind. Subscribers are attached
//! while the pipeline is being constructed and receive every emission, in
//! subscription order, with the arguments passed through unchanged.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::payload::{
    BackendInput, DeformationGraphSnapshot, PlacesSnapshot, Pose, SceneGraph, TimestampNs,
    VoxelLayerSnapshot,
};

/// Subscriber to a stage output
pub type OutputCallback<A, B, C> = Arc<dyn Fn(&A, &B, &C) + Send + Sync>;

/// Ordered list of output subscribers
pub struct OutputFanout<A, B, C> {
    subscribers: RwLock<Vec<OutputCallback<A, B, C>>>,
}

impl<A, B, C> OutputFanout<A, B, C> {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, callback: OutputCallback<A, B, C>) {
        self.subscribers.write().push(callback);
    }

    /// Call every subscriber with the same three arguments
    pub fn emit(&self, a: &A, b: &B, c: &C) {
        // Snapshot so a subscriber may subscribe without deadlocking
        let subscribers: Vec<OutputCallback<A, B, C>> = self.subscribers.read().clone();
        for subscriber in &subscribers {
            subscriber(a, b, c);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }
}

impl<A, B, C> Default for OutputFanout<A, B, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, B, C> std::fmt::Debug for OutputFanout<A, B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputFanout")
            .field("subscribers", &self.len())
            .finish()
    }
}

/// Frontend output: updated graph, backend delta, timestamp
pub type FrontendOutputCallback = OutputCallback<SceneGraph, BackendInput, TimestampNs>;

/// Places visualization: timestamp, GVD layer, extracted places
pub type PlacesVisualizationCallback = OutputCallback<TimestampNs, VoxelLayerSnapshot, PlacesSnapshot>;

/// Reconstruction visualization: timestamp, body pose, TSDF layer
pub type ReconstructionVisualizationCallback = OutputCallback<TimestampNs, Pose, VoxelLayerSnapshot>;

/// Backend output: optimized graph, deformation graph, timestamp
pub type BackendOutputCallback = OutputCallback<SceneGraph, DeformationGraphSnapshot, TimestampNs>;
