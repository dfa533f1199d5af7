// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Data exchanged between stages and with their subscribers

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

/// Nanoseconds since the epoch of the sensor clock
pub type TimestampNs = u64;

/// Rigid transform: translation plus unit quaternion `[w, x, y, z]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pose {
    pub translation: [f64; 3],
    pub rotation: [f64; 4],
}

impl Pose {
    pub fn identity() -> Self {
        Self {
            translation: [0.0; 3],
            rotation: [1.0, 0.0, 0.0, 0.0],
        }
    }

    pub fn from_translation(translation: [f64; 3]) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Scene graph layer a node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Layer {
    Objects,
    Agents,
    Places,
    Rooms,
    Buildings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneNode {
    pub id: u64,
    pub layer: Layer,
    pub position: [f64; 3],
    pub semantic_label: Option<u32>,
}

/// Layered scene graph shared between stages
#[derive(Debug, Clone, Default, Serialize)]
pub struct SceneGraph {
    nodes: AHashMap<u64, SceneNode>,
    edges: Vec<(u64, u64)>,
    pub last_update_ns: TimestampNs,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node; returns `true` if the id was new
    pub fn insert_node(&mut self, node: SceneNode) -> bool {
        self.nodes.insert(node.id, node).is_none()
    }

    /// Connect two existing nodes; returns `false` if either is missing
    pub fn insert_edge(&mut self, source: u64, target: u64) -> bool {
        if !self.nodes.contains_key(&source) || !self.nodes.contains_key(&target) {
            return false;
        }
        self.edges.push((source, target));
        true
    }

    pub fn node(&self, id: u64) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn num_layer_nodes(&self, layer: Layer) -> usize {
        self.nodes.values().filter(|n| n.layer == layer).count()
    }
}

/// Scene graph behind a lock, owned jointly by the stages that edit it
pub type SharedSceneGraph = Arc<RwLock<SceneGraph>>;

pub fn shared_scene_graph() -> SharedSceneGraph {
    Arc::new(RwLock::new(SceneGraph::new()))
}

/// What the reconstruction stage hands the frontend each update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconstructionOutput {
    pub timestamp_ns: TimestampNs,
    pub world_t_body: Pose,
    pub archived_blocks: Vec<[i32; 3]>,
    pub num_mesh_vertices: usize,
}

/// Frontend changes the backend folds into its deformation graph
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackendInput {
    pub timestamp_ns: TimestampNs,
    pub new_agent_nodes: Vec<u64>,
    pub archived_places: Vec<u64>,
    pub deformation_edges: Vec<(u64, u64)>,
}

/// Summary of a voxel layer (TSDF or GVD) for visualization
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VoxelLayerSnapshot {
    pub voxel_size: f64,
    pub allocated_blocks: Vec<[i32; 3]>,
}

/// Summary of the places extracted by the frontend
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlacesSnapshot {
    pub num_places: usize,
    pub num_edges: usize,
}

/// Summary of the backend deformation graph
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeformationGraphSnapshot {
    pub num_nodes: usize,
    pub num_edges: usize,
    pub num_loop_closures: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u64, layer: Layer) -> SceneNode {
        SceneNode {
            id,
            layer,
            position: [0.0; 3],
            semantic_label: None,
        }
    }

    #[test]
    fn test_edges_require_both_endpoints() {
        let mut graph = SceneGraph::new();
        assert!(graph.insert_node(node(1, Layer::Places)));
        assert!(graph.insert_node(node(2, Layer::Places)));
        assert!(graph.insert_node(node(3, Layer::Objects)));
        assert!(!graph.insert_node(node(3, Layer::Objects)));

        assert!(graph.insert_edge(1, 2));
        assert!(!graph.insert_edge(1, 9));
        assert_eq!(graph.num_nodes(), 3);
        assert_eq!(graph.num_edges(), 1);
        assert_eq!(graph.num_layer_nodes(Layer::Places), 2);
    }
}
