// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Queues shared between stages that do not hold references to each other

use once_cell::sync::OnceCell;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::input_queue::InputQueue;
use crate::{Result, StateError};

/// Bag-of-words descriptor for one keyframe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BowQuery {
    pub robot_id: u32,
    pub pose_id: u64,
    pub word_ids: Vec<u32>,
    pub word_values: Vec<f32>,
}

/// Scene-graph changes handed from the frontend to loop-closure detection
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LcdInput {
    pub timestamp_ns: u64,
    pub archived_places: Vec<u64>,
    pub new_agent_nodes: Vec<u64>,
}

/// Shared queues
///
/// The loop-closure queue only exists when loop closure is enabled and may be
/// created once. The visual query queue always exists.
#[derive(Debug, Default)]
pub struct SharedModuleState {
    lcd_queue: OnceCell<Arc<InputQueue<LcdInput>>>,
    visual_lcd_queue: Arc<InputQueue<Arc<BowQuery>>>,
}

impl SharedModuleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the loop-closure input queue
    ///
    /// # Errors
    ///
    /// `StateError::QueueAlreadyCreated` if the queue exists.
    pub fn create_lcd_queue(&self, max_size: usize) -> Result<Arc<InputQueue<LcdInput>>> {
        let queue = Arc::new(InputQueue::new(max_size));
        self.lcd_queue
            .set(Arc::clone(&queue))
            .map_err(|_| StateError::QueueAlreadyCreated("lcd_queue".to_string()))?;
        debug!("[SHARED-STATE] Created lcd_queue (max_size={})", max_size);
        Ok(queue)
    }

    pub fn lcd_queue(&self) -> Option<Arc<InputQueue<LcdInput>>> {
        self.lcd_queue.get().cloned()
    }

    pub fn visual_lcd_queue(&self) -> Arc<InputQueue<Arc<BowQuery>>> {
        Arc::clone(&self.visual_lcd_queue)
    }
}
