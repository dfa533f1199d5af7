// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Bag-of-words ingestion for visual loop closure

use kestrel_state_manager::{BowQuery, InputQueue};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Topic the batches arrive on
pub const BOW_TOPIC: &str = "bow_vectors";

/// One batch of descriptors as delivered by the transport
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BowQueries {
    pub robot_id: u32,
    pub queries: Vec<BowQuery>,
}

/// Push every query in `batch` onto `queue`, preserving batch order
///
/// Returns the number of queries accepted.
pub fn ingest_bow_queries(queue: &InputQueue<Arc<BowQuery>>, batch: &BowQueries) -> usize {
    let mut accepted = 0;
    for query in &batch.queries {
        if queue.push(Arc::new(query.clone())) {
            accepted += 1;
        }
    }
    if accepted < batch.queries.len() {
        warn!(
            "[BOW] Visual query queue full; dropped {} of {} queries from robot {}",
            batch.queries.len() - accepted,
            batch.queries.len(),
            batch.robot_id
        );
    }
    accepted
}
