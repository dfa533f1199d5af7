// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Event streaming for state changes

use crate::core_state::PipelineState;

/// State change event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    PipelineStateChanged {
        from: PipelineState,
        to: PipelineState,
    },
    LabelSpacePublished {
        total_labels: usize,
    },
    QueueCreated(String),
}

/// Sending half handed to the context
pub type EventSender = crossbeam::channel::Sender<StateEvent>;

/// Receiving half kept by whoever observes the pipeline
pub type EventReceiver = crossbeam::channel::Receiver<StateEvent>;

/// Unbounded state-event channel
pub fn event_channel() -> (EventSender, EventReceiver) {
    crossbeam::channel::unbounded()
}
