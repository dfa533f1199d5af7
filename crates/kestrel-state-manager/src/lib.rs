// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Kestrel State Manager
//!
//! Runtime state shared across pipeline stages.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   PipelineContext                   │  ← passed to every stage at construction
//! │   ├── LabelSpace (write-once)       │
//! │   ├── SharedModuleState             │  ← inter-stage InputQueues
//! │   ├── ElapsedTimeRecorder / LogSetup│
//! │   └── PipelineState (atomic)        │  → StateEvent channel
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use kestrel_state_manager::{LabelSpace, PipelineContext, PipelineState};
//!
//! let context = PipelineContext::detached(0);
//! context.set_label_space(LabelSpace::new(20)?)?;
//! context.set_state(PipelineState::Initializing)?;
//! assert_eq!(context.total_labels(), 20);
//! # Ok::<(), kestrel_state_manager::StateError>(())
//! ```

pub mod context;
pub mod core_state;
pub mod events;
pub mod input_queue;
pub mod label_space;
pub mod shared_state;

pub use context::PipelineContext;
pub use core_state::{PipelineState, PipelineStateCell};
pub use events::{event_channel, EventReceiver, EventSender, StateEvent};
pub use input_queue::InputQueue;
pub use label_space::LabelSpace;
pub use shared_state::{BowQuery, LcdInput, SharedModuleState};

/// State manager error types
#[derive(Debug)]
pub enum StateError {
    /// Invalid lifecycle transition
    InvalidTransition(String),

    /// Label space configuration rejected
    InvalidLabelSpace(String),

    /// Label space was already published
    LabelSpaceAlreadySet,

    /// A write-once queue was created twice
    QueueAlreadyCreated(String),
}

impl std::fmt::Display for StateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateError::InvalidTransition(msg) => write!(f, "Invalid transition: {}", msg),
            StateError::InvalidLabelSpace(msg) => write!(f, "Invalid label space: {}", msg),
            StateError::LabelSpaceAlreadySet => write!(f, "Label space already set"),
            StateError::QueueAlreadyCreated(name) => write!(f, "Queue already created: {}", name),
        }
    }
}

impl std::error::Error for StateError {}

pub type Result<T> = std::result::Result<T, StateError>;
