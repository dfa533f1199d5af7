// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Process context handed to every stage at construction

use kestrel_observability::{ElapsedTimeRecorder, LogSetup};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core_state::{PipelineState, PipelineStateCell};
use crate::events::{EventSender, StateEvent};
use crate::label_space::LabelSpace;
use crate::shared_state::SharedModuleState;
use crate::{Result, StateError};

/// Everything a stage may read from the process it runs in
///
/// The label space is published once, before the first stage is built.
pub struct PipelineContext {
    robot_id: u32,
    label_space: OnceCell<Arc<LabelSpace>>,
    shared: SharedModuleState,
    timer: Arc<ElapsedTimeRecorder>,
    log_setup: Arc<LogSetup>,
    state: PipelineStateCell,
    events: Option<EventSender>,
}

impl PipelineContext {
    pub fn new(robot_id: u32, timer: Arc<ElapsedTimeRecorder>, log_setup: Arc<LogSetup>) -> Self {
        Self {
            robot_id,
            label_space: OnceCell::new(),
            shared: SharedModuleState::new(),
            timer,
            log_setup,
            state: PipelineStateCell::new(),
            events: None,
        }
    }

    /// Context without log output, for tools and tests
    pub fn detached(robot_id: u32) -> Self {
        Self::new(
            robot_id,
            Arc::new(ElapsedTimeRecorder::new()),
            Arc::new(LogSetup::disabled()),
        )
    }

    /// Forward state changes to `sender`
    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn robot_id(&self) -> u32 {
        self.robot_id
    }

    /// # Errors
    ///
    /// `StateError::LabelSpaceAlreadySet` on a second call.
    pub fn set_label_space(&self, label_space: LabelSpace) -> Result<Arc<LabelSpace>> {
        let total_labels = label_space.total_labels();
        let label_space = Arc::new(label_space);
        self.label_space
            .set(Arc::clone(&label_space))
            .map_err(|_| StateError::LabelSpaceAlreadySet)?;
        info!("[CONTEXT] Label space published: {} labels", total_labels);
        self.emit(StateEvent::LabelSpacePublished { total_labels });
        Ok(label_space)
    }

    pub fn label_space(&self) -> Option<Arc<LabelSpace>> {
        self.label_space.get().cloned()
    }

    /// Total label count, 0 before the label space is published
    pub fn total_labels(&self) -> usize {
        self.label_space
            .get()
            .map(|space| space.total_labels())
            .unwrap_or(0)
    }

    pub fn shared(&self) -> &SharedModuleState {
        &self.shared
    }

    pub fn timer(&self) -> &Arc<ElapsedTimeRecorder> {
        &self.timer
    }

    pub fn log_setup(&self) -> &Arc<LogSetup> {
        &self.log_setup
    }

    pub fn state(&self) -> PipelineState {
        self.state.get()
    }

    /// # Errors
    ///
    /// `StateError::InvalidTransition` if `next` is not reachable from the current state.
    pub fn set_state(&self, next: PipelineState) -> Result<()> {
        match self.state.transition(next) {
            Ok(from) => {
                debug!("[CONTEXT] Pipeline state {} -> {}", from, next);
                self.emit(StateEvent::PipelineStateChanged { from, to: next });
                Ok(())
            }
            Err(current) => Err(StateError::InvalidTransition(format!(
                "{} -> {}",
                current, next
            ))),
        }
    }

    /// Record that a shared queue now exists
    pub fn notify_queue_created(&self, name: &str) {
        self.emit(StateEvent::QueueCreated(name.to_string()));
    }

    fn emit(&self, event: StateEvent) {
        if let Some(sender) = &self.events {
            if sender.send(event).is_err() {
                warn!("[CONTEXT] State event receiver dropped");
            }
        }
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("robot_id", &self.robot_id)
            .field("total_labels", &self.total_labels())
            .field("state", &self.state())
            .field("log_setup", &self.log_setup)
            .finish()
    }
}
