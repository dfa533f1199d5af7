// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Pipeline lifecycle state with lock-free reads

use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};

/// Pipeline lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum PipelineState {
    Unavailable = 0,
    Initializing = 1,
    Ready = 2,
    Running = 3,
    Stopping = 4,
    Stopped = 5,
    Error = 6,
}

impl PipelineState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => PipelineState::Initializing,
            2 => PipelineState::Ready,
            3 => PipelineState::Running,
            4 => PipelineState::Stopping,
            5 => PipelineState::Stopped,
            6 => PipelineState::Error,
            _ => PipelineState::Unavailable,
        }
    }

    /// Whether `self -> next` is a legal lifecycle step
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Unavailable, Initializing)
                | (Initializing, Ready)
                | (Ready, Running)
                | (Ready, Stopping)
                | (Running, Stopping)
                | (Stopping, Stopped)
                | (Error, Stopping)
                | (Error, Stopped)
                | (Unavailable | Initializing | Ready | Running | Stopping, Error)
        )
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineState::Unavailable => "unavailable",
            PipelineState::Initializing => "initializing",
            PipelineState::Ready => "ready",
            PipelineState::Running => "running",
            PipelineState::Stopping => "stopping",
            PipelineState::Stopped => "stopped",
            PipelineState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Atomic holder for [`PipelineState`]
#[derive(Debug)]
pub struct PipelineStateCell {
    state: AtomicU8,
}

impl PipelineStateCell {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(PipelineState::Unavailable as u8),
        }
    }

    pub fn get(&self) -> PipelineState {
        PipelineState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move to `next` if legal from the current state
    ///
    /// Returns the previous state, or `Err(current)` when the step is illegal.
    pub fn transition(&self, next: PipelineState) -> Result<PipelineState, PipelineState> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let from = PipelineState::from_u8(current);
            if !from.can_transition_to(next) {
                return Err(from);
            }
            match self.state.compare_exchange_weak(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(from),
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for PipelineStateCell {
    fn default() -> Self {
        Self::new()
    }
}
