// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Pipeline error types

use kestrel_config::ConfigError;
use kestrel_state_manager::StateError;
use thiserror::Error;

/// Fatal errors raised while building or driving the pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage the pipeline cannot run without failed to construct
    #[error("Required stage '{stage}' missing: {reason}")]
    RequiredStageMissing { stage: &'static str, reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Returned by a [`crate::StageFactory`] that cannot build what was asked
#[derive(Debug, Clone, Error)]
pub enum StageBuildError {
    #[error("{stage} is not available: {reason}")]
    Unavailable { stage: String, reason: String },

    #[error("{stage} rejected its configuration: {reason}")]
    InvalidConfig { stage: String, reason: String },
}

impl StageBuildError {
    pub fn unavailable(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        StageBuildError::Unavailable {
            stage: stage.into(),
            reason: reason.into(),
        }
    }
}

/// Malformed freespace request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FreespaceError {
    #[error("Coordinate lengths differ: x={x}, y={y}, z={z}")]
    LengthMismatch { x: usize, y: usize, z: usize },

    #[error("No frontend available to answer freespace queries")]
    FrontendUnavailable,
}

/// Errors from the message bus
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Name already registered: {0}")]
    AlreadyRegistered(String),

    #[error("No handler registered for: {0}")]
    NotFound(String),

    #[error("Transport is shut down")]
    Shutdown,

    #[error("Request failed: {0}")]
    RequestFailed(String),
}

impl From<FreespaceError> for TransportError {
    fn from(err: FreespaceError) -> Self {
        TransportError::RequestFailed(err.to_string())
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
