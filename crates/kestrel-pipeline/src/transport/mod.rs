// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Message-bus contract
//!
//! The pipeline never talks to a concrete bus. It registers services and
//! subscriptions through [`Transport`] and drives event delivery with
//! [`Transport::spin_once`] / [`Transport::spin`]. Every registration returns
//! a [`Registration`] that withdraws it when dropped.

pub mod local;

pub use local::LocalTransport;

use std::sync::Arc;

use crate::bow::BowQueries;
use crate::error::{FreespaceError, TransportError};
use crate::freespace::{FreespaceRequest, FreespaceResponse};

/// Topic whose publisher count signals that simulated time is running
pub const CLOCK_TOPIC: &str = "/clock";

/// Service that ends a `SERVICE`-mode run
pub const SHUTDOWN_SERVICE: &str = "shutdown";

pub type FreespaceHandler =
    Arc<dyn Fn(&FreespaceRequest) -> Result<FreespaceResponse, FreespaceError> + Send + Sync>;

pub type BowHandler = Arc<dyn Fn(&BowQueries) + Send + Sync>;

pub type ShutdownHandler = Arc<dyn Fn() + Send + Sync>;

/// Handle for a live subscription or service
///
/// Dropping it withdraws the registration.
pub struct Registration {
    name: String,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Registration {
    pub fn new<F>(name: impl Into<String>, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            name: name.into(),
            release: Some(Box::new(release)),
        }
    }

    /// Registration with nothing to withdraw
    pub fn detached(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            release: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration").field("name", &self.name).finish()
    }
}

/// Message bus used by the pipeline and the exit-mode scheduler
pub trait Transport: Send + Sync {
    /// False once the transport has been asked to shut down
    fn ok(&self) -> bool;

    /// Deliver every pending message and service call, then return
    fn spin_once(&self);

    /// Deliver events until [`Transport::ok`] turns false
    fn spin(&self);

    /// Ask the transport to stop; wakes a blocked [`Transport::spin`]
    fn shutdown(&self);

    /// Number of publishers currently advertising `topic`
    fn num_publishers(&self, topic: &str) -> usize;

    /// Subscribe to [`CLOCK_TOPIC`] so its publishers are tracked
    fn subscribe_clock(&self) -> Result<Registration, TransportError>;

    fn advertise_freespace_service(
        &self,
        name: &str,
        handler: FreespaceHandler,
    ) -> Result<Registration, TransportError>;

    fn subscribe_bow_queries(
        &self,
        topic: &str,
        queue_size: usize,
        handler: BowHandler,
    ) -> Result<Registration, TransportError>;

    fn advertise_shutdown_service(
        &self,
        name: &str,
        handler: ShutdownHandler,
    ) -> Result<Registration, TransportError>;
}
