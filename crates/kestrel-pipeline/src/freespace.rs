// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Synchronous freespace query answered by the frontend

use ndarray::{Array2, ShapeBuilder};
use serde::Serialize;
use std::sync::Arc;

use crate::error::FreespaceError;
use crate::module::FrontendModule;

/// Service name the query is registered under
pub const FREESPACE_SERVICE: &str = "query_freespace";

/// Points to test, as three parallel coordinate lists
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FreespaceRequest {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub freespace_distance_m: f64,
}

impl FreespaceRequest {
    pub fn from_points(points: &[[f64; 3]], freespace_distance_m: f64) -> Self {
        Self {
            x: points.iter().map(|p| p[0]).collect(),
            y: points.iter().map(|p| p[1]).collect(),
            z: points.iter().map(|p| p[2]).collect(),
            freespace_distance_m,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FreespaceResponse {
    pub in_freespace: Vec<bool>,
}

/// Validate `request`, pack it into a 3×N matrix and ask `frontend`
///
/// The frontend is not consulted for an empty request.
pub fn handle_freespace_query(
    frontend: &dyn FrontendModule,
    request: &FreespaceRequest,
) -> Result<FreespaceResponse, FreespaceError> {
    let n = request.x.len();
    if request.y.len() != n || request.z.len() != n {
        return Err(FreespaceError::LengthMismatch {
            x: n,
            y: request.y.len(),
            z: request.z.len(),
        });
    }

    if n == 0 {
        return Ok(FreespaceResponse::default());
    }

    // Column-major so each point is a contiguous column
    let points = Array2::from_shape_fn((3, n).f(), |(row, col)| match row {
        0 => request.x[col],
        1 => request.y[col],
        _ => request.z[col],
    });

    let in_freespace = frontend.in_freespace(points.view(), request.freespace_distance_m);
    Ok(FreespaceResponse { in_freespace })
}

/// Handler closure bound to one frontend, as registered with the transport
pub fn freespace_handler(
    frontend: Arc<dyn FrontendModule>,
) -> impl Fn(&FreespaceRequest) -> Result<FreespaceResponse, FreespaceError> + Send + Sync + 'static
{
    move |request: &FreespaceRequest| handle_freespace_query(frontend.as_ref(), request)
}
