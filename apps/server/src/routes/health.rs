// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Health check endpoint.

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    /// Parsed models currently held in memory.
    pub cached_models: usize,
    pub rasterizer: bool,
}

/// API information response.
#[derive(Debug, Serialize)]
pub struct ApiInfoResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoints: Vec<EndpointInfo>,
}

/// Endpoint information.
#[derive(Debug, Serialize)]
pub struct EndpointInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

/// GET /api/v1/health - Health check endpoint.
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: "pcb3d-server",
        cached_models: state.converter.loader().cache().len(),
        rasterizer: state.converter.rasterizer().is_some(),
    })
}

/// GET / - API information endpoint.
pub async fn info() -> Json<ApiInfoResponse> {
    Json(ApiInfoResponse {
        service: "pcb3d-server",
        version: env!("CARGO_PKG_VERSION"),
        description: "Circuit board description to glTF/GLB conversion",
        endpoints: vec![
            EndpointInfo {
                method: "GET",
                path: "/api/v1/health",
                description: "Health check endpoint",
            },
            EndpointInfo {
                method: "POST",
                path: "/api/v1/convert",
                description: "Convert a circuit description (?format=glb|gltf)",
            },
            EndpointInfo {
                method: "POST",
                path: "/api/v1/scene",
                description: "Assembled scene as JSON",
            },
            EndpointInfo {
                method: "GET",
                path: "/api/v1/cache/{key}",
                description: "Retrieve a converted asset",
            },
        ],
    })
}
