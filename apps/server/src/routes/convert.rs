// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversion endpoints.

use crate::error::ApiError;
use crate::services::{convert_to_asset, convert_to_scene, DiskCache};
use crate::types::{ConvertQuery, SceneResponse};
use crate::AppState;
use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::Response,
    Json,
};

pub const CACHE_KEY_HEADER: &str = "x-cache-key";
pub const CACHE_STATUS_HEADER: &str = "x-cache";

fn check_body(state: &AppState, body: &Bytes) -> Result<(), ApiError> {
    if body.is_empty() {
        return Err(ApiError::MissingBody);
    }
    if body.len() > state.config.max_body_bytes() {
        return Err(ApiError::FileTooLarge {
            max_mb: state.config.max_file_size_mb,
        });
    }
    Ok(())
}

pub(crate) fn asset_response(
    bytes: Vec<u8>,
    content_type: &'static str,
    key: &str,
    hit: bool,
) -> Result<Response, ApiError> {
    let key = HeaderValue::from_str(key).map_err(|e| ApiError::Internal(e.to_string()))?;
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(CACHE_KEY_HEADER, key)
        .header(CACHE_STATUS_HEADER, if hit { "HIT" } else { "MISS" })
        .body(Body::from(bytes))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// POST /api/v1/convert - Circuit description to glTF or GLB.
pub async fn convert(
    State(state): State<AppState>,
    Query(query): Query<ConvertQuery>,
    body: Bytes,
) -> Result<Response, ApiError> {
    check_body(&state, &body)?;

    let fingerprint = query.cache_fingerprint();
    let cache_key = DiskCache::generate_key(&[&body[..], &fingerprint[..]]);

    if !query.skip_cache {
        if let Some(bytes) = state.cache.get_bytes(&cache_key).await? {
            tracing::info!(cache_key = %cache_key, "Cache HIT");
            let content_type = crate::services::sniff_content_type(&bytes);
            return asset_response(bytes, content_type, &cache_key, true);
        }
    }

    tracing::info!(cache_key = %cache_key, size = body.len(), "Cache MISS - converting");

    let options = query.conversion_options();
    let converter = state.converter.clone();
    let asset = tokio::task::spawn_blocking(move || convert_to_asset(&converter, &body, &options)).await??;

    // Cache result (background)
    let cache = state.cache.clone();
    let key = cache_key.clone();
    let bytes = asset.bytes.clone();
    tokio::spawn(async move {
        if let Err(e) = cache.set_bytes(&key, &bytes).await {
            tracing::error!(error = %e, "Failed to cache result");
        }
    });

    asset_response(asset.bytes, asset.content_type, &cache_key, false)
}

/// POST /api/v1/scene - Assembled scene as JSON.
pub async fn scene(
    State(state): State<AppState>,
    Query(query): Query<ConvertQuery>,
    body: Bytes,
) -> Result<Json<SceneResponse>, ApiError> {
    check_body(&state, &body)?;

    let options = query.conversion_options();
    let converter = state.converter.clone();
    let response = tokio::task::spawn_blocking(move || convert_to_scene(&converter, &body, &options)).await??;

    tracing::info!(
        boxes = response.stats.total_boxes,
        triangles = response.stats.total_triangles,
        "Scene assembled"
    );
    Ok(Json(response))
}
