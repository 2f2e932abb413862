// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cache retrieval endpoint.

use crate::error::ApiError;
use crate::routes::convert::asset_response;
use crate::services::sniff_content_type;
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::Response,
};

/// GET /api/v1/cache/{key} - Retrieve a converted asset.
pub async fn get_cached(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    tracing::debug!(key = %key, "Cache lookup");

    match state.cache.get_bytes(&key).await? {
        Some(bytes) => {
            tracing::info!(key = %key, "Cache HIT");
            let content_type = sniff_content_type(&bytes);
            asset_response(bytes, content_type, &key, true)
        }
        None => {
            tracing::debug!(key = %key, "Cache MISS");
            Err(ApiError::NotFound(format!("Cache key not found: {}", key)))
        }
    }
}
