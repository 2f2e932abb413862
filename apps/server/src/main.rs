// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! PCB3D Server - circuit board descriptions to glTF/GLB over HTTP.
//!
//! # Endpoints
//!
//! - `GET /` - API information
//! - `GET /api/v1/health` - Health check
//! - `POST /api/v1/convert` - Circuit JSON body to GLB or glTF (`?format=glb|gltf`)
//! - `POST /api/v1/scene` - Circuit JSON body to the assembled scene (JSON)
//! - `GET /api/v1/cache/{key}` - Retrieve a converted asset

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use pcb3d_processing::{CacheConfig, Converter};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

mod config;
mod error;
mod routes;
mod services;
mod types;

use config::Config;
use services::{CommandRasterizer, DiskCache, ModelFetcher};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<DiskCache>,
    pub config: Arc<Config>,
    pub converter: Converter,
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any)
}

fn build_converter(config: &Config) -> Converter {
    let fetcher = Arc::new(ModelFetcher::new(
        tokio::runtime::Handle::current(),
        config.model_base_dir.clone(),
    ));
    let caches = CacheConfig {
        mesh_capacity: config.mesh_cache_capacity,
        label_capacity: config.label_cache_capacity,
    };
    let converter = Converter::new(fetcher, caches);
    match &config.rasterizer_bin {
        Some(program) => converter.with_rasterizer(Arc::new(CommandRasterizer::new(program.clone()))),
        None => {
            tracing::warn!("RASTERIZER_BIN not set, board and label textures disabled");
            converter
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug,pcb3d_server=debug".into()),
        )
        .pretty()
        .init();

    let config = Config::from_env();

    tracing::info!(
        port = config.port,
        cache_dir = %config.cache_dir,
        max_file_size_mb = config.max_file_size_mb,
        worker_threads = config.worker_threads,
        mesh_cache_capacity = config.mesh_cache_capacity,
        rasterizer = ?config.rasterizer_bin,
        "Starting PCB3D Server"
    );

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads)
        .build_global()
        .context("Failed to initialize rayon thread pool")?;

    let cache = Arc::new(DiskCache::new(&config.cache_dir).await);

    let state = AppState {
        cache,
        converter: build_converter(&config),
        config: Arc::new(config.clone()),
    };

    let app = Router::new()
        .route("/", get(routes::health::info))
        .route("/api/v1/health", get(routes::health::check))
        .route("/api/v1/convert", post(routes::convert::convert))
        .route("/api/v1/scene", post(routes::convert::scene))
        .route("/api/v1/cache/:key", get(routes::cache::get_cached))
        .layer(DefaultBodyLimit::max(config.max_body_bytes()))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
