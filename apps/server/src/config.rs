// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Server configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on.
    pub port: u16,
    /// Directory for cache storage.
    pub cache_dir: String,
    /// Maximum request body size in MB.
    pub max_file_size_mb: usize,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Number of worker threads for parallel processing.
    pub worker_threads: usize,
    /// Parsed models kept in memory.
    pub mesh_cache_capacity: usize,
    /// Rendered label images kept in memory.
    pub label_cache_capacity: usize,
    /// Root for model references that are not URLs.
    pub model_base_dir: Option<PathBuf>,
    /// External SVG to PNG converter; board and label textures are skipped without one.
    pub rasterizer_bin: Option<String>,
    /// Allowed CORS origins (comma-separated, or "*" for all in development).
    pub cors_origins: Vec<String>,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            port: env_or("PORT", 8080),
            cache_dir: env_opt("CACHE_DIR").unwrap_or_else(|| {
                if std::path::Path::new("/.dockerenv").exists() {
                    "/app/cache".into()
                } else {
                    std::env::current_dir()
                        .ok()
                        .and_then(|dir| dir.join(".cache").to_str().map(|s| s.to_string()))
                        .unwrap_or_else(|| "./.cache".into())
                }
            }),
            max_file_size_mb: env_or("MAX_FILE_SIZE_MB", 50),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 120),
            worker_threads: env_or("WORKER_THREADS", num_cpus::get()),
            mesh_cache_capacity: env_or("MESH_CACHE_CAPACITY", 256),
            label_cache_capacity: env_or("LABEL_CACHE_CAPACITY", 1024),
            model_base_dir: env_opt("MODEL_BASE_DIR").map(PathBuf::from),
            rasterizer_bin: env_opt("RASTERIZER_BIN"),
            cors_origins: env_opt("CORS_ORIGINS")
                .unwrap_or_else(|| {
                    "http://localhost:3000,http://localhost:5173,http://127.0.0.1:3000,http://127.0.0.1:5173".into()
                })
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
