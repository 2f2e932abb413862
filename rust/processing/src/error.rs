// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading models or assembling a scene.
///
/// Cloneable so that every waiter on a shared cache slot sees the same failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid GLB: {0}")]
    InvalidGlb(String),

    #[error("Invalid JSON: {0}")]
    Json(String),

    #[error("Failed to fetch {reference}: {message}")]
    Fetch { reference: String, message: String },

    #[error("STL parse error: {0}")]
    Stl(String),

    #[error("OBJ parse error: {0}")]
    Obj(String),

    #[error("Footprint model error: {0}")]
    Footprint(String),

    #[error("Rasterization failed: {0}")]
    Raster(String),

    #[error(transparent)]
    Geometry(#[from] pcb3d_geometry::Error),

    #[error("Circuit description error: {0}")]
    Core(String),
}

impl Error {
    pub fn glb(msg: impl Into<String>) -> Self {
        Error::InvalidGlb(msg.into())
    }

    pub fn fetch(reference: impl Into<String>, message: impl ToString) -> Self {
        Error::Fetch {
            reference: reference.into(),
            message: message.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}

impl From<pcb3d_core::Error> for Error {
    fn from(err: pcb3d_core::Error) -> Self {
        Error::Core(err.to_string())
    }
}
