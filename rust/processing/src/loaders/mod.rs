// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh loaders
//!
//! Every external model goes through the same steps: fetch the bytes,
//! parse with the format's reader, apply the format's default transform
//! (or the caller's override), then cache the result under
//! `"{reference}:{transform}"`. Footprint models are generated instead of
//! fetched.

pub mod footprint;
pub mod gltf;
pub mod obj;
pub mod stl;

use crate::cache::MeshCache;
use crate::error::Result;
use crate::glb::parse_glb;
use pcb3d_core::CadComponent;
use pcb3d_geometry::{CoordinateTransform, Mesh, ModelFormat};
use serde::Serialize;
use std::sync::Arc;

pub use footprint::{load_footprint, parse_package, Package};
pub use gltf::parse_gltf;
pub use obj::parse_obj;
pub use stl::parse_stl;

/// Byte source for model references (URLs or paths)
pub trait Fetcher: Send + Sync {
    fn fetch(&self, reference: &str) -> Result<Vec<u8>>;

    /// Location of `relative` as seen from the document at `base`
    fn resolve(&self, base: &str, relative: &str) -> String {
        resolve_relative(base, relative)
    }
}

/// Join a relative reference onto the directory of `base`.
///
/// Absolute URLs, rooted paths and data URIs are returned as given.
pub fn resolve_relative(base: &str, relative: &str) -> String {
    if relative.contains("://") || relative.starts_with('/') || relative.starts_with("data:") {
        return relative.to_string();
    }
    match base.rfind('/') {
        Some(slash) => format!("{}{}", &base[..=slash], relative),
        None => relative.to_string(),
    }
}

/// A model reference together with the reader that understands it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSource {
    pub format: ModelFormat,
    /// URL or path, or the footprint descriptor for generated models
    pub reference: String,
}

impl ModelSource {
    pub fn new(format: ModelFormat, reference: impl Into<String>) -> Self {
        Self {
            format,
            reference: reference.into(),
        }
    }

    /// Pick the model for a CAD component: STL, OBJ, GLTF, then GLB. The
    /// footprint descriptor is used only when no file is referenced.
    pub fn from_cad(cad: &CadComponent) -> Option<Self> {
        let urls = [
            (ModelFormat::Stl, &cad.model_stl_url),
            (ModelFormat::Obj, &cad.model_obj_url),
            (ModelFormat::Gltf, &cad.model_gltf_url),
            (ModelFormat::Glb, &cad.model_glb_url),
        ];
        urls.into_iter()
            .find_map(|(format, url)| url.as_deref().map(|u| Self::new(format, u)))
            .or_else(|| {
                cad.footprinter_string
                    .as_deref()
                    .map(|d| Self::new(ModelFormat::Footprint, d))
            })
    }
}

/// Cache slot for a parsed model. The format is part of the key, so a
/// footprint descriptor never shares a slot with a file of the same name.
pub fn mesh_cache_key(format: ModelFormat, reference: &str, transform: &CoordinateTransform) -> String {
    format!("{}:{}:{}", format.as_str(), reference, transform.key())
}

/// Fetches, parses and caches component models
#[derive(Clone)]
pub struct ModelLoader {
    fetcher: Arc<dyn Fetcher>,
    cache: Arc<MeshCache>,
}

impl ModelLoader {
    pub fn new(fetcher: Arc<dyn Fetcher>, cache: Arc<MeshCache>) -> Self {
        Self { fetcher, cache }
    }

    pub fn cache(&self) -> &MeshCache {
        &self.cache
    }

    /// Load `source`, transformed by `transform` or the format default.
    ///
    /// Repeated calls with the same reference and transform share one
    /// `Arc<Mesh>` and never fetch twice.
    pub fn load(&self, source: &ModelSource, transform: Option<&CoordinateTransform>) -> Result<Arc<Mesh>> {
        let transform = transform
            .copied()
            .unwrap_or_else(|| CoordinateTransform::for_format(source.format));
        let key = mesh_cache_key(source.format, &source.reference, &transform);

        self.cache.get_or_try_insert_with(&key, || {
            tracing::debug!(
                reference = %source.reference,
                format = source.format.as_str(),
                "loading model"
            );
            let mesh = self.load_uncached(source, &transform)?;
            tracing::debug!(
                reference = %source.reference,
                triangles = mesh.triangle_count(),
                "model loaded"
            );
            Ok(Arc::new(mesh))
        })
    }

    fn load_uncached(&self, source: &ModelSource, transform: &CoordinateTransform) -> Result<Mesh> {
        let reference = source.reference.as_str();
        match source.format {
            ModelFormat::Footprint => load_footprint(reference, transform),
            ModelFormat::Stl => parse_stl(&self.fetcher.fetch(reference)?, transform),
            ModelFormat::Obj => parse_obj(&self.fetcher.fetch(reference)?, transform),
            ModelFormat::Glb => parse_glb(&self.fetcher.fetch(reference)?, Some(transform)),
            ModelFormat::Gltf => {
                let document = self.fetcher.fetch(reference)?;
                parse_gltf(&document, reference, self.fetcher.as_ref(), transform)
            }
        }
    }
}
