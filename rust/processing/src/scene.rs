// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene model produced by the assembler and consumed by the exporter.
//!
//! Serializes to JSON for inspection; meshes and images are summarized
//! rather than dumped.

use crate::color::to_css;
use crate::loaders::ModelSource;
use crate::texture::{BoardTextures, PngImage};
use pcb3d_core::Point3D;
use pcb3d_geometry::{Color, Mesh};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::sync::Arc;

/// A placed element of the scene: board, component model or placeholder
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Box3D {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub center: Point3D,
    pub size: Point3D,
    /// XYZ Euler angles in radians
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Point3D>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_mesh")]
    pub mesh: Option<Arc<Mesh>>,
    /// Unloaded model reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelSource>,
    /// Flat color; also the fallback for meshes without materials
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_color")]
    pub color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_textures")]
    pub textures: Option<BoardTextures>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_color")]
    pub label_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_image")]
    pub label_texture: Option<PngImage>,
}

impl Box3D {
    pub fn new(center: Point3D, size: Point3D) -> Self {
        Self {
            center,
            size,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    pub position: Point3D,
    pub target: Point3D,
    pub up: Point3D,
    /// Vertical field of view in degrees
    pub fov: f64,
    pub near: f64,
    pub far: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Light {
    Ambient {
        #[serde(serialize_with = "serialize_plain_color")]
        color: Color,
        intensity: f64,
    },
    Directional {
        #[serde(serialize_with = "serialize_plain_color")]
        color: Color,
        intensity: f64,
        direction: Point3D,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub boxes: Vec<Box3D>,
    pub camera: Camera,
    pub lights: Vec<Light>,
}

impl Scene {
    /// Total triangles across every box mesh
    pub fn triangle_count(&self) -> usize {
        self.boxes
            .iter()
            .filter_map(|b| b.mesh.as_ref())
            .map(|m| m.triangle_count())
            .sum()
    }
}

fn serialize_plain_color<S: Serializer>(color: &Color, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&to_css(color))
}

fn serialize_color<S: Serializer>(color: &Option<Color>, s: S) -> Result<S::Ok, S::Error> {
    match color {
        Some(c) => serialize_plain_color(c, s),
        None => s.serialize_none(),
    }
}

fn serialize_mesh<S: Serializer>(mesh: &Option<Arc<Mesh>>, s: S) -> Result<S::Ok, S::Error> {
    let Some(mesh) = mesh else {
        return s.serialize_none();
    };
    let bounds = mesh.bounding_box();
    let mut state = s.serialize_struct("MeshSummary", 4)?;
    state.serialize_field("triangles", &mesh.triangle_count())?;
    state.serialize_field("materials", &mesh.materials().len())?;
    state.serialize_field("min", &[bounds.min.x, bounds.min.y, bounds.min.z])?;
    state.serialize_field("max", &[bounds.max.x, bounds.max.y, bounds.max.z])?;
    state.end()
}

#[derive(Serialize)]
struct ImageSummary {
    width: u32,
    height: u32,
    bytes: usize,
}

impl From<&PngImage> for ImageSummary {
    fn from(image: &PngImage) -> Self {
        Self {
            width: image.width,
            height: image.height,
            bytes: image.data.len(),
        }
    }
}

fn serialize_image<S: Serializer>(image: &Option<PngImage>, s: S) -> Result<S::Ok, S::Error> {
    match image {
        Some(image) => ImageSummary::from(image).serialize(s),
        None => s.serialize_none(),
    }
}

fn serialize_textures<S: Serializer>(textures: &Option<BoardTextures>, s: S) -> Result<S::Ok, S::Error> {
    let Some(textures) = textures else {
        return s.serialize_none();
    };
    let mut state = s.serialize_struct("BoardTextures", 2)?;
    state.serialize_field("top", &ImageSummary::from(&textures.top))?;
    state.serialize_field("bottom", &ImageSummary::from(&textures.bottom))?;
    state.end()
}
