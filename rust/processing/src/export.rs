// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene to glTF / GLB export
//!
//! Every box becomes a node carrying its center and orientation. Meshes are
//! written one primitive per color; boxes without a mesh share a unit cube
//! scaled by a child node. Board textures and label badges are textured
//! quads parented to their box.

use crate::assembler::{Converter, SceneOptions};
use crate::error::Result;
use crate::glb::reader::DEFAULT_MATERIAL_COLOR;
use crate::glb::schema::{self, GltfMaterial, Node, PbrMetallicRoughness, PerspectiveCamera, Primitive, TextureInfo};
use crate::glb::GlbBuilder;
use crate::scene::{Box3D, Camera, Scene};
use crate::texture::PngImage;
use nalgebra::{UnitQuaternion, Vector3};
use pcb3d_core::{CircuitJson, Point3D};
use pcb3d_geometry::{centered_box, Color, CoordinateTransform, Mesh, Point3, Triangle};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Gap between a board face and its texture quad
const SURFACE_OFFSET: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// GLB container instead of text glTF
    pub binary: bool,
    /// Store images in the binary buffer rather than as data URIs
    pub embed_images: bool,
    /// Write index buffers for every mesh primitive
    pub force_indices: bool,
    /// CSS color recorded in `asset.extras.backgroundColor`
    pub background_color: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            binary: true,
            embed_images: true,
            force_indices: true,
            background_color: None,
        }
    }
}

/// Finished export
#[derive(Debug, Clone)]
pub enum ExportOutput {
    Glb(Vec<u8>),
    Gltf(serde_json::Value),
}

impl ExportOutput {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportOutput::Glb(_) => "model/gltf-binary",
            ExportOutput::Gltf(_) => "model/gltf+json",
        }
    }

    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            ExportOutput::Glb(bytes) => Ok(bytes),
            ExportOutput::Gltf(value) => Ok(serde_json::to_vec(&value)?),
        }
    }
}

/// Flat-color materials, deduplicated by color
#[derive(Default)]
struct MaterialTable {
    by_color: FxHashMap<String, usize>,
}

impl MaterialTable {
    fn get(&mut self, builder: &mut GlbBuilder, color: Color, name: Option<&str>) -> usize {
        let key = color.key();
        if let Some(&index) = self.by_color.get(&key) {
            return index;
        }
        let index = builder.add_material(GltfMaterial {
            name: Some(name.map_or_else(|| format!("color_{}", self.by_color.len()), str::to_string)),
            pbr_metallic_roughness: Some(PbrMetallicRoughness {
                base_color_factor: color.to_unit_rgba(),
                base_color_texture: None,
                metallic_factor: 0.0,
                roughness_factor: 0.8,
            }),
            alpha_mode: (color.a < 1.0).then(|| "BLEND".to_string()),
            double_sided: false,
        });
        self.by_color.insert(key, index);
        index
    }
}

/// XYZ Euler angles (radians) to a glTF `[x, y, z, w]` quaternion
pub fn euler_to_quaternion(rotation: &Point3D) -> [f32; 4] {
    let q = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), rotation.x)
        * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), rotation.y)
        * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), rotation.z);
    let c = q.quaternion().coords;
    [c[0] as f32, c[1] as f32, c[2] as f32, c[3] as f32]
}

fn vec3(p: &Point3D) -> [f32; 3] {
    [p.x as f32, p.y as f32, p.z as f32]
}

/// One primitive per resolved triangle color, in first-seen order
fn mesh_primitives(
    builder: &mut GlbBuilder,
    materials: &mut MaterialTable,
    mesh: &Mesh,
    fallback: Color,
    indexed: bool,
) -> Vec<Primitive> {
    let mut groups: Vec<(Color, Option<&str>, Vec<&Triangle>)> = Vec::new();
    let mut slots: FxHashMap<String, usize> = FxHashMap::default();

    for t in mesh.triangles() {
        let material = t.material_index.and_then(|i| mesh.materials().get(i));
        let color = material.map(|m| m.color).or(t.color).unwrap_or(fallback);
        let slot = *slots.entry(color.key()).or_insert_with(|| {
            groups.push((color, material.map(|m| m.name.as_str()), Vec::new()));
            groups.len() - 1
        });
        groups[slot].2.push(t);
    }

    groups
        .into_iter()
        .map(|(color, name, triangles)| {
            let mut primitive = builder.add_triangles(triangles, false, indexed);
            primitive.material = Some(materials.get(builder, color, name));
            primitive
        })
        .collect()
}

/// Horizontal textured quad at height `y`, facing up or down
fn textured_quad(builder: &mut GlbBuilder, width: f64, depth: f64, y: f64, facing_up: bool, texture: usize) -> usize {
    let (hw, hd, y) = ((width / 2.0) as f32, (depth / 2.0) as f32, y as f32);
    let positions = [[-hw, y, -hd], [-hw, y, hd], [hw, y, hd], [hw, y, -hd]];
    let normal = if facing_up { [0.0, 1.0, 0.0] } else { [0.0, -1.0, 0.0] };
    let uvs = [[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]];
    let indices: [u32; 6] = if facing_up { [0, 1, 2, 0, 2, 3] } else { [0, 2, 1, 0, 3, 2] };

    let mut attributes = BTreeMap::new();
    attributes.insert("POSITION".to_string(), builder.add_positions(&positions));
    attributes.insert("NORMAL".to_string(), builder.add_vec3(&[normal; 4]));
    attributes.insert("TEXCOORD_0".to_string(), builder.add_vec2(&uvs));
    let indices = builder.add_indices(&indices);

    let material = builder.add_material(GltfMaterial {
        name: None,
        pbr_metallic_roughness: Some(PbrMetallicRoughness {
            base_color_factor: [1.0; 4],
            base_color_texture: Some(TextureInfo { index: texture, tex_coord: 0 }),
            metallic_factor: 0.0,
            roughness_factor: 1.0,
        }),
        alpha_mode: Some("BLEND".to_string()),
        double_sided: false,
    });

    builder.add_mesh(
        None,
        vec![Primitive {
            attributes,
            indices: Some(indices),
            material: Some(material),
            mode: schema::MODE_TRIANGLES,
        }],
    )
}

/// Label badge footprint on top of a box, keeping the image aspect ratio
fn label_extent(size: &Point3D, image: &PngImage) -> (f64, f64) {
    let aspect = image.aspect();
    let mut width = size.x * 0.9;
    let mut depth = width * aspect;
    let max_depth = size.z * 0.9;
    if depth > max_depth && aspect > 0.0 {
        depth = max_depth;
        width = depth / aspect;
    }
    (width, depth)
}

struct SceneWriter<'a> {
    builder: GlbBuilder,
    materials: MaterialTable,
    cube: Option<Primitive>,
    options: &'a ExportOptions,
}

impl SceneWriter<'_> {
    fn texture(&mut self, image: &PngImage) -> usize {
        self.builder.add_png_texture(&image.data, self.options.embed_images)
    }

    fn cube_mesh(&mut self, color: Color) -> usize {
        let base = match &self.cube {
            Some(primitive) => primitive.clone(),
            None => {
                let unit = centered_box(Point3::origin(), Vector3::new(1.0, 1.0, 1.0));
                let primitive = self.builder.add_triangles(unit.triangles(), false, self.options.force_indices);
                self.cube = Some(primitive.clone());
                primitive
            }
        };
        let primitive = Primitive {
            material: Some(self.materials.get(&mut self.builder, color, None)),
            ..base
        };
        self.builder.add_mesh(None, vec![primitive])
    }

    fn write_box(&mut self, index: usize, b: &Box3D) {
        let mut children = Vec::new();
        let color = b.color.unwrap_or(DEFAULT_MATERIAL_COLOR);

        let mesh = match &b.mesh {
            Some(mesh) if !mesh.is_empty() => {
                let primitives = mesh_primitives(
                    &mut self.builder,
                    &mut self.materials,
                    mesh,
                    color,
                    self.options.force_indices,
                );
                Some(self.builder.add_mesh(b.name.clone(), primitives))
            }
            _ => {
                let cube = self.cube_mesh(color);
                children.push(self.builder.add_node(Node {
                    mesh: Some(cube),
                    scale: Some(vec3(&b.size)),
                    ..Default::default()
                }));
                None
            }
        };

        if let Some(textures) = &b.textures {
            let offset = b.size.y / 2.0 + SURFACE_OFFSET;
            let top = self.texture(&textures.top);
            let bottom = self.texture(&textures.bottom);
            for (y, up, texture) in [(offset, true, top), (-offset, false, bottom)] {
                let quad = textured_quad(&mut self.builder, b.size.x, b.size.z, y, up, texture);
                children.push(self.builder.add_node(Node {
                    mesh: Some(quad),
                    ..Default::default()
                }));
            }
        }

        if let Some(image) = &b.label_texture {
            let (width, depth) = label_extent(&b.size, image);
            let texture = self.texture(image);
            let quad = textured_quad(
                &mut self.builder,
                width,
                depth,
                b.size.y / 2.0 + SURFACE_OFFSET,
                true,
                texture,
            );
            children.push(self.builder.add_node(Node {
                name: b.label.clone(),
                mesh: Some(quad),
                ..Default::default()
            }));
        }

        self.builder.add_root_node(Node {
            name: Some(b.name.clone().unwrap_or_else(|| format!("box_{index}"))),
            children,
            mesh,
            translation: Some(vec3(&b.center)),
            rotation: b.rotation.as_ref().map(euler_to_quaternion),
            ..Default::default()
        });
    }

    fn write_camera(&mut self, camera: &Camera) {
        let index = self.builder.add_camera(schema::Camera {
            camera_type: "perspective".to_string(),
            perspective: Some(PerspectiveCamera {
                aspect_ratio: None,
                yfov: camera.fov.to_radians() as f32,
                znear: camera.near as f32,
                zfar: Some(camera.far as f32),
            }),
        });

        let eye = Vector3::new(camera.position.x, camera.position.y, camera.position.z);
        let target = Vector3::new(camera.target.x, camera.target.y, camera.target.z);
        let up = Vector3::new(camera.up.x, camera.up.y, camera.up.z);
        // glTF cameras look down their local -Z
        let rotation = UnitQuaternion::face_towards(&(eye - target), &up);
        let c = rotation.quaternion().coords;

        self.builder.add_root_node(Node {
            name: Some("camera".to_string()),
            camera: Some(index),
            translation: Some(vec3(&camera.position)),
            rotation: Some([c[0] as f32, c[1] as f32, c[2] as f32, c[3] as f32]),
            ..Default::default()
        });
    }
}

/// Write a scene as GLB or text glTF
pub fn export_scene(scene: &Scene, options: &ExportOptions) -> Result<ExportOutput> {
    let mut writer = SceneWriter {
        builder: GlbBuilder::new(),
        materials: MaterialTable::default(),
        cube: None,
        options,
    };
    if let Some(background) = &options.background_color {
        writer
            .builder
            .set_extras(serde_json::json!({ "backgroundColor": background }));
    }

    for (index, b) in scene.boxes.iter().enumerate() {
        writer.write_box(index, b);
    }
    writer.write_camera(&scene.camera);

    tracing::debug!(
        boxes = scene.boxes.len(),
        triangles = scene.triangle_count(),
        binary = options.binary,
        "exporting scene"
    );

    if options.binary {
        Ok(ExportOutput::Glb(writer.builder.into_glb()?))
    } else {
        Ok(ExportOutput::Gltf(serde_json::to_value(writer.builder.into_gltf())?))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Gltf,
    Glb,
}

/// End-to-end options for [`Converter::convert_circuit_to_gltf`]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    pub format: OutputFormat,
    pub embed_images: bool,
    pub force_indices: bool,
    pub board_texture_resolution: u32,
    pub render_board_textures: bool,
    pub render_copper_pours_as_3d: bool,
    pub show_bounding_boxes: bool,
    pub include_models: bool,
    pub background_color: Option<String>,
    pub coordinate_transform: Option<CoordinateTransform>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Gltf,
            embed_images: true,
            force_indices: true,
            board_texture_resolution: 1024,
            render_board_textures: true,
            render_copper_pours_as_3d: false,
            show_bounding_boxes: false,
            include_models: true,
            background_color: None,
            coordinate_transform: None,
        }
    }
}

impl ConversionOptions {
    pub fn scene_options(&self) -> SceneOptions {
        SceneOptions {
            render_board_textures: self.render_board_textures,
            texture_resolution: self.board_texture_resolution,
            render_copper_pours_as_3d: self.render_copper_pours_as_3d,
            show_bounding_boxes: self.show_bounding_boxes,
            include_models: self.include_models,
            coordinate_transform: self.coordinate_transform,
            ..SceneOptions::default()
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            binary: self.format == OutputFormat::Glb,
            embed_images: self.embed_images,
            force_indices: self.force_indices,
            background_color: self.background_color.clone(),
        }
    }
}

impl Converter {
    /// Assemble the scene for `circuit` and export it in one step
    pub fn convert_circuit_to_gltf(&self, circuit: &CircuitJson, options: &ConversionOptions) -> Result<ExportOutput> {
        let scene = self.convert_circuit_to_scene(circuit, &options.scene_options())?;
        export_scene(&scene, &options.export_options())
    }
}
