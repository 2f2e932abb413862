// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GLB encode path.

use super::reader::DEFAULT_MATERIAL_COLOR;
use super::schema::{
    self, Accessor, Asset, Buffer, BufferView, Camera, Gltf, GltfMaterial, Image, Node, Primitive,
    Sampler, Scene, Texture, TARGET_ARRAY_BUFFER, TARGET_ELEMENT_ARRAY_BUFFER,
};
use super::{align4, encode_data_uri, CHUNK_BIN, CHUNK_HEADER_LEN, CHUNK_JSON, GLB_HEADER_LEN, GLB_MAGIC, GLB_VERSION};
use crate::error::{Error, Result};
use pcb3d_geometry::{Mesh, Triangle};
use std::collections::BTreeMap;

const GENERATOR: &str = concat!("pcb3d ", env!("CARGO_PKG_VERSION"));

/// Serialize a document and its binary payload into a GLB container.
///
/// The JSON chunk is padded with spaces and the BIN chunk with zeros, both
/// to four bytes. An empty payload omits the BIN chunk.
pub fn write_glb(gltf: &Gltf, bin: &[u8]) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(gltf)?;
    let json_len = align4(json.len());
    let bin_len = align4(bin.len());

    let mut total = GLB_HEADER_LEN + CHUNK_HEADER_LEN + json_len;
    if !bin.is_empty() {
        total += CHUNK_HEADER_LEN + bin_len;
    }
    let total_u32 = u32::try_from(total).map_err(|_| Error::glb("GLB output exceeds 4 GiB"))?;

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&total_u32.to_le_bytes());

    out.extend_from_slice(&(json_len as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json);
    out.resize(out.len() + json_len - json.len(), b' ');

    if !bin.is_empty() {
        out.extend_from_slice(&(bin_len as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(bin);
        out.resize(out.len() + bin_len - bin.len(), 0);
    }

    debug_assert_eq!(out.len(), total);
    Ok(out)
}

/// Incremental glTF document builder with a single binary buffer.
pub struct GlbBuilder {
    gltf: Gltf,
    bin: Vec<u8>,
    roots: Vec<usize>,
    sampler: Option<usize>,
}

impl Default for GlbBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GlbBuilder {
    pub fn new() -> Self {
        Self {
            gltf: Gltf {
                asset: Asset {
                    generator: Some(GENERATOR.to_string()),
                    ..Default::default()
                },
                ..Default::default()
            },
            bin: Vec::new(),
            roots: Vec::new(),
            sampler: None,
        }
    }

    /// Attach application data to `asset.extras`
    pub fn set_extras(&mut self, extras: serde_json::Value) {
        self.gltf.asset.extras = Some(extras);
    }

    fn push_view(&mut self, bytes: &[u8], target: Option<u32>) -> usize {
        self.bin.resize(align4(self.bin.len()), 0);
        let byte_offset = self.bin.len();
        self.bin.extend_from_slice(bytes);
        self.gltf.buffer_views.push(BufferView {
            buffer: 0,
            byte_offset,
            byte_length: bytes.len(),
            byte_stride: None,
            target,
        });
        self.gltf.buffer_views.len() - 1
    }

    fn push_accessor(&mut self, accessor: Accessor) -> usize {
        self.gltf.accessors.push(accessor);
        self.gltf.accessors.len() - 1
    }

    fn add_float_accessor<const N: usize>(
        &mut self,
        data: &[[f32; N]],
        accessor_type: &str,
        with_bounds: bool,
    ) -> usize {
        let bytes: Vec<u8> = data
            .iter()
            .flat_map(|v| v.iter().flat_map(|c| c.to_le_bytes()))
            .collect();
        let view = self.push_view(&bytes, Some(TARGET_ARRAY_BUFFER));

        let (min, max) = if with_bounds && !data.is_empty() {
            let mut min = [f32::MAX; N];
            let mut max = [f32::MIN; N];
            for v in data {
                for k in 0..N {
                    min[k] = min[k].min(v[k]);
                    max[k] = max[k].max(v[k]);
                }
            }
            (
                Some(min.iter().map(|&c| c as f64).collect()),
                Some(max.iter().map(|&c| c as f64).collect()),
            )
        } else {
            (None, None)
        };

        self.push_accessor(Accessor {
            buffer_view: Some(view),
            byte_offset: 0,
            component_type: schema::COMPONENT_FLOAT,
            count: data.len(),
            accessor_type: accessor_type.to_string(),
            normalized: false,
            min,
            max,
        })
    }

    /// Positions; min/max bounds are recorded as the format requires
    pub fn add_positions(&mut self, data: &[[f32; 3]]) -> usize {
        self.add_float_accessor(data, "VEC3", true)
    }

    pub fn add_vec3(&mut self, data: &[[f32; 3]]) -> usize {
        self.add_float_accessor(data, "VEC3", false)
    }

    pub fn add_vec2(&mut self, data: &[[f32; 2]]) -> usize {
        self.add_float_accessor(data, "VEC2", false)
    }

    pub fn add_vec4(&mut self, data: &[[f32; 4]]) -> usize {
        self.add_float_accessor(data, "VEC4", false)
    }

    /// Index accessor, stored as u16 when every index fits
    pub fn add_indices(&mut self, indices: &[u32]) -> usize {
        let max_index = indices.iter().copied().max().unwrap_or(0);
        let (bytes, component_type): (Vec<u8>, u32) = if max_index <= u16::MAX as u32 {
            (
                indices.iter().flat_map(|&i| (i as u16).to_le_bytes()).collect(),
                schema::COMPONENT_UNSIGNED_SHORT,
            )
        } else {
            (
                indices.iter().flat_map(|&i| i.to_le_bytes()).collect(),
                schema::COMPONENT_UNSIGNED_INT,
            )
        };
        let view = self.push_view(&bytes, Some(TARGET_ELEMENT_ARRAY_BUFFER));
        self.push_accessor(Accessor {
            buffer_view: Some(view),
            byte_offset: 0,
            component_type,
            count: indices.len(),
            accessor_type: "SCALAR".to_string(),
            normalized: false,
            min: None,
            max: None,
        })
    }

    /// Unshared-vertex primitive for a run of triangles.
    ///
    /// Every triangle contributes three vertices carrying its unit normal.
    /// With `with_colors`, each triangle's color (gray when absent) becomes a
    /// `COLOR_0` attribute.
    pub fn add_triangles<'a, I>(&mut self, triangles: I, with_colors: bool, indexed: bool) -> Primitive
    where
        I: IntoIterator<Item = &'a Triangle>,
    {
        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut colors = Vec::new();

        for t in triangles {
            let n = t.unit_normal();
            let normal = [n.x as f32, n.y as f32, n.z as f32];
            let color = t.color.unwrap_or(DEFAULT_MATERIAL_COLOR).to_unit_rgba();
            for v in &t.vertices {
                positions.push([v.x as f32, v.y as f32, v.z as f32]);
                normals.push(normal);
                if with_colors {
                    colors.push(color);
                }
            }
        }

        let mut attributes = BTreeMap::new();
        attributes.insert("POSITION".to_string(), self.add_positions(&positions));
        attributes.insert("NORMAL".to_string(), self.add_vec3(&normals));
        if with_colors {
            attributes.insert("COLOR_0".to_string(), self.add_vec4(&colors));
        }

        let indices = if indexed {
            let sequence: Vec<u32> = (0..positions.len() as u32).collect();
            Some(self.add_indices(&sequence))
        } else {
            None
        };

        Primitive {
            attributes,
            indices,
            material: None,
            mode: schema::MODE_TRIANGLES,
        }
    }

    pub fn add_material(&mut self, material: GltfMaterial) -> usize {
        self.gltf.materials.push(material);
        self.gltf.materials.len() - 1
    }

    pub fn add_mesh(&mut self, name: Option<String>, primitives: Vec<Primitive>) -> usize {
        self.gltf.meshes.push(schema::Mesh { name, primitives });
        self.gltf.meshes.len() - 1
    }

    /// Node that is not listed in the scene; attach it as a child of another
    pub fn add_node(&mut self, node: Node) -> usize {
        self.gltf.nodes.push(node);
        self.gltf.nodes.len() - 1
    }

    pub fn add_root_node(&mut self, node: Node) -> usize {
        let index = self.add_node(node);
        self.roots.push(index);
        index
    }

    pub fn add_camera(&mut self, camera: Camera) -> usize {
        self.gltf.cameras.push(camera);
        self.gltf.cameras.len() - 1
    }

    /// PNG texture, stored in the binary buffer when `embed` is set and as a
    /// data URI otherwise. All textures share one clamped linear sampler.
    pub fn add_png_texture(&mut self, png: &[u8], embed: bool) -> usize {
        let image = if embed {
            Image {
                uri: None,
                mime_type: Some("image/png".to_string()),
                buffer_view: Some(self.push_view(png, None)),
            }
        } else {
            Image {
                uri: Some(encode_data_uri("image/png", png)),
                ..Default::default()
            }
        };
        self.gltf.images.push(image);
        let source = self.gltf.images.len() - 1;

        let sampler = match self.sampler {
            Some(s) => s,
            None => {
                self.gltf.samplers.push(Sampler::default());
                let s = self.gltf.samplers.len() - 1;
                self.sampler = Some(s);
                s
            }
        };

        self.gltf.textures.push(Texture {
            sampler: Some(sampler),
            source: Some(source),
        });
        self.gltf.textures.len() - 1
    }

    /// Finish the document: one scene holding every root node, one buffer
    pub fn into_parts(mut self) -> (Gltf, Vec<u8>) {
        self.bin.resize(align4(self.bin.len()), 0);
        if !self.bin.is_empty() {
            self.gltf.buffers = vec![Buffer {
                byte_length: self.bin.len(),
                uri: None,
            }];
        }
        self.gltf.scenes = vec![Scene {
            name: None,
            nodes: self.roots,
        }];
        self.gltf.scene = Some(0);
        (self.gltf, self.bin)
    }

    pub fn into_glb(self) -> Result<Vec<u8>> {
        let (gltf, bin) = self.into_parts();
        write_glb(&gltf, &bin)
    }

    /// Text glTF with the binary buffer embedded as a base64 data URI
    pub fn into_gltf(self) -> Gltf {
        let (mut gltf, bin) = self.into_parts();
        if let Some(buffer) = gltf.buffers.first_mut() {
            buffer.uri = Some(encode_data_uri("application/octet-stream", &bin));
        }
        gltf
    }
}

/// Encode one mesh as a single-node, single-primitive GLB.
///
/// Material colors are baked into a `COLOR_0` attribute so that parsing
/// the result regroups the same colors.
pub fn encode_mesh_glb(mesh: &Mesh) -> Result<Vec<u8>> {
    let baked = mesh.map_triangles(|t| {
        let mut t = t.clone();
        if t.color.is_none() {
            t.color = t
                .material_index
                .and_then(|i| mesh.materials().get(i))
                .map(|m| m.color);
        }
        t
    });
    let with_colors = baked.triangles().iter().any(|t| t.color.is_some());

    let mut builder = GlbBuilder::new();
    let primitive = builder.add_triangles(baked.triangles(), with_colors, true);
    let mesh_index = builder.add_mesh(None, vec![primitive]);
    builder.add_root_node(Node {
        mesh: Some(mesh_index),
        ..Default::default()
    });
    builder.into_glb()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glb::{parse_glb, split_glb};
    use approx::assert_relative_eq;
    use pcb3d_geometry::{centered_box, Color, CoordinateTransform, Point3, Vector3};

    #[test]
    fn test_chunks_are_aligned_and_padded() {
        let mut builder = GlbBuilder::new();
        builder.add_indices(&[0, 1, 2]);
        let data = builder.into_glb().unwrap();

        assert_eq!(data.len() % 4, 0);
        assert_eq!(u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize, data.len());
        let json_len = u32::from_le_bytes([data[12], data[13], data[14], data[15]]) as usize;
        assert_eq!(json_len % 4, 0);
        let json = &data[20..20 + json_len];
        assert!(json.ends_with(b"}") || json.ends_with(b" "));

        let chunks = split_glb(&data).unwrap();
        let bin = chunks.bin.unwrap();
        assert_eq!(bin.len(), 8);
        assert_eq!(&bin[6..], &[0, 0]);
    }

    #[test]
    fn test_indices_widen_past_u16() {
        let mut builder = GlbBuilder::new();
        let small = builder.add_indices(&[0, 65535]);
        let large = builder.add_indices(&[0, 65536]);
        let (gltf, _) = builder.into_parts();
        assert_eq!(gltf.accessors[small].component_type, schema::COMPONENT_UNSIGNED_SHORT);
        assert_eq!(gltf.accessors[large].component_type, schema::COMPONENT_UNSIGNED_INT);
    }

    #[test]
    fn test_mesh_round_trip_preserves_geometry() {
        let mesh = centered_box(Point3::new(1.0, 2.0, 3.0), Vector3::new(2.0, 4.0, 6.0));
        let data = encode_mesh_glb(&mesh).unwrap();
        let parsed = parse_glb(&data, Some(&CoordinateTransform::IDENTITY)).unwrap();

        assert_eq!(parsed.triangle_count(), 12);
        assert!(!parsed.has_materials());
        assert_relative_eq!(parsed.bounding_box().min, Point3::new(0.0, 0.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(parsed.bounding_box().max, Point3::new(2.0, 4.0, 6.0), epsilon = 1e-6);
        for (a, b) in mesh.triangles().iter().zip(parsed.triangles()) {
            assert_relative_eq!(a.normal, b.normal, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_material_colors_survive_round_trip() {
        let mut mesh = centered_box(Point3::origin(), Vector3::new(1.0, 1.0, 1.0));
        let body = mesh.map_triangles(|t| t.clone().with_material(0));
        mesh = body.with_materials(vec![pcb3d_geometry::Material::new("body", Color::rgb(20, 20, 20))]);

        let parsed = parse_glb(&encode_mesh_glb(&mesh).unwrap(), None).unwrap();
        assert_eq!(parsed.materials().len(), 1);
        assert_eq!(parsed.materials()[0].name, "Material_0");
        assert_eq!(parsed.materials()[0].color, Color::rgb(20, 20, 20));
    }

    #[test]
    fn test_text_gltf_embeds_buffer() {
        let mut builder = GlbBuilder::new();
        builder.add_png_texture(&[137, 80, 78, 71], false);
        builder.add_vec2(&[[0.0, 1.0]]);
        let gltf = builder.into_gltf();
        let uri = gltf.buffers[0].uri.as_deref().unwrap();
        assert!(uri.starts_with("data:application/octet-stream;base64,"));
        assert!(gltf.images[0].uri.as_deref().unwrap().starts_with("data:image/png;base64,"));
        assert_eq!(gltf.samplers.len(), 1);
    }
}
