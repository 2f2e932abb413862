// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GLB parse path: header and chunk validation, accessor decoding and
//! triangle extraction.

use super::schema::{
    self, Accessor, Gltf, COMPONENT_BYTE, COMPONENT_FLOAT, COMPONENT_SHORT,
    COMPONENT_UNSIGNED_BYTE, COMPONENT_UNSIGNED_INT, COMPONENT_UNSIGNED_SHORT,
};
use super::{
    align4, decode_data_uri, CHUNK_BIN, CHUNK_HEADER_LEN, CHUNK_JSON, GLB_HEADER_LEN, GLB_MAGIC,
    GLB_VERSION,
};
use crate::error::{Error, Result};
use pcb3d_geometry::{Color, CoordinateTransform, Material, Mesh, Point3, Triangle, Vector3};
use rustc_hash::FxHashMap;
use std::borrow::Cow;

/// Color of the material slot given to uncolored triangles in a colored mesh
pub const DEFAULT_MATERIAL_COLOR: Color = Color::rgba(179, 179, 179, 1.0);

/// The two payloads of a GLB container
#[derive(Debug, Clone, Copy)]
pub struct GlbChunks<'a> {
    pub json: &'a [u8],
    pub bin: Option<&'a [u8]>,
}

#[inline]
fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

/// Validate the header and split a GLB file into its chunks.
///
/// The header length field bounds every later read. Chunk 0 must be JSON;
/// a trailing BIN chunk is optional.
pub fn split_glb(data: &[u8]) -> Result<GlbChunks<'_>> {
    if data.len() < GLB_HEADER_LEN {
        return Err(Error::glb("file too short for a GLB header"));
    }

    let magic = read_u32(data, 0);
    if magic != GLB_MAGIC {
        return Err(Error::glb(format!("incorrect magic number 0x{magic:08x}")));
    }
    let version = read_u32(data, 4);
    if version != GLB_VERSION {
        return Err(Error::glb(format!("unsupported GLB version {version}")));
    }
    let end = (read_u32(data, 8) as usize).min(data.len());

    let mut offset = GLB_HEADER_LEN;
    if offset + CHUNK_HEADER_LEN > end {
        return Err(Error::glb("missing JSON chunk"));
    }
    let json_len = read_u32(data, offset) as usize;
    let json_type = read_u32(data, offset + 4);
    if json_type != CHUNK_JSON {
        return Err(Error::glb(format!("expected JSON chunk, found type 0x{json_type:08x}")));
    }
    offset += CHUNK_HEADER_LEN;
    if offset + json_len > end {
        return Err(Error::glb("JSON chunk extends past end of file"));
    }
    let json = &data[offset..offset + json_len];
    offset = align4(offset + json_len);

    let mut bin = None;
    if offset + CHUNK_HEADER_LEN <= end {
        let bin_len = read_u32(data, offset) as usize;
        let bin_type = read_u32(data, offset + 4);
        offset += CHUNK_HEADER_LEN;
        if bin_type == CHUNK_BIN {
            if offset + bin_len > end {
                return Err(Error::glb("BIN chunk extends past end of file"));
            }
            bin = Some(&data[offset..offset + bin_len]);
        }
    }

    Ok(GlbChunks { json, bin })
}

/// Parse a GLB file into a mesh.
///
/// `transform` defaults to [`CoordinateTransform::CODEC_DEFAULT`], the Y/Z
/// swap from the format's Z-up authoring convention. When any triangle
/// carries a color the result is a multi-material mesh (see [`group_by_color`]).
pub fn parse_glb(data: &[u8], transform: Option<&CoordinateTransform>) -> Result<Mesh> {
    let chunks = split_glb(data)?;
    let gltf: Gltf = serde_json::from_slice(chunks.json)?;
    let triangles = extract_triangles(&gltf, chunks.bin)?;

    let transform = transform.unwrap_or(&CoordinateTransform::CODEC_DEFAULT);
    Ok(group_by_color(transform.apply_to_triangles(&triangles)))
}

/// Resolve each declared buffer: embedded data URIs are decoded, buffer 0
/// without a URI is the BIN chunk. `None` marks a buffer with no bytes
/// available; reading through it is an error.
fn resolve_buffers<'a>(gltf: &Gltf, bin: Option<&'a [u8]>) -> Result<Vec<Option<Cow<'a, [u8]>>>> {
    gltf.buffers
        .iter()
        .enumerate()
        .map(|(i, buffer)| match &buffer.uri {
            Some(uri) if uri.starts_with("data:") => Ok(Some(Cow::Owned(decode_data_uri(uri)?))),
            Some(uri) => Err(Error::glb(format!("buffer {i} references external resource {uri}"))),
            None if i == 0 => Ok(bin.map(Cow::Borrowed)),
            None => Ok(None),
        })
        .collect()
}

fn component_size(component_type: u32) -> Result<usize> {
    match component_type {
        COMPONENT_BYTE | COMPONENT_UNSIGNED_BYTE => Ok(1),
        COMPONENT_SHORT | COMPONENT_UNSIGNED_SHORT => Ok(2),
        COMPONENT_UNSIGNED_INT | COMPONENT_FLOAT => Ok(4),
        other => Err(Error::glb(format!("unknown component type {other}"))),
    }
}

fn decode_component(bytes: &[u8], component_type: u32, normalized: bool) -> f64 {
    match component_type {
        COMPONENT_BYTE => {
            let v = bytes[0] as i8 as f64;
            if normalized {
                (v / 127.0).max(-1.0)
            } else {
                v
            }
        }
        COMPONENT_UNSIGNED_BYTE => {
            let v = bytes[0] as f64;
            if normalized {
                v / 255.0
            } else {
                v
            }
        }
        COMPONENT_SHORT => {
            let v = i16::from_le_bytes([bytes[0], bytes[1]]) as f64;
            if normalized {
                (v / 32767.0).max(-1.0)
            } else {
                v
            }
        }
        COMPONENT_UNSIGNED_SHORT => {
            let v = u16::from_le_bytes([bytes[0], bytes[1]]) as f64;
            if normalized {
                v / 65535.0
            } else {
                v
            }
        }
        COMPONENT_UNSIGNED_INT => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        _ => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
    }
}

/// Decoded accessor contents, flattened
struct AccessorData {
    values: Vec<f64>,
    components: usize,
}

impl AccessorData {
    #[inline]
    fn count(&self) -> usize {
        self.values.len() / self.components
    }

    #[inline]
    fn element(&self, i: usize) -> &[f64] {
        &self.values[i * self.components..(i + 1) * self.components]
    }
}

/// Decode an accessor into `f64` components.
///
/// Every read is bounds-checked against the buffer view before anything is
/// allocated. Accessors without a buffer view read as zeros, and only up to
/// `zero_fill_limit` elements.
fn read_accessor(
    gltf: &Gltf,
    buffers: &[Option<Cow<'_, [u8]>>],
    index: usize,
    zero_fill_limit: usize,
) -> Result<AccessorData> {
    let accessor: &Accessor = gltf
        .accessors
        .get(index)
        .ok_or_else(|| Error::glb(format!("accessor {index} does not exist")))?;
    let components = accessor
        .components()
        .ok_or_else(|| Error::glb(format!("unsupported accessor type {}", accessor.accessor_type)))?;
    let size = component_size(accessor.component_type)?;
    let count = accessor.count;

    let Some(view_index) = accessor.buffer_view else {
        if count > zero_fill_limit {
            return Err(Error::glb(format!(
                "accessor {index} has no buffer view and {count} elements"
            )));
        }
        return Ok(AccessorData {
            values: vec![0.0; count * components],
            components,
        });
    };

    let view = gltf
        .buffer_views
        .get(view_index)
        .ok_or_else(|| Error::glb(format!("buffer view {view_index} does not exist")))?;
    let buffer = buffers
        .get(view.buffer)
        .and_then(|b| b.as_deref())
        .ok_or_else(|| Error::glb(format!("binary data for buffer {} is missing", view.buffer)))?;

    let element_size = components * size;
    let stride = view.byte_stride.unwrap_or(element_size).max(element_size);
    let view_end = view
        .byte_offset
        .checked_add(view.byte_length)
        .map_or(buffer.len(), |end| end.min(buffer.len()));
    let past_end = || Error::glb(format!("accessor {index} reads past the end of its buffer view"));

    if count == 0 {
        return Ok(AccessorData {
            values: Vec::new(),
            components,
        });
    }

    let start = view
        .byte_offset
        .checked_add(accessor.byte_offset)
        .ok_or_else(past_end)?;
    let last = stride
        .checked_mul(count - 1)
        .and_then(|span| span.checked_add(start))
        .and_then(|end| end.checked_add(element_size))
        .ok_or_else(past_end)?;
    if last > view_end {
        return Err(past_end());
    }

    // Bounded by the view: count * element_size <= last <= buffer.len()
    let mut values = Vec::with_capacity(count * components);
    for i in 0..count {
        let base = start + i * stride;
        for c in 0..components {
            let at = base + c * size;
            values.push(decode_component(
                &buffer[at..at + size],
                accessor.component_type,
                accessor.normalized,
            ));
        }
    }

    Ok(AccessorData { values, components })
}

fn material_color(gltf: &Gltf, material: Option<usize>) -> Option<Color> {
    let pbr = gltf.materials.get(material?)?.pbr_metallic_roughness.as_ref()?;
    let [r, g, b, a] = pbr.base_color_factor;
    Some(Color::from_unit_rgba([r as f64, g as f64, b as f64, a as f64]))
}

/// Decode every triangle-list primitive of every mesh, untransformed
fn extract_triangles(gltf: &Gltf, bin: Option<&[u8]>) -> Result<Vec<Triangle>> {
    let buffers = resolve_buffers(gltf, bin)?;
    let mut triangles = Vec::new();

    for mesh in &gltf.meshes {
        for primitive in &mesh.primitives {
            if primitive.mode != schema::MODE_TRIANGLES {
                continue;
            }

            let position_index = *primitive
                .attributes
                .get("POSITION")
                .ok_or_else(|| Error::glb("primitive has no POSITION accessor"))?;
            let positions = read_accessor(gltf, &buffers, position_index, 0)?;
            if positions.components != 3 {
                return Err(Error::glb("POSITION accessor must be VEC3"));
            }
            let vertex_count = positions.count();

            let normals = primitive
                .attributes
                .get("NORMAL")
                .map(|&i| read_accessor(gltf, &buffers, i, vertex_count))
                .transpose()?
                .filter(|n| n.components == 3 && n.count() >= vertex_count);

            let colors = primitive
                .attributes
                .get("COLOR_0")
                .map(|&i| read_accessor(gltf, &buffers, i, vertex_count))
                .transpose()?
                .filter(|c| matches!(c.components, 3 | 4) && c.count() >= vertex_count);

            let fallback_color = if colors.is_none() {
                material_color(gltf, primitive.material)
            } else {
                None
            };

            let indices: Vec<usize> = match primitive.indices {
                Some(i) => {
                    let data = read_accessor(gltf, &buffers, i, 0)?;
                    data.values.iter().map(|&v| v as usize).collect()
                }
                None => (0..vertex_count).collect(),
            };

            triangles.reserve(indices.len() / 3);
            for corner in indices.chunks_exact(3) {
                let [i0, i1, i2] = [corner[0], corner[1], corner[2]];
                if i0.max(i1).max(i2) >= vertex_count {
                    return Err(Error::glb(format!(
                        "index {} out of range for {vertex_count} vertices",
                        i0.max(i1).max(i2)
                    )));
                }

                let point = |i: usize| {
                    let p = positions.element(i);
                    Point3::new(p[0], p[1], p[2])
                };
                let (v0, v1, v2) = (point(i0), point(i1), point(i2));

                let normal = match &normals {
                    Some(n) => {
                        let sum = [i0, i1, i2].iter().fold(Vector3::zeros(), |acc, &i| {
                            let e = n.element(i);
                            acc + Vector3::new(e[0], e[1], e[2])
                        });
                        sum / 3.0
                    }
                    None => (v1 - v0).cross(&(v2 - v0)),
                };

                let mut triangle = Triangle::new(v0, v1, v2, normal);
                let color = match &colors {
                    Some(c) => {
                        let mut avg = [0.0, 0.0, 0.0, 0.0];
                        for &i in &[i0, i1, i2] {
                            let e = c.element(i);
                            for (k, slot) in avg.iter_mut().enumerate() {
                                *slot += e.get(k).copied().unwrap_or(1.0) / 3.0;
                            }
                        }
                        Some(Color::from_unit_rgba(avg))
                    }
                    None => fallback_color,
                };
                if let Some(color) = color {
                    triangle = triangle.with_color(color);
                }
                triangles.push(triangle);
            }
        }
    }

    Ok(triangles)
}

/// Attach a material table when any triangle carries a color.
///
/// Distinct colors become `Material_0..N` in first-seen order. Uncolored
/// triangles in a colored mesh share a trailing `default` slot. A mesh with
/// no colors at all is returned without materials.
pub fn group_by_color(triangles: Vec<Triangle>) -> Mesh {
    if !triangles.iter().any(|t| t.color.is_some()) {
        return Mesh::from_triangles(triangles);
    }

    let mut slots: FxHashMap<String, usize> = FxHashMap::default();
    let mut materials = Vec::new();
    for color in triangles.iter().filter_map(|t| t.color) {
        slots.entry(color.key()).or_insert_with(|| {
            materials.push(Material::new(format!("Material_{}", materials.len()), color));
            materials.len() - 1
        });
    }

    let default_slot = if triangles.iter().any(|t| t.color.is_none()) {
        materials.push(Material::new("default", DEFAULT_MATERIAL_COLOR));
        Some(materials.len() - 1)
    } else {
        None
    };

    let triangles = triangles
        .into_iter()
        .map(|t| {
            let slot = match &t.color {
                Some(c) => slots.get(&c.key()).copied(),
                None => default_slot,
            };
            match slot {
                Some(slot) => t.with_material(slot),
                None => t,
            }
        })
        .collect();

    Mesh::from_triangles(triangles).with_materials(materials)
}
