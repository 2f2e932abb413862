// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wavefront OBJ reader built on `tobj`. Material libraries are not resolved.

use crate::error::{Error, Result};
use pcb3d_geometry::{CoordinateTransform, Mesh, Point3, Triangle, Vector3};
use std::io::Cursor;

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        single_index: true,
        triangulate: true,
        ..Default::default()
    }
}

/// Parse an OBJ document and apply `transform`.
///
/// Triangle normals are the average of the vertex normals when the file
/// provides them, otherwise the raw winding cross product.
pub fn parse_obj(data: &[u8], transform: &CoordinateTransform) -> Result<Mesh> {
    let mut reader = Cursor::new(data);
    let (models, _materials) = tobj::load_obj_buf(&mut reader, &load_options(), |_| {
        Err(tobj::LoadError::OpenFileFailed)
    })
    .map_err(|e| Error::Obj(e.to_string()))?;

    let mut triangles = Vec::new();
    for model in &models {
        let mesh = &model.mesh;
        let vertex_count = mesh.positions.len() / 3;
        let has_normals = mesh.normals.len() >= vertex_count * 3 && !mesh.normals.is_empty();

        let position = |i: usize| {
            Point3::new(
                mesh.positions[3 * i] as f64,
                mesh.positions[3 * i + 1] as f64,
                mesh.positions[3 * i + 2] as f64,
            )
        };
        let normal = |i: usize| {
            Vector3::new(
                mesh.normals[3 * i] as f64,
                mesh.normals[3 * i + 1] as f64,
                mesh.normals[3 * i + 2] as f64,
            )
        };

        for face in mesh.indices.chunks_exact(3) {
            let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];
            if i0.max(i1).max(i2) >= vertex_count {
                return Err(Error::Obj(format!("face index out of range in {}", model.name)));
            }
            let (v0, v1, v2) = (position(i0), position(i1), position(i2));
            let triangle = if has_normals {
                Triangle::new(v0, v1, v2, (normal(i0) + normal(i1) + normal(i2)) / 3.0)
            } else {
                Triangle::from_vertices(v0, v1, v2)
            };
            triangles.push(triangle);
        }
    }

    Ok(Mesh::from_triangles(transform.apply_to_triangles(&triangles)))
}
