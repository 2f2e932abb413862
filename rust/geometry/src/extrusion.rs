// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extrusion operations - converting 2D profiles to 3D meshes

use crate::error::{Error, Result};
use crate::mesh::{Mesh, Triangle};
use crate::profile::{Profile2D, Triangulation};
use nalgebra::{Matrix3, Matrix4, Point2, Point3, Vector3};

/// Extrude a 2D profile along +Z, from `z = 0` to `z = depth`.
///
/// The profile is normalized first (outer ring counter-clockwise, holes
/// clockwise) so every facet winds outward.
#[inline]
pub fn extrude_profile(
    profile: &Profile2D,
    depth: f64,
    transform: Option<Matrix4<f64>>,
) -> Result<Mesh> {
    if !(depth > 0.0) || !depth.is_finite() {
        return Err(Error::InvalidExtrusion(format!(
            "Depth must be positive, got {depth}"
        )));
    }

    let profile = profile.clone().normalized();
    let triangulation = profile.triangulate()?;

    let wall_count = profile.outer.len() + profile.holes.iter().map(Vec::len).sum::<usize>();
    let mut triangles = Vec::with_capacity(triangulation.indices.len() * 2 / 3 + wall_count * 2);

    create_cap_triangles(&triangulation, 0.0, false, &mut triangles);
    create_cap_triangles(&triangulation, depth, true, &mut triangles);

    create_side_walls(&profile.outer, 0.0, depth, &mut triangles);
    for hole in &profile.holes {
        create_side_walls(hole, 0.0, depth, &mut triangles);
    }

    let mut mesh = Mesh::from_triangles(triangles);
    if let Some(mat) = transform {
        mesh = apply_transform(&mesh, &mat);
    }
    Ok(mesh)
}

/// Extrude and center on the extrusion axis (`z` in `[-depth/2, depth/2]`)
#[inline]
pub fn extrude_centered(profile: &Profile2D, depth: f64) -> Result<Mesh> {
    let centering = Matrix4::new_translation(&Vector3::new(0.0, 0.0, -depth / 2.0));
    extrude_profile(profile, depth, Some(centering))
}

/// Create a cap from triangulation, facing +Z when `up` and -Z otherwise
#[inline]
fn create_cap_triangles(
    triangulation: &Triangulation,
    z: f64,
    up: bool,
    out: &mut Vec<Triangle>,
) {
    let normal = Vector3::new(0.0, 0.0, if up { 1.0 } else { -1.0 });
    let lift = |p: &Point2<f64>| Point3::new(p.x, p.y, z);

    for tri in triangulation.indices.chunks_exact(3) {
        let a = &triangulation.points[tri[0]];
        let b = &triangulation.points[tri[1]];
        let c = &triangulation.points[tri[2]];

        // earcut output orientation is not guaranteed; fix it per triangle
        let ccw = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x) > 0.0;
        let (b, c) = if ccw == up { (b, c) } else { (c, b) };

        out.push(Triangle::new(lift(a), lift(b), lift(c), normal));
    }
}

/// Create side walls for a boundary ring between two heights.
/// Counter-clockwise rings face outward, clockwise rings (holes) face inward.
#[inline]
fn create_side_walls(boundary: &[Point2<f64>], z0: f64, z1: f64, out: &mut Vec<Triangle>) {
    for i in 0..boundary.len() {
        let j = (i + 1) % boundary.len();

        let p0 = &boundary[i];
        let p1 = &boundary[j];

        // Use try_normalize to handle degenerate edges (duplicate consecutive points)
        let edge = Vector3::new(p1.x - p0.x, p1.y - p0.y, 0.0);
        let normal = match Vector3::new(edge.y, -edge.x, 0.0).try_normalize(1e-10) {
            Some(n) => n,
            None => continue,
        };

        let v0_bottom = Point3::new(p0.x, p0.y, z0);
        let v1_bottom = Point3::new(p1.x, p1.y, z0);
        let v0_top = Point3::new(p0.x, p0.y, z1);
        let v1_top = Point3::new(p1.x, p1.y, z1);

        out.push(Triangle::new(v0_bottom, v1_bottom, v1_top, normal));
        out.push(Triangle::new(v0_bottom, v1_top, v0_top, normal));
    }
}

/// Apply transformation matrix to mesh
#[inline]
pub fn apply_transform(mesh: &Mesh, transform: &Matrix4<f64>) -> Mesh {
    // Inverse transpose keeps normals perpendicular under non-uniform scale
    let linear: Matrix3<f64> = transform.fixed_view::<3, 3>(0, 0).into_owned();
    let normal_matrix = linear
        .try_inverse()
        .map(|m| m.transpose())
        .unwrap_or(linear);
    let mirrors = linear.determinant() < 0.0;

    mesh.map_triangles(|t| {
        let [v0, v1, v2] = t.vertices.map(|v| transform.transform_point(&v));
        let normal = (normal_matrix * t.normal)
            .try_normalize(1e-12)
            .unwrap_or(t.normal);
        let vertices = if mirrors { [v0, v2, v1] } else { [v0, v1, v2] };
        Triangle {
            vertices,
            normal,
            ..t.clone()
        }
    })
}
