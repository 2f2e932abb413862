// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon triangulation utilities
//!
//! Wrapper around earcutr for 2D outlines, plus fan triangulation of the
//! convex planar polygons produced by the CSG kernel.

use crate::mesh::Triangle;
use crate::{Error, Point2, Point3, Result, Vector3};

/// Check if a polygon is convex (all cross products have same sign)
#[inline]
pub fn is_convex(points: &[Point2<f64>]) -> bool {
    if points.len() < 3 {
        return false;
    }

    let n = points.len();
    let mut sign = 0i8;

    for i in 0..n {
        let p0 = &points[i];
        let p1 = &points[(i + 1) % n];
        let p2 = &points[(i + 2) % n];

        let cross = (p1.x - p0.x) * (p2.y - p1.y) - (p1.y - p0.y) * (p2.x - p1.x);

        if cross.abs() > 1e-10 {
            let current_sign = if cross > 0.0 { 1i8 } else { -1i8 };
            if sign == 0 {
                sign = current_sign;
            } else if sign != current_sign {
                return false;
            }
        }
    }

    true
}

/// Fan indices for an n-gon
#[inline]
fn fan_indices(n: usize) -> Vec<usize> {
    let mut indices = Vec::with_capacity((n - 2) * 3);
    for i in 1..n - 1 {
        indices.push(0);
        indices.push(i);
        indices.push(i + 1);
    }
    indices
}

/// Triangulate a simple polygon (no holes)
/// Returns triangle indices into the input points
#[inline]
pub fn triangulate_polygon(points: &[Point2<f64>]) -> Result<Vec<usize>> {
    let n = points.len();

    if n < 3 {
        return Err(Error::TriangulationError(
            "Need at least 3 points to triangulate".to_string(),
        ));
    }

    if n == 3 {
        return Ok(vec![0, 1, 2]);
    }

    if is_convex(points) {
        return Ok(fan_indices(n));
    }

    let vertices: Vec<f64> = points.iter().flat_map(|p| [p.x, p.y]).collect();

    earcutr::earcut(&vertices, &[], 2).map_err(|e| Error::TriangulationError(format!("{:?}", e)))
}

/// Triangulate a polygon with holes
/// Returns triangle indices into the combined vertex array (outer + all holes)
#[inline]
pub fn triangulate_polygon_with_holes(
    outer: &[Point2<f64>],
    holes: &[Vec<Point2<f64>>],
) -> Result<Vec<usize>> {
    if outer.len() < 3 {
        return Err(Error::TriangulationError(
            "Need at least 3 points in outer boundary".to_string(),
        ));
    }

    if holes.is_empty() {
        return triangulate_polygon(outer);
    }

    if let Some(bad) = holes.iter().find(|h| h.len() < 3) {
        return Err(Error::TriangulationError(format!(
            "Hole with {} points cannot be triangulated",
            bad.len()
        )));
    }

    let total_points: usize = outer.len() + holes.iter().map(Vec::len).sum::<usize>();
    let mut vertices = Vec::with_capacity(total_points * 2);
    vertices.extend(outer.iter().flat_map(|p| [p.x, p.y]));

    let mut hole_indices = Vec::with_capacity(holes.len());
    for hole in holes {
        hole_indices.push(vertices.len() / 2);
        vertices.extend(hole.iter().flat_map(|p| [p.x, p.y]));
    }

    earcutr::earcut(&vertices, &hole_indices, 2)
        .map_err(|e| Error::TriangulationError(format!("{:?}", e)))
}

/// Calculate the unit normal of a planar polygon (Newell's method)
#[inline]
pub fn calculate_polygon_normal(points: &[Point3<f64>]) -> Option<Vector3<f64>> {
    let n = points.len();
    if n < 3 {
        return None;
    }

    let mut normal = Vector3::<f64>::zeros();
    for i in 0..n {
        let current = &points[i];
        let next = &points[(i + 1) % n];

        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }

    normal.try_normalize(1e-12)
}

/// Fan-triangulate a convex planar polygon.
///
/// Every output triangle carries the same unit normal, taken from the first
/// two edges. When those are collinear the polygon-wide normal is used, and
/// a fully degenerate polygon falls back to `+Z`.
pub fn fan_triangulate(points: &[Point3<f64>]) -> Vec<Triangle> {
    if points.len() < 3 {
        return Vec::new();
    }

    let normal = (points[1] - points[0])
        .cross(&(points[2] - points[0]))
        .try_normalize(1e-12)
        .or_else(|| calculate_polygon_normal(points))
        .unwrap_or_else(Vector3::z);

    (1..points.len() - 1)
        .map(|i| Triangle::new(points[0], points[i], points[i + 1], normal))
        .collect()
}
