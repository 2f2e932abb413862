// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CSG bridge
//!
//! Converts triangle meshes to csgrs BSP solids and back. Boolean results
//! come back as convex planar polygons, which are kept as a polygon soup so
//! callers can reposition them before fan triangulation.

use crate::error::{Error, Result};
use crate::mesh::{BoundingBox, Mesh};
use crate::triangulation::fan_triangulate;
use csgrs::mesh::{polygon::Polygon, vertex::Vertex, Mesh as CSGMesh};
use csgrs::traits::CSG;
use nalgebra::{Point3, Rotation3};
use rayon::prelude::*;
use smallvec::SmallVec;
use std::sync::OnceLock;

/// Planar polygon as returned by the CSG kernel
pub type Polygon3 = SmallVec<[Point3<f64>; 8]>;

/// Convert our Mesh format to csgrs Mesh format
pub fn mesh_to_csg(mesh: &Mesh) -> CSGMesh<()> {
    if mesh.is_empty() {
        return CSGMesh {
            polygons: Vec::new(),
            bounding_box: OnceLock::new(),
            metadata: None,
        };
    }

    let polygons: Vec<Polygon<()>> = mesh
        .triangles()
        .iter()
        .filter_map(|t| {
            let [v0, v1, v2] = t.vertices;
            // Skip degenerate triangles to avoid NaN propagation in the BSP
            let face_normal = (v1 - v0).cross(&(v2 - v0)).try_normalize(1e-10)?;
            let vertices = vec![
                Vertex::new(v0, face_normal),
                Vertex::new(v1, face_normal),
                Vertex::new(v2, face_normal),
            ];
            Some(Polygon::new(vertices, None))
        })
        .collect();

    CSGMesh::from_polygons(&polygons, None)
}

/// Extract the polygon soup of a csgrs solid
pub fn csg_polygons(csg_mesh: &CSGMesh<()>) -> Vec<Polygon3> {
    csg_mesh
        .polygons
        .iter()
        .filter(|polygon| polygon.vertices.len() >= 3)
        .map(|polygon| {
            polygon
                .vertices
                .iter()
                .map(|v| Point3::new(v.pos.x, v.pos.y, v.pos.z))
                .collect()
        })
        .collect()
}

/// Subtract the union of all `tools` from `host` in one boolean difference.
///
/// Tools are unioned pairwise in parallel first. Without tools the host's
/// own triangles are returned as the soup.
pub fn subtract_all(host: &Mesh, tools: &[Mesh]) -> Result<Vec<Polygon3>> {
    if host.is_empty() {
        return Err(Error::EmptyMesh("host solid has no triangles".to_string()));
    }

    let cutter = tools
        .par_iter()
        .filter(|tool| !tool.is_empty())
        .map(mesh_to_csg)
        .reduce_with(|a, b| a.union(&b));

    let polygons = match cutter {
        Some(cutter) => {
            let host_csg = mesh_to_csg(host);
            csg_polygons(&host_csg.difference(&cutter))
        }
        None => host
            .triangles()
            .iter()
            .map(|t| t.vertices.iter().copied().collect())
            .collect(),
    };

    if polygons.is_empty() {
        return Err(Error::Csg(
            "difference removed the entire solid".to_string(),
        ));
    }
    Ok(polygons)
}

/// Rotate every polygon vertex in place
pub fn rotate_polygons(polygons: &mut [Polygon3], rotation: &Rotation3<f64>) {
    for polygon in polygons {
        for p in polygon.iter_mut() {
            *p = rotation * *p;
        }
    }
}

/// Fan-triangulate a polygon soup. Bounds come from the polygon vertices,
/// not the triangles, so they describe the solid itself.
pub fn polygons_to_mesh(polygons: &[Polygon3]) -> Mesh {
    let bounds = BoundingBox::from_points(polygons.iter().flat_map(|p| p.iter()))
        .unwrap_or_default();
    let triangles = polygons.iter().flat_map(|p| fan_triangulate(p)).collect();
    Mesh::with_bounding_box(triangles, bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extrusion::extrude_centered;
    use crate::profile::{create_circle, create_rectangle};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use std::f64::consts::FRAC_PI_2;

    fn top_area(mesh: &Mesh) -> f64 {
        mesh.triangles()
            .iter()
            .filter(|t| t.normal.z > 0.9)
            .map(|t| t.area())
            .sum()
    }

    #[test]
    fn test_no_tools_passes_host_through() {
        let host = extrude_centered(&create_rectangle(4.0, 2.0), 1.0).unwrap();
        let polygons = subtract_all(&host, &[]).unwrap();
        assert_eq!(polygons.len(), host.triangle_count());
        let mesh = polygons_to_mesh(&polygons);
        assert_relative_eq!(top_area(&mesh), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_subtract_cylinder() {
        let host = extrude_centered(&create_rectangle(10.0, 10.0), 1.0).unwrap();
        let tool = extrude_centered(&create_circle(1.0, 32), 2.0).unwrap();
        let polygons = subtract_all(&host, &[tool]).unwrap();
        let mesh = polygons_to_mesh(&polygons);

        let polygon_area = 0.5 * 32.0 * (std::f64::consts::TAU / 32.0).sin();
        assert_relative_eq!(top_area(&mesh), 100.0 - polygon_area, epsilon = 1e-6);
        assert_relative_eq!(mesh.bounding_box().max.z, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_overlapping_tools_are_unioned() {
        let host = extrude_centered(&create_rectangle(10.0, 10.0), 1.0).unwrap();
        let a = extrude_centered(&create_rectangle(4.0, 2.0), 2.0).unwrap();
        let b = extrude_centered(&create_rectangle(2.0, 4.0), 2.0).unwrap();
        let mesh = polygons_to_mesh(&subtract_all(&host, &[a, b]).unwrap());
        // Plus sign: 8 + 8 - 4 overlap
        assert_relative_eq!(top_area(&mesh), 100.0 - 12.0, epsilon = 1e-6);
    }

    #[test]
    fn test_tool_covering_host_is_an_error() {
        let host = extrude_centered(&create_rectangle(2.0, 2.0), 1.0).unwrap();
        let tool = extrude_centered(&create_rectangle(4.0, 4.0), 2.0).unwrap();
        assert!(matches!(subtract_all(&host, &[tool]), Err(Error::Csg(_))));
    }

    #[test]
    fn test_rotate_polygons() {
        let mut polygons: Vec<Polygon3> = vec![SmallVec::from_slice(&[
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 1.0),
        ])];
        rotate_polygons(&mut polygons, &Rotation3::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2));
        // (x, y, z) -> (x, z, -y)
        assert_relative_eq!(polygons[0][0], Point3::new(0.0, 0.0, -1.0), epsilon = 1e-12);
        assert_relative_eq!(polygons[0][2], Point3::new(0.0, 1.0, -1.0), epsilon = 1e-12);
    }
}
