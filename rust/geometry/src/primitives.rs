// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Primitive solids

use crate::mesh::{Mesh, Triangle};
use nalgebra::{Point3, Vector3};

/// Axis-aligned box between `min` and `max`, 12 outward-wound triangles
pub fn box_between(min: Point3<f64>, max: Point3<f64>) -> Mesh {
    let v0 = Point3::new(min.x, min.y, min.z);
    let v1 = Point3::new(max.x, min.y, min.z);
    let v2 = Point3::new(max.x, max.y, min.z);
    let v3 = Point3::new(min.x, max.y, min.z);
    let v4 = Point3::new(min.x, min.y, max.z);
    let v5 = Point3::new(max.x, min.y, max.z);
    let v6 = Point3::new(max.x, max.y, max.z);
    let v7 = Point3::new(min.x, max.y, max.z);

    let faces = [
        // -Z
        ([v0, v2, v1], [v0, v3, v2], -Vector3::z()),
        // +Z
        ([v4, v5, v6], [v4, v6, v7], Vector3::z()),
        // -X
        ([v0, v4, v7], [v0, v7, v3], -Vector3::x()),
        // +X
        ([v1, v2, v6], [v1, v6, v5], Vector3::x()),
        // -Y
        ([v0, v1, v5], [v0, v5, v4], -Vector3::y()),
        // +Y
        ([v3, v7, v6], [v3, v6, v2], Vector3::y()),
    ];

    let mut mesh = Mesh::with_capacity(12);
    for (a, b, normal) in faces {
        mesh.push(Triangle::new(a[0], a[1], a[2], normal));
        mesh.push(Triangle::new(b[0], b[1], b[2], normal));
    }
    mesh
}

/// Box of the given size centered at `center`
#[inline]
pub fn centered_box(center: Point3<f64>, size: Vector3<f64>) -> Mesh {
    let half = size.abs() / 2.0;
    box_between(center - half, center + half)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_is_closed_and_outward() {
        let mesh = centered_box(Point3::new(1.0, 2.0, 3.0), Vector3::new(2.0, 4.0, 6.0));
        assert_eq!(mesh.triangle_count(), 12);
        assert_relative_eq!(mesh.bounding_box().min, Point3::new(0.0, 0.0, 0.0));
        assert_relative_eq!(mesh.bounding_box().max, Point3::new(2.0, 4.0, 6.0));

        let center = Point3::new(1.0, 2.0, 3.0);
        for t in mesh.triangles() {
            let winding = t.winding_normal().normalize();
            assert_relative_eq!(winding, t.normal, epsilon = 1e-12);
            assert!((t.vertices[0] - center).dot(&t.normal) > 0.0);
        }

        let area: f64 = mesh.triangles().iter().map(Triangle::area).sum();
        assert_relative_eq!(area, 2.0 * (8.0 + 12.0 + 24.0));
    }
}
