// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Coordinate convention transforms
//!
//! Imported models are authored in different conventions (Z-up vs Y-up,
//! mirrored axes, offset origins). A [`CoordinateTransform`] remaps a
//! triangle set from one convention into the scene's Y-up convention:
//! positions go through axis mapping, flips and translation; normals only
//! through mapping and flips.

use crate::mesh::{Mesh, Triangle};
use nalgebra::{Matrix3, Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signed source axis for one output axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    #[serde(rename = "x")]
    X,
    #[serde(rename = "y")]
    Y,
    #[serde(rename = "z")]
    Z,
    #[serde(rename = "-x")]
    NegX,
    #[serde(rename = "-y")]
    NegY,
    #[serde(rename = "-z")]
    NegZ,
}

impl Axis {
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Axis::X | Axis::NegX => 0,
            Axis::Y | Axis::NegY => 1,
            Axis::Z | Axis::NegZ => 2,
        }
    }

    #[inline]
    pub const fn sign(self) -> f64 {
        match self {
            Axis::X | Axis::Y | Axis::Z => 1.0,
            Axis::NegX | Axis::NegY | Axis::NegZ => -1.0,
        }
    }

    fn from_index(index: usize, negative: bool) -> Option<Axis> {
        Some(match (index, negative) {
            (0, false) => Axis::X,
            (1, false) => Axis::Y,
            (2, false) => Axis::Z,
            (0, true) => Axis::NegX,
            (1, true) => Axis::NegY,
            (2, true) => Axis::NegZ,
            _ => return None,
        })
    }

    fn as_str(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
            Axis::NegX => "-x",
            Axis::NegY => "-y",
            Axis::NegZ => "-z",
        }
    }
}

/// Output axis ← signed input axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AxisMapping {
    pub x: Axis,
    pub y: Axis,
    pub z: Axis,
}

impl AxisMapping {
    pub const IDENTITY: AxisMapping = AxisMapping {
        x: Axis::X,
        y: Axis::Y,
        z: Axis::Z,
    };
}

impl Default for AxisMapping {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// External model formats, each with its own authoring convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    Stl,
    Obj,
    Gltf,
    Glb,
    Footprint,
}

impl ModelFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFormat::Stl => "stl",
            ModelFormat::Obj => "obj",
            ModelFormat::Gltf => "gltf",
            ModelFormat::Glb => "glb",
            ModelFormat::Footprint => "footprint",
        }
    }
}

/// Axis remapping, per-axis flips and a translation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoordinateTransform {
    pub axis_mapping: AxisMapping,
    pub flip_x: bool,
    pub flip_y: bool,
    pub flip_z: bool,
    pub translation: [f64; 3],
}

impl Default for CoordinateTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl CoordinateTransform {
    pub const IDENTITY: CoordinateTransform = CoordinateTransform {
        axis_mapping: AxisMapping::IDENTITY,
        flip_x: false,
        flip_y: false,
        flip_z: false,
        translation: [0.0; 3],
    };

    /// Z-up authored data into the Y-up scene: x←x, y←z, z←y
    pub const Y_Z_SWAP: CoordinateTransform = CoordinateTransform {
        axis_mapping: AxisMapping {
            x: Axis::X,
            y: Axis::Z,
            z: Axis::Y,
        },
        flip_x: false,
        flip_y: false,
        flip_z: false,
        translation: [0.0; 3],
    };

    /// Default applied by the binary model codec when no override is given
    pub const CODEC_DEFAULT: CoordinateTransform = Self::Y_Z_SWAP;

    /// Default convention for a model format
    pub fn for_format(format: ModelFormat) -> CoordinateTransform {
        match format {
            ModelFormat::Stl | ModelFormat::Obj | ModelFormat::Footprint => Self::Y_Z_SWAP,
            ModelFormat::Gltf | ModelFormat::Glb => Self::CODEC_DEFAULT,
        }
    }

    /// Pure translation
    pub fn from_translation(offset: Vector3<f64>) -> CoordinateTransform {
        CoordinateTransform {
            translation: [offset.x, offset.y, offset.z],
            ..Self::IDENTITY
        }
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Linear part: signed permutation followed by the flips
    pub fn linear(&self) -> Matrix3<f64> {
        let mut m = Matrix3::zeros();
        let rows = [
            (self.axis_mapping.x, self.flip_x),
            (self.axis_mapping.y, self.flip_y),
            (self.axis_mapping.z, self.flip_z),
        ];
        for (row, (axis, flip)) in rows.into_iter().enumerate() {
            let flip_sign = if flip { -1.0 } else { 1.0 };
            m[(row, axis.index())] = axis.sign() * flip_sign;
        }
        m
    }

    #[inline]
    fn offset(&self) -> Vector3<f64> {
        Vector3::from(self.translation)
    }

    /// True when the linear part mirrors space, which reverses winding
    #[inline]
    pub fn is_reflection(&self) -> bool {
        self.linear().determinant() < 0.0
    }

    #[inline]
    pub fn apply_to_point(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.linear() * p.coords + self.offset())
    }

    #[inline]
    pub fn apply_to_normal(&self, n: &Vector3<f64>) -> Vector3<f64> {
        self.linear() * n
    }

    /// Transform one triangle, keeping winding consistent with the normal
    pub fn apply_to_triangle(&self, triangle: &Triangle) -> Triangle {
        let linear = self.linear();
        let offset = self.offset();
        let map = |p: &Point3<f64>| Point3::from(linear * p.coords + offset);
        let [v0, v1, v2] = &triangle.vertices;
        let vertices = if linear.determinant() < 0.0 {
            [map(v0), map(v2), map(v1)]
        } else {
            [map(v0), map(v1), map(v2)]
        };
        Triangle {
            vertices,
            normal: linear * triangle.normal,
            ..triangle.clone()
        }
    }

    pub fn apply_to_triangles(&self, triangles: &[Triangle]) -> Vec<Triangle> {
        if self.is_identity() {
            return triangles.to_vec();
        }
        triangles.iter().map(|t| self.apply_to_triangle(t)).collect()
    }

    /// Transform a mesh, recomputing its bounds and keeping its materials
    pub fn apply_to_mesh(&self, mesh: &Mesh) -> Mesh {
        if self.is_identity() {
            return mesh.clone();
        }
        mesh.map_triangles(|t| self.apply_to_triangle(t))
    }

    /// Algebraic inverse. `None` when the axis mapping is not a permutation.
    pub fn inverse(&self) -> Option<CoordinateTransform> {
        let lt = self.linear().transpose();
        let mut axes = [Axis::X; 3];
        for (row, slot) in axes.iter_mut().enumerate() {
            let mut found = None;
            for col in 0..3 {
                let v = lt[(row, col)];
                if v != 0.0 {
                    if found.is_some() {
                        return None;
                    }
                    found = Axis::from_index(col, v < 0.0);
                }
            }
            *slot = found?;
        }

        let inverse = CoordinateTransform {
            axis_mapping: AxisMapping {
                x: axes[0],
                y: axes[1],
                z: axes[2],
            },
            flip_x: false,
            flip_y: false,
            flip_z: false,
            translation: [0.0; 3],
        };
        let t = -(lt * self.offset());
        Some(CoordinateTransform {
            translation: [t.x, t.y, t.z],
            ..inverse
        })
    }

    /// Stable text form, used in cache keys
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CoordinateTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.axis_mapping;
        write!(
            f,
            "{},{},{}|{}{}{}|{},{},{}",
            m.x.as_str(),
            m.y.as_str(),
            m.z.as_str(),
            u8::from(self.flip_x),
            u8::from(self.flip_y),
            u8::from(self.flip_z),
            self.translation[0],
            self.translation[1],
            self.translation[2],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_triangles() -> Vec<Triangle> {
        vec![
            Triangle::from_vertices(
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(0.0, 3.0, 0.0),
            ),
            Triangle::from_vertices(
                Point3::new(1.0, -1.0, 4.0),
                Point3::new(1.0, 2.0, 5.0),
                Point3::new(-3.0, 0.5, 4.5),
            ),
        ]
    }

    #[test]
    fn test_identity_is_noop() {
        let tris = sample_triangles();
        assert_eq!(CoordinateTransform::IDENTITY.apply_to_triangles(&tris), tris);
        assert_eq!(CoordinateTransform::default(), CoordinateTransform::IDENTITY);
    }

    #[test]
    fn test_y_z_swap() {
        let t = CoordinateTransform::Y_Z_SWAP;
        let p = t.apply_to_point(&Point3::new(1.0, 2.0, 3.0));
        assert_eq!(p, Point3::new(1.0, 3.0, 2.0));
        assert!(t.is_reflection());
    }

    #[test]
    fn test_reflection_keeps_winding_consistent() {
        let t = CoordinateTransform::Y_Z_SWAP;
        for tri in t.apply_to_triangles(&sample_triangles()) {
            let winding = tri.winding_normal().normalize();
            let stored = tri.normal.normalize();
            assert_relative_eq!(winding, stored, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_translation_does_not_touch_normals() {
        let t = CoordinateTransform::from_translation(Vector3::new(5.0, -2.0, 1.0));
        let tris = sample_triangles();
        let moved = t.apply_to_triangles(&tris);
        for (a, b) in tris.iter().zip(&moved) {
            assert_eq!(a.normal, b.normal);
            assert_relative_eq!(b.vertices[0].x, a.vertices[0].x + 5.0);
        }
    }

    #[test]
    fn test_inverse_round_trip() {
        let t = CoordinateTransform {
            axis_mapping: AxisMapping {
                x: Axis::NegZ,
                y: Axis::X,
                z: Axis::Y,
            },
            flip_x: false,
            flip_y: true,
            flip_z: false,
            translation: [1.5, -2.0, 10.0],
        };
        let inverse = t.inverse().unwrap();
        let tris = sample_triangles();
        let round_trip = inverse.apply_to_triangles(&t.apply_to_triangles(&tris));
        for (a, b) in tris.iter().zip(&round_trip) {
            for (va, vb) in a.vertices.iter().zip(&b.vertices) {
                assert_relative_eq!(va, vb, epsilon = 1e-9);
            }
            assert_relative_eq!(a.normal, b.normal, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_singular_mapping_has_no_inverse() {
        let t = CoordinateTransform {
            axis_mapping: AxisMapping {
                x: Axis::X,
                y: Axis::X,
                z: Axis::Z,
            },
            ..CoordinateTransform::IDENTITY
        };
        assert!(t.inverse().is_none());
    }

    #[test]
    fn test_format_defaults_and_key() {
        assert_eq!(
            CoordinateTransform::for_format(ModelFormat::Stl),
            CoordinateTransform::Y_Z_SWAP
        );
        assert_eq!(
            CoordinateTransform::for_format(ModelFormat::Glb),
            CoordinateTransform::CODEC_DEFAULT
        );
        assert_eq!(CoordinateTransform::Y_Z_SWAP.key(), "x,z,y|000|0,0,0");
    }
}
