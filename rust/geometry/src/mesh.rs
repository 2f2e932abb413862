// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures
//!
//! Meshes are triangle soups: every triangle owns its three corners, a
//! facet normal and an optional per-triangle color or material slot. The
//! bounding box is maintained alongside the triangles and is never stale.

use nalgebra::{Point3, Vector3};
use std::sync::Arc;

/// sRGB color with 0-255 channels and 0-1 alpha
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Color {
    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Build from linear 0-1 channels, rounding RGB to the nearest byte
    pub fn from_unit_rgba(rgba: [f64; 4]) -> Self {
        let byte = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self {
            r: byte(rgba[0]),
            g: byte(rgba[1]),
            b: byte(rgba[2]),
            a: if rgba[3].is_finite() { rgba[3].clamp(0.0, 1.0) } else { 1.0 },
        }
    }

    /// Channels as 0-1 floats, the form glTF base colors use
    #[inline]
    pub fn to_unit_rgba(&self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32,
        ]
    }

    /// Stable string identity, used to group triangles by color
    pub fn key(&self) -> String {
        format!("{},{},{},{}", self.r, self.g, self.b, self.a)
    }
}

/// Named surface color
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub color: Color,
}

impl Material {
    pub fn new(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }
}

/// Single facet of a mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Point3<f64>; 3],
    /// Facet normal, not guaranteed to be unit length
    pub normal: Vector3<f64>,
    pub color: Option<Color>,
    pub material_index: Option<usize>,
}

impl Triangle {
    #[inline]
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self {
            vertices: [v0, v1, v2],
            normal,
            color: None,
            material_index: None,
        }
    }

    /// Triangle whose normal is the raw edge cross product (length = 2 * area)
    #[inline]
    pub fn from_vertices(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        let normal = (v1 - v0).cross(&(v2 - v0));
        Self::new(v0, v1, v2, normal)
    }

    #[inline]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    #[inline]
    pub fn with_material(mut self, index: usize) -> Self {
        self.material_index = Some(index);
        self
    }

    /// Normal implied by the winding, right-hand rule
    #[inline]
    pub fn winding_normal(&self) -> Vector3<f64> {
        let [v0, v1, v2] = &self.vertices;
        (v1 - v0).cross(&(v2 - v0))
    }

    /// Unit normal; falls back to the winding normal, then to +Y
    pub fn unit_normal(&self) -> Vector3<f64> {
        self.normal
            .try_normalize(1e-12)
            .or_else(|| self.winding_normal().try_normalize(1e-12))
            .unwrap_or_else(Vector3::y)
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.winding_normal().norm() * 0.5
    }

    /// Same facet seen from the other side
    #[inline]
    pub fn flipped(&self) -> Self {
        let [v0, v1, v2] = self.vertices;
        Self {
            vertices: [v0, v2, v1],
            normal: -self.normal,
            ..self.clone()
        }
    }
}

/// Axis-aligned bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Default for BoundingBox {
    /// Degenerate box at the origin, used for empty meshes
    fn default() -> Self {
        Self {
            min: Point3::origin(),
            max: Point3::origin(),
        }
    }
}

impl BoundingBox {
    #[inline]
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Bounds of a point set; `None` when the set is empty
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3<f64>>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bounds = Self::new(first, first);
        for p in iter {
            bounds.include(p);
        }
        Some(bounds)
    }

    #[inline]
    pub fn include(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    #[inline]
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }

    #[inline]
    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Uniform scale about the origin, keeping min <= max for negative factors
    pub fn scaled(&self, k: f64) -> BoundingBox {
        let a = self.min * k;
        let b = self.max * k;
        BoundingBox::new(a.inf(&b), a.sup(&b))
    }
}

/// Triangle mesh with cached bounds and an optional material table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    triangles: Vec<Triangle>,
    bounding_box: BoundingBox,
    /// Material slots, keyed by position. Empty means a single uncolored surface.
    materials: Vec<Material>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(triangle_count: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(triangle_count),
            ..Self::default()
        }
    }

    /// Mesh whose bounds are computed from its triangles
    pub fn from_triangles(triangles: Vec<Triangle>) -> Self {
        let bounding_box = triangle_bounds(&triangles);
        Self {
            triangles,
            bounding_box,
            materials: Vec::new(),
        }
    }

    /// Mesh with externally supplied bounds, e.g. those of the solid it was tessellated from
    pub fn with_bounding_box(triangles: Vec<Triangle>, bounding_box: BoundingBox) -> Self {
        Self {
            triangles,
            bounding_box,
            materials: Vec::new(),
        }
    }

    /// Attach a material table; triangle `material_index` values refer into it
    pub fn with_materials(mut self, materials: Vec<Material>) -> Self {
        self.materials = materials;
        self
    }

    #[inline]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    #[inline]
    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    #[inline]
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    #[inline]
    pub fn has_materials(&self) -> bool {
        !self.materials.is_empty()
    }

    /// Add a triangle, growing the bounds
    pub fn push(&mut self, triangle: Triangle) {
        if self.triangles.is_empty() {
            self.bounding_box = BoundingBox::new(triangle.vertices[0], triangle.vertices[0]);
        }
        for v in &triangle.vertices {
            self.bounding_box.include(v);
        }
        self.triangles.push(triangle);
    }

    /// Merge another mesh into this one, renumbering its material slots
    pub fn merge(&mut self, other: &Mesh) {
        if other.is_empty() {
            return;
        }
        let offset = self.materials.len();
        self.materials.extend(other.materials.iter().cloned());
        self.triangles.reserve(other.triangles.len());
        for t in &other.triangles {
            let mut t = t.clone();
            t.material_index = t.material_index.map(|i| i + offset);
            self.push(t);
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Apply `f` to every triangle and recompute bounds
    pub fn map_triangles<F>(&self, f: F) -> Mesh
    where
        F: FnMut(&Triangle) -> Triangle,
    {
        Mesh {
            materials: self.materials.clone(),
            ..Mesh::from_triangles(self.triangles.iter().map(f).collect())
        }
    }
}

fn triangle_bounds(triangles: &[Triangle]) -> BoundingBox {
    BoundingBox::from_points(triangles.iter().flat_map(|t| t.vertices.iter())).unwrap_or_default()
}

/// Uniformly scale a shared mesh.
///
/// Vertices and bounds are multiplied by `k`; normals are left untouched.
/// `k == 1` or a non-finite `k` returns the same allocation.
pub fn scale_mesh(mesh: &Arc<Mesh>, k: f64) -> Arc<Mesh> {
    if k == 1.0 || !k.is_finite() {
        return Arc::clone(mesh);
    }

    let triangles = mesh
        .triangles
        .iter()
        .map(|t| Triangle {
            vertices: t.vertices.map(|v| v * k),
            ..t.clone()
        })
        .collect();

    Arc::new(Mesh {
        triangles,
        bounding_box: mesh.bounding_box.scaled(k),
        materials: mesh.materials.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_triangle() -> Triangle {
        Triangle::from_vertices(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn test_triangle_normal_and_area() {
        let t = unit_triangle();
        assert_relative_eq!(t.normal, Vector3::new(0.0, 0.0, 1.0));
        assert_relative_eq!(t.area(), 0.5);
        assert_relative_eq!(t.flipped().winding_normal().z, -1.0);
    }

    #[test]
    fn test_empty_mesh_bounds_at_origin() {
        let mesh = Mesh::new();
        assert!(mesh.is_empty());
        assert_eq!(mesh.bounding_box().min, Point3::origin());
        assert_eq!(mesh.bounding_box().max, Point3::origin());
    }

    #[test]
    fn test_push_tracks_bounds() {
        let mut mesh = Mesh::new();
        mesh.push(Triangle::from_vertices(
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(2.0, 1.0, 1.0),
            Point3::new(1.0, 3.0, 1.0),
        ));
        assert_eq!(mesh.bounding_box().min, Point3::new(1.0, 1.0, 1.0));
        assert_eq!(mesh.bounding_box().max, Point3::new(2.0, 3.0, 1.0));
    }

    #[test]
    fn test_merge_renumbers_materials() {
        let red = Material::new("red", Color::rgb(255, 0, 0));
        let blue = Material::new("blue", Color::rgb(0, 0, 255));
        let mut a = Mesh::from_triangles(vec![unit_triangle().with_material(0)])
            .with_materials(vec![red]);
        let b = Mesh::from_triangles(vec![unit_triangle().with_material(0)])
            .with_materials(vec![blue.clone()]);
        a.merge(&b);
        assert_eq!(a.triangle_count(), 2);
        assert_eq!(a.triangles()[1].material_index, Some(1));
        assert_eq!(a.materials()[1], blue);
    }

    #[test]
    fn test_scale_identity_returns_same_allocation() {
        let mesh = Arc::new(Mesh::from_triangles(vec![unit_triangle()]));
        assert!(Arc::ptr_eq(&mesh, &scale_mesh(&mesh, 1.0)));
        assert!(Arc::ptr_eq(&mesh, &scale_mesh(&mesh, f64::NAN)));
    }

    #[test]
    fn test_scale_multiplies_vertices_not_normals() {
        let mesh = Arc::new(Mesh::from_triangles(vec![unit_triangle()]));
        let scaled = scale_mesh(&mesh, 2.5);
        assert_relative_eq!(scaled.triangles()[0].vertices[1].x, 2.5);
        assert_relative_eq!(scaled.triangles()[0].normal, mesh.triangles()[0].normal);
        assert_relative_eq!(scaled.bounding_box().max.y, 2.5);
    }

    #[test]
    fn test_color_from_unit() {
        let c = Color::from_unit_rgba([1.0, 0.5, 0.0, 0.25]);
        assert_eq!((c.r, c.g, c.b), (255, 128, 0));
        assert_relative_eq!(c.a, 0.25);
        assert_eq!(c.key(), "255,128,0,0.25");
    }
}
