// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bulge arc tessellation
//!
//! A ring vertex may carry a bulge `b = tan(θ/4)` where θ is the included
//! angle of the arc running to the next vertex. Positive bulges sweep
//! counter-clockwise, negative ones clockwise; zero is a straight edge.

use nalgebra::{Point2, Vector2};
use smallvec::SmallVec;
use std::f64::consts::{PI, TAU};

/// Below this magnitude a bulge, or a chord length, is treated as straight
pub const BULGE_EPSILON: f64 = 1e-4;

/// Arc segments per half turn of sweep
pub const SEGMENTS_PER_HALF_TURN: f64 = 32.0;

/// Ring vertex with an optional arc to its successor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BulgeVertex {
    pub point: Point2<f64>,
    pub bulge: f64,
}

impl BulgeVertex {
    #[inline]
    pub fn new(x: f64, y: f64, bulge: f64) -> Self {
        Self {
            point: Point2::new(x, y),
            bulge,
        }
    }
}

/// Points along the edge from `start` to `end`, excluding `end`
pub fn tessellate_edge(
    start: Point2<f64>,
    end: Point2<f64>,
    bulge: f64,
) -> SmallVec<[Point2<f64>; 8]> {
    let mut out = SmallVec::new();
    let chord = end - start;
    let c = chord.norm();

    if !bulge.is_finite() || bulge.abs() < BULGE_EPSILON || c < BULGE_EPSILON {
        out.push(start);
        return out;
    }

    let theta = 4.0 * bulge.atan();
    let half_chord = c / 2.0;
    let radius = (half_chord / (theta / 2.0).sin()).abs();
    let sagitta = bulge.abs() * half_chord;
    let mid = nalgebra::center(&start, &end);
    // Left of travel; the center sits on the left for positive bulges up to a half turn
    let perp = Vector2::new(-chord.y, chord.x) / c;
    let apothem = radius - sagitta;
    let center = mid + perp * apothem * bulge.signum();

    let start_angle = (start.y - center.y).atan2(start.x - center.x);
    let end_angle = (end.y - center.y).atan2(end.x - center.x);
    let mut sweep = end_angle - start_angle;
    if bulge > 0.0 {
        while sweep <= 0.0 {
            sweep += TAU;
        }
    } else {
        while sweep >= 0.0 {
            sweep -= TAU;
        }
    }

    let segments = ((sweep.abs() * SEGMENTS_PER_HALF_TURN / PI - 1e-9).ceil() as usize).max(3);
    out.push(start);
    for j in 1..segments {
        let angle = start_angle + sweep * (j as f64) / (segments as f64);
        out.push(Point2::new(
            center.x + radius * angle.cos(),
            center.y + radius * angle.sin(),
        ));
    }
    out
}

/// Expand a closed ring, turning every bulged edge into an arc polyline
pub fn tessellate_ring(vertices: &[BulgeVertex]) -> Vec<Point2<f64>> {
    let n = vertices.len();
    let mut out = Vec::with_capacity(n);
    for (i, v) in vertices.iter().enumerate() {
        let next = &vertices[(i + 1) % n];
        out.extend(tessellate_edge(v.point, next.point, v.bulge));
    }
    out
}

/// True if any vertex carries a non-zero bulge
#[inline]
pub fn has_bulge(vertices: &[BulgeVertex]) -> bool {
    vertices.iter().any(|v| v.bulge.abs() >= BULGE_EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::signed_area;
    use approx::assert_relative_eq;

    #[test]
    fn test_straight_edges_pass_through() {
        let ring = [
            BulgeVertex::new(0.0, 0.0, 0.0),
            BulgeVertex::new(1.0, 0.0, 0.0),
            BulgeVertex::new(1.0, 1.0, 0.0),
        ];
        assert!(!has_bulge(&ring));
        let points = tessellate_ring(&ring);
        assert_eq!(points.len(), 3);
        assert_eq!(points[1], Point2::new(1.0, 0.0));
    }

    #[test]
    fn test_semicircle_points_on_arc() {
        // bulge 1 is a half turn; arc from (0,0) to (2,0) centered at (1,0)
        let points = tessellate_edge(Point2::new(0.0, 0.0), Point2::new(2.0, 0.0), 1.0);
        assert_eq!(points.len(), 32);
        assert_eq!(points[0], Point2::new(0.0, 0.0));
        for p in &points {
            assert_relative_eq!((p - Point2::new(1.0, 0.0)).norm(), 1.0, epsilon = 1e-9);
        }
        // Counter-clockwise from (0,0) passes below the chord
        assert!(points[16].y < -0.99);
    }

    #[test]
    fn test_negative_bulge_sweeps_other_side() {
        let points = tessellate_edge(Point2::new(0.0, 0.0), Point2::new(2.0, 0.0), -1.0);
        assert!(points[16].y > 0.99);
    }

    #[test]
    fn test_small_arc_center() {
        // Quarter arc: θ = 90°, b = tan(22.5°)
        let b = (PI / 8.0).tan();
        let points = tessellate_edge(Point2::new(1.0, 0.0), Point2::new(0.0, 1.0), b);
        for p in &points {
            assert_relative_eq!(p.coords.norm(), 1.0, epsilon = 1e-9);
        }
        assert_eq!(points.len(), 16);
    }

    #[test]
    fn test_minimum_segments() {
        let points = tessellate_edge(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), 0.001);
        assert_eq!(points.len(), 3);
    }

    #[test]
    fn test_degenerate_chord_emits_start() {
        let points = tessellate_edge(Point2::new(1.0, 1.0), Point2::new(1.0, 1.00001), 1.0);
        assert_eq!(points.as_slice(), &[Point2::new(1.0, 1.0)]);
    }

    #[test]
    fn test_bulged_square_side_grows_area() {
        // Unit square with the bottom edge bulging outward into a half disc
        let ring = [
            BulgeVertex::new(0.0, 0.0, 1.0),
            BulgeVertex::new(1.0, 0.0, 0.0),
            BulgeVertex::new(1.0, 1.0, 0.0),
            BulgeVertex::new(0.0, 1.0, 0.0),
        ];
        let points = tessellate_ring(&ring);
        let area = signed_area(&points);
        assert_relative_eq!(area, 1.0 + PI / 8.0, epsilon = 1e-2);
    }
}
