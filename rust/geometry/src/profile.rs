// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D Profile definitions and triangulation

use crate::error::{Error, Result};
use crate::triangulation::triangulate_polygon_with_holes;
use nalgebra::{Point2, Rotation2, Vector2};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Segments used for full circles
pub const CIRCLE_SEGMENTS: usize = 64;

/// 2D Profile with optional holes
#[derive(Debug, Clone, PartialEq)]
pub struct Profile2D {
    /// Outer boundary (counter-clockwise)
    pub outer: Vec<Point2<f64>>,
    /// Holes (clockwise)
    pub holes: Vec<Vec<Point2<f64>>>,
}

impl Profile2D {
    /// Create a new profile
    pub fn new(outer: Vec<Point2<f64>>) -> Self {
        Self {
            outer,
            holes: Vec::new(),
        }
    }

    /// Add a hole to the profile
    pub fn add_hole(&mut self, hole: Vec<Point2<f64>>) {
        self.holes.push(hole);
    }

    /// Orient the outer boundary counter-clockwise and every hole clockwise
    pub fn normalized(mut self) -> Self {
        ensure_ccw(&mut self.outer);
        for hole in &mut self.holes {
            if !is_clockwise(hole) {
                hole.reverse();
            }
        }
        self
    }

    /// Rotate by `angle` radians about the origin, then translate by `offset`
    pub fn placed(mut self, angle: f64, offset: Vector2<f64>) -> Self {
        let rotation = Rotation2::new(angle);
        let place = |p: &mut Point2<f64>| *p = rotation * *p + offset;
        self.outer.iter_mut().for_each(place);
        for hole in &mut self.holes {
            hole.iter_mut().for_each(place);
        }
        self
    }

    /// Triangulate the profile using earcutr
    /// Returns triangle indices into the flattened vertex array
    pub fn triangulate(&self) -> Result<Triangulation> {
        if self.outer.len() < 3 {
            return Err(Error::InvalidProfile(
                "Profile must have at least 3 vertices".to_string(),
            ));
        }

        let indices = triangulate_polygon_with_holes(&self.outer, &self.holes)?;

        let mut points = Vec::with_capacity(
            self.outer.len() + self.holes.iter().map(Vec::len).sum::<usize>(),
        );
        points.extend_from_slice(&self.outer);
        for hole in &self.holes {
            points.extend_from_slice(hole);
        }

        Ok(Triangulation { points, indices })
    }
}

/// Triangulated profile result
#[derive(Debug, Clone)]
pub struct Triangulation {
    /// All vertices (outer + holes)
    pub points: Vec<Point2<f64>>,
    /// Triangle indices
    pub indices: Vec<usize>,
}

/// Shoelace area, positive for counter-clockwise rings
pub fn signed_area(points: &[Point2<f64>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let a = &points[i];
            let b = &points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum();
    twice * 0.5
}

/// Degenerate rings count as clockwise
#[inline]
pub fn is_clockwise(points: &[Point2<f64>]) -> bool {
    signed_area(points) <= 0.0
}

/// Reverse a ring in place if it is not counter-clockwise
#[inline]
pub fn ensure_ccw(points: &mut [Point2<f64>]) {
    if is_clockwise(points) {
        points.reverse();
    }
}

/// Create a rectangular profile
#[inline]
pub fn create_rectangle(width: f64, height: f64) -> Profile2D {
    let half_w = width / 2.0;
    let half_h = height / 2.0;

    Profile2D::new(vec![
        Point2::new(-half_w, -half_h),
        Point2::new(half_w, -half_h),
        Point2::new(half_w, half_h),
        Point2::new(-half_w, half_h),
    ])
}

/// Create a circular profile centered on the origin
pub fn create_circle(radius: f64, segments: usize) -> Profile2D {
    let segments = segments.max(3);
    let outer = (0..segments)
        .map(|i| {
            let angle = TAU * (i as f64) / (segments as f64);
            Point2::new(radius * angle.cos(), radius * angle.sin())
        })
        .collect();
    Profile2D::new(outer)
}

/// Rectangle with circular corners.
///
/// `segments` counts a full circle; each corner gets a quarter of them.
/// A non-positive radius gives a plain rectangle. The radius is clamped
/// to half the smaller side.
pub fn create_rounded_rectangle(width: f64, height: f64, radius: f64, segments: usize) -> Profile2D {
    let half_w = width / 2.0;
    let half_h = height / 2.0;
    let r = radius.min(half_w).min(half_h);
    if !(r > 0.0) {
        return create_rectangle(width, height);
    }

    let per_corner = (segments / 4).max(1);
    let corners = [
        (Point2::new(half_w - r, -half_h + r), -FRAC_PI_2),
        (Point2::new(half_w - r, half_h - r), 0.0),
        (Point2::new(-half_w + r, half_h - r), FRAC_PI_2),
        (Point2::new(-half_w + r, -half_h + r), PI),
    ];

    let mut outer = Vec::with_capacity(4 * (per_corner + 1));
    for (center, start) in corners {
        for j in 0..=per_corner {
            let angle = start + FRAC_PI_2 * (j as f64) / (per_corner as f64);
            outer.push(Point2::new(
                center.x + r * angle.cos(),
                center.y + r * angle.sin(),
            ));
        }
    }
    dedup_ring(&mut outer, 1e-9);

    Profile2D::new(outer)
}

/// Drop consecutive near-duplicate points, including the closing pair
pub fn dedup_ring(points: &mut Vec<Point2<f64>>, tolerance: f64) {
    points.dedup_by(|a, b| (*a - *b).norm() <= tolerance);
    while points.len() > 1 {
        let first = points[0];
        match points.last() {
            Some(last) if (last - first).norm() <= tolerance => {
                points.pop();
            }
            _ => break,
        }
    }
}
