// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Board and panel solids
//!
//! The outline is built in a board-local drafting plane: origin at the
//! board center, Y negated relative to circuit coordinates. It is extruded
//! by the board thickness and centered on Z. Holes and cutouts become
//! subtraction volumes one unit taller than the board, are unioned and
//! subtracted in a single boolean, and the result is rotated -90° about X
//! so the board lies in the scene's XZ plane with its top face at +Y.

use crate::bulge::{has_bulge, tessellate_ring, BulgeVertex};
use crate::csg::{polygons_to_mesh, rotate_polygons, subtract_all};
use crate::error::Result;
use crate::extrusion::extrude_centered;
use crate::mesh::Mesh;
use crate::profile::{
    create_circle, create_rectangle, create_rounded_rectangle, ensure_ccw, Profile2D,
    CIRCLE_SEGMENTS,
};
use nalgebra::{Point2, Rotation3, Vector3};
use pcb3d_core::{
    CutoutShape, HoleKind, LoosePoint, OutlineRef, PcbBoard, PcbCutout, PcbHole, PcbPanel,
    PcbPlatedHole, Point,
};
use rayon::prelude::*;
use std::f64::consts::FRAC_PI_2;

/// Pill corner radii stay this far below half the short side
pub const PILL_RADIUS_EPSILON: f64 = 1e-4;

/// Extra height of subtraction volumes so they pierce both faces
pub const CUTTER_OVERSHOOT: f64 = 1.0;

/// Circuit point to board-local drafting coordinates
#[inline]
pub fn to_board_space(p: Point, origin: Point) -> Point2<f64> {
    Point2::new(p.x - origin.x, -(p.y - origin.y))
}

#[inline]
fn positive(v: Option<f64>) -> Option<f64> {
    v.filter(|v| v.is_finite() && *v > 0.0)
}

/// Rotation about X taking the drafting plane to the scene: (x, y, z) -> (x, z, -y)
#[inline]
pub fn drafting_to_scene() -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2)
}

#[inline]
fn pill_corner_radius(width: f64, height: f64) -> f64 {
    (height / 2.0).min((width.min(height) / 2.0 - PILL_RADIUS_EPSILON).max(0.0))
}

/// A through-board subtraction volume in board-local coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum BoardFeature {
    Circle {
        center: Point2<f64>,
        radius: f64,
    },
    /// Rectangle with optional rounded corners, rotated about its center
    RoundedRect {
        center: Point2<f64>,
        width: f64,
        height: f64,
        corner_radius: f64,
        rotation: f64,
    },
    Polygon {
        points: Vec<Point2<f64>>,
    },
}

impl BoardFeature {
    /// Pill of the given size. Tall pills are laid out wide and turned 90°.
    pub fn pill(center: Point2<f64>, width: f64, height: f64, rotation: f64) -> BoardFeature {
        let (width, height, rotation) = if height > width {
            (height, width, rotation + FRAC_PI_2)
        } else {
            (width, height, rotation)
        };
        BoardFeature::RoundedRect {
            center,
            width,
            height,
            corner_radius: pill_corner_radius(width, height),
            rotation,
        }
    }

    pub fn profile(&self) -> Profile2D {
        match self {
            BoardFeature::Circle { center, radius } => {
                create_circle(*radius, CIRCLE_SEGMENTS).placed(0.0, center.coords)
            }
            BoardFeature::RoundedRect {
                center,
                width,
                height,
                corner_radius,
                rotation,
            } => create_rounded_rectangle(*width, *height, *corner_radius, CIRCLE_SEGMENTS)
                .placed(*rotation, center.coords),
            BoardFeature::Polygon { points } => Profile2D::new(points.clone()),
        }
    }

    /// Cutting solid for a board of the given thickness
    pub fn solid(&self, thickness: f64) -> Result<Mesh> {
        extrude_centered(&self.profile(), thickness + CUTTER_OVERSHOOT)
    }
}

/// Subtraction volume for an unplated hole, `None` when malformed
pub fn hole_feature(hole: &PcbHole, origin: Point) -> Option<BoardFeature> {
    let center = to_board_space(hole.center()?, origin);

    match hole.kind() {
        HoleKind::Circle => {
            let diameter = positive(hole.hole_diameter.or(hole.diameter))?;
            Some(BoardFeature::Circle {
                center,
                radius: diameter / 2.0,
            })
        }
        HoleKind::Pill => {
            let width = positive(hole.hole_width)?;
            let height = positive(hole.hole_height)?;
            Some(BoardFeature::pill(center, width, height, 0.0))
        }
        HoleKind::RotatedPill => {
            let width = positive(hole.hole_width)?;
            let height = positive(hole.hole_height)?;
            // Board space has Y negated, so counter-clockwise input turns clockwise
            let rotation = -hole.ccw_rotation.filter(|r| r.is_finite()).unwrap_or(0.0).to_radians();
            Some(BoardFeature::RoundedRect {
                center,
                width,
                height,
                corner_radius: pill_corner_radius(width, height),
                rotation,
            })
        }
    }
}

/// Drill of a plated hole, offset from the pad center when requested
pub fn plated_hole_feature(hole: &PcbPlatedHole, origin: Point) -> Option<BoardFeature> {
    let center = to_board_space(hole.drill_center()?, origin);

    if hole.is_pill() {
        let width = positive(hole.hole_width.or(hole.outer_diameter))?;
        let height = positive(hole.hole_height.or(hole.hole_diameter))?;
        Some(BoardFeature::pill(center, width, height, 0.0))
    } else {
        let diameter = positive(hole.hole_diameter.or(hole.outer_diameter))?;
        Some(BoardFeature::Circle {
            center,
            radius: diameter / 2.0,
        })
    }
}

/// Finite ring points in circuit coordinates, arcs expanded
pub fn polygon_ring(points: &[Option<LoosePoint>]) -> Option<Vec<Point>> {
    let ring: Vec<BulgeVertex> = points
        .iter()
        .flatten()
        .filter_map(|p| {
            let finite = p.finite()?;
            let bulge = p.bulge.filter(|b| b.is_finite()).unwrap_or(0.0);
            Some(BulgeVertex::new(finite.x, finite.y, bulge))
        })
        .collect();

    if ring.len() < 3 {
        return None;
    }

    let expanded = if has_bulge(&ring) {
        tessellate_ring(&ring)
    } else {
        ring.iter().map(|v| v.point).collect()
    };
    Some(expanded.into_iter().map(|p| Point::new(p.x, p.y)).collect())
}

/// Map a circuit-space ring into board space, counter-clockwise
pub fn board_space_ring(ring: &[Point], origin: Point) -> Vec<Point2<f64>> {
    let mut points: Vec<Point2<f64>> = ring.iter().map(|p| to_board_space(*p, origin)).collect();
    ensure_ccw(&mut points);
    points
}

/// Subtraction volume for a cutout, `None` when malformed or of unknown shape
pub fn cutout_feature(cutout: &PcbCutout, origin: Point) -> Option<BoardFeature> {
    match &cutout.shape {
        CutoutShape::Rect {
            center,
            width,
            height,
            rotation,
        } => {
            let center = center.as_ref()?.finite()?;
            let width = positive(width.as_ref()?.to_mm())?;
            let height = positive(height.as_ref()?.to_mm())?;
            let rotation = rotation.as_ref().map_or(0.0, |r| r.to_radians());
            Some(BoardFeature::RoundedRect {
                center: to_board_space(center, origin),
                width,
                height,
                corner_radius: 0.0,
                rotation: -rotation,
            })
        }
        CutoutShape::Circle {
            center,
            radius,
            diameter,
        } => {
            let center = center.as_ref()?.finite()?;
            let radius = radius
                .as_ref()
                .and_then(|r| r.to_mm())
                .or_else(|| diameter.as_ref().and_then(|d| d.to_mm()).map(|d| d / 2.0));
            Some(BoardFeature::Circle {
                center: to_board_space(center, origin),
                radius: positive(radius)?,
            })
        }
        CutoutShape::Polygon { points } => {
            let ring = polygon_ring(points)?;
            Some(BoardFeature::Polygon {
                points: board_space_ring(&ring, origin),
            })
        }
        CutoutShape::Unrecognized => None,
    }
}

/// Board-local outline: explicit points when there are at least 3, else a rectangle
pub fn outline_profile(outline: &OutlineRef<'_>) -> Profile2D {
    match outline.outline {
        Some(points) if points.len() >= 3 => {
            Profile2D::new(board_space_ring(points, outline.center))
        }
        _ => create_rectangle(outline.width, outline.height),
    }
}

/// Build the finished solid for an outline with the given subtraction volumes
pub fn create_outline_mesh(
    outline: &OutlineRef<'_>,
    thickness: f64,
    features: &[BoardFeature],
) -> Result<Mesh> {
    let body = extrude_centered(&outline_profile(outline), thickness)?;

    // Malformed individual features never abort the board
    let tools: Vec<Mesh> = features
        .par_iter()
        .filter_map(|feature| feature.solid(thickness).ok())
        .collect();

    let mut polygons = subtract_all(&body, &tools)?;
    rotate_polygons(&mut polygons, &drafting_to_scene());
    Ok(polygons_to_mesh(&polygons))
}

/// Collect hole subtraction volumes in board-local coordinates
pub fn hole_features(
    origin: Point,
    holes: &[&PcbHole],
    plated_holes: &[&PcbPlatedHole],
) -> Vec<BoardFeature> {
    holes
        .iter()
        .filter_map(|h| hole_feature(h, origin))
        .chain(plated_holes.iter().filter_map(|h| plated_hole_feature(h, origin)))
        .collect()
}

/// Board solid with holes and cutouts removed.
/// Cutouts naming a different board are ignored.
pub fn create_board_mesh(
    board: &PcbBoard,
    thickness: f64,
    holes: &[&PcbHole],
    plated_holes: &[&PcbPlatedHole],
    cutouts: &[&PcbCutout],
) -> Result<Mesh> {
    let mut features = hole_features(board.center, holes, plated_holes);
    features.extend(
        cutouts
            .iter()
            .filter(|c| c.applies_to(board))
            .filter_map(|c| cutout_feature(c, board.center)),
    );
    create_outline_mesh(&board.outline_ref(), thickness, &features)
}

/// Panel solid; panels take holes but never cutouts
pub fn create_panel_mesh(
    panel: &PcbPanel,
    thickness: f64,
    holes: &[&PcbHole],
    plated_holes: &[&PcbPlatedHole],
) -> Result<Mesh> {
    let features = hole_features(panel.center, holes, plated_holes);
    create_outline_mesh(&panel.outline_ref(), thickness, &features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pcb3d_core::{Length, Rotation};
    use std::f64::consts::PI;

    fn board(width: f64, height: f64) -> PcbBoard {
        PcbBoard {
            center: Point::new(10.0, 20.0),
            width,
            height,
            ..Default::default()
        }
    }

    fn top_area(mesh: &Mesh) -> f64 {
        mesh.triangles()
            .iter()
            .filter(|t| t.normal.y > 0.9)
            .map(|t| t.area())
            .sum()
    }

    fn circle_polygon_area(radius: f64) -> f64 {
        let n = CIRCLE_SEGMENTS as f64;
        0.5 * n * radius * radius * (2.0 * PI / n).sin()
    }

    #[test]
    fn test_plain_board() {
        let mesh = create_board_mesh(&board(50.0, 30.0), 1.6, &[], &[], &[]).unwrap();
        let bounds = mesh.bounding_box();
        assert_relative_eq!(bounds.min.y, -0.8, epsilon = 1e-9);
        assert_relative_eq!(bounds.max.y, 0.8, epsilon = 1e-9);
        assert_relative_eq!(bounds.size().x, 50.0, epsilon = 1e-9);
        assert_relative_eq!(bounds.size().z, 30.0, epsilon = 1e-9);
        assert_relative_eq!(top_area(&mesh), 1500.0, epsilon = 1e-6);
        for t in mesh.triangles() {
            assert_relative_eq!(t.normal.norm(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_board_with_hole_removes_area() {
        let hole = PcbHole {
            x: Some(10.0),
            y: Some(20.0),
            hole_diameter: Some(2.0),
            ..Default::default()
        };
        let mesh = create_board_mesh(&board(50.0, 30.0), 1.6, &[&hole], &[], &[]).unwrap();
        assert_relative_eq!(
            top_area(&mesh),
            1500.0 - circle_polygon_area(1.0),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_malformed_features_are_skipped() {
        let zero = PcbHole {
            x: Some(0.0),
            y: Some(0.0),
            hole_diameter: Some(0.0),
            ..Default::default()
        };
        let nan = PcbHole {
            x: Some(f64::NAN),
            y: Some(0.0),
            hole_diameter: Some(1.0),
            ..Default::default()
        };
        let cutout = PcbCutout {
            pcb_cutout_id: None,
            pcb_board_id: None,
            shape: CutoutShape::Rect {
                center: None,
                width: Some(Length::Number(2.0)),
                height: Some(Length::Number(2.0)),
                rotation: None,
            },
        };
        let mesh =
            create_board_mesh(&board(20.0, 10.0), 1.6, &[&zero, &nan], &[], &[&cutout]).unwrap();
        assert_relative_eq!(top_area(&mesh), 200.0, epsilon = 1e-6);
    }

    #[test]
    fn test_rect_cutout_and_board_filter() {
        let cutout = |board_id: Option<&str>| PcbCutout {
            pcb_cutout_id: None,
            pcb_board_id: board_id.map(str::to_string),
            shape: CutoutShape::Rect {
                center: Some(Point::new(12.0, 20.0).into()),
                width: Some(Length::Text("4mm".into())),
                height: Some(Length::Number(2.0)),
                rotation: Some(Rotation::Degrees(30.0)),
            },
        };
        let mut b = board(50.0, 30.0);
        b.pcb_board_id = Some("b1".into());
        let mine = cutout(Some("b1"));
        let other = cutout(Some("b2"));
        let mesh = create_board_mesh(&b, 1.6, &[], &[], &[&mine, &other]).unwrap();
        assert_relative_eq!(top_area(&mesh), 1500.0 - 8.0, epsilon = 1e-6);
    }

    #[test]
    fn test_pill_auto_rotates() {
        let hole = PcbHole {
            x: Some(0.0),
            y: Some(0.0),
            hole_shape: Some("pill".into()),
            hole_width: Some(1.0),
            hole_height: Some(3.0),
            ..Default::default()
        };
        match hole_feature(&hole, Point::default()).unwrap() {
            BoardFeature::RoundedRect {
                width,
                height,
                corner_radius,
                rotation,
                ..
            } => {
                assert_eq!((width, height), (3.0, 1.0));
                assert_relative_eq!(corner_radius, 0.5 - PILL_RADIUS_EPSILON);
                assert_relative_eq!(rotation, FRAC_PI_2);
            }
            other => panic!("unexpected feature {other:?}"),
        }
    }

    #[test]
    fn test_rotated_pill_negates_rotation() {
        let hole = PcbHole {
            x: Some(1.0),
            y: Some(2.0),
            hole_shape: Some("rotated_pill".into()),
            hole_width: Some(3.0),
            hole_height: Some(1.0),
            ccw_rotation: Some(45.0),
            ..Default::default()
        };
        match hole_feature(&hole, Point::default()).unwrap() {
            BoardFeature::RoundedRect { center, rotation, .. } => {
                assert_eq!(center, Point2::new(1.0, -2.0));
                assert_relative_eq!(rotation, -PI / 4.0);
            }
            other => panic!("unexpected feature {other:?}"),
        }
    }

    #[test]
    fn test_plated_hole_offset_and_fallbacks() {
        let hole = PcbPlatedHole {
            x: Some(5.0),
            y: Some(5.0),
            shape: Some("circle".into()),
            hole_offset_x: Some(1.0),
            outer_diameter: Some(2.0),
            ..Default::default()
        };
        assert_eq!(
            plated_hole_feature(&hole, Point::new(5.0, 5.0)),
            Some(BoardFeature::Circle {
                center: Point2::new(1.0, 0.0),
                radius: 1.0
            })
        );
    }

    #[test]
    fn test_polygon_cutout_clockwise_input() {
        let points = [(9.0, 19.0), (9.0, 21.0), (11.0, 21.0), (11.0, 19.0)]
            .iter()
            .map(|&(x, y)| Some(LoosePoint::from(Point::new(x, y))))
            .collect();
        let cutout = PcbCutout {
            pcb_cutout_id: None,
            pcb_board_id: None,
            shape: CutoutShape::Polygon { points },
        };
        let b = board(20.0, 20.0);
        let feature = cutout_feature(&cutout, b.center).unwrap();
        match &feature {
            BoardFeature::Polygon { points } => assert!(!crate::profile::is_clockwise(points)),
            other => panic!("unexpected feature {other:?}"),
        }
        let mesh = create_outline_mesh(&b.outline_ref(), 1.6, std::slice::from_ref(&feature));
        assert_relative_eq!(top_area(&mesh.unwrap()), 400.0 - 4.0, epsilon = 1e-6);
    }

    #[test]
    fn test_custom_outline_negates_y() {
        let mut b = board(0.0, 0.0);
        b.center = Point::new(0.0, 0.0);
        // Triangle pointing toward +Y in circuit space
        b.outline = Some(vec![
            Point::new(-1.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 4.0),
        ]);
        let mesh = create_board_mesh(&b, 1.0, &[], &[], &[]).unwrap();
        let bounds = mesh.bounding_box();
        // Scene z = circuit y
        assert_relative_eq!(bounds.max.z, 4.0, epsilon = 1e-9);
        assert_relative_eq!(bounds.min.z, 0.0, epsilon = 1e-9);
        assert_relative_eq!(bounds.min.y, -0.5, epsilon = 1e-9);
        assert_relative_eq!(bounds.max.y, 0.5, epsilon = 1e-9);
        assert_relative_eq!(top_area(&mesh), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_panel_ignores_zero_size_holes() {
        let panel = PcbPanel {
            width: 100.0,
            height: 50.0,
            ..Default::default()
        };
        let mesh = create_panel_mesh(&panel, 1.6, &[], &[]).unwrap();
        assert_relative_eq!(top_area(&mesh), 5000.0, epsilon = 1e-6);
    }
}
