// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Copper pour solids
//!
//! Pours are thin extrusions of their outline, built in the same board-local
//! drafting plane as the board and rotated into the scene the same way.

use crate::board::{board_space_ring, drafting_to_scene, polygon_ring, to_board_space};
use crate::bulge::{tessellate_ring, BulgeVertex};
use crate::error::Result;
use crate::extrusion::{apply_transform, extrude_centered};
use crate::mesh::Mesh;
use crate::profile::{create_rectangle, is_clockwise, Profile2D};
use pcb3d_core::{BrepRing, PcbCopperPour, Point, PourShape};

fn brep_ring_points(ring: &BrepRing) -> Option<Vec<Point>> {
    let vertices: Vec<BulgeVertex> = ring
        .vertices
        .iter()
        .filter_map(|v| {
            let p = v.finite()?;
            Some(BulgeVertex::new(p.x, p.y, v.bulge.filter(|b| b.is_finite()).unwrap_or(0.0)))
        })
        .collect();
    if vertices.len() < 3 {
        return None;
    }
    Some(
        tessellate_ring(&vertices)
            .into_iter()
            .map(|p| Point::new(p.x, p.y))
            .collect(),
    )
}

/// Board-local outline of a pour; `None` when malformed or of unknown shape
pub fn pour_profile(pour: &PcbCopperPour, origin: Point) -> Option<Profile2D> {
    match &pour.shape {
        PourShape::Rect {
            center,
            width,
            height,
            rotation,
        } => {
            let center = center.as_ref()?.finite()?;
            let width = width.as_ref()?.to_mm().filter(|w| *w > 0.0)?;
            let height = height.as_ref()?.to_mm().filter(|h| *h > 0.0)?;
            let rotation = rotation.as_ref().map_or(0.0, |r| r.to_radians());
            Some(create_rectangle(width, height).placed(-rotation, to_board_space(center, origin).coords))
        }
        PourShape::Polygon { points } => {
            let ring = polygon_ring(points)?;
            Some(Profile2D::new(board_space_ring(&ring, origin)))
        }
        PourShape::Brep { brep_shape } => {
            let outer = brep_ring_points(&brep_shape.outer_ring)?;
            let mut profile = Profile2D::new(board_space_ring(&outer, origin));
            for inner in brep_shape.inner_rings.iter().filter_map(brep_ring_points) {
                let mut hole = board_space_ring(&inner, origin);
                if !is_clockwise(&hole) {
                    hole.reverse();
                }
                profile.add_hole(hole);
            }
            Some(profile)
        }
        PourShape::Unrecognized => None,
    }
}

/// Pour solid in scene orientation, centered on y = 0 around the board origin.
/// Returns `Ok(None)` for pours whose shape cannot be resolved.
pub fn create_copper_pour_mesh(
    pour: &PcbCopperPour,
    origin: Point,
    copper_thickness: f64,
) -> Result<Option<Mesh>> {
    let Some(profile) = pour_profile(pour, origin) else {
        return Ok(None);
    };
    let slab = extrude_centered(&profile, copper_thickness)?;
    Ok(Some(apply_transform(
        &slab,
        &drafting_to_scene().to_homogeneous(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pcb3d_core::{BrepShape, Layer, Length, LoosePoint, RingVertex};

    fn pour(shape: PourShape) -> PcbCopperPour {
        PcbCopperPour {
            pcb_copper_pour_id: None,
            layer: Some(Layer::Name("top".into())),
            covered_with_solder_mask: false,
            source_net_id: None,
            shape,
        }
    }

    fn square_ring(x0: f64, y0: f64, size: f64) -> BrepRing {
        BrepRing {
            vertices: vec![
                RingVertex { x: Some(x0), y: Some(y0), bulge: None },
                RingVertex { x: Some(x0 + size), y: Some(y0), bulge: None },
                RingVertex { x: Some(x0 + size), y: Some(y0 + size), bulge: None },
                RingVertex { x: Some(x0), y: Some(y0 + size), bulge: None },
            ],
        }
    }

    fn top_area(mesh: &Mesh) -> f64 {
        mesh.triangles()
            .iter()
            .filter(|t| t.normal.y > 0.9)
            .map(|t| t.area())
            .sum()
    }

    #[test]
    fn test_rect_pour() {
        let p = pour(PourShape::Rect {
            center: Some(Point::new(3.0, 4.0).into()),
            width: Some(Length::Number(2.0)),
            height: Some(Length::Number(1.0)),
            rotation: None,
        });
        let mesh = create_copper_pour_mesh(&p, Point::default(), 0.035).unwrap().unwrap();
        let bounds = mesh.bounding_box();
        assert_relative_eq!(bounds.min.y, -0.0175, epsilon = 1e-9);
        assert_relative_eq!(bounds.max.y, 0.0175, epsilon = 1e-9);
        assert_relative_eq!(bounds.center().x, 3.0, epsilon = 1e-9);
        assert_relative_eq!(bounds.center().z, 4.0, epsilon = 1e-9);
        assert_relative_eq!(top_area(&mesh), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_brep_pour_with_inner_ring() {
        let p = pour(PourShape::Brep {
            brep_shape: BrepShape {
                outer_ring: square_ring(0.0, 0.0, 10.0),
                inner_rings: vec![square_ring(2.0, 2.0, 2.0)],
            },
        });
        let mesh = create_copper_pour_mesh(&p, Point::default(), 0.035).unwrap().unwrap();
        assert_relative_eq!(top_area(&mesh), 96.0, epsilon = 1e-9);
    }

    #[test]
    fn test_malformed_pours_are_skipped() {
        let p = pour(PourShape::Polygon {
            points: vec![Some(LoosePoint::from(Point::new(0.0, 0.0))), None],
        });
        assert!(create_copper_pour_mesh(&p, Point::default(), 0.035).unwrap().is_none());
        assert!(create_copper_pour_mesh(&pour(PourShape::Unrecognized), Point::default(), 0.035)
            .unwrap()
            .is_none());

        let mut ring = square_ring(0.0, 0.0, 10.0);
        ring.vertices[1].x = None;
        ring.vertices[2].y = None;
        let brep = pour(PourShape::Brep {
            brep_shape: BrepShape {
                outer_ring: ring,
                inner_rings: vec![],
            },
        });
        assert!(create_copper_pour_mesh(&brep, Point::default(), 0.035).unwrap().is_none());
        let empty = pour(PourShape::Brep {
            brep_shape: BrepShape::default(),
        });
        assert!(create_copper_pour_mesh(&empty, Point::default(), 0.035).unwrap().is_none());
    }
}
