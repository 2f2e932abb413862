// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use approx::assert_relative_eq;
use pcb3d_core::CircuitJson;
use pcb3d_geometry::bulge::{tessellate_ring, BulgeVertex};
use pcb3d_geometry::profile::signed_area;
use pcb3d_geometry::{create_board_mesh, Mesh};
use std::f64::consts::PI;

fn load(json: &str) -> CircuitJson {
    CircuitJson::from_json_str(json).expect("fixture parses")
}

fn board_mesh(circuit: &CircuitJson) -> Mesh {
    let board = circuit.board().expect("fixture has a board");
    let holes: Vec<_> = circuit.holes().collect();
    let plated: Vec<_> = circuit.plated_holes().collect();
    let cutouts: Vec<_> = circuit.cutouts().collect();
    create_board_mesh(board, board.thickness.unwrap_or(1.6), &holes, &plated, &cutouts)
        .expect("board builds")
}

fn face_area(mesh: &Mesh, up: bool) -> f64 {
    mesh.triangles()
        .iter()
        .filter(|t| if up { t.normal.y > 0.9 } else { t.normal.y < -0.9 })
        .map(|t| t.area())
        .sum()
}

fn polygon_circle_area(radius: f64) -> f64 {
    0.5 * 64.0 * radius * radius * (2.0 * PI / 64.0).sin()
}

#[test]
fn test_board_with_mixed_features() {
    let circuit = load(
        r#"[
        {"type": "pcb_board", "center": {"x": 0, "y": 0}, "width": 60, "height": 40, "thickness": 1.2},
        {"type": "pcb_hole", "x": -20, "y": 10, "hole_shape": "circle", "hole_diameter": 3},
        {"type": "pcb_plated_hole", "x": 20, "y": 10, "shape": "circle", "hole_diameter": 1, "outer_diameter": 2, "layers": ["top", "bottom"]},
        {"type": "pcb_cutout", "shape": "circle", "center": {"x": 0, "y": -10}, "radius": "2mm"},
        {"type": "pcb_cutout", "shape": "rect", "center": {"x": 10, "y": -10}, "width": 4, "height": 2}
    ]"#,
    );
    let mesh = board_mesh(&circuit);

    let expected = 60.0 * 40.0
        - polygon_circle_area(1.5)
        - polygon_circle_area(0.5)
        - polygon_circle_area(2.0)
        - 8.0;
    assert_relative_eq!(face_area(&mesh, true), expected, epsilon = 1e-6);
    assert_relative_eq!(face_area(&mesh, false), expected, epsilon = 1e-6);

    let bounds = mesh.bounding_box();
    assert_relative_eq!(bounds.min.y, -0.6, epsilon = 1e-9);
    assert_relative_eq!(bounds.max.y, 0.6, epsilon = 1e-9);
    assert_relative_eq!(bounds.size().x, 60.0, epsilon = 1e-9);
    assert_relative_eq!(bounds.size().z, 40.0, epsilon = 1e-9);
}

#[test]
fn test_board_holes_land_at_mirrored_scene_positions() {
    // A hole at circuit (+x, +y) must open at scene (+x, +z)
    let circuit = load(
        r#"[
        {"type": "pcb_board", "center": {"x": 0, "y": 0}, "width": 20, "height": 20},
        {"type": "pcb_hole", "x": 5, "y": 5, "hole_diameter": 2}
    ]"#,
    );
    let mesh = board_mesh(&circuit);

    // Hole walls are vertical triangles whose vertices lie on the drill circle
    let wall_vertices: Vec<_> = mesh
        .triangles()
        .iter()
        .filter(|t| t.normal.y.abs() < 1e-6)
        .flat_map(|t| t.vertices.iter())
        .filter(|v| v.x.abs() < 9.0 && v.z.abs() < 9.0)
        .collect();
    assert!(!wall_vertices.is_empty());
    for v in wall_vertices {
        assert_relative_eq!(((v.x - 5.0).powi(2) + (v.z - 5.0).powi(2)).sqrt(), 1.0, epsilon = 1e-6);
    }
}

#[test]
fn test_unknown_shapes_and_foreign_cutouts_leave_board_intact() {
    let circuit = load(
        r#"[
        {"type": "pcb_board", "pcb_board_id": "main", "center": {"x": 0, "y": 0}, "width": 10, "height": 10},
        {"type": "pcb_cutout", "shape": "star", "center": {"x": 0, "y": 0}},
        {"type": "pcb_cutout", "pcb_board_id": "other", "shape": "circle", "center": {"x": 0, "y": 0}, "radius": 1},
        {"type": "pcb_hole", "x": 0, "y": 0, "hole_shape": "pill", "hole_width": 0, "hole_height": 2}
    ]"#,
    );
    let mesh = board_mesh(&circuit);
    assert_relative_eq!(face_area(&mesh, true), 100.0, epsilon = 1e-9);
}

#[test]
fn test_custom_outline_with_bulged_cutout() {
    let circuit = load(
        r#"[
        {"type": "pcb_board", "center": {"x": 0, "y": 0}, "width": 20, "height": 24, "outline": [
            {"x": -10, "y": -10}, {"x": 10, "y": -10}, {"x": 10, "y": 10}, {"x": 0, "y": 14}, {"x": -10, "y": 10}
        ]},
        {"type": "pcb_cutout", "shape": "polygon", "points": [
            {"x": -2, "y": -1}, {"x": 2, "y": -1, "bulge": 1}, {"x": 2, "y": 1}, {"x": -2, "y": 1}
        ]}
    ]"#,
    );
    let mesh = board_mesh(&circuit);

    let cutout = tessellate_ring(&[
        BulgeVertex::new(-2.0, -1.0, 0.0),
        BulgeVertex::new(2.0, -1.0, 1.0),
        BulgeVertex::new(2.0, 1.0, 0.0),
        BulgeVertex::new(-2.0, 1.0, 0.0),
    ]);
    let cutout_area = signed_area(&cutout).abs();
    // Rectangle plus a half disc of radius 1, minus chord error
    assert!(cutout_area > 8.0 + 1.5 && cutout_area < 8.0 + PI / 2.0);

    let expected = 400.0 + 40.0 - cutout_area;
    assert_relative_eq!(face_area(&mesh, true), expected, epsilon = 1e-6);
    assert_relative_eq!(face_area(&mesh, false), expected, epsilon = 1e-6);

    let bounds = mesh.bounding_box();
    assert_relative_eq!(bounds.min.y, -0.8, epsilon = 1e-9);
    assert_relative_eq!(bounds.max.y, 0.8, epsilon = 1e-9);
    assert_relative_eq!(bounds.max.z, 14.0, epsilon = 1e-9);
}
