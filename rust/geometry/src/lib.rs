// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! PCB3D Geometry Processing
//!
//! Procedural board solids built from 2D outlines with earcutr
//! triangulation, csgrs booleans and nalgebra transforms, plus the triangle
//! mesh model shared by every loader.

pub mod board;
pub mod bulge;
pub mod csg;
pub mod error;
pub mod extrusion;
pub mod mesh;
pub mod pour;
pub mod primitives;
pub mod profile;
pub mod transform;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

pub use board::{create_board_mesh, create_outline_mesh, create_panel_mesh, BoardFeature};
pub use error::{Error, Result};
pub use extrusion::{extrude_centered, extrude_profile};
pub use mesh::{scale_mesh, BoundingBox, Color, Material, Mesh, Triangle};
pub use pour::create_copper_pour_mesh;
pub use primitives::{box_between, centered_box};
pub use profile::Profile2D;
pub use transform::{Axis, AxisMapping, CoordinateTransform, ModelFormat};
pub use triangulation::triangulate_polygon;
