// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # PCB3D Core
//!
//! Typed view of a circuit board description: boards, panels, holes,
//! cutouts, copper pours and component placements, plus resolution of the
//! unit-bearing length and rotation notations those records use.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pcb3d_core::CircuitJson;
//!
//! let circuit = CircuitJson::from_json_str(r#"[
//!     {"type": "pcb_board", "center": {"x": 0, "y": 0}, "width": 50, "height": 30}
//! ]"#)?;
//! let board = circuit.board().unwrap();
//! assert_eq!(board.width, 50.0);
//! ```

pub mod circuit;
pub mod error;
pub mod units;

pub use circuit::{
    finite_point, is_bottom_layer, BrepRing, BrepShape, CadComponent, CircuitElement, CircuitJson,
    CutoutShape, HoleKind, Layer, LoosePoint, OutlineRef, PcbBoard, PcbComponent,
    PcbCopperPour, PcbCutout, PcbHole, PcbPanel, PcbPlatedHole, Point, Point3D, PourShape,
    RingVertex, SourceComponent,
};
pub use error::{Error, Result};
pub use units::{lenient_number, rotation_radians, Length, Rotation, MM_PER_INCH, MM_PER_MIL};
