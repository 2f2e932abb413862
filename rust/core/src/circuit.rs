// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Circuit description records
//!
//! A circuit description is a flat JSON array of elements discriminated by
//! their `type` field. Only the element kinds needed for 3D conversion are
//! modelled; every other kind is kept as [`CircuitElement::Unknown`].
//!
//! Shape-dependent records (cutouts, copper pours) are closed tagged unions
//! with an `Unrecognized` fallthrough so unknown shapes are skipped instead
//! of failing the whole document.

use crate::error::{Error, Result};
use crate::units::{lenient_number, Length, Rotation};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 2D point in circuit coordinates (millimetres, Y up on the board plane)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Point whose coordinates may be missing in malformed input.
/// Polygon vertices may carry a `bulge` describing an arc to the next vertex.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LoosePoint {
    #[serde(default, deserialize_with = "lenient_number")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub y: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub bulge: Option<f64>,
}

impl LoosePoint {
    /// The point, if both coordinates are present and finite
    pub fn finite(&self) -> Option<Point> {
        finite_point(self.x, self.y)
    }
}

/// Point from optional coordinates, `None` unless both are present and finite
#[inline]
pub fn finite_point(x: Option<f64>, y: Option<f64>) -> Option<Point> {
    match (x, y) {
        (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some(Point { x, y }),
        _ => None,
    }
}

impl From<Point> for LoosePoint {
    fn from(p: Point) -> Self {
        Self {
            x: Some(p.x),
            y: Some(p.y),
            bulge: None,
        }
    }
}

/// 3D vector used by CAD placement records
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Board layer reference, either a layer name or a numeric index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Layer {
    Name(String),
    Index(i64),
}

impl Layer {
    pub fn is_bottom(&self) -> bool {
        matches!(self, Layer::Name(name) if name == "bottom")
    }
}

/// True when an optional layer names the bottom side
#[inline]
pub fn is_bottom_layer(layer: Option<&Layer>) -> bool {
    layer.is_some_and(Layer::is_bottom)
}

/// Rectangular or custom-outline board
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PcbBoard {
    #[serde(default)]
    pub pcb_board_id: Option<String>,
    #[serde(default)]
    pub center: Point,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub thickness: Option<f64>,
    #[serde(default)]
    pub outline: Option<Vec<Point>>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub num_layers: Option<u32>,
}

/// Carrier panel holding one or more boards
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PcbPanel {
    #[serde(default)]
    pub pcb_panel_id: Option<String>,
    #[serde(default)]
    pub center: Point,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub outline: Option<Vec<Point>>,
}

/// Borrowed outline description shared by boards and panels
#[derive(Debug, Clone, Copy)]
pub struct OutlineRef<'a> {
    pub center: Point,
    pub width: f64,
    pub height: f64,
    pub outline: Option<&'a [Point]>,
}

impl PcbBoard {
    pub fn outline_ref(&self) -> OutlineRef<'_> {
        OutlineRef {
            center: self.center,
            width: self.width,
            height: self.height,
            outline: self.outline.as_deref(),
        }
    }
}

impl PcbPanel {
    pub fn outline_ref(&self) -> OutlineRef<'_> {
        OutlineRef {
            center: self.center,
            width: self.width,
            height: self.height,
            outline: self.outline.as_deref(),
        }
    }
}

/// Drill shape of an unplated hole
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoleKind {
    Circle,
    Pill,
    RotatedPill,
}

/// Unplated hole
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PcbHole {
    #[serde(default)]
    pub pcb_hole_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub y: Option<f64>,
    #[serde(default)]
    pub hole_shape: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub hole_diameter: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub diameter: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub hole_width: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub hole_height: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub ccw_rotation: Option<f64>,
}

impl PcbHole {
    /// Hole center, `None` when a coordinate is missing or malformed
    pub fn center(&self) -> Option<Point> {
        finite_point(self.x, self.y)
    }

    /// Shape kind; anything that is not a pill drills a round hole
    pub fn kind(&self) -> HoleKind {
        match self.hole_shape.as_deref() {
            Some("pill") => HoleKind::Pill,
            Some("rotated_pill") => HoleKind::RotatedPill,
            _ => HoleKind::Circle,
        }
    }
}

/// Plated through-hole or via
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PcbPlatedHole {
    #[serde(default)]
    pub pcb_plated_hole_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub y: Option<f64>,
    #[serde(default)]
    pub shape: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub hole_offset_x: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub hole_offset_y: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub hole_diameter: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub outer_diameter: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub hole_width: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub hole_height: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub outer_width: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub outer_height: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rect_pad_width: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rect_pad_height: Option<f64>,
    #[serde(default)]
    pub layers: Vec<Layer>,
}

impl PcbPlatedHole {
    /// Pill drills, including pill drills inside rectangular pads
    pub fn is_pill(&self) -> bool {
        matches!(
            self.shape.as_deref(),
            Some("pill") | Some("pill_hole_with_rect_pad")
        )
    }

    /// Pad center, `None` when a coordinate is missing or malformed
    pub fn pad_center(&self) -> Option<Point> {
        finite_point(self.x, self.y)
    }

    /// Drill center including the hole offset from the pad center
    pub fn drill_center(&self) -> Option<Point> {
        let pad = self.pad_center()?;
        finite_point(
            Some(pad.x + self.hole_offset_x.unwrap_or(0.0)),
            Some(pad.y + self.hole_offset_y.unwrap_or(0.0)),
        )
    }
}

/// Cutout shape variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum CutoutShape {
    Rect {
        #[serde(default)]
        center: Option<LoosePoint>,
        #[serde(default)]
        width: Option<Length>,
        #[serde(default)]
        height: Option<Length>,
        #[serde(default)]
        rotation: Option<Rotation>,
    },
    Circle {
        #[serde(default)]
        center: Option<LoosePoint>,
        #[serde(default)]
        radius: Option<Length>,
        #[serde(default)]
        diameter: Option<Length>,
    },
    Polygon {
        #[serde(default)]
        points: Vec<Option<LoosePoint>>,
    },
    #[serde(other)]
    Unrecognized,
}

/// Through-board material removal region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbCutout {
    #[serde(default)]
    pub pcb_cutout_id: Option<String>,
    #[serde(default)]
    pub pcb_board_id: Option<String>,
    #[serde(flatten)]
    pub shape: CutoutShape,
}

impl PcbCutout {
    /// Cutouts belong to a board when they name it or name no board at all
    pub fn applies_to(&self, board: &PcbBoard) -> bool {
        match (&self.pcb_board_id, &board.pcb_board_id) {
            (Some(cutout_board), Some(board_id)) => cutout_board == board_id,
            _ => true,
        }
    }
}

/// Vertex of a boundary-representation ring; `bulge` encodes an arc to the next vertex
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RingVertex {
    #[serde(default, deserialize_with = "lenient_number")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub y: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub bulge: Option<f64>,
}

impl RingVertex {
    pub fn finite(&self) -> Option<Point> {
        finite_point(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BrepRing {
    #[serde(default)]
    pub vertices: Vec<RingVertex>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BrepShape {
    #[serde(default)]
    pub outer_ring: BrepRing,
    #[serde(default)]
    pub inner_rings: Vec<BrepRing>,
}

/// Copper pour shape variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum PourShape {
    Rect {
        #[serde(default)]
        center: Option<LoosePoint>,
        #[serde(default)]
        width: Option<Length>,
        #[serde(default)]
        height: Option<Length>,
        #[serde(default)]
        rotation: Option<Rotation>,
    },
    Polygon {
        #[serde(default)]
        points: Vec<Option<LoosePoint>>,
    },
    Brep {
        #[serde(default)]
        brep_shape: BrepShape,
    },
    #[serde(other)]
    Unrecognized,
}

/// Filled conductive region on one layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbCopperPour {
    #[serde(default)]
    pub pcb_copper_pour_id: Option<String>,
    #[serde(default)]
    pub layer: Option<Layer>,
    #[serde(default)]
    pub covered_with_solder_mask: bool,
    #[serde(default)]
    pub source_net_id: Option<String>,
    #[serde(flatten)]
    pub shape: PourShape,
}

/// Links a placed component to its 3D representation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CadComponent {
    #[serde(default)]
    pub cad_component_id: Option<String>,
    pub pcb_component_id: String,
    #[serde(default)]
    pub source_component_id: Option<String>,
    #[serde(default)]
    pub position: Option<Point3D>,
    #[serde(default)]
    pub rotation: Option<Point3D>,
    #[serde(default)]
    pub size: Option<Point3D>,
    #[serde(default)]
    pub model_stl_url: Option<String>,
    #[serde(default)]
    pub model_obj_url: Option<String>,
    #[serde(default)]
    pub model_glb_url: Option<String>,
    #[serde(default)]
    pub model_gltf_url: Option<String>,
    #[serde(default)]
    pub footprinter_string: Option<String>,
    #[serde(default)]
    pub model_unit_to_mm_scale_factor: Option<f64>,
}

/// Placed component footprint
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PcbComponent {
    pub pcb_component_id: String,
    #[serde(default)]
    pub source_component_id: Option<String>,
    #[serde(default)]
    pub center: Point,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub layer: Option<Layer>,
    #[serde(default)]
    pub rotation: Option<f64>,
}

/// Logical component, carries the human readable name
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceComponent {
    pub source_component_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// One entry of a circuit description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CircuitElement {
    PcbBoard(PcbBoard),
    PcbPanel(PcbPanel),
    PcbHole(PcbHole),
    PcbPlatedHole(PcbPlatedHole),
    PcbCutout(PcbCutout),
    PcbCopperPour(PcbCopperPour),
    CadComponent(CadComponent),
    PcbComponent(PcbComponent),
    SourceComponent(SourceComponent),
    #[serde(other)]
    Unknown,
}

/// Parsed circuit description with id lookups
#[derive(Debug, Clone, Default)]
pub struct CircuitJson {
    elements: Vec<CircuitElement>,
    pcb_component_index: FxHashMap<String, usize>,
    source_component_index: FxHashMap<String, usize>,
}

macro_rules! element_iter {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub fn $name(&self) -> impl Iterator<Item = &$ty> {
            self.elements.iter().filter_map(|e| match e {
                CircuitElement::$variant(inner) => Some(inner),
                _ => None,
            })
        }
    };
}

impl CircuitJson {
    pub fn new(elements: Vec<CircuitElement>) -> Self {
        let mut pcb_component_index = FxHashMap::default();
        let mut source_component_index = FxHashMap::default();

        for (i, element) in elements.iter().enumerate() {
            match element {
                CircuitElement::PcbComponent(c) => {
                    pcb_component_index.entry(c.pcb_component_id.clone()).or_insert(i);
                }
                CircuitElement::SourceComponent(c) => {
                    source_component_index
                        .entry(c.source_component_id.clone())
                        .or_insert(i);
                }
                _ => {}
            }
        }

        Self {
            elements,
            pcb_component_index,
            source_component_index,
        }
    }

    /// Parse from a JSON document (an array of elements)
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json_value(value)
    }

    /// Parse from an already decoded JSON value, reporting the failing element index
    pub fn from_json_value(value: Value) -> Result<Self> {
        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(Error::InvalidElement {
                    index: 0,
                    message: format!("expected an array of elements, got {}", json_kind(&other)),
                })
            }
        };

        let elements = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value(item).map_err(|e| Error::InvalidElement {
                    index,
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<CircuitElement>>>()?;

        Ok(Self::new(elements))
    }

    pub fn elements(&self) -> &[CircuitElement] {
        &self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// First board in the description
    pub fn board(&self) -> Option<&PcbBoard> {
        self.boards().next()
    }

    /// First panel in the description
    pub fn panel(&self) -> Option<&PcbPanel> {
        self.panels().next()
    }

    element_iter!(boards, PcbBoard, PcbBoard);
    element_iter!(panels, PcbPanel, PcbPanel);
    element_iter!(holes, PcbHole, PcbHole);
    element_iter!(plated_holes, PcbPlatedHole, PcbPlatedHole);
    element_iter!(cutouts, PcbCutout, PcbCutout);
    element_iter!(copper_pours, PcbCopperPour, PcbCopperPour);
    element_iter!(cad_components, CadComponent, CadComponent);
    element_iter!(pcb_components, PcbComponent, PcbComponent);
    element_iter!(source_components, SourceComponent, SourceComponent);

    pub fn pcb_component(&self, id: &str) -> Option<&PcbComponent> {
        match self.pcb_component_index.get(id).map(|&i| &self.elements[i]) {
            Some(CircuitElement::PcbComponent(c)) => Some(c),
            _ => None,
        }
    }

    pub fn source_component(&self, id: &str) -> Option<&SourceComponent> {
        match self.source_component_index.get(id).map(|&i| &self.elements[i]) {
            Some(CircuitElement::SourceComponent(c)) => Some(c),
            _ => None,
        }
    }
}

impl From<Vec<CircuitElement>> for CircuitJson {
    fn from(elements: Vec<CircuitElement>) -> Self {
        Self::new(elements)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
