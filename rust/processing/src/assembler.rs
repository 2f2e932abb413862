// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene assembly
//!
//! Runs once per circuit: board or panel first, then component models
//! (loaded in parallel), placeholders, optional copper solids, and finally
//! the camera and lights. Model, texture and label failures degrade to
//! flat colors; only board geometry errors abort the conversion.

use crate::cache::{CacheConfig, LabelCache, MeshCache};
use crate::error::Result;
use crate::loaders::{Fetcher, ModelLoader, ModelSource};
use crate::scene::{Box3D, Camera, Light, Scene};
use crate::texture::{create_label_texture, render_board_textures, LabelStyle, Rasterizer};
use pcb3d_core::{
    is_bottom_layer, CadComponent, CircuitJson, OutlineRef, PcbComponent, PcbCutout, PcbHole,
    PcbPlatedHole, Point, Point3D,
};
use pcb3d_geometry::{
    create_board_mesh, create_copper_pour_mesh, create_panel_mesh, scale_mesh, Color,
    CoordinateTransform, Mesh, ModelFormat,
};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::f64::consts::PI;
use std::sync::Arc;

pub const DEFAULT_BOARD_THICKNESS: f64 = 1.6;
pub const DEFAULT_COMPONENT_HEIGHT: f64 = 2.0;
pub const COPPER_THICKNESS: f64 = 0.035;
pub const DEFAULT_TEXTURE_RESOLUTION: u32 = 1024;

pub const BOARD_COLOR: Color = Color::rgba(0, 140, 0, 0.8);
pub const COMPONENT_COLOR: Color = Color::rgba(128, 128, 128, 0.5);
pub const COPPER_COLOR: Color = Color::rgb(0xC8, 0x7B, 0x4B);
const WHITE: Color = Color::rgb(255, 255, 255);

/// Knobs for [`Converter::convert_circuit_to_scene`]
#[derive(Debug, Clone, PartialEq)]
pub struct SceneOptions {
    pub board_color: Color,
    pub component_color: Color,
    pub copper_color: Color,
    /// Used when the board does not state its own thickness
    pub board_thickness: f64,
    pub default_component_height: f64,
    pub copper_thickness: f64,
    pub render_board_textures: bool,
    pub texture_resolution: u32,
    pub render_copper_pours_as_3d: bool,
    /// Emit placeholder boxes for components without a model
    pub show_bounding_boxes: bool,
    /// Rasterize placeholder labels when a rasterizer is available
    pub render_label_textures: bool,
    /// Load model meshes; otherwise boxes only record the model reference
    pub include_models: bool,
    /// Replaces every format's default transform
    pub coordinate_transform: Option<CoordinateTransform>,
    pub label_style: LabelStyle,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            board_color: BOARD_COLOR,
            component_color: COMPONENT_COLOR,
            copper_color: COPPER_COLOR,
            board_thickness: DEFAULT_BOARD_THICKNESS,
            default_component_height: DEFAULT_COMPONENT_HEIGHT,
            copper_thickness: COPPER_THICKNESS,
            render_board_textures: true,
            texture_resolution: DEFAULT_TEXTURE_RESOLUTION,
            render_copper_pours_as_3d: false,
            show_bounding_boxes: true,
            render_label_textures: true,
            include_models: true,
            coordinate_transform: None,
            label_style: LabelStyle::default(),
        }
    }
}

/// Conversion context: model loader, label cache and optional rasterizer.
///
/// Cheap to clone; clones share caches.
#[derive(Clone)]
pub struct Converter {
    loader: ModelLoader,
    labels: Arc<LabelCache>,
    rasterizer: Option<Arc<dyn Rasterizer>>,
}

impl Converter {
    pub fn new(fetcher: Arc<dyn Fetcher>, caches: CacheConfig) -> Self {
        Self {
            loader: ModelLoader::new(fetcher, Arc::new(MeshCache::new(caches.mesh_capacity))),
            labels: Arc::new(LabelCache::new(caches.label_capacity)),
            rasterizer: None,
        }
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn loader(&self) -> &ModelLoader {
        &self.loader
    }

    pub fn label_cache(&self) -> &LabelCache {
        &self.labels
    }

    pub fn rasterizer(&self) -> Option<&dyn Rasterizer> {
        self.rasterizer.as_deref()
    }

    /// Assemble the scene for a circuit
    pub fn convert_circuit_to_scene(&self, circuit: &CircuitJson, options: &SceneOptions) -> Result<Scene> {
        let board = circuit.board();
        let thickness = board
            .and_then(|b| b.thickness)
            .filter(|t| t.is_finite() && *t > 0.0)
            .unwrap_or(options.board_thickness);

        let mut boxes = Vec::new();
        let origin = match self.board_box(circuit, thickness, options)? {
            Some((board_box, origin)) => {
                boxes.push(board_box);
                Some(origin)
            }
            None => None,
        };

        let (component_boxes, modeled) = self.component_boxes(circuit, thickness, options);
        boxes.extend(component_boxes);

        if options.show_bounding_boxes {
            boxes.extend(
                circuit
                    .pcb_components()
                    .filter(|c| !modeled.contains(c.pcb_component_id.as_str()))
                    .map(|c| self.placeholder_box(circuit, c, thickness, options)),
            );
        }

        if options.render_copper_pours_as_3d {
            boxes.extend(copper_pour_boxes(
                circuit,
                origin.unwrap_or_default(),
                thickness,
                options,
            ));
        }

        let camera = frame_camera(board.map(|b| (b.center, b.width, b.height)), &boxes);
        tracing::debug!(boxes = boxes.len(), "scene assembled");

        Ok(Scene {
            boxes,
            camera,
            lights: default_lights(),
        })
    }

    /// Panel when present, otherwise the first board. Returns the box and the
    /// circuit-space origin its mesh is built around.
    fn board_box(
        &self,
        circuit: &CircuitJson,
        thickness: f64,
        options: &SceneOptions,
    ) -> Result<Option<(Box3D, Point)>> {
        let holes: Vec<&PcbHole> = circuit.holes().collect();
        let plated: Vec<&PcbPlatedHole> = circuit.plated_holes().collect();

        let (name, outline, mesh): (&str, OutlineRef<'_>, Mesh) = if let Some(panel) = circuit.panel() {
            let mesh = create_panel_mesh(panel, thickness, &holes, &plated)?;
            ("panel", panel.outline_ref(), mesh)
        } else if let Some(board) = circuit.board() {
            let cutouts: Vec<&PcbCutout> = circuit.cutouts().collect();
            let mesh = create_board_mesh(board, thickness, &holes, &plated, &cutouts)?;
            ("board", board.outline_ref(), mesh)
        } else {
            return Ok(None);
        };

        let extent = mesh.bounding_box().size();
        let measured = |v: f64, fallback: f64| {
            if !mesh.is_empty() && v.is_finite() {
                v
            } else {
                fallback
            }
        };

        let mut board_box = Box3D::new(
            Point3D {
                x: outline.center.x,
                y: 0.0,
                z: outline.center.y,
            },
            Point3D {
                x: measured(extent.x, outline.width),
                y: thickness,
                z: measured(extent.z, outline.height),
            },
        );
        board_box.name = Some(name.to_string());
        board_box.mesh = Some(Arc::new(mesh));
        board_box.color = Some(options.board_color);

        if options.render_board_textures && options.texture_resolution > 0 {
            match self.rasterizer() {
                Some(rasterizer) => {
                    match render_board_textures(circuit, &outline, options.texture_resolution, rasterizer) {
                        Ok(textures) => board_box.textures = Some(textures),
                        Err(e) => tracing::warn!(error = %e, "board texture rendering failed, using flat color"),
                    }
                }
                None => tracing::debug!("no rasterizer configured, board textures skipped"),
            }
        }

        Ok(Some((board_box, outline.center)))
    }

    /// Boxes for every CAD component with a model, in input order, plus the
    /// ids of the PCB components they cover
    fn component_boxes<'a>(
        &self,
        circuit: &'a CircuitJson,
        thickness: f64,
        options: &SceneOptions,
    ) -> (Vec<Box3D>, FxHashSet<&'a str>) {
        let planned: Vec<(&CadComponent, ModelSource)> = circuit
            .cad_components()
            .filter_map(|cad| ModelSource::from_cad(cad).map(|source| (cad, source)))
            .collect();
        let modeled = planned.iter().map(|&(cad, _)| cad.pcb_component_id.as_str()).collect();

        let transform = options.coordinate_transform.as_ref();
        let boxes = planned
            .par_iter()
            .map(|(cad, source)| {
                let pcb = circuit.pcb_component(&cad.pcb_component_id);
                let mut placed = place_component(cad, source, pcb, thickness, options);
                if !options.include_models {
                    placed.color = Some(options.component_color);
                    return placed;
                }

                match self.loader.load(source, transform) {
                    Ok(mesh) => {
                        let mesh = scale_mesh(&mesh, cad.model_unit_to_mm_scale_factor.unwrap_or(1.0));
                        // OBJ origins sit at the model base
                        if cad.position.is_some() && source.format == ModelFormat::Obj {
                            placed.center.y -= mesh.bounding_box().min.y;
                        }
                        placed.mesh = Some(mesh);
                    }
                    Err(e) => {
                        tracing::warn!(
                            component = %cad.pcb_component_id,
                            reference = %source.reference,
                            error = %e,
                            "model load failed, using placeholder color"
                        );
                        placed.color = Some(options.component_color);
                    }
                }
                placed
            })
            .collect();

        (boxes, modeled)
    }

    fn placeholder_box(
        &self,
        circuit: &CircuitJson,
        component: &PcbComponent,
        thickness: f64,
        options: &SceneOptions,
    ) -> Box3D {
        let height = component
            .width
            .min(component.height)
            .min(options.default_component_height);
        let half = thickness / 2.0 + height / 2.0;
        let y = if is_bottom_layer(component.layer.as_ref()) { -half } else { half };

        let mut placeholder = Box3D::new(
            Point3D {
                x: component.center.x,
                y,
                z: component.center.y,
            },
            Point3D {
                x: component.width,
                y: height,
                z: component.height,
            },
        );
        let label = component
            .source_component_id
            .as_deref()
            .and_then(|id| circuit.source_component(id))
            .and_then(|s| s.name.clone())
            .unwrap_or_else(|| "?".to_string());

        if options.render_label_textures {
            if let Some(rasterizer) = self.rasterizer() {
                match create_label_texture(&label, &options.label_style, rasterizer, &self.labels) {
                    Ok(texture) => placeholder.label_texture = Some(texture),
                    Err(e) => tracing::warn!(label = %label, error = %e, "label rasterization failed"),
                }
            }
        }

        placeholder.name = Some(component.pcb_component_id.clone());
        placeholder.color = Some(options.component_color);
        placeholder.label = Some(label);
        placeholder.label_color = Some(WHITE);
        placeholder
    }
}

#[inline]
fn point3(x: f64, y: f64, z: f64) -> Point3D {
    Point3D { x, y, z }
}

/// Size, position and orientation of a modeled component before its mesh is known
pub fn place_component(
    cad: &CadComponent,
    source: &ModelSource,
    pcb: Option<&PcbComponent>,
    thickness: f64,
    options: &SceneOptions,
) -> Box3D {
    let bottom = is_bottom_layer(pcb.and_then(|p| p.layer.as_ref()));
    let scale = cad.model_unit_to_mm_scale_factor.unwrap_or(1.0);

    let size = match cad.size {
        Some(s) => point3(s.x * scale, s.y * scale, s.z * scale),
        None => point3(
            pcb.map_or(2.0, |p| p.width),
            options.default_component_height,
            pcb.map_or(2.0, |p| p.height),
        ),
    };

    // Circuit coordinates are Z-up; the scene is Y-up
    let center = match cad.position {
        Some(p) => point3(p.x, p.z, p.y),
        None => {
            let half = thickness / 2.0 + size.y / 2.0;
            let c = pcb.map(|p| p.center).unwrap_or_default();
            point3(c.x, if bottom { -half } else { half }, c.y)
        }
    };

    let rotation = match cad.rotation {
        Some(r) => Some(point3(r.x.to_radians(), r.z.to_radians(), r.y.to_radians())),
        None if bottom => Some(match source.format {
            ModelFormat::Glb | ModelFormat::Gltf | ModelFormat::Footprint => point3(0.0, 0.0, PI),
            ModelFormat::Stl | ModelFormat::Obj => point3(PI, 0.0, 0.0),
        }),
        None => None,
    };

    let mut placed = Box3D::new(center, size);
    placed.name = Some(cad.pcb_component_id.clone());
    placed.rotation = rotation;
    if source.format != ModelFormat::Footprint {
        placed.model = Some(source.clone());
    }
    placed
}

/// Copper pours as thin solids on their layer face. Pours that cannot be
/// resolved are skipped.
fn copper_pour_boxes(circuit: &CircuitJson, origin: Point, thickness: f64, options: &SceneOptions) -> Vec<Box3D> {
    let copper = options.copper_thickness;
    circuit
        .copper_pours()
        .filter_map(|pour| {
            let mesh = match create_copper_pour_mesh(pour, origin, copper) {
                Ok(Some(mesh)) if !mesh.is_empty() => mesh,
                Ok(_) => return None,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping copper pour");
                    return None;
                }
            };
            let half = thickness / 2.0 + copper / 2.0;
            let y = if is_bottom_layer(pour.layer.as_ref()) { -half } else { half };
            let extent = mesh.bounding_box().size();

            let mut slab = Box3D::new(point3(origin.x, y, origin.y), point3(extent.x, copper, extent.z));
            slab.name = pour.pcb_copper_pour_id.clone();
            slab.mesh = Some(Arc::new(mesh));
            slab.color = Some(options.copper_color);
            Some(slab)
        })
        .collect()
}

fn orbit_camera(center_x: f64, center_z: f64, width: f64, depth: f64) -> Camera {
    let distance = (width * width + depth * depth).sqrt() * 1.5;
    Camera {
        position: point3(center_x + distance * 0.5, distance * 0.7, center_z + distance * 0.5),
        target: point3(center_x, 0.0, center_z),
        up: point3(0.0, 1.0, 0.0),
        fov: 50.0,
        near: 0.1,
        far: distance * 4.0,
    }
}

/// Deterministic framing: the board diagonal when a board exists, else the
/// XZ extent of every box, else a fixed view of the origin.
///
/// `board` is `(center, width, height)` in circuit coordinates.
pub fn frame_camera(board: Option<(Point, f64, f64)>, boxes: &[Box3D]) -> Camera {
    if let Some((center, width, height)) = board {
        return orbit_camera(center.x, center.y, width, height);
    }
    if boxes.is_empty() {
        return Camera {
            position: point3(30.0, 30.0, 25.0),
            target: point3(0.0, 0.0, 0.0),
            up: point3(0.0, 1.0, 0.0),
            fov: 50.0,
            near: 0.1,
            far: 120.0,
        };
    }

    let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_z, mut max_z) = (f64::INFINITY, f64::NEG_INFINITY);
    for b in boxes {
        min_x = min_x.min(b.center.x - b.size.x / 2.0);
        max_x = max_x.max(b.center.x + b.size.x / 2.0);
        min_z = min_z.min(b.center.z - b.size.z / 2.0);
        max_z = max_z.max(b.center.z + b.size.z / 2.0);
    }
    orbit_camera(
        (min_x + max_x) / 2.0,
        (min_z + max_z) / 2.0,
        (max_x - min_x).max(1.0),
        (max_z - min_z).max(1.0),
    )
}

pub fn default_lights() -> Vec<Light> {
    vec![
        Light::Ambient {
            color: WHITE,
            intensity: 0.5,
        },
        Light::Directional {
            color: WHITE,
            intensity: 0.5,
            direction: point3(-1.0, -1.0, -1.0),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::texture::tests::RecordingRasterizer;
    use approx::assert_relative_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NoNetwork {
        calls: AtomicUsize,
    }

    impl Fetcher for NoNetwork {
        fn fetch(&self, reference: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::fetch(reference, "offline"))
        }
    }

    fn converter() -> Converter {
        Converter::new(
            Arc::new(NoNetwork {
                calls: AtomicUsize::new(0),
            }),
            CacheConfig::default(),
        )
    }

    fn flat_options() -> SceneOptions {
        SceneOptions {
            render_board_textures: false,
            ..Default::default()
        }
    }

    fn circuit(value: serde_json::Value) -> CircuitJson {
        CircuitJson::from_json_value(value).unwrap()
    }

    #[test]
    fn test_bare_board() {
        let c = circuit(json!([
            {"type": "pcb_board", "center": {"x": 3, "y": 4}, "width": 50, "height": 30}
        ]));
        let scene = converter().convert_circuit_to_scene(&c, &flat_options()).unwrap();

        assert_eq!(scene.boxes.len(), 1);
        let board = &scene.boxes[0];
        assert_relative_eq!(board.size.x, 50.0, epsilon = 1e-6);
        assert_relative_eq!(board.size.y, 1.6);
        assert_relative_eq!(board.size.z, 30.0, epsilon = 1e-6);
        assert_eq!((board.center.x, board.center.y, board.center.z), (3.0, 0.0, 4.0));
        assert_eq!(board.color, Some(BOARD_COLOR));
        assert_eq!(scene.lights.len(), 2);
    }

    #[test]
    fn test_panel_takes_priority() {
        let c = circuit(json!([
            {"type": "pcb_board", "center": {"x": 0, "y": 0}, "width": 10, "height": 10, "thickness": 1.2},
            {"type": "pcb_panel", "center": {"x": 0, "y": 0}, "width": 100, "height": 80}
        ]));
        let scene = converter().convert_circuit_to_scene(&c, &flat_options()).unwrap();
        let panel = &scene.boxes[0];
        assert_eq!(panel.name.as_deref(), Some("panel"));
        assert_relative_eq!(panel.size.x, 100.0, epsilon = 1e-6);
        assert_relative_eq!(panel.size.y, 1.2);
        // The camera still frames the board
        assert_relative_eq!(scene.camera.far, (200.0f64).sqrt() * 1.5 * 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bottom_component_sits_below_board() {
        let c = circuit(json!([
            {"type": "pcb_board", "center": {"x": 0, "y": 0}, "width": 20, "height": 20},
            {"type": "pcb_component", "pcb_component_id": "pc1", "center": {"x": 2, "y": 3},
             "width": 4, "height": 3, "layer": "bottom"},
            {"type": "cad_component", "pcb_component_id": "pc1", "size": {"x": 4, "y": 2, "z": 3},
             "model_stl_url": "https://models.test/r.stl"}
        ]));
        let scene = converter().convert_circuit_to_scene(&c, &flat_options()).unwrap();

        let part = &scene.boxes[1];
        assert_relative_eq!(part.center.y, -1.8);
        assert_eq!((part.center.x, part.center.z), (2.0, 3.0));
        // Failed load falls back to the component color, STL flips about X
        assert_eq!(part.color, Some(COMPONENT_COLOR));
        assert!(part.mesh.is_none());
        assert_relative_eq!(part.rotation.unwrap().x, PI);
        assert_eq!(scene.boxes.len(), 2);
    }

    #[test]
    fn test_explicit_position_and_rotation() {
        let cad = CadComponent {
            pcb_component_id: "pc".into(),
            position: Some(point3(1.0, 2.0, 3.0)),
            rotation: Some(point3(90.0, 0.0, 45.0)),
            model_unit_to_mm_scale_factor: Some(2.0),
            size: Some(point3(1.0, 2.0, 3.0)),
            ..Default::default()
        };
        let source = ModelSource::new(ModelFormat::Glb, "a.glb");
        let placed = place_component(&cad, &source, None, 1.6, &SceneOptions::default());

        assert_eq!((placed.center.x, placed.center.y, placed.center.z), (1.0, 3.0, 2.0));
        assert_eq!((placed.size.x, placed.size.y, placed.size.z), (2.0, 4.0, 6.0));
        let r = placed.rotation.unwrap();
        assert_relative_eq!(r.x, PI / 2.0);
        assert_relative_eq!(r.y, PI / 4.0);
        assert_relative_eq!(r.z, 0.0);
        assert_eq!(placed.model, Some(source));
    }

    #[test]
    fn test_footprint_model_is_loaded_without_fetching() {
        let c = circuit(json!([
            {"type": "pcb_component", "pcb_component_id": "pc1", "center": {"x": 0, "y": 0},
             "width": 1.6, "height": 0.8, "layer": "bottom"},
            {"type": "cad_component", "pcb_component_id": "pc1", "footprinter_string": "0603"}
        ]));
        let scene = converter().convert_circuit_to_scene(&c, &flat_options()).unwrap();
        assert_eq!(scene.boxes.len(), 1);
        let part = &scene.boxes[0];
        assert!(part.mesh.is_some());
        assert!(part.model.is_none());
        assert_relative_eq!(part.rotation.unwrap().z, PI);
    }

    #[test]
    fn test_placeholders() {
        let c = circuit(json!([
            {"type": "pcb_board", "center": {"x": 0, "y": 0}, "width": 20, "height": 20},
            {"type": "source_component", "source_component_id": "s1", "name": "U1"},
            {"type": "pcb_component", "pcb_component_id": "a", "source_component_id": "s1",
             "center": {"x": 1, "y": 1}, "width": 5, "height": 6},
            {"type": "pcb_component", "pcb_component_id": "b", "center": {"x": 1, "y": 1},
             "width": 1, "height": 0.5, "layer": "bottom"}
        ]));
        let rasterizer = Arc::new(RecordingRasterizer::default());
        let converter = converter().with_rasterizer(rasterizer.clone());
        let scene = converter.convert_circuit_to_scene(&c, &flat_options()).unwrap();
        assert_eq!(scene.boxes.len(), 3);

        let a = &scene.boxes[1];
        assert_eq!(a.label.as_deref(), Some("U1"));
        assert_relative_eq!(a.size.y, 2.0);
        assert_relative_eq!(a.center.y, 1.8);
        assert!(a.label_texture.is_some());

        let b = &scene.boxes[2];
        assert_eq!(b.label.as_deref(), Some("?"));
        assert_relative_eq!(b.size.y, 0.5);
        assert_relative_eq!(b.center.y, -(0.8 + 0.25));
        assert_eq!(converter.label_cache().len(), 2);

        let hidden = SceneOptions {
            show_bounding_boxes: false,
            ..flat_options()
        };
        assert_eq!(converter.convert_circuit_to_scene(&c, &hidden).unwrap().boxes.len(), 1);
    }

    #[test]
    fn test_texture_failure_keeps_flat_color() {
        let c = circuit(json!([
            {"type": "pcb_board", "center": {"x": 0, "y": 0}, "width": 20, "height": 10}
        ]));
        let failing = Arc::new(RecordingRasterizer {
            fail: true,
            ..Default::default()
        });
        let scene = converter()
            .with_rasterizer(failing)
            .convert_circuit_to_scene(&c, &SceneOptions::default())
            .unwrap();
        assert!(scene.boxes[0].textures.is_none());
        assert_eq!(scene.boxes[0].color, Some(BOARD_COLOR));

        let working = Arc::new(RecordingRasterizer::default());
        let scene = converter()
            .with_rasterizer(working)
            .convert_circuit_to_scene(&c, &SceneOptions::default())
            .unwrap();
        let textures = scene.boxes[0].textures.as_ref().unwrap();
        assert_eq!((textures.top.width, textures.top.height), (1024, 512));
    }

    #[test]
    fn test_copper_pours_as_solids() {
        let c = circuit(json!([
            {"type": "pcb_board", "center": {"x": 0, "y": 0}, "width": 20, "height": 20},
            {"type": "pcb_copper_pour", "shape": "rect", "layer": "bottom",
             "center": {"x": 0, "y": 0}, "width": 4, "height": 2},
            {"type": "pcb_copper_pour", "shape": "mystery", "layer": "top"}
        ]));
        let options = SceneOptions {
            render_copper_pours_as_3d: true,
            ..flat_options()
        };
        let scene = converter().convert_circuit_to_scene(&c, &options).unwrap();
        assert_eq!(scene.boxes.len(), 2);
        let pour = &scene.boxes[1];
        assert_relative_eq!(pour.center.y, -(0.8 + COPPER_THICKNESS / 2.0));
        assert_relative_eq!(pour.size.x, 4.0, epsilon = 1e-9);
        assert_eq!(pour.color, Some(COPPER_COLOR));
    }

    #[test]
    fn test_camera_framing() {
        let board = frame_camera(Some((Point::new(10.0, 5.0), 30.0, 40.0)), &[]);
        // diagonal 50, distance 75
        assert_relative_eq!(board.position.x, 47.5);
        assert_relative_eq!(board.position.y, 52.5);
        assert_relative_eq!(board.position.z, 42.5);
        assert_eq!((board.target.x, board.target.z), (10.0, 5.0));
        assert_relative_eq!(board.far, 300.0);
        assert_eq!(board.fov, 50.0);

        let empty = frame_camera(None, &[]);
        assert_eq!(empty.position, point3(30.0, 30.0, 25.0));
        assert_eq!(empty.far, 120.0);

        // Tiny boxes are framed as at least 1 x 1
        let tiny = [Box3D::new(point3(2.0, 0.0, 2.0), point3(0.1, 0.1, 0.1))];
        let framed = frame_camera(None, &tiny);
        assert_relative_eq!(framed.far, (2.0f64).sqrt() * 1.5 * 4.0, epsilon = 1e-12);
        assert_relative_eq!(framed.target.x, 2.0);
    }

    #[test]
    fn test_camera_is_deterministic() {
        let c = circuit(json!([
            {"type": "pcb_component", "pcb_component_id": "a", "center": {"x": -3, "y": 7},
             "width": 2.5, "height": 1.25}
        ]));
        let first = converter().convert_circuit_to_scene(&c, &flat_options()).unwrap().camera;
        let second = converter().convert_circuit_to_scene(&c, &flat_options()).unwrap().camera;
        assert_eq!(first, second);
    }
}
