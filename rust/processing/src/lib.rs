// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # PCB3D Processing
//!
//! Turns a parsed circuit description into a 3D scene and writes it out as
//! glTF or GLB. Component models are fetched through a caller supplied
//! [`Fetcher`], parsed from STL, OBJ, glTF or GLB (or generated from a
//! footprint descriptor) and cached per reference and transform. Board
//! textures and label badges are drawn as SVG and handed to a
//! [`Rasterizer`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pcb3d_core::CircuitJson;
//! use pcb3d_processing::{CacheConfig, ConversionOptions, Converter, OutputFormat};
//!
//! let circuit = CircuitJson::from_json_str(&json)?;
//! let converter = Converter::new(fetcher, CacheConfig::default());
//! let options = ConversionOptions { format: OutputFormat::Glb, ..Default::default() };
//! let glb = converter.convert_circuit_to_gltf(&circuit, &options)?.into_bytes()?;
//! ```

pub mod assembler;
pub mod cache;
pub mod color;
pub mod error;
pub mod export;
pub mod glb;
pub mod loaders;
pub mod scene;
pub mod texture;

pub use assembler::{
    default_lights, frame_camera, place_component, Converter, SceneOptions, BOARD_COLOR,
    COMPONENT_COLOR, COPPER_COLOR, DEFAULT_BOARD_THICKNESS, DEFAULT_COMPONENT_HEIGHT,
};
pub use cache::{CacheConfig, KeyedCache, LabelCache, MeshCache};
pub use error::{Error, Result};
pub use export::{
    euler_to_quaternion, export_scene, ConversionOptions, ExportOptions, ExportOutput, OutputFormat,
};
pub use glb::{encode_mesh_glb, parse_glb, split_glb};
pub use loaders::{resolve_relative, Fetcher, ModelLoader, ModelSource};
pub use scene::{Box3D, Camera, Light, Scene};
pub use texture::{
    create_label_texture, label_svg, render_board_textures, BoardTextures, LabelStyle, PngImage,
    RasterOptions, Rasterizer,
};
