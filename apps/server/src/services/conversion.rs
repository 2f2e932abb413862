// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Blocking conversion jobs. Callers run these through `spawn_blocking`.

use crate::error::ApiError;
use crate::types::{ProcessingStats, SceneResponse};
use pcb3d_core::CircuitJson;
use pcb3d_processing::{export_scene, ConversionOptions, Converter, ExportOutput};
use std::time::Instant;

/// Produced asset with its media type
pub struct ConvertedAsset {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub stats: ProcessingStats,
}

fn parse_circuit(body: &[u8], stats: &mut ProcessingStats) -> Result<CircuitJson, ApiError> {
    let start = Instant::now();
    let text = std::str::from_utf8(body).map_err(|e| ApiError::InvalidCircuit(e.to_string()))?;
    let circuit = CircuitJson::from_json_str(text)?;
    stats.parse_time_ms = start.elapsed().as_millis() as u64;
    Ok(circuit)
}

/// Circuit description to glTF or GLB
pub fn convert_to_asset(
    converter: &Converter,
    body: &[u8],
    options: &ConversionOptions,
) -> Result<ConvertedAsset, ApiError> {
    let mut stats = ProcessingStats::default();
    let circuit = parse_circuit(body, &mut stats)?;

    let start = Instant::now();
    let scene = converter.convert_circuit_to_scene(&circuit, &options.scene_options())?;
    stats.total_boxes = scene.boxes.len();
    stats.total_triangles = scene.triangle_count();

    let output = export_scene(&scene, &options.export_options())?;
    let content_type = output.content_type();
    let bytes = output.into_bytes()?;
    stats.convert_time_ms = start.elapsed().as_millis() as u64;
    stats.output_bytes = bytes.len();

    tracing::info!(
        boxes = stats.total_boxes,
        triangles = stats.total_triangles,
        bytes = stats.output_bytes,
        parse_ms = stats.parse_time_ms,
        convert_ms = stats.convert_time_ms,
        "conversion complete"
    );

    Ok(ConvertedAsset {
        bytes,
        content_type,
        stats,
    })
}

/// Circuit description to the assembled scene, for inspection
pub fn convert_to_scene(
    converter: &Converter,
    body: &[u8],
    options: &ConversionOptions,
) -> Result<SceneResponse, ApiError> {
    let mut stats = ProcessingStats::default();
    let circuit = parse_circuit(body, &mut stats)?;

    let start = Instant::now();
    let scene = converter.convert_circuit_to_scene(&circuit, &options.scene_options())?;
    stats.total_boxes = scene.boxes.len();
    stats.total_triangles = scene.triangle_count();
    stats.convert_time_ms = start.elapsed().as_millis() as u64;

    Ok(SceneResponse { scene, stats })
}

/// Media type of a cached asset, recognised by the GLB magic
pub fn sniff_content_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"glTF") {
        ExportOutput::Glb(Vec::new()).content_type()
    } else {
        ExportOutput::Gltf(serde_json::Value::Null).content_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcb3d_processing::{CacheConfig, Error, Fetcher, OutputFormat, Result};
    use std::sync::Arc;

    struct NoFetch;

    impl Fetcher for NoFetch {
        fn fetch(&self, reference: &str) -> Result<Vec<u8>> {
            Err(Error::fetch(reference, "offline"))
        }
    }

    const BOARD: &[u8] = br#"[{"type": "pcb_board", "center": {"x": 0, "y": 0}, "width": 30, "height": 20}]"#;

    fn converter() -> Converter {
        Converter::new(Arc::new(NoFetch), CacheConfig::default())
    }

    #[test]
    fn test_glb_asset() {
        let options = ConversionOptions {
            format: OutputFormat::Glb,
            ..Default::default()
        };
        let asset = convert_to_asset(&converter(), BOARD, &options).unwrap();
        assert_eq!(asset.content_type, "model/gltf-binary");
        assert_eq!(sniff_content_type(&asset.bytes), "model/gltf-binary");
        assert_eq!(asset.stats.total_boxes, 1);
    }

    #[test]
    fn test_gltf_asset_is_json() {
        let asset = convert_to_asset(&converter(), BOARD, &ConversionOptions::default()).unwrap();
        assert_eq!(asset.content_type, "model/gltf+json");
        assert_eq!(sniff_content_type(&asset.bytes), "model/gltf+json");
        let json: serde_json::Value = serde_json::from_slice(&asset.bytes).unwrap();
        assert_eq!(json["asset"]["version"], "2.0");
    }

    #[test]
    fn test_invalid_body() {
        let err = convert_to_scene(&converter(), b"{\"not\": \"an array\"}", &ConversionOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::InvalidCircuit(_)));
    }

    #[test]
    fn test_missing_model_keeps_scene() {
        let body = br#"[
            {"type": "pcb_board", "center": {"x": 0, "y": 0}, "width": 30, "height": 20},
            {"type": "pcb_component", "pcb_component_id": "pc1", "center": {"x": 0, "y": 0}, "width": 2, "height": 2},
            {"type": "cad_component", "pcb_component_id": "pc1", "model_stl_url": "https://x.test/a.stl"}
        ]"#;
        let options = ConversionOptions {
            show_bounding_boxes: true,
            ..Default::default()
        };
        let response = convert_to_scene(&converter(), body, &options).unwrap();
        assert_eq!(response.stats.total_boxes, 2);
    }
}
