// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Text glTF documents are packed into a GLB and read by the binary codec.

use super::Fetcher;
use crate::error::Result;
use crate::glb::schema::Gltf;
use crate::glb::{decode_data_uri, encode_data_uri, parse_glb, write_glb};
use pcb3d_geometry::{CoordinateTransform, Mesh};

/// Resolve the buffers of a `.gltf` document and repack it as GLB.
///
/// Buffer 0 becomes the BIN chunk. Other external buffers are inlined as
/// data URIs so the document stays self-contained.
pub fn pack_gltf(document: &[u8], base: &str, fetcher: &dyn Fetcher) -> Result<Vec<u8>> {
    let mut gltf: Gltf = serde_json::from_slice(document)?;
    let mut bin = Vec::new();

    for (index, buffer) in gltf.buffers.iter_mut().enumerate() {
        let Some(uri) = buffer.uri.take() else {
            continue;
        };
        if index > 0 && uri.starts_with("data:") {
            buffer.uri = Some(uri);
            continue;
        }

        let bytes = if uri.starts_with("data:") {
            decode_data_uri(&uri)?
        } else {
            let location = fetcher.resolve(base, &uri);
            tracing::debug!(buffer = index, location = %location, "fetching glTF buffer");
            fetcher.fetch(&location)?
        };

        buffer.byte_length = bytes.len();
        if index == 0 {
            bin = bytes;
        } else {
            buffer.uri = Some(encode_data_uri("application/octet-stream", &bytes));
        }
    }

    write_glb(&gltf, &bin)
}

pub fn parse_gltf(
    document: &[u8],
    base: &str,
    fetcher: &dyn Fetcher,
    transform: &CoordinateTransform,
) -> Result<Mesh> {
    let glb = pack_gltf(document, base, fetcher)?;
    parse_glb(&glb, Some(transform))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rustc_hash::FxHashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapFetcher {
        files: FxHashMap<String, Vec<u8>>,
        requests: Mutex<Vec<String>>,
    }

    impl Fetcher for MapFetcher {
        fn fetch(&self, reference: &str) -> Result<Vec<u8>> {
            self.requests.lock().unwrap().push(reference.to_string());
            self.files
                .get(reference)
                .cloned()
                .ok_or_else(|| Error::fetch(reference, "not found"))
        }
    }

    fn triangle_bytes() -> Vec<u8> {
        [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
            .iter()
            .flatten()
            .flat_map(|c| c.to_le_bytes())
            .collect()
    }

    fn document(uri: &str) -> String {
        format!(
            r#"{{
  "asset": {{"version": "2.0"}},
  "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0}}}}]}}],
  "accessors": [{{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"}}],
  "bufferViews": [{{"buffer": 0, "byteLength": 36}}],
  "buffers": [{{"byteLength": 36, "uri": "{uri}"}}]
}}"#
        )
    }

    #[test]
    fn test_relative_buffer_is_fetched_next_to_document() {
        let mut fetcher = MapFetcher::default();
        fetcher
            .files
            .insert("https://cdn.test/models/part.bin".into(), triangle_bytes());

        let mesh = parse_gltf(
            document("part.bin").as_bytes(),
            "https://cdn.test/models/part.gltf",
            &fetcher,
            &CoordinateTransform::IDENTITY,
        )
        .unwrap();

        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(
            *fetcher.requests.lock().unwrap(),
            vec!["https://cdn.test/models/part.bin".to_string()]
        );
    }

    #[test]
    fn test_data_uri_buffer() {
        let uri = encode_data_uri("application/octet-stream", &triangle_bytes());
        let fetcher = MapFetcher::default();
        let mesh = parse_gltf(
            document(&uri).as_bytes(),
            "local/part.gltf",
            &fetcher,
            &CoordinateTransform::IDENTITY,
        )
        .unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert!(fetcher.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_missing_buffer_fails() {
        let fetcher = MapFetcher::default();
        let err = pack_gltf(document("gone.bin").as_bytes(), "a/b.gltf", &fetcher).unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
    }
}
