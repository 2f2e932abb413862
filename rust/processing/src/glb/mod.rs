// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary glTF (GLB) codec
//!
//! A GLB file is a 12-byte header followed by a JSON chunk and an optional
//! BIN chunk, each 4-byte aligned. The reader decodes triangle primitives
//! into a [`Mesh`](pcb3d_geometry::Mesh); the writer assembles documents
//! from scratch for mesh round-trips and scene export.

pub mod reader;
pub mod schema;
pub mod writer;

use crate::error::{Error, Result};
use base64::Engine;

/// "glTF" read as a little-endian u32
pub const GLB_MAGIC: u32 = 0x46546C67;
pub const GLB_VERSION: u32 = 2;
/// "JSON"
pub const CHUNK_JSON: u32 = 0x4E4F534A;
/// "BIN\0"
pub const CHUNK_BIN: u32 = 0x004E4942;
pub const GLB_HEADER_LEN: usize = 12;
pub const CHUNK_HEADER_LEN: usize = 8;

pub use reader::{group_by_color, parse_glb, split_glb, GlbChunks};
pub use writer::{encode_mesh_glb, write_glb, GlbBuilder};

/// Round `len` up to the next multiple of four
#[inline]
pub(crate) fn align4(len: usize) -> usize {
    (len + 3) & !3
}

/// Decode the payload of a base64 `data:` URI
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| Error::glb("malformed data URI"))?;
    if !header.ends_with(";base64") {
        return Err(Error::glb(format!("unsupported data URI encoding: {header}")));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::glb(format!("invalid base64 in data URI: {e}")))
}

pub fn encode_data_uri(mime_type: &str, data: &[u8]) -> String {
    format!(
        "data:{mime_type};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(data)
    )
}
