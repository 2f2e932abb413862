// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Response types for the API.

use pcb3d_processing::Scene;
use serde::Serialize;

/// Processing statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingStats {
    /// Boxes in the assembled scene.
    pub total_boxes: usize,
    /// Triangles across every mesh.
    pub total_triangles: usize,
    /// Time spent parsing the circuit description (ms).
    pub parse_time_ms: u64,
    /// Time spent assembling and exporting (ms).
    pub convert_time_ms: u64,
    /// Size of the produced asset in bytes.
    pub output_bytes: usize,
}

/// Scene inspection response.
#[derive(Debug, Clone, Serialize)]
pub struct SceneResponse {
    pub scene: Scene,
    pub stats: ProcessingStats,
}
