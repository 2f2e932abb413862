// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request types for the API.

use pcb3d_processing::{ConversionOptions, OutputFormat};
use serde::{Deserialize, Serialize};

/// Query parameters of the conversion endpoints. Absent values keep the
/// library defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConvertQuery {
    /// Skip cache lookup if true.
    #[serde(default)]
    pub skip_cache: bool,
    /// `glb` or `gltf`
    pub format: Option<String>,
    pub embed_images: Option<bool>,
    pub force_indices: Option<bool>,
    pub board_texture_resolution: Option<u32>,
    pub render_board_textures: Option<bool>,
    pub render_copper_pours_as_3d: Option<bool>,
    pub show_bounding_boxes: Option<bool>,
    pub include_models: Option<bool>,
    pub background_color: Option<String>,
}

impl ConvertQuery {
    pub fn conversion_options(&self) -> ConversionOptions {
        let defaults = ConversionOptions::default();
        ConversionOptions {
            format: match self.format.as_deref() {
                Some(f) if f.eq_ignore_ascii_case("glb") => OutputFormat::Glb,
                Some(f) if f.eq_ignore_ascii_case("gltf") => OutputFormat::Gltf,
                _ => defaults.format,
            },
            embed_images: self.embed_images.unwrap_or(defaults.embed_images),
            force_indices: self.force_indices.unwrap_or(defaults.force_indices),
            board_texture_resolution: self
                .board_texture_resolution
                .filter(|r| (16..=8192).contains(r))
                .unwrap_or(defaults.board_texture_resolution),
            render_board_textures: self.render_board_textures.unwrap_or(defaults.render_board_textures),
            render_copper_pours_as_3d: self
                .render_copper_pours_as_3d
                .unwrap_or(defaults.render_copper_pours_as_3d),
            show_bounding_boxes: self.show_bounding_boxes.unwrap_or(defaults.show_bounding_boxes),
            include_models: self.include_models.unwrap_or(defaults.include_models),
            background_color: self.background_color.clone(),
            coordinate_transform: None,
        }
    }

    /// Cache identity of the options; `skip_cache` does not change the result
    pub fn cache_fingerprint(&self) -> Vec<u8> {
        let options = ConvertQuery {
            skip_cache: false,
            ..self.clone()
        };
        serde_json::to_vec(&options).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_keeps_defaults() {
        assert_eq!(ConvertQuery::default().conversion_options(), ConversionOptions::default());
    }

    #[test]
    fn test_overrides() {
        let query = ConvertQuery {
            format: Some("GLB".into()),
            show_bounding_boxes: Some(true),
            board_texture_resolution: Some(1),
            ..Default::default()
        };
        let options = query.conversion_options();
        assert_eq!(options.format, OutputFormat::Glb);
        assert!(options.show_bounding_boxes);
        assert_eq!(options.board_texture_resolution, 1024);
    }

    #[test]
    fn test_skip_cache_not_in_fingerprint() {
        let a = ConvertQuery::default();
        let b = ConvertQuery {
            skip_cache: true,
            ..Default::default()
        };
        assert_eq!(a.cache_fingerprint(), b.cache_fingerprint());
    }
}
