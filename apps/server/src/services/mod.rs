// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Service modules for conversion, model fetching, rasterization and caching.

pub mod cache;
pub mod conversion;
pub mod fetcher;
pub mod rasterizer;

pub use cache::DiskCache;
pub use conversion::{convert_to_asset, convert_to_scene, sniff_content_type, ConvertedAsset};
pub use fetcher::ModelFetcher;
pub use rasterizer::CommandRasterizer;
