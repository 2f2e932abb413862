// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model byte source: HTTP(S) URLs through reqwest, everything else from disk.
//!
//! Conversion runs on blocking threads, so remote fetches are driven to
//! completion on the server runtime through its handle.

use pcb3d_processing::{Error, Fetcher, Result};
use std::path::{Component, Path, PathBuf};
use tokio::runtime::Handle;

pub struct ModelFetcher {
    client: reqwest::Client,
    runtime: Handle,
    base_dir: Option<PathBuf>,
}

impl ModelFetcher {
    pub fn new(runtime: Handle, base_dir: Option<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            runtime,
            base_dir,
        }
    }

    fn fetch_url(&self, url: &str) -> Result<Vec<u8>> {
        self.runtime.block_on(async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| Error::fetch(url, e))?;
            let bytes = response.bytes().await.map_err(|e| Error::fetch(url, e))?;
            Ok(bytes.to_vec())
        })
    }

    fn local_path(&self, reference: &str) -> Result<PathBuf> {
        let reference = reference.strip_prefix("file://").unwrap_or(reference);
        let path = Path::new(reference);
        match &self.base_dir {
            Some(base) => {
                // References stay inside the model root
                if path.components().any(|c| matches!(c, Component::ParentDir)) {
                    return Err(Error::fetch(reference, "path escapes the model directory"));
                }
                let relative = path.strip_prefix("/").unwrap_or(path);
                Ok(base.join(relative))
            }
            None => Ok(path.to_path_buf()),
        }
    }
}

impl Fetcher for ModelFetcher {
    fn fetch(&self, reference: &str) -> Result<Vec<u8>> {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            tracing::debug!(url = %reference, "fetching remote model");
            return self.fetch_url(reference);
        }
        let path = self.local_path(reference)?;
        std::fs::read(&path).map_err(|e| Error::fetch(path.display().to_string(), e))
    }
}
