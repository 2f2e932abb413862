// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! SVG rasterization through an external `resvg`-compatible command.
//!
//! The SVG is written to the child's stdin and the PNG read from its
//! stdout (`resvg - -c`).

use pcb3d_processing::{Error, PngImage, RasterOptions, Rasterizer, Result};
use std::io::Write;
use std::process::{Command, Stdio};

pub struct CommandRasterizer {
    program: String,
}

impl CommandRasterizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn args(options: &RasterOptions) -> Vec<String> {
        let mut args = vec!["-w".to_string(), options.width.to_string()];
        if let Some(height) = options.height {
            args.extend(["-h".to_string(), height.to_string()]);
        }
        if let Some(background) = &options.background {
            args.extend(["--background".to_string(), background.clone()]);
        }
        args.extend(["-".to_string(), "-c".to_string()]);
        args
    }
}

/// Width and height from a PNG IHDR chunk
pub fn png_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    const SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
    if data.len() < 24 || !data.starts_with(SIGNATURE) || &data[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
    let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
    Some((width, height))
}

impl Rasterizer for CommandRasterizer {
    fn rasterize(&self, svg: &str, options: &RasterOptions) -> Result<PngImage> {
        let mut child = Command::new(&self.program)
            .args(Self::args(options))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Raster(format!("cannot start {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(svg.as_bytes())
                .map_err(|e| Error::Raster(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| Error::Raster(e.to_string()))?;
        if !output.status.success() {
            return Err(Error::Raster(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let (width, height) = png_dimensions(&output.stdout)
            .ok_or_else(|| Error::Raster(format!("{} did not produce a PNG", self.program)))?;
        tracing::debug!(width, height, bytes = output.stdout.len(), "rasterized svg");
        Ok(PngImage::new(output.stdout, width, height))
    }
}
