// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parametric package models generated from footprint descriptors.
//!
//! Packages are modeled as a body box plus terminal boxes in circuit
//! coordinates (Z up, seated on z = 0). The result is encoded to GLB and
//! decoded again so it takes the same path as any downloaded model.

use crate::error::{Error, Result};
use crate::glb::{encode_mesh_glb, parse_glb};
use pcb3d_geometry::{centered_box, Color, CoordinateTransform, Mesh, Point3, Vector3};

const BODY_COLOR: Color = Color::rgb(38, 38, 38);
const CERAMIC_COLOR: Color = Color::rgb(110, 95, 80);
const METAL_COLOR: Color = Color::rgb(200, 200, 200);

/// Package family and its parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Package {
    /// Two-terminal chip component, dimensions in mm
    Chip { length: f64, width: f64, height: f64 },
    Soic { pins: u32 },
    Dip { pins: u32 },
    Tssop { pins: u32 },
    Qfn { pins: u32 },
    Sot23,
    Sot23_5,
    Sot223,
}

fn chip(code: &str) -> Option<Package> {
    let (length, width, height) = match code {
        "0402" => (1.0, 0.5, 0.35),
        "0603" => (1.6, 0.8, 0.45),
        "0805" => (2.0, 1.25, 0.5),
        "1206" => (3.2, 1.6, 0.55),
        "1210" => (3.2, 2.5, 0.55),
        "2010" => (5.0, 2.5, 0.6),
        "2512" => (6.4, 3.2, 0.6),
        _ => return None,
    };
    Some(Package::Chip { length, width, height })
}

fn pin_count(rest: &str, multiple_of: u32, minimum: u32) -> Option<u32> {
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    let pins: u32 = digits.parse().ok()?;
    (pins >= minimum && pins % multiple_of == 0).then_some(pins)
}

/// Parse a footprint descriptor such as `0603`, `soic8` or `sot23_5`.
///
/// Trailing `_`-separated parameters are ignored.
pub fn parse_package(descriptor: &str) -> Result<Package> {
    let lower = descriptor.trim().to_ascii_lowercase();
    let unsupported = || Error::Footprint(format!("unsupported footprint {descriptor:?}"));

    if lower == "sot23_5" || lower.starts_with("sot23_5_") {
        return Ok(Package::Sot23_5);
    }
    let head = lower.split('_').next().unwrap_or_default();

    if let Some(package) = chip(head) {
        return Ok(package);
    }
    let package = match head {
        "sot23" => Some(Package::Sot23),
        "sot223" => Some(Package::Sot223),
        _ => {
            if let Some(rest) = head.strip_prefix("soic") {
                pin_count(rest, 2, 4).map(|pins| Package::Soic { pins })
            } else if let Some(rest) = head.strip_prefix("dip") {
                pin_count(rest, 2, 4).map(|pins| Package::Dip { pins })
            } else if let Some(rest) = head.strip_prefix("tssop") {
                pin_count(rest, 2, 4).map(|pins| Package::Tssop { pins })
            } else if let Some(rest) = head.strip_prefix("qfn") {
                pin_count(rest, 4, 8).map(|pins| Package::Qfn { pins })
            } else {
                None
            }
        }
    };
    package.ok_or_else(unsupported)
}

struct PartBuilder {
    mesh: Mesh,
}

impl PartBuilder {
    fn new() -> Self {
        Self { mesh: Mesh::new() }
    }

    /// Box spanning `z0..z0 + size.z`, centered on (x, y)
    fn block(&mut self, x: f64, y: f64, z0: f64, size: [f64; 3], color: Color) {
        let center = Point3::new(x, y, z0 + size[2] / 2.0);
        let part = centered_box(center, Vector3::from(size)).map_triangles(|t| t.clone().with_color(color));
        self.mesh.merge(&part);
    }

    /// Positions of `count` pins spaced by `pitch`, centered on zero
    fn pin_positions(count: u32, pitch: f64) -> impl Iterator<Item = f64> {
        let start = -(count.saturating_sub(1) as f64) * pitch / 2.0;
        (0..count).map(move |i| start + i as f64 * pitch)
    }

    /// Gull-wing package: pins on the two sides perpendicular to x
    fn dual_row(&mut self, pins: u32, pitch: f64, body_x: f64, height: f64, lead_len: f64, lead_w: f64) {
        let per_side = pins / 2;
        let body_y = (per_side.saturating_sub(1)) as f64 * pitch + 1.1;
        let standoff = 0.1;
        self.block(0.0, 0.0, standoff, [body_x, body_y, height], BODY_COLOR);
        for side in [-1.0, 1.0] {
            let x = side * (body_x / 2.0 + lead_len / 2.0);
            for y in Self::pin_positions(per_side, pitch) {
                self.block(x, y, 0.0, [lead_len, lead_w, 0.2], METAL_COLOR);
            }
        }
    }

    fn finish(self) -> Mesh {
        self.mesh
    }
}

/// Package solid in circuit coordinates (Z up)
pub fn package_mesh(package: &Package) -> Mesh {
    let mut part = PartBuilder::new();
    match *package {
        Package::Chip { length, width, height } => {
            let cap = (length * 0.2).max(0.1);
            part.block(0.0, 0.0, 0.0, [length - 2.0 * cap, width, height], CERAMIC_COLOR);
            for side in [-1.0, 1.0] {
                part.block(side * (length - cap) / 2.0, 0.0, 0.0, [cap, width, height], METAL_COLOR);
            }
        }
        Package::Soic { pins } => part.dual_row(pins, 1.27, 3.9, 1.5, 1.05, 0.41),
        Package::Tssop { pins } => part.dual_row(pins, 0.65, 4.4, 1.0, 1.0, 0.3),
        Package::Dip { pins } => {
            let per_side = pins / 2;
            let body_y = per_side as f64 * 2.54;
            part.block(0.0, 0.0, 0.5, [6.35, body_y, 3.3], BODY_COLOR);
            for side in [-1.0, 1.0] {
                for y in PartBuilder::pin_positions(per_side, 2.54) {
                    part.block(side * 3.81, y, -3.0, [0.5, 0.5, 3.5], METAL_COLOR);
                }
            }
        }
        Package::Qfn { pins } => {
            let per_side = pins / 4;
            let size = per_side as f64 * 0.5 + 1.0;
            part.block(0.0, 0.0, 0.0, [size, size, 0.9], BODY_COLOR);
            let edge = size / 2.0 - 0.3;
            for p in PartBuilder::pin_positions(per_side, 0.5) {
                part.block(-edge - 0.01, p, -0.02, [0.6, 0.25, 0.05], METAL_COLOR);
                part.block(edge + 0.01, p, -0.02, [0.6, 0.25, 0.05], METAL_COLOR);
                part.block(p, -edge - 0.01, -0.02, [0.25, 0.6, 0.05], METAL_COLOR);
                part.block(p, edge + 0.01, -0.02, [0.25, 0.6, 0.05], METAL_COLOR);
            }
        }
        Package::Sot23 | Package::Sot23_5 => {
            part.block(0.0, 0.0, 0.1, [1.3, 2.9, 1.0], BODY_COLOR);
            let (left, right): (&[f64], &[f64]) = match package {
                Package::Sot23 => (&[-0.95, 0.95], &[0.0]),
                _ => (&[-0.95, 0.0, 0.95], &[-0.95, 0.95]),
            };
            for &y in left {
                part.block(-1.0, y, 0.0, [0.7, 0.4, 0.15], METAL_COLOR);
            }
            for &y in right {
                part.block(1.0, y, 0.0, [0.7, 0.4, 0.15], METAL_COLOR);
            }
        }
        Package::Sot223 => {
            part.block(0.0, 0.0, 0.1, [3.5, 6.5, 1.6], BODY_COLOR);
            for y in PartBuilder::pin_positions(3, 2.3) {
                part.block(-2.6, y, 0.0, [1.7, 0.7, 0.25], METAL_COLOR);
            }
            part.block(2.6, 0.0, 0.0, [1.7, 3.0, 0.25], METAL_COLOR);
        }
    }
    part.finish()
}

/// Encode the package for a descriptor as GLB
pub fn footprint_glb(descriptor: &str) -> Result<Vec<u8>> {
    let package = parse_package(descriptor)?;
    encode_mesh_glb(&package_mesh(&package))
}

/// Generate, encode and re-parse the model for a descriptor
pub fn load_footprint(descriptor: &str, transform: &CoordinateTransform) -> Result<Mesh> {
    let glb = footprint_glb(descriptor)?;
    parse_glb(&glb, Some(transform))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_descriptors() {
        assert!(matches!(parse_package("0402"), Ok(Package::Chip { length, .. }) if length == 1.0));
        assert_eq!(parse_package("SOIC8").unwrap(), Package::Soic { pins: 8 });
        assert_eq!(parse_package("soic16_w7.5mm").unwrap(), Package::Soic { pins: 16 });
        assert_eq!(parse_package("dip14").unwrap(), Package::Dip { pins: 14 });
        assert_eq!(parse_package("tssop20").unwrap(), Package::Tssop { pins: 20 });
        assert_eq!(parse_package("qfn32").unwrap(), Package::Qfn { pins: 32 });
        assert_eq!(parse_package("sot23").unwrap(), Package::Sot23);
        assert_eq!(parse_package("sot23_5").unwrap(), Package::Sot23_5);
        assert_eq!(parse_package("sot223").unwrap(), Package::Sot223);
    }

    #[test]
    fn test_unknown_descriptors_fail() {
        for bad in ["", "bga256", "soic", "soic7", "qfn10", "9999"] {
            assert!(matches!(parse_package(bad), Err(Error::Footprint(_))), "{bad}");
        }
    }

    #[test]
    fn test_chip_extents() {
        let mesh = package_mesh(&parse_package("0805").unwrap());
        let bounds = mesh.bounding_box();
        assert_relative_eq!(bounds.size(), Vector3::new(2.0, 1.25, 0.5), epsilon = 1e-9);
        assert_relative_eq!(bounds.min.z, 0.0);
    }

    #[test]
    fn test_round_trip_is_y_up_with_two_colors() {
        let mesh = load_footprint("soic8", &CoordinateTransform::for_format(pcb3d_geometry::ModelFormat::Footprint))
            .unwrap();
        // 1 body + 8 leads, 12 triangles each
        assert_eq!(mesh.triangle_count(), 9 * 12);
        assert_eq!(mesh.materials().len(), 2);
        let size = mesh.bounding_box().size();
        assert_relative_eq!(size.y, 1.6, epsilon = 1e-5);
        assert!(size.x > size.y && size.z > size.y);
    }
}
