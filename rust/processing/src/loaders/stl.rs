// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STL reader, binary and ASCII.
//!
//! Binary layout: 80-byte header, u32 facet count, then 50 bytes per facet
//! (normal, three vertices as f32 triples, u16 attribute count).

use crate::error::{Error, Result};
use pcb3d_geometry::{CoordinateTransform, Mesh, Point3, Triangle, Vector3};

const HEADER_SIZE: usize = 80;
const FACET_SIZE: usize = 50;

/// Binary files may also begin with "solid"; their size gives them away
fn is_binary(data: &[u8]) -> bool {
    let text_prefix = String::from_utf8_lossy(&data[..data.len().min(HEADER_SIZE)]);
    if !text_prefix.trim_start().starts_with("solid") {
        return true;
    }
    if data.len() < HEADER_SIZE + 4 {
        return false;
    }
    let count = u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as usize;
    data.len() == HEADER_SIZE + 4 + count * FACET_SIZE
}

/// Facet with the stored normal, or the winding normal when the file left it zero
fn facet(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>, normal: Vector3<f64>) -> Triangle {
    if normal.norm_squared() > 0.0 && normal.iter().all(|c| c.is_finite()) {
        Triangle::new(v0, v1, v2, normal)
    } else {
        Triangle::from_vertices(v0, v1, v2)
    }
}

fn read_vec3(buf: &[u8]) -> [f64; 3] {
    let f = |o: usize| f32::from_le_bytes([buf[o], buf[o + 1], buf[o + 2], buf[o + 3]]) as f64;
    [f(0), f(4), f(8)]
}

fn parse_binary(data: &[u8]) -> Result<Vec<Triangle>> {
    if data.len() < HEADER_SIZE + 4 {
        return Err(Error::Stl("file too small for a binary STL header".into()));
    }
    let count = u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as usize;
    let body = &data[HEADER_SIZE + 4..];
    if body.len() < count * FACET_SIZE {
        return Err(Error::Stl(format!(
            "expected {count} facets, file holds {}",
            body.len() / FACET_SIZE
        )));
    }

    Ok(body
        .chunks_exact(FACET_SIZE)
        .take(count)
        .map(|f| {
            let n = read_vec3(&f[0..12]);
            let [a, b, c] = [read_vec3(&f[12..24]), read_vec3(&f[24..36]), read_vec3(&f[36..48])];
            facet(
                Point3::from(a),
                Point3::from(b),
                Point3::from(c),
                Vector3::from(n),
            )
        })
        .collect())
}

fn parse_triple(parts: &[&str], line_no: usize) -> Result<[f64; 3]> {
    if parts.len() < 3 {
        return Err(Error::Stl(format!("line {line_no}: expected three coordinates")));
    }
    let mut out = [0.0; 3];
    for (slot, text) in out.iter_mut().zip(parts) {
        *slot = text
            .parse()
            .map_err(|_| Error::Stl(format!("line {line_no}: invalid number {text:?}")))?;
    }
    Ok(out)
}

fn parse_ascii(text: &str) -> Result<Vec<Triangle>> {
    let mut triangles = Vec::new();
    let mut normal = Vector3::zeros();
    let mut corners: Vec<Point3<f64>> = Vec::with_capacity(3);

    for (i, line) in text.lines().enumerate() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(keyword) = parts.first() else {
            continue;
        };
        match keyword.to_ascii_lowercase().as_str() {
            "facet" => {
                corners.clear();
                normal = match parts.get(1) {
                    Some(kw) if kw.eq_ignore_ascii_case("normal") => {
                        Vector3::from(parse_triple(&parts[2..], i + 1)?)
                    }
                    _ => Vector3::zeros(),
                };
            }
            "vertex" => corners.push(Point3::from(parse_triple(&parts[1..], i + 1)?)),
            "endfacet" => {
                if corners.len() != 3 {
                    return Err(Error::Stl(format!(
                        "line {}: facet has {} vertices",
                        i + 1,
                        corners.len()
                    )));
                }
                triangles.push(facet(corners[0], corners[1], corners[2], normal));
                corners.clear();
            }
            "endsolid" => break,
            _ => {}
        }
    }

    Ok(triangles)
}

/// Parse an STL file and apply `transform`
pub fn parse_stl(data: &[u8], transform: &CoordinateTransform) -> Result<Mesh> {
    let triangles = if is_binary(data) {
        parse_binary(data)?
    } else {
        parse_ascii(&String::from_utf8_lossy(data))?
    };
    Ok(Mesh::from_triangles(transform.apply_to_triangles(&triangles)))
}
