// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Length and rotation values with units
//!
//! Circuit descriptions carry dimensions either as bare millimetre numbers,
//! unit-suffixed strings (`"10mil"`, `"0.5in"`) or small objects
//! (`{ "value": 3, "unit": "mil" }`, `{ "in": 0.1 }`). Rotations are degrees
//! when bare, or an object naming its unit.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Millimetres per mil
pub const MM_PER_MIL: f64 = 0.0254;
/// Millimetres per inch
pub const MM_PER_INCH: f64 = 25.4;

/// Multiplier converting a unit name to millimetres
#[inline]
pub fn unit_to_mm_multiplier(unit: &str) -> Option<f64> {
    match unit {
        "mm" => Some(1.0),
        "mil" => Some(MM_PER_MIL),
        "in" => Some(MM_PER_INCH),
        _ => None,
    }
}

/// A length in any of the accepted notations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Length {
    Number(f64),
    Text(String),
    Object(Map<String, Value>),
}

impl Length {
    /// Resolve to millimetres. Returns `None` for unparseable or non-finite values.
    pub fn to_mm(&self) -> Option<f64> {
        let mm = match self {
            Length::Number(value) => Some(*value),
            Length::Text(text) => parse_length_str(text),
            Length::Object(record) => resolve_length_object(record),
        };
        mm.filter(|v| v.is_finite())
    }
}

impl From<f64> for Length {
    fn from(value: f64) -> Self {
        Length::Number(value)
    }
}

/// Parse `"<decimal>[mm|mil|in]"`, case-insensitive on the unit
fn parse_length_str(text: &str) -> Option<f64> {
    let trimmed = text.trim().to_ascii_lowercase();

    let (number, multiplier) = if let Some(n) = trimmed.strip_suffix("mil") {
        (n, MM_PER_MIL)
    } else if let Some(n) = trimmed.strip_suffix("mm") {
        (n, 1.0)
    } else if let Some(n) = trimmed.strip_suffix("in") {
        (n, MM_PER_INCH)
    } else {
        (trimmed.as_str(), 1.0)
    };

    if !is_plain_decimal(number) {
        return None;
    }
    number.parse::<f64>().ok().map(|v| v * multiplier)
}

/// Matches `-?\d+(\.\d+)?`
fn is_plain_decimal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    all_digits(int_part) && frac_part.map_or(true, all_digits)
}

fn number_field(record: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|key| record.get(*key).and_then(Value::as_f64))
}

fn resolve_length_object(record: &Map<String, Value>) -> Option<f64> {
    if let Some(value) = record.get("value").and_then(Value::as_f64) {
        let unit = record
            .get("unit")
            .or_else(|| record.get("units"))
            .and_then(Value::as_str);
        // Unrecognized units fall back to the raw value
        let multiplier = unit.and_then(unit_to_mm_multiplier).unwrap_or(1.0);
        return Some(value * multiplier);
    }

    if let Some(mm) = number_field(record, &["mm", "millimeters", "millimetres"]) {
        return Some(mm);
    }
    if let Some(mil) = number_field(record, &["mil", "mils"]) {
        return Some(mil * MM_PER_MIL);
    }
    number_field(record, &["in", "inch", "inches"]).map(|inch| inch * MM_PER_INCH)
}

/// A rotation, bare numbers are degrees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rotation {
    Degrees(f64),
    Object(Map<String, Value>),
}

const DEGREE_KEYS: [&str; 7] = [
    "deg",
    "degs",
    "degree",
    "degrees",
    "ccw",
    "ccw_degrees",
    "ccw_degree",
];
const RADIAN_KEYS: [&str; 5] = ["rad", "rads", "radian", "radians", "ccw_radians"];

impl Rotation {
    /// Counter-clockwise rotation in radians, 0 when nothing resolves
    pub fn to_radians(&self) -> f64 {
        match self {
            Rotation::Degrees(deg) if deg.is_finite() => deg.to_radians(),
            Rotation::Degrees(_) => 0.0,
            Rotation::Object(record) => {
                let finite = |keys: &[&str]| {
                    keys.iter().find_map(|key| {
                        record
                            .get(*key)
                            .and_then(Value::as_f64)
                            .filter(|v| v.is_finite())
                    })
                };
                finite(&DEGREE_KEYS)
                    .map(f64::to_radians)
                    .or_else(|| finite(&RADIAN_KEYS))
                    .unwrap_or(0.0)
            }
        }
    }
}

/// Radians for an optional rotation
#[inline]
pub fn rotation_radians(rotation: Option<&Rotation>) -> f64 {
    rotation.map_or(0.0, Rotation::to_radians)
}

/// Field deserializer for bare numeric dimensions. Anything other than a
/// JSON number reads as absent instead of failing the surrounding element.
pub fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64())
}
