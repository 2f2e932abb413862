// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CSS color strings as used by scene options (`#rgb`, `#rrggbb`,
//! `#rrggbbaa`, `rgb(...)`, `rgba(...)` and a few named colors).

use pcb3d_geometry::Color;

const NAMED: &[(&str, Color)] = &[
    ("black", Color::rgb(0, 0, 0)),
    ("white", Color::rgb(255, 255, 255)),
    ("red", Color::rgb(255, 0, 0)),
    ("green", Color::rgb(0, 128, 0)),
    ("blue", Color::rgb(0, 0, 255)),
    ("gray", Color::rgb(128, 128, 128)),
    ("grey", Color::rgb(128, 128, 128)),
    ("yellow", Color::rgb(255, 255, 0)),
    ("orange", Color::rgb(255, 165, 0)),
    ("transparent", Color::rgba(0, 0, 0, 0.0)),
];

fn hex_channel(s: &str) -> Option<u8> {
    u8::from_str_radix(s, 16).ok()
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        3 => {
            let d = |i: usize| hex_channel(&hex[i..i + 1]).map(|v| v * 17);
            Some(Color::rgb(d(0)?, d(1)?, d(2)?))
        }
        6 | 8 => {
            let c = |i: usize| hex_channel(&hex[i..i + 2]);
            let a = if hex.len() == 8 { c(6)? as f64 / 255.0 } else { 1.0 };
            Some(Color::rgba(c(0)?, c(2)?, c(4)?, a))
        }
        _ => None,
    }
}

fn parse_functional(args: &str, with_alpha: bool) -> Option<Color> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() != if with_alpha { 4 } else { 3 } {
        return None;
    }
    let channel = |s: &str| -> Option<u8> {
        let v: f64 = s.parse().ok()?;
        v.is_finite().then(|| v.round().clamp(0.0, 255.0) as u8)
    };
    let alpha = if with_alpha {
        let a: f64 = parts[3].parse().ok()?;
        if !a.is_finite() {
            return None;
        }
        a.clamp(0.0, 1.0)
    } else {
        1.0
    };
    Some(Color::rgba(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?, alpha))
}

/// Parse a CSS color; `None` for anything unrecognized
pub fn parse_css_color(input: &str) -> Option<Color> {
    let s = input.trim().to_ascii_lowercase();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }
    if let Some(args) = s.strip_prefix("rgba(").and_then(|r| r.strip_suffix(')')) {
        return parse_functional(args, true);
    }
    if let Some(args) = s.strip_prefix("rgb(").and_then(|r| r.strip_suffix(')')) {
        return parse_functional(args, false);
    }
    NAMED.iter().find(|(name, _)| *name == s).map(|(_, c)| *c)
}

/// Format as `rgba(r,g,b,a)`, the form board SVGs use
pub fn to_css(color: &Color) -> String {
    format!("rgba({},{},{},{})", color.r, color.g, color.b, color.a)
}
