// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Board and label textures
//!
//! Textures are described as SVG and handed to a [`Rasterizer`]. Board
//! layers use circuit coordinates directly as the SVG user space, so image
//! columns follow +x and image rows follow +y (scene +z).

use crate::cache::LabelCache;
use crate::color::to_css;
use crate::error::{Error, Result};
use pcb3d_core::{is_bottom_layer, CircuitJson, Layer, OutlineRef, PcbPlatedHole, Point};
use pcb3d_geometry::board::{hole_feature, to_board_space};
use pcb3d_geometry::pour::pour_profile;
use pcb3d_geometry::{BoardFeature, Color, Point2};
use std::fmt::Write as _;
use std::sync::Arc;

pub const TOP_LAYER_COLOR: Color = Color::rgb(0x00, 0x8C, 0x00);
pub const BOTTOM_LAYER_COLOR: Color = Color::rgb(0x00, 0x66, 0x00);
pub const COPPER_TEXTURE_COLOR: Color = Color::rgb(0xff, 0xe0, 0x66);
pub const DRILL_COLOR: Color = Color::rgba(0, 0, 0, 0.5);

/// Encoded PNG plus its pixel size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngImage {
    pub data: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
}

impl PngImage {
    pub fn new(data: impl Into<Arc<[u8]>>, width: u32, height: u32) -> Self {
        Self {
            data: data.into(),
            width,
            height,
        }
    }

    /// Height over width; 1 for an empty image
    pub fn aspect(&self) -> f64 {
        if self.width == 0 {
            1.0
        } else {
            self.height as f64 / self.width as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RasterOptions {
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels; the SVG aspect ratio decides when absent
    pub height: Option<u32>,
    /// CSS color painted behind the image, transparent when absent
    pub background: Option<String>,
}

/// SVG to PNG conversion
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, svg: &str, options: &RasterOptions) -> Result<PngImage>;
}

/// Which face of the board a texture covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardSide {
    Top,
    Bottom,
}

impl BoardSide {
    pub fn matches(self, layer: Option<&Layer>) -> bool {
        match self {
            BoardSide::Top => !is_bottom_layer(layer),
            BoardSide::Bottom => is_bottom_layer(layer),
        }
    }

    fn background(self) -> Color {
        match self {
            BoardSide::Top => TOP_LAYER_COLOR,
            BoardSide::Bottom => BOTTOM_LAYER_COLOR,
        }
    }
}

/// Rendered faces of a board
#[derive(Debug, Clone, PartialEq)]
pub struct BoardTextures {
    pub top: PngImage,
    pub bottom: PngImage,
}

/// Axis-aligned extent of a board outline in circuit coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineExtent {
    pub min: Point,
    pub width: f64,
    pub height: f64,
}

impl OutlineExtent {
    pub fn of(outline: &OutlineRef<'_>) -> Self {
        match outline.outline {
            Some(points) if points.len() >= 3 => {
                let (mut min, mut max) = (points[0], points[0]);
                for p in points {
                    min = Point::new(min.x.min(p.x), min.y.min(p.y));
                    max = Point::new(max.x.max(p.x), max.y.max(p.y));
                }
                Self {
                    min,
                    width: max.x - min.x,
                    height: max.y - min.y,
                }
            }
            _ => Self {
                min: Point::new(
                    outline.center.x - outline.width / 2.0,
                    outline.center.y - outline.height / 2.0,
                ),
                width: outline.width,
                height: outline.height,
            },
        }
    }
}

fn fmt_num(v: f64) -> String {
    let rounded = (v * 1e4).round() / 1e4;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        rounded.to_string()
    }
}

/// Board-local drafting point back to circuit coordinates
fn from_board_space(p: &Point2<f64>, origin: Point) -> Point {
    Point::new(p.x + origin.x, origin.y - p.y)
}

fn ring_path(out: &mut String, ring: impl IntoIterator<Item = Point>) {
    for (i, p) in ring.into_iter().enumerate() {
        let _ = write!(out, "{}{} {} ", if i == 0 { 'M' } else { 'L' }, fmt_num(p.x), fmt_num(p.y));
    }
    out.push_str("Z ");
}

fn feature_svg(out: &mut String, feature: &BoardFeature, origin: Point, fill: &str) {
    match feature {
        BoardFeature::Circle { center, radius } => {
            let c = from_board_space(center, origin);
            let _ = write!(
                out,
                r#"<circle cx="{}" cy="{}" r="{}" fill="{fill}"/>"#,
                fmt_num(c.x),
                fmt_num(c.y),
                fmt_num(*radius)
            );
        }
        other => {
            let profile = other.profile();
            let mut d = String::new();
            ring_path(&mut d, profile.outer.iter().map(|p| from_board_space(p, origin)));
            let _ = write!(out, r#"<path d="{}" fill="{fill}"/>"#, d.trim_end());
        }
    }
}

/// Copper annulus or pad around a plated hole
fn plated_pad(hole: &PcbPlatedHole, origin: Point) -> Option<BoardFeature> {
    let center = to_board_space(hole.pad_center()?, origin);
    let positive = |v: Option<f64>| v.filter(|v| v.is_finite() && *v > 0.0);

    match hole.shape.as_deref() {
        Some("pill_hole_with_rect_pad") => Some(BoardFeature::RoundedRect {
            center,
            width: positive(hole.rect_pad_width)?,
            height: positive(hole.rect_pad_height)?,
            corner_radius: 0.0,
            rotation: 0.0,
        }),
        Some("pill") => Some(BoardFeature::pill(
            center,
            positive(hole.outer_width)?,
            positive(hole.outer_height)?,
            0.0,
        )),
        _ => Some(BoardFeature::Circle {
            center,
            radius: positive(hole.outer_diameter.or(hole.hole_diameter))? / 2.0,
        }),
    }
}

/// Drill of a plated hole, at its offset position
fn plated_drill(hole: &PcbPlatedHole, origin: Point) -> Option<BoardFeature> {
    let center = to_board_space(hole.drill_center()?, origin);
    let positive = |v: Option<f64>| v.filter(|v| v.is_finite() && *v > 0.0);

    if hole.is_pill() {
        Some(BoardFeature::pill(
            center,
            positive(hole.hole_width)?,
            positive(hole.hole_height)?,
            0.0,
        ))
    } else {
        Some(BoardFeature::Circle {
            center,
            radius: positive(hole.hole_diameter.or(hole.outer_diameter))? / 2.0,
        })
    }
}

/// SVG for one face of a board: outline fill, copper pours of that layer,
/// plated pads and drills.
pub fn board_layer_svg(circuit: &CircuitJson, outline: &OutlineRef<'_>, side: BoardSide) -> String {
    let extent = OutlineExtent::of(outline);
    let origin = outline.center;
    let copper = to_css(&COPPER_TEXTURE_COLOR);
    let drill = to_css(&DRILL_COLOR);

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{} {} {} {}" width="{}" height="{}">"#,
        fmt_num(extent.min.x),
        fmt_num(extent.min.y),
        fmt_num(extent.width),
        fmt_num(extent.height),
        fmt_num(extent.width),
        fmt_num(extent.height),
    );

    let background = to_css(&side.background());
    match outline.outline {
        Some(points) if points.len() >= 3 => {
            let mut d = String::new();
            ring_path(&mut d, points.iter().copied());
            let _ = write!(svg, r#"<path d="{}" fill="{background}"/>"#, d.trim_end());
        }
        _ => {
            let _ = write!(
                svg,
                r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{background}"/>"#,
                fmt_num(extent.min.x),
                fmt_num(extent.min.y),
                fmt_num(extent.width),
                fmt_num(extent.height),
            );
        }
    }

    for pour in circuit.copper_pours().filter(|p| side.matches(p.layer.as_ref())) {
        let Some(profile) = pour_profile(pour, origin) else {
            continue;
        };
        let mut d = String::new();
        ring_path(&mut d, profile.outer.iter().map(|p| from_board_space(p, origin)));
        for hole in &profile.holes {
            ring_path(&mut d, hole.iter().map(|p| from_board_space(p, origin)));
        }
        let _ = write!(
            svg,
            r#"<path d="{}" fill="{copper}" fill-rule="evenodd"/>"#,
            d.trim_end()
        );
    }

    for hole in circuit.plated_holes() {
        if let Some(pad) = plated_pad(hole, origin) {
            feature_svg(&mut svg, &pad, origin, &copper);
        }
    }
    for hole in circuit.plated_holes() {
        if let Some(feature) = plated_drill(hole, origin) {
            feature_svg(&mut svg, &feature, origin, &drill);
        }
    }
    for hole in circuit.holes() {
        if let Some(feature) = hole_feature(hole, origin) {
            feature_svg(&mut svg, &feature, origin, &drill);
        }
    }

    svg.push_str("</svg>");
    svg
}

/// Render both faces concurrently; either failure fails the pair
pub fn render_board_textures(
    circuit: &CircuitJson,
    outline: &OutlineRef<'_>,
    resolution: u32,
    rasterizer: &dyn Rasterizer,
) -> Result<BoardTextures> {
    if resolution == 0 {
        return Err(Error::Raster("texture resolution must be positive".into()));
    }
    let extent = OutlineExtent::of(outline);
    if !(extent.width > 0.0 && extent.height > 0.0) {
        return Err(Error::Raster("board has no area to texture".into()));
    }
    let options = RasterOptions {
        width: resolution,
        height: Some(((resolution as f64) * extent.height / extent.width).round().max(1.0) as u32),
        background: None,
    };

    let render = |side: BoardSide| rasterizer.rasterize(&board_layer_svg(circuit, outline, side), &options);
    let (top, bottom) = rayon::join(|| render(BoardSide::Top), || render(BoardSide::Bottom));
    Ok(BoardTextures {
        top: top?,
        bottom: bottom?,
    })
}

/// Visual parameters of a label badge. Lengths default to multiples of the font size.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelStyle {
    pub font_size: f64,
    pub font_family: String,
    pub padding: Option<f64>,
    pub background: String,
    pub text_color: String,
    pub corner_radius: Option<f64>,
    pub min_width: Option<f64>,
    pub min_height: Option<f64>,
    pub pixel_width: u32,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_size: 48.0,
            font_family: "Arial, Helvetica, sans-serif".to_string(),
            padding: None,
            background: "rgba(0,0,0,0.7)".to_string(),
            text_color: "#ffffff".to_string(),
            corner_radius: None,
            min_width: None,
            min_height: None,
            pixel_width: 512,
        }
    }
}

impl LabelStyle {
    fn padding(&self) -> f64 {
        self.padding.unwrap_or(self.font_size * 0.4)
    }

    fn corner_radius(&self) -> f64 {
        self.corner_radius.unwrap_or(self.font_size * 0.3)
    }

    fn min_width(&self) -> f64 {
        self.min_width.unwrap_or(self.font_size * 2.0)
    }

    fn min_height(&self) -> f64 {
        self.min_height.unwrap_or(self.font_size * 1.6)
    }

    /// SVG user-space size of the badge for `text`
    pub fn badge_size(&self, text: &str) -> (f64, f64) {
        let f = self.font_size;
        let estimated = text.chars().count().max(1) as f64 * f * 0.6;
        let width = (estimated + 2.0 * self.padding()).max(self.min_width());
        let height = (f + 2.0 * self.padding()).max(self.min_height());
        (width, height)
    }

    fn pixel_height(&self, text: &str) -> u32 {
        let (w, h) = self.badge_size(text);
        ((h / w) * self.pixel_width as f64).round().max(1.0) as u32
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

pub fn label_svg(text: &str, style: &LabelStyle) -> String {
    let (width, height) = style.badge_size(text);
    let radius = fmt_num(style.corner_radius());
    format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            r#"<rect x="0" y="0" width="{w}" height="{h}" rx="{r}" ry="{r}" fill="{bg}"/>"#,
            r#"<text x="50%" y="50%" font-family="{family}" font-size="{size}" font-weight="700" "#,
            r#"fill="{fg}" dominant-baseline="middle" text-anchor="middle">{text}</text></svg>"#
        ),
        w = fmt_num(width),
        h = fmt_num(height),
        r = radius,
        bg = escape_xml(&style.background),
        family = escape_xml(&style.font_family),
        size = fmt_num(style.font_size),
        fg = escape_xml(&style.text_color),
        text = escape_xml(text),
    )
}

/// Every parameter that changes the rendered pixels, joined with `|`
pub fn label_cache_key(text: &str, style: &LabelStyle) -> String {
    [
        text.to_string(),
        fmt_num(style.font_size),
        style.font_family.clone(),
        fmt_num(style.padding()),
        style.background.clone(),
        style.text_color.clone(),
        fmt_num(style.corner_radius()),
        fmt_num(style.min_width()),
        fmt_num(style.min_height()),
        style.pixel_width.to_string(),
    ]
    .join("|")
}

/// Rasterize a label badge, memoized in `cache`
pub fn create_label_texture(
    text: &str,
    style: &LabelStyle,
    rasterizer: &dyn Rasterizer,
    cache: &LabelCache,
) -> Result<PngImage> {
    let key = label_cache_key(text, style);
    cache.get_or_try_insert_with(&key, || {
        tracing::trace!(label = %text, "rasterizing label");
        let options = RasterOptions {
            width: style.pixel_width,
            height: Some(style.pixel_height(text)),
            background: None,
        };
        rasterizer.rasterize(&label_svg(text, style), &options)
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pcb3d_core::{CircuitElement, PcbBoard, PcbHole};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Records every SVG and answers with a fake PNG of the requested size
    #[derive(Default)]
    pub(crate) struct RecordingRasterizer {
        pub svgs: Mutex<Vec<String>>,
        pub calls: AtomicUsize,
        pub fail: bool,
    }

    impl Rasterizer for RecordingRasterizer {
        fn rasterize(&self, svg: &str, options: &RasterOptions) -> Result<PngImage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.svgs.lock().unwrap().push(svg.to_string());
            if self.fail {
                return Err(Error::Raster("renderer unavailable".into()));
            }
            let height = options.height.unwrap_or(options.width);
            Ok(PngImage::new(b"\x89PNG fake".to_vec(), options.width, height))
        }
    }

    fn circuit() -> CircuitJson {
        CircuitJson::from(vec![
            CircuitElement::PcbBoard(PcbBoard {
                center: Point::new(0.0, 0.0),
                width: 40.0,
                height: 20.0,
                ..Default::default()
            }),
            CircuitElement::PcbHole(PcbHole {
                x: Some(5.0),
                y: Some(5.0),
                hole_diameter: Some(2.0),
                ..Default::default()
            }),
        ])
    }

    #[test]
    fn test_board_svg_layers() {
        let circuit = circuit();
        let board = circuit.board().unwrap();
        let top = board_layer_svg(&circuit, &board.outline_ref(), BoardSide::Top);
        let bottom = board_layer_svg(&circuit, &board.outline_ref(), BoardSide::Bottom);

        assert!(top.contains(r#"viewBox="-20 -10 40 20""#));
        assert!(top.contains("rgba(0,140,0,1)"));
        assert!(bottom.contains("rgba(0,102,0,1)"));
        assert!(top.contains(r#"<circle cx="5" cy="5" r="1" fill="rgba(0,0,0,0.5)"/>"#));
    }

    #[test]
    fn test_textures_keep_aspect_ratio() {
        let circuit = circuit();
        let board = circuit.board().unwrap();
        let rasterizer = RecordingRasterizer::default();
        let textures = render_board_textures(&circuit, &board.outline_ref(), 1024, &rasterizer).unwrap();
        assert_eq!((textures.top.width, textures.top.height), (1024, 512));
        assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_texture_failure_propagates() {
        let circuit = circuit();
        let board = circuit.board().unwrap();
        let rasterizer = RecordingRasterizer {
            fail: true,
            ..Default::default()
        };
        assert!(render_board_textures(&circuit, &board.outline_ref(), 256, &rasterizer).is_err());
    }

    #[test]
    fn test_label_geometry() {
        let style = LabelStyle::default();
        // 2 chars: 2*48*0.6 + 2*19.2 = 96, clamped to min width 96
        let (w, h) = style.badge_size("R1");
        assert!((w - 96.0).abs() < 1e-9);
        assert!((h - 86.4).abs() < 1e-9);
        assert_eq!(style.pixel_height("R1"), 461);

        let (empty_w, _) = style.badge_size("");
        assert!((empty_w - 96.0).abs() < 1e-9);
    }

    #[test]
    fn test_label_svg_escapes_text() {
        let svg = label_svg("A&B<\"'>", &LabelStyle::default());
        assert!(svg.contains(">A&amp;B&lt;&quot;&apos;&gt;</text>"));
        assert!(svg.contains(r#"rx="14.4""#));
        assert!(svg.contains(r#"font-weight="700""#));
    }

    #[test]
    fn test_labels_are_cached_by_style() {
        let rasterizer = RecordingRasterizer::default();
        let cache = LabelCache::new(16);
        let style = LabelStyle::default();

        let a = create_label_texture("U1", &style, &rasterizer, &cache).unwrap();
        let b = create_label_texture("U1", &style, &rasterizer, &cache).unwrap();
        assert_eq!(a, b);
        assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 1);

        let bigger = LabelStyle {
            font_size: 64.0,
            ..LabelStyle::default()
        };
        create_label_texture("U1", &bigger, &rasterizer, &cache).unwrap();
        assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 2);
        assert_ne!(label_cache_key("U1", &style), label_cache_key("U1", &bigger));
    }
}
