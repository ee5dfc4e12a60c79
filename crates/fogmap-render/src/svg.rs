//! SVG export of reveal geometry.
//!
//! The document is a single fog rectangle masked by a `<mask>` element:
//! the mask is a white background (fog shows) with the reveal shapes
//! drawn in black (fog hidden). Stroke geometry becomes `<circle>`
//! elements plus round-capped `<path>` strokes; polygon geometry becomes
//! one filled `<path>` per ring. The viewport matches the pixel
//! dimensions of the region the geometry was built against.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use fogmap_core::{PolygonGeometry, Polyline, RevealGeometry, StrokeGeometry};
use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Circle, Definitions, Description, Element, Mask, Path, Rectangle, Title};
use svg::node::{Node, Text, Value};

/// Fill of the fog rectangle.
pub const FOG_FILL: &str = "#000000";

/// `id` of the reveal mask element.
const MASK_ID: &str = "reveal";

/// Metadata to embed in the SVG document.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Emitted as `<title>`.
    pub title: Option<&'a str>,

    /// Emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized [`FogConfig`](fogmap_core::FogConfig) JSON, emitted
    /// inside `<metadata>` in a namespaced `<fogmap:config>` element.
    pub config_json: Option<&'a str>,
}

/// Build an SVG path `d` attribute from a polyline.
///
/// Returns an empty string for polylines with fewer than 2 points.
#[must_use]
pub fn build_path_data(polyline: &Polyline) -> String {
    let points = polyline.points();
    if points.len() < 2 {
        return String::new();
    }
    let mut data = Data::new().move_to((points[0].x, points[0].y));
    for p in &points[1..] {
        data = data.line_to((p.x, p.y));
    }
    String::from(Value::from(data))
}

fn stroke_shapes(mut mask: Mask, strokes: &StrokeGeometry) -> Mask {
    if !(strokes.radius_px.is_finite() && strokes.radius_px > 0.0) {
        return mask;
    }
    for c in &strokes.discs {
        mask = mask.add(
            Circle::new()
                .set("cx", c.x)
                .set("cy", c.y)
                .set("r", strokes.radius_px)
                .set("fill", "black"),
        );
    }
    for polyline in &strokes.polylines {
        let d = build_path_data(polyline);
        if d.is_empty() {
            continue;
        }
        mask = mask.add(
            Path::new()
                .set("d", d)
                .set("fill", "none")
                .set("stroke", "black")
                .set("stroke-width", strokes.stroke_width())
                .set("stroke-linecap", "round")
                .set("stroke-linejoin", "round"),
        );
    }
    mask
}

fn ring_shapes(mut mask: Mask, polygon: &PolygonGeometry) -> Mask {
    for ring in &polygon.rings {
        let mut coords = ring.exterior().coords();
        let Some(first) = coords.next() else {
            continue;
        };
        let mut data = Data::new().move_to((first.x, first.y));
        for c in coords {
            data = data.line_to((c.x, c.y));
        }
        mask = mask.add(Path::new().set("d", data.close()).set("fill", "black"));
    }
    mask
}

/// Serialize reveal geometry into an SVG document string.
///
/// # Examples
///
/// ```
/// use fogmap_core::{GeometryStyle, MapRegion, RevealGeometry};
/// use fogmap_render::{SvgMetadata, to_svg};
///
/// let region = MapRegion::new(0.0, 0.0, 0.01, 0.01, 320.0, 240.0);
/// let geometry = RevealGeometry::empty(GeometryStyle::Strokes, region);
/// let metadata = SvgMetadata {
///     title: Some("morning-walk"),
///     ..SvgMetadata::default()
/// };
/// let svg = to_svg(&geometry, &metadata);
/// assert!(svg.contains("<title>morning-walk</title>"));
/// assert!(svg.contains("url(#reveal)"));
/// ```
#[must_use]
pub fn to_svg(geometry: &RevealGeometry, metadata: &SvgMetadata<'_>) -> String {
    let region = geometry.region();
    let (w, h) = (region.pixel_width.max(0.0), region.pixel_height.max(0.0));

    let mut doc = Document::new()
        .set("width", w)
        .set("height", h)
        .set("viewBox", (0, 0, w, h));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }
    if let Some(config_json) = metadata.config_json {
        let mut config_el = Element::new("fogmap:config");
        config_el.assign("xmlns:fogmap", "https://github.com/fogmap/fogmap/ns/1");
        config_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(config_el);
        doc = doc.add(metadata_el);
    }

    let mut mask = Mask::new()
        .set("id", MASK_ID)
        .set("maskUnits", "userSpaceOnUse")
        .set("x", 0)
        .set("y", 0)
        .set("width", w)
        .set("height", h)
        .add(
            Rectangle::new()
                .set("width", w)
                .set("height", h)
                .set("fill", "white"),
        );
    mask = match geometry {
        RevealGeometry::Strokes(strokes) => stroke_shapes(mask, strokes),
        RevealGeometry::Polygon(polygon) => ring_shapes(mask, polygon),
    };

    doc = doc.add(Definitions::new().add(mask)).add(
        Rectangle::new()
            .set("width", w)
            .set("height", h)
            .set("fill", FOG_FILL)
            .set("mask", format!("url(#{MASK_ID})")),
    );

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
