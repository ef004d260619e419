//! SVG skeleton preview.
//!
//! Draws the currently visible edges and keypoints of a
//! [`KeypointGraph`] in source-pixel coordinates using the [`svg`] crate
//! for document construction and XML escaping. Edges are colored by the
//! table they come from so body, hands and wrist links are easy to tell
//! apart. This is a quick-look export, not a replacement for the
//! rasterization collaborator.

use svg::Document;
use svg::node::Text;
use svg::node::element::{Circle, Description, Group, Line, Rectangle, Title};

use posedit_core::{EdgeKind, KeypointGraph, Side};

/// Marker radius in source pixels.
const POINT_RADIUS: f64 = 4.0;
/// Edge stroke width in source pixels.
const STROKE_WIDTH: f64 = 2.0;

/// Metadata to embed in the SVG document.
///
/// When present, `<title>` and `<desc>` are emitted right after the
/// opening `<svg>` tag.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, typically the source image filename.
    pub title: Option<&'a str>,
    /// Free-form description.
    pub description: Option<&'a str>,
}

const fn edge_color(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::Body => "#ffffff",
        EdgeKind::Hand(Side::Left) => "#f0a030",
        EdgeKind::Hand(Side::Right) => "#30c0f0",
        EdgeKind::WristLink(_) => "#a0a0a0",
    }
}

/// Serialize the visible skeleton of `graph` as an SVG document.
#[must_use]
pub fn to_skeleton_svg(graph: &KeypointGraph, metadata: &SvgMetadata<'_>) -> String {
    let dims = graph.source_dimensions();
    let mut doc = Document::new()
        .set("width", dims.width)
        .set("height", dims.height)
        .set("viewBox", (0, 0, dims.width, dims.height));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    doc = doc.add(
        Rectangle::new()
            .set("width", dims.width)
            .set("height", dims.height)
            .set("fill", "black"),
    );

    let mut edges = Group::new().set("id", "edges");
    for edge in graph.visible_edges() {
        let (Some(from), Some(to)) = (graph.get(edge.from), graph.get(edge.to)) else {
            continue;
        };
        edges = edges.add(
            Line::new()
                .set("x1", from.position.x)
                .set("y1", from.position.y)
                .set("x2", to.position.x)
                .set("y2", to.position.y)
                .set("stroke", edge_color(edge.kind))
                .set("stroke-width", STROKE_WIDTH)
                .set("stroke-linecap", "round")
                .set("data-from", edge.from.to_string())
                .set("data-to", edge.to.to_string()),
        );
    }
    doc = doc.add(edges);

    let mut points = Group::new().set("id", "keypoints");
    for kp in graph.visible_keypoints() {
        points = points.add(
            Circle::new()
                .set("cx", kp.position.x)
                .set("cy", kp.position.y)
                .set("r", POINT_RADIUS)
                .set("fill", "red")
                .set("data-id", kp.id.to_string()),
        );
    }
    doc = doc.add(points);

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
