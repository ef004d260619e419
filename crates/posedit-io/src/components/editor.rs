//! Interactive keypoint editor.
//!
//! Draws the source image at display size with the visible skeleton on
//! top, and turns pointer gestures into [`EditSurface`] calls. Dragging
//! keeps the grab offset: the node moves by exactly as much as the
//! pointer has moved since the press, so grabbing a marker off-center
//! does not make it jump.
//!
//! [`EditSurface`]: posedit_core::EditSurface

use dioxus::prelude::*;
use posedit_core::{EdgeKind, KeypointId, Point, Session, Side};

/// Marker radius in display pixels.
const NODE_RADIUS: f64 = 5.0;

/// Props for the [`PoseEditor`] component.
#[derive(Props, Clone, PartialEq)]
pub struct PoseEditorProps {
    /// The session being edited. Nothing is drawn outside the edit stage.
    session: Signal<Option<Session>>,
    /// Blob URL of the source image.
    image_url: String,
}

/// Pointer and node positions captured when a drag starts.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Grab {
    client_start: Point,
    node_start: Point,
}

impl Grab {
    /// Display position of the dragged node for a pointer at `client`.
    fn target(self, client: Point) -> Point {
        self.node_start + (client - self.client_start)
    }
}

struct EdgeView {
    key: String,
    from: Point,
    to: Point,
    class: String,
}

struct NodeView {
    id: KeypointId,
    at: Point,
    class: String,
}

fn edge_class(kind: EdgeKind, previewed: bool) -> String {
    let base = match kind {
        EdgeKind::Body => "edge edge-body",
        EdgeKind::Hand(Side::Left) => "edge edge-hand-left",
        EdgeKind::Hand(Side::Right) => "edge edge-hand-right",
        EdgeKind::WristLink(_) => "edge edge-wrist",
    };
    if previewed {
        format!("{base} previewed")
    } else {
        base.to_owned()
    }
}

fn node_class(id: KeypointId, active: bool, previewed: bool) -> String {
    let mut class = String::from(if id.side().is_some() {
        "node node-hand"
    } else {
        "node node-body"
    });
    if active {
        class.push_str(" active");
    }
    if previewed {
        class.push_str(" previewed");
    }
    class
}

/// SVG keypoint editor.
///
/// Pressing a marker starts a drag. Moving the pointer anywhere over the
/// editor moves the marker (and its finger group); releasing ends the
/// drag. Leaving the editor ends the drag where it is, and a cancelled
/// pointer puts the dragged points back. Hovering a finger joint
/// highlights the rest of its finger.
#[component]
pub fn PoseEditor(props: PoseEditorProps) -> Element {
    let mut session = props.session;
    let mut grab = use_signal(|| Option::<Grab>::None);

    let guard = session.read();
    let Some(surface) = guard.as_ref().and_then(Session::surface) else {
        return rsx! {
            div { class: "editor-placeholder", "Nothing to edit" }
        };
    };

    let display = surface.mapper().display();
    let (w, h) = (display.width, display.height);
    let active = surface.active_drag();

    let edges: Vec<EdgeView> = surface
        .graph()
        .visible_edges()
        .into_iter()
        .filter_map(|edge| {
            let from = surface.display_position(edge.from)?;
            let to = surface.display_position(edge.to)?;
            let previewed = surface.is_previewed(edge.from) && surface.is_previewed(edge.to);
            Some(EdgeView {
                key: format!("{}-{}", edge.from, edge.to),
                from,
                to,
                class: edge_class(edge.kind, previewed),
            })
        })
        .collect();

    let nodes: Vec<NodeView> = surface
        .paint_order()
        .iter()
        .filter_map(|&id| {
            let at = surface.display_position(id)?;
            Some(NodeView {
                id,
                at,
                class: node_class(id, active == Some(id), surface.is_previewed(id)),
            })
        })
        .collect();
    drop(guard);

    let on_move = move |evt: PointerEvent| {
        let Some(g) = grab() else {
            return;
        };
        let client = evt.client_coordinates();
        let target = g.target(Point::new(client.x, client.y));
        if let Some(surface) = session.write().as_mut().and_then(Session::surface_mut) {
            surface.move_drag(target);
        }
    };

    let mut finish = move |cancel: bool| {
        if grab.take().is_none() {
            return;
        }
        if let Some(surface) = session.write().as_mut().and_then(Session::surface_mut) {
            if cancel {
                surface.cancel_drag();
            } else {
                surface.end_drag();
            }
        }
    };

    rsx! {
        svg {
            xmlns: "http://www.w3.org/2000/svg",
            class: "pose-editor",
            width: "{w}",
            height: "{h}",
            view_box: "0 0 {w} {h}",
            onpointermove: on_move,
            onpointerup: move |_| finish(false),
            onpointerleave: move |_| finish(false),
            onpointercancel: move |_| finish(true),

            image {
                "href": "{props.image_url}",
                x: "0",
                y: "0",
                width: "{w}",
                height: "{h}",
                "preserveAspectRatio": "none",
            }

            g { class: "edges",
                for edge in edges {
                    line {
                        key: "{edge.key}",
                        class: "{edge.class}",
                        x1: "{edge.from.x}",
                        y1: "{edge.from.y}",
                        x2: "{edge.to.x}",
                        y2: "{edge.to.y}",
                    }
                }
            }

            g { class: "nodes",
                for node in nodes {
                    circle {
                        key: "{node.id}",
                        class: "{node.class}",
                        cx: "{node.at.x}",
                        cy: "{node.at.y}",
                        r: "{NODE_RADIUS}",
                        onpointerdown: move |evt: PointerEvent| {
                            evt.prevent_default();
                            evt.stop_propagation();
                            let client = evt.client_coordinates();
                            let mut slot = session.write();
                            let Some(surface) = slot.as_mut().and_then(Session::surface_mut) else {
                                return;
                            };
                            if surface.start_drag(node.id) {
                                grab.set(Some(Grab {
                                    client_start: Point::new(client.x, client.y),
                                    node_start: node.at,
                                }));
                            }
                        },
                        onpointerenter: move |_| {
                            if let Some(surface) = session.write().as_mut().and_then(Session::surface_mut) {
                                surface.hover_enter(node.id);
                            }
                        },
                        onpointerleave: move |_| {
                            if let Some(surface) = session.write().as_mut().and_then(Session::surface_mut) {
                                surface.hover_exit();
                            }
                        },
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grab_offset_is_preserved() {
        let grab = Grab {
            client_start: Point::new(103.0, 207.0),
            node_start: Point::new(50.0, 60.0),
        };
        assert_eq!(grab.target(Point::new(103.0, 207.0)), Point::new(50.0, 60.0));
        assert_eq!(grab.target(Point::new(113.0, 202.0)), Point::new(60.0, 55.0));
    }

    #[test]
    fn edge_classes_follow_kind() {
        assert_eq!(edge_class(EdgeKind::Body, false), "edge edge-body");
        assert_eq!(
            edge_class(EdgeKind::Hand(Side::Right), true),
            "edge edge-hand-right previewed"
        );
        assert_eq!(edge_class(EdgeKind::WristLink(Side::Left), false), "edge edge-wrist");
    }

    #[test]
    fn node_classes_mark_state() {
        assert_eq!(node_class(KeypointId::Body(3), false, false), "node node-body");
        assert_eq!(
            node_class(KeypointId::Hand(Side::Left, 4), true, true),
            "node node-hand active previewed"
        );
    }
}
