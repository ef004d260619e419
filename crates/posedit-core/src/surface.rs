//! Drag and hover handling for the keypoint editor.
//!
//! The surface owns the [`KeypointGraph`] while a session is editing and
//! is the only path through which keypoints move. Pointer positions
//! arrive in display space and are mapped back to source space before
//! being written.
//!
//! A gesture runs `start → move* → end`, or `start → move* → cancel`
//! when the pointer is lost. Finger-group offsets and drag-start
//! positions belong to the gesture and are released on every exit path.

use crate::coords::CoordinateMapper;
use crate::graph::KeypointGraph;
use crate::group::GroupDrag;
use crate::topology;
use crate::types::{Edge, KeypointId, Point};

/// Result of one drag-move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragUpdate {
    /// The dragged keypoint followed by any group peers that moved with it.
    pub moved: Vec<KeypointId>,
    /// Every currently visible edge touching a moved keypoint.
    pub edges: Vec<Edge>,
}

/// Visual-only highlight of a hovered keypoint's finger group.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HoverPreview {
    /// Visible peers of the hovered keypoint's group.
    peers: Vec<KeypointId>,
}

#[derive(Debug, Clone, PartialEq)]
struct Gesture {
    id: KeypointId,
    group: Option<GroupDrag>,
    origins: Vec<(KeypointId, Point)>,
}

/// Interactive editing state for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct EditSurface {
    graph: KeypointGraph,
    mapper: CoordinateMapper,
    paint_order: Vec<KeypointId>,
    gesture: Option<Gesture>,
    hover: Option<HoverPreview>,
}

impl EditSurface {
    /// Start editing `graph`, drawn through `mapper`.
    #[must_use]
    pub fn new(graph: KeypointGraph, mapper: CoordinateMapper) -> Self {
        let paint_order = graph
            .document()
            .active()
            .map(|person| person.keypoints().map(|kp| kp.id).collect())
            .unwrap_or_default();
        Self {
            graph,
            mapper,
            paint_order,
            gesture: None,
            hover: None,
        }
    }

    /// The graph being edited.
    #[must_use]
    pub const fn graph(&self) -> &KeypointGraph {
        &self.graph
    }

    /// The session's coordinate mapper.
    #[must_use]
    pub const fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    /// Keypoint ids in paint order; the last one is drawn on top.
    #[must_use]
    pub fn paint_order(&self) -> &[KeypointId] {
        &self.paint_order
    }

    /// The keypoint currently being dragged, if any.
    #[must_use]
    pub fn active_drag(&self) -> Option<KeypointId> {
        self.gesture.as_ref().map(|g| g.id)
    }

    /// Returns `true` if `id` is highlighted by the hover preview.
    #[must_use]
    pub fn is_previewed(&self, id: KeypointId) -> bool {
        self.hover.as_ref().is_some_and(|h| h.peers.contains(&id))
    }

    /// Display-space position of a visible keypoint.
    #[must_use]
    pub fn display_position(&self, id: KeypointId) -> Option<Point> {
        self.graph
            .get(id)
            .map(|kp| self.mapper.to_display(kp.position))
    }

    /// Begin dragging `id`.
    ///
    /// Refused (returns `false`) for hidden or unknown keypoints. An
    /// active drag on another node is ended first.
    pub fn start_drag(&mut self, id: KeypointId) -> bool {
        if self.gesture.is_some() {
            self.end_drag();
        }
        let Some(kp) = self.graph.get(id) else {
            tracing::debug!(%id, "refusing drag on hidden keypoint");
            return false;
        };

        if let Some(pos) = self.paint_order.iter().position(|&p| p == id) {
            let raised = self.paint_order.remove(pos);
            self.paint_order.push(raised);
        }

        let group = GroupDrag::capture(&self.graph, id);
        let mut origins = vec![(id, kp.position)];
        if let Some(group) = &group {
            origins.extend(
                group
                    .members()
                    .filter_map(|m| self.graph.get(m).map(|kp| (m, kp.position))),
            );
        }
        tracing::debug!(%id, grouped = origins.len() - 1, "drag started");
        self.gesture = Some(Gesture { id, group, origins });
        true
    }

    /// Move the dragged keypoint to `display_point`.
    ///
    /// Returns `None` if no drag is active.
    pub fn move_drag(&mut self, display_point: Point) -> Option<DragUpdate> {
        let gesture = self.gesture.as_ref()?;
        let source_point = self.mapper.to_source(display_point);
        self.graph.set_position(gesture.id, source_point);

        let mut moved = vec![gesture.id];
        if let Some(group) = &gesture.group {
            moved.extend(group.propagate(&mut self.graph, source_point));
        }

        let edges = self
            .graph
            .visible_edges()
            .into_iter()
            .filter(|e| moved.iter().any(|&m| e.touches(m)))
            .collect();
        Some(DragUpdate { moved, edges })
    }

    /// Commit the current gesture. Returns the dragged id, if any.
    pub fn end_drag(&mut self) -> Option<KeypointId> {
        let gesture = self.gesture.take()?;
        tracing::debug!(id = %gesture.id, "drag ended");
        Some(gesture.id)
    }

    /// Abort the current gesture and put every node it touched back where
    /// it was when the drag started. Returns the dragged id, if any.
    pub fn cancel_drag(&mut self) -> Option<KeypointId> {
        let gesture = self.gesture.take()?;
        for &(id, origin) in &gesture.origins {
            self.graph.set_position(id, origin);
        }
        tracing::debug!(id = %gesture.id, "drag cancelled");
        Some(gesture.id)
    }

    /// Preview the group peers of the hovered keypoint.
    pub fn hover_enter(&mut self, id: KeypointId) {
        let peers = topology::group_peers(id)
            .into_iter()
            .filter(|&p| self.graph.get(p).is_some())
            .collect();
        self.hover = Some(HoverPreview { peers });
    }

    /// Clear the hover preview. Independent of any active drag.
    pub fn hover_exit(&mut self) {
        self.hover = None;
    }
}
