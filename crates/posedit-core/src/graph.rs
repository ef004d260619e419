//! Canonical keypoint store with confidence-gated visibility.
//!
//! The graph owns the [`PoseDocument`] for one session and answers
//! visibility queries against the static tables in [`crate::topology`].
//! Only the active person (`people[0]`) is reachable through keypoint
//! ids; every other person is carried through untouched.
//!
//! Edges are never stored. [`KeypointGraph::visible_edges`] walks the
//! topology tables on every call so a confidence or position change is
//! reflected on the very next query.

use crate::topology::{self, BODY_EDGES, HAND_EDGES, HAND_WRIST};
use crate::types::{Dimensions, Edge, EdgeKind, Keypoint, KeypointId, Point, PoseDocument, Side};

/// A keypoint is visible only if its confidence is strictly above this.
pub const VISIBILITY_THRESHOLD: f64 = 0.3;

/// Minimum confidence (inclusive) of both wrists for a wrist link.
pub const WRIST_LINK_THRESHOLD: f64 = 0.3;

/// A non-wrist hand keypoint counts as support if its confidence is
/// strictly above this.
pub const HAND_SUPPORT_THRESHOLD: f64 = 0.2;

/// Number of supporting hand keypoints required for a wrist link.
pub const MIN_HAND_SUPPORT: usize = 5;

/// Keypoint store plus visibility rules for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct KeypointGraph {
    document: PoseDocument,
    source: Dimensions,
}

impl KeypointGraph {
    /// Wrap a document whose positions are in `source` pixel space.
    #[must_use]
    pub const fn new(document: PoseDocument, source: Dimensions) -> Self {
        Self { document, source }
    }

    /// Source image dimensions used for the in-bounds test.
    #[must_use]
    pub const fn source_dimensions(&self) -> Dimensions {
        self.source
    }

    /// The underlying document.
    #[must_use]
    pub const fn document(&self) -> &PoseDocument {
        &self.document
    }

    /// Consume the graph and return its document.
    #[must_use]
    pub fn into_document(self) -> PoseDocument {
        self.document
    }

    /// Total keypoint count across every person in the document.
    #[must_use]
    pub fn keypoint_count(&self) -> usize {
        self.document.keypoint_count()
    }

    /// A visible keypoint of the active person.
    ///
    /// Returns `None` for unknown ids and for keypoints whose confidence
    /// is at or below [`VISIBILITY_THRESHOLD`].
    #[must_use]
    pub fn get(&self, id: KeypointId) -> Option<Keypoint> {
        self.raw(id).filter(|kp| is_visible(kp)).copied()
    }

    /// Move one keypoint of the active person. Unknown ids are ignored.
    pub fn set_position(&mut self, id: KeypointId, position: Point) {
        if let Some(kp) = self
            .document
            .active_mut()
            .and_then(|person| person.keypoint_mut(id))
        {
            kp.position = position;
        }
    }

    /// Every visible keypoint of the active person, body first.
    #[must_use]
    pub fn visible_keypoints(&self) -> Vec<Keypoint> {
        self.document
            .active()
            .map(|person| person.keypoints().filter(|kp| is_visible(kp)).copied().collect())
            .unwrap_or_default()
    }

    /// All currently displayable edges.
    ///
    /// An edge is included when both endpoints are visible and lie inside
    /// the source image. Wrist links must pass that test too, on top of
    /// [`Self::wrist_hand_link_eligible`] for their side.
    #[must_use]
    pub fn visible_edges(&self) -> Vec<Edge> {
        let mut edges = Vec::new();

        for &(a, b) in &BODY_EDGES {
            self.push_if_displayable(
                &mut edges,
                KeypointId::Body(a),
                KeypointId::Body(b),
                EdgeKind::Body,
            );
        }

        for side in Side::ALL {
            for &(a, b) in &HAND_EDGES {
                self.push_if_displayable(
                    &mut edges,
                    KeypointId::Hand(side, a),
                    KeypointId::Hand(side, b),
                    EdgeKind::Hand(side),
                );
            }
            if self.wrist_hand_link_eligible(side) {
                self.push_if_displayable(
                    &mut edges,
                    KeypointId::Body(topology::body_wrist(side)),
                    KeypointId::Hand(side, HAND_WRIST),
                    EdgeKind::WristLink(side),
                );
            }
        }

        edges
    }

    /// Visible edges with `id` as an endpoint.
    #[must_use]
    pub fn edges_touching(&self, id: KeypointId) -> Vec<Edge> {
        self.visible_edges()
            .into_iter()
            .filter(|e| e.touches(id))
            .collect()
    }

    /// Whether the body wrist should be drawn connected to the hand.
    ///
    /// Requires the body wrist at confidence ≥ [`WRIST_LINK_THRESHOLD`]
    /// and in bounds, the hand wrist at confidence ≥
    /// [`WRIST_LINK_THRESHOLD`], and at least [`MIN_HAND_SUPPORT`] of the
    /// other hand keypoints above [`HAND_SUPPORT_THRESHOLD`].
    #[must_use]
    pub fn wrist_hand_link_eligible(&self, side: Side) -> bool {
        let Some(person) = self.document.active() else {
            return false;
        };
        let Some(body_wrist) = person.body.get(topology::body_wrist(side)) else {
            return false;
        };
        if body_wrist.confidence < WRIST_LINK_THRESHOLD || !self.in_bounds(body_wrist) {
            return false;
        }

        let hand = person.hand(side);
        let Some(hand_wrist) = hand.get(HAND_WRIST) else {
            return false;
        };
        if hand_wrist.confidence < WRIST_LINK_THRESHOLD {
            return false;
        }

        let support = hand
            .iter()
            .skip(HAND_WRIST + 1)
            .filter(|kp| kp.confidence > HAND_SUPPORT_THRESHOLD)
            .count();
        support >= MIN_HAND_SUPPORT
    }

    fn raw(&self, id: KeypointId) -> Option<&Keypoint> {
        self.document.active().and_then(|person| person.keypoint(id))
    }

    fn displayable(&self, id: KeypointId) -> bool {
        self.raw(id).is_some_and(|kp| is_visible(kp) && self.in_bounds(kp))
    }

    fn push_if_displayable(
        &self,
        edges: &mut Vec<Edge>,
        from: KeypointId,
        to: KeypointId,
        kind: EdgeKind,
    ) {
        if self.displayable(from) && self.displayable(to) {
            edges.push(Edge { from, to, kind });
        }
    }

    fn in_bounds(&self, kp: &Keypoint) -> bool {
        let nx = kp.position.x / f64::from(self.source.width);
        let ny = kp.position.y / f64::from(self.source.height);
        (0.0..=1.0).contains(&nx) && (0.0..=1.0).contains(&ny)
    }
}

fn is_visible(kp: &Keypoint) -> bool {
    kp.confidence > VISIBILITY_THRESHOLD
}
