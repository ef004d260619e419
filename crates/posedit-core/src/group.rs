//! Correlated displacement of finger-group members during a drag.
//!
//! When a drag starts on a finger joint, the offset of every other
//! visible joint of the same finger is captured relative to the dragged
//! one. Each move then re-places those joints at `anchor + offset`, so a
//! translation of the anchor by `(dx, dy)` translates the whole finger by
//! exactly `(dx, dy)`. The offsets live only as long as the gesture.

use crate::graph::KeypointGraph;
use crate::topology;
use crate::types::{KeypointId, Point};

/// Captured offsets for one drag gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDrag {
    anchor: KeypointId,
    offsets: Vec<(KeypointId, Point)>,
}

impl GroupDrag {
    /// Capture offsets for a drag starting on `anchor`.
    ///
    /// Returns `None` when `anchor` is hidden or does not belong to a
    /// finger group (body keypoints and hand wrists never do). Hidden
    /// peers are left out and stay where they are.
    #[must_use]
    pub fn capture(graph: &KeypointGraph, anchor: KeypointId) -> Option<Self> {
        topology::finger_group(anchor)?;
        let anchor_pos = graph.get(anchor)?.position;
        let offsets = topology::group_peers(anchor)
            .into_iter()
            .filter_map(|peer| graph.get(peer).map(|kp| (peer, kp.position - anchor_pos)))
            .collect();
        Some(Self { anchor, offsets })
    }

    /// The keypoint the gesture started on.
    #[must_use]
    pub const fn anchor(&self) -> KeypointId {
        self.anchor
    }

    /// Ids of the peers that follow the anchor.
    pub fn members(&self) -> impl Iterator<Item = KeypointId> + '_ {
        self.offsets.iter().map(|&(id, _)| id)
    }

    /// Re-place every captured peer relative to the anchor's new position.
    ///
    /// Returns the ids that were written.
    pub fn propagate(&self, graph: &mut KeypointGraph, anchor_pos: Point) -> Vec<KeypointId> {
        self.offsets
            .iter()
            .map(|&(id, offset)| {
                graph.set_position(id, anchor_pos + offset);
                id
            })
            .collect()
    }
}
