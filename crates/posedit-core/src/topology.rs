//! Static skeleton topology: body edges, hand edges, wrist links, and
//! finger groups.
//!
//! These tables are immutable and shared by every session.

use crate::types::{KeypointId, Side};

/// Body skeleton edges over COCO keypoint indices.
///
/// 0 nose, 1/2 eyes, 3/4 ears, 5/6 shoulders, 7/8 elbows, 9/10 wrists,
/// 11/12 hips, 13/14 knees, 15/16 ankles (left before right).
pub const BODY_EDGES: [(usize, usize); 14] = [
    // face
    (0, 1),
    (0, 2),
    // shoulders and arms
    (5, 6),
    (5, 7),
    (7, 9),
    (6, 8),
    (8, 10),
    // torso
    (5, 11),
    (6, 12),
    (11, 12),
    // legs
    (11, 13),
    (13, 15),
    (12, 14),
    (14, 16),
];

/// Edges within one hand. Index 0 is the hand's wrist; each finger is a
/// chain of four joints hanging off it.
pub const HAND_EDGES: [(usize, usize); 20] = [
    // thumb
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    // index
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    // middle
    (0, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    // ring
    (0, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    // pinky
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
];

/// Index of the wrist within a hand array.
pub const HAND_WRIST: usize = 0;

/// Body keypoint index of the wrist on the given side.
#[must_use]
pub const fn body_wrist(side: Side) -> usize {
    match side {
        Side::Left => 9,
        Side::Right => 10,
    }
}

/// Fingers whose joints move together when one of them is dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    /// Hand indices 1–4.
    Thumb,
    /// Hand indices 5–8.
    Index,
    /// Hand indices 9–12.
    Middle,
    /// Hand indices 13–16.
    Ring,
}

/// The four non-wrist joints of one finger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerGroup {
    /// Which finger.
    pub finger: Finger,
    /// Hand indices of the finger's joints, base to tip.
    pub joints: [usize; 4],
}

impl FingerGroup {
    /// Member ids of this group on the given hand.
    pub fn members(&self, side: Side) -> impl Iterator<Item = KeypointId> + '_ {
        self.joints.iter().map(move |&j| KeypointId::Hand(side, j))
    }

    /// Returns `true` if `index` is one of this group's joints.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.joints.contains(&index)
    }
}

/// Finger groups, identical for both hands.
///
/// The pinky joints (17–20) are not grouped and move individually.
pub static FINGER_GROUPS: [FingerGroup; 4] = [
    FingerGroup {
        finger: Finger::Thumb,
        joints: [1, 2, 3, 4],
    },
    FingerGroup {
        finger: Finger::Index,
        joints: [5, 6, 7, 8],
    },
    FingerGroup {
        finger: Finger::Middle,
        joints: [9, 10, 11, 12],
    },
    FingerGroup {
        finger: Finger::Ring,
        joints: [13, 14, 15, 16],
    },
];

/// The finger group `id` belongs to, if any.
///
/// Body keypoints and hand wrists never belong to a group.
#[must_use]
pub fn finger_group(id: KeypointId) -> Option<&'static FingerGroup> {
    match id {
        KeypointId::Body(_) => None,
        KeypointId::Hand(_, index) => FINGER_GROUPS.iter().find(|g| g.contains(index)),
    }
}

/// The other members of `id`'s finger group, in base-to-tip order.
#[must_use]
pub fn group_peers(id: KeypointId) -> Vec<KeypointId> {
    let (Some(group), Some(side)) = (finger_group(id), id.side()) else {
        return Vec::new();
    };
    group.members(side).filter(|&m| m != id).collect()
}
