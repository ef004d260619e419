//! Shared types for the posedit keypoint editor.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of body keypoints per person (COCO ordering).
pub const BODY_KEYPOINTS: usize = 17;

/// Number of keypoints per hand, index 0 being the hand's own wrist.
pub const HAND_KEYPOINTS: usize = 21;

/// A 2D point.
///
/// Used both for positions (in source-image pixels or display units)
/// and for offsets between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (from left edge).
    pub x: f64,
    /// Vertical position (from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.hypot(dy)
    }

    /// Returns `true` if both coordinates are finite.
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns `true` if either axis has zero length.
    #[must_use]
    pub const fn is_degenerate(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A fractional size in display units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
}

impl Size {
    /// Create a new size.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Which hand a hand keypoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    /// The subject's left hand.
    Left,
    /// The subject's right hand.
    Right,
}

impl Side {
    /// Both sides, left first.
    pub const ALL: [Self; 2] = [Self::Left, Self::Right];

    /// Lowercase label used in identifiers and file formats.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identifier of one keypoint of the active person.
///
/// Body keypoints are indexed `0..17` in COCO order; hand keypoints are
/// indexed `0..21` per hand, with index 0 being the hand's own wrist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeypointId {
    /// A body keypoint.
    Body(usize),
    /// A keypoint of one hand.
    Hand(Side, usize),
}

impl KeypointId {
    /// The hand side, if this is a hand keypoint.
    #[must_use]
    pub const fn side(self) -> Option<Side> {
        match self {
            Self::Body(_) => None,
            Self::Hand(side, _) => Some(side),
        }
    }
}

impl fmt::Display for KeypointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Body(index) => write!(f, "body:{index}"),
            Self::Hand(side, index) => write!(f, "{side}_hand:{index}"),
        }
    }
}

/// Error returned when parsing a [`KeypointId`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid keypoint id {0:?} (expected body:N, left_hand:N or right_hand:N)")]
pub struct ParseKeypointIdError(String);

impl FromStr for KeypointId {
    type Err = ParseKeypointIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseKeypointIdError(s.to_owned());
        let (prefix, index) = s.trim().split_once(':').ok_or_else(err)?;
        let index: usize = index.parse().map_err(|_| err())?;
        match prefix {
            "body" if index < BODY_KEYPOINTS => Ok(Self::Body(index)),
            "left_hand" if index < HAND_KEYPOINTS => Ok(Self::Hand(Side::Left, index)),
            "right_hand" if index < HAND_KEYPOINTS => Ok(Self::Hand(Side::Right, index)),
            _ => Err(err()),
        }
    }
}

/// A tracked anatomical landmark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// Which landmark this is.
    pub id: KeypointId,
    /// Position in source-image pixel space.
    pub position: Point,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f64,
}

impl Keypoint {
    /// Create a new keypoint.
    #[must_use]
    pub const fn new(id: KeypointId, position: Point, confidence: f64) -> Self {
        Self {
            id,
            position,
            confidence,
        }
    }
}

/// One detected person.
///
/// The body array always has [`BODY_KEYPOINTS`] entries. Each hand array
/// has either [`HAND_KEYPOINTS`] entries or none at all (no hand data).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// Body keypoints.
    pub body: Vec<Keypoint>,
    /// Left-hand keypoints (may be empty).
    pub left_hand: Vec<Keypoint>,
    /// Right-hand keypoints (may be empty).
    pub right_hand: Vec<Keypoint>,
    /// Detector-assigned person id, carried through unchanged.
    pub person_id: Option<u32>,
    /// Detector-assigned whole-pose score, carried through unchanged.
    pub pose_score: Option<f64>,
    /// Raw flat face keypoint triples, carried through unchanged.
    pub face: Vec<f64>,
}

impl Person {
    /// Create a person with the given body keypoints and no hand data.
    #[must_use]
    pub const fn new(body: Vec<Keypoint>) -> Self {
        Self {
            body,
            left_hand: Vec::new(),
            right_hand: Vec::new(),
            person_id: None,
            pose_score: None,
            face: Vec::new(),
        }
    }

    /// The keypoints of one hand.
    #[must_use]
    pub fn hand(&self, side: Side) -> &[Keypoint] {
        match side {
            Side::Left => &self.left_hand,
            Side::Right => &self.right_hand,
        }
    }

    /// Look up a keypoint by id.
    #[must_use]
    pub fn keypoint(&self, id: KeypointId) -> Option<&Keypoint> {
        match id {
            KeypointId::Body(index) => self.body.get(index),
            KeypointId::Hand(side, index) => self.hand(side).get(index),
        }
    }

    /// Look up a keypoint by id for mutation.
    pub fn keypoint_mut(&mut self, id: KeypointId) -> Option<&mut Keypoint> {
        match id {
            KeypointId::Body(index) => self.body.get_mut(index),
            KeypointId::Hand(Side::Left, index) => self.left_hand.get_mut(index),
            KeypointId::Hand(Side::Right, index) => self.right_hand.get_mut(index),
        }
    }

    /// All keypoints: body first, then left hand, then right hand.
    pub fn keypoints(&self) -> impl Iterator<Item = &Keypoint> {
        self.body
            .iter()
            .chain(self.left_hand.iter())
            .chain(self.right_hand.iter())
    }

    /// Total number of keypoints.
    #[must_use]
    pub fn keypoint_count(&self) -> usize {
        self.body.len() + self.left_hand.len() + self.right_hand.len()
    }
}

/// A pose document: the detector output for one image.
///
/// Only the first person is ever edited; the rest are carried through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseDocument {
    /// Detected people, in detector order.
    pub people: Vec<Person>,
    /// Canvas size reported by the detector, if any.
    pub canvas: Option<Dimensions>,
    /// Format version reported by the detector, if any.
    pub version: Option<String>,
}

impl PoseDocument {
    /// Create a document from a list of people.
    #[must_use]
    pub const fn new(people: Vec<Person>) -> Self {
        Self {
            people,
            canvas: None,
            version: None,
        }
    }

    /// The editable person.
    #[must_use]
    pub fn active(&self) -> Option<&Person> {
        self.people.first()
    }

    /// The editable person, for mutation.
    pub fn active_mut(&mut self) -> Option<&mut Person> {
        self.people.first_mut()
    }

    /// Total number of keypoints across all people.
    #[must_use]
    pub fn keypoint_count(&self) -> usize {
        self.people.iter().map(Person::keypoint_count).sum()
    }
}

/// Which skeleton table an [`Edge`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Body skeleton edge.
    Body,
    /// Edge within one hand.
    Hand(Side),
    /// Connector between a body wrist and the matching hand's wrist.
    WristLink(Side),
}

/// A connection between two keypoints. Derived on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// First endpoint.
    pub from: KeypointId,
    /// Second endpoint.
    pub to: KeypointId,
    /// Which topology table produced the edge.
    pub kind: EdgeKind,
}

impl Edge {
    /// Returns `true` if either endpoint is `id`.
    #[must_use]
    pub fn touches(&self, id: KeypointId) -> bool {
        self.from == id || self.to == id
    }
}

/// A decoded-size-checked encoded bitmap (PNG, JPEG, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedImage {
    /// Encoded image bytes, exactly as received.
    pub bytes: Vec<u8>,
    /// Pixel dimensions read from the image header.
    pub dimensions: Dimensions,
}

/// Stages of an editing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Waiting for the detection collaborator.
    Extract,
    /// The operator is editing keypoints.
    Edit,
    /// Waiting for the rasterization collaborator.
    Render,
    /// Rendered image ready to be placed into the host scene.
    Apply,
    /// Rendered image placed; session finished.
    Done,
    /// Abandoned by the operator.
    Cancelled,
    /// Aborted by a detection failure.
    Failed,
}

impl Stage {
    /// Display label for the stage.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Extract => "Extract",
            Self::Edit => "Edit",
            Self::Render => "Render",
            Self::Apply => "Apply",
            Self::Done => "Done",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Operator or driver actions on a session, named in transition errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Send the source image for detection.
    Extract,
    /// Reload the originally extracted document.
    Reset,
    /// Abandon the session.
    Cancel,
    /// Freeze the edited document and send it for rendering.
    RequestApply,
    /// Place the rendered image into the host scene.
    Apply,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Extract => "extract",
            Self::Reset => "reset",
            Self::Cancel => "cancel",
            Self::RequestApply => "request apply",
            Self::Apply => "apply",
        })
    }
}

/// Errors surfaced by an editing session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum SessionError {
    /// Degenerate source dimensions or editor bounds. Raised before any
    /// network call.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The detection collaborator failed or found nobody. No document
    /// was created.
    #[error("pose detection failed: {0}")]
    Detection(String),

    /// The rasterization collaborator failed or returned nothing usable.
    /// The session is back in the edit stage with all edits intact.
    #[error("skeleton rendering failed: {0}")]
    Render(String),

    /// The host scene rejected the rendered image. Apply can be retried.
    #[error("failed to place rendered image: {0}")]
    Apply(String),

    /// The action is not valid in the current stage.
    #[error("cannot {action} while in the {stage} stage")]
    InvalidTransition {
        /// The attempted action.
        action: Action,
        /// The stage the session was in.
        stage: Stage,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn kp(id: KeypointId) -> Keypoint {
        Keypoint::new(id, Point::new(1.0, 2.0), 0.9)
    }

    #[test]
    fn point_arithmetic() {
        let a = Point::new(3.0, 4.0);
        let b = Point::new(1.0, 1.0);
        assert_eq!(a - b, Point::new(2.0, 3.0));
        assert_eq!(a + b, Point::new(4.0, 5.0));
        assert!((Point::default().distance(a) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn dimensions_degenerate() {
        assert!(Dimensions::new(0, 10).is_degenerate());
        assert!(Dimensions::new(10, 0).is_degenerate());
        assert!(!Dimensions::new(1, 1).is_degenerate());
        assert_eq!(Dimensions::new(640, 480).to_string(), "640x480");
    }

    #[test]
    fn keypoint_id_display_and_parse_agree() {
        let ids = [
            KeypointId::Body(0),
            KeypointId::Body(16),
            KeypointId::Hand(Side::Left, 0),
            KeypointId::Hand(Side::Right, 20),
        ];
        for id in ids {
            let parsed: KeypointId = id.to_string().parse().unwrap();
            assert_eq!(parsed, id);
        }
    }

    #[test]
    fn keypoint_id_parse_rejects_out_of_range() {
        assert!("body:17".parse::<KeypointId>().is_err());
        assert!("left_hand:21".parse::<KeypointId>().is_err());
        assert!("elbow:3".parse::<KeypointId>().is_err());
        assert!("body".parse::<KeypointId>().is_err());
    }

    #[test]
    fn person_lookup_by_id() {
        let mut person = Person::new(vec![kp(KeypointId::Body(0))]);
        person.right_hand = vec![kp(KeypointId::Hand(Side::Right, 0))];

        assert!(person.keypoint(KeypointId::Body(0)).is_some());
        assert!(person.keypoint(KeypointId::Body(1)).is_none());
        assert!(person.keypoint(KeypointId::Hand(Side::Left, 0)).is_none());
        assert!(person.keypoint(KeypointId::Hand(Side::Right, 0)).is_some());
        assert_eq!(person.keypoint_count(), 2);

        person
            .keypoint_mut(KeypointId::Hand(Side::Right, 0))
            .unwrap()
            .position = Point::new(9.0, 9.0);
        assert_eq!(
            person.hand(Side::Right)[0].position,
            Point::new(9.0, 9.0)
        );
    }

    #[test]
    fn document_counts_every_person() {
        let person = Person::new(vec![kp(KeypointId::Body(0)); 3]);
        let doc = PoseDocument::new(vec![person.clone(), person]);
        assert_eq!(doc.keypoint_count(), 6);
        assert!(doc.active().is_some());
    }

    #[test]
    fn edge_touches_either_end() {
        let edge = Edge {
            from: KeypointId::Body(5),
            to: KeypointId::Body(7),
            kind: EdgeKind::Body,
        };
        assert!(edge.touches(KeypointId::Body(5)));
        assert!(edge.touches(KeypointId::Body(7)));
        assert!(!edge.touches(KeypointId::Body(9)));
    }

    #[test]
    fn invalid_transition_display() {
        let err = SessionError::InvalidTransition {
            action: Action::Reset,
            stage: Stage::Render,
        };
        assert_eq!(err.to_string(), "cannot reset while in the Render stage");
    }

    #[test]
    fn session_error_serde_round_trip() {
        let err = SessionError::Render("backend returned 500".to_owned());
        let json = serde_json::to_string(&err).unwrap();
        let back: SessionError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
