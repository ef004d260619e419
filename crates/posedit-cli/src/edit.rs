//! Scripted keypoint moves given on the command line.

use std::str::FromStr;

use posedit_core::types::ParseKeypointIdError;
use posedit_core::{EditSurface, KeypointId, Point};

/// One `--edit ID=X,Y` argument: move a keypoint to a source-pixel position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditSpec {
    /// Keypoint to grab.
    pub id: KeypointId,
    /// Where to drop it, in source-image pixels.
    pub to: Point,
}

/// Why an `--edit` argument could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseEditError {
    /// No `=` between id and position.
    #[error("expected ID=X,Y, got {0:?}")]
    Shape(String),

    /// The id part is not a keypoint id.
    #[error(transparent)]
    Id(#[from] ParseKeypointIdError),

    /// The position is not two finite numbers.
    #[error("invalid position {0:?} (expected X,Y)")]
    Position(String),
}

impl FromStr for EditSpec {
    type Err = ParseEditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, pos) = s
            .split_once('=')
            .ok_or_else(|| ParseEditError::Shape(s.to_owned()))?;
        let id: KeypointId = id.parse()?;

        let bad = || ParseEditError::Position(pos.to_owned());
        let (x, y) = pos.split_once(',').ok_or_else(bad)?;
        let x: f64 = x.trim().parse().map_err(|_| bad())?;
        let y: f64 = y.trim().parse().map_err(|_| bad())?;
        let to = Point::new(x, y);
        if !to.is_finite() {
            return Err(bad());
        }
        Ok(Self { id, to })
    }
}

/// Perform `edits` on `surface` as complete drags, in order.
///
/// Each edit goes through the same start/move/end sequence as a pointer
/// drag, so finger groups follow their anchor. Edits naming a hidden
/// keypoint are skipped and returned.
pub fn apply_edits(surface: &mut EditSurface, edits: &[EditSpec]) -> Vec<KeypointId> {
    let mut skipped = Vec::new();
    for edit in edits {
        if !surface.start_drag(edit.id) {
            tracing::warn!(id = %edit.id, "keypoint is not visible; edit skipped");
            skipped.push(edit.id);
            continue;
        }
        let target = surface.mapper().to_display(edit.to);
        if let Some(update) = surface.move_drag(target) {
            tracing::info!(
                id = %edit.id,
                moved = update.moved.len(),
                x = edit.to.x,
                y = edit.to.y,
                "keypoint moved"
            );
        }
        surface.end_drag();
    }
    skipped
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use posedit_core::{
        CoordinateMapper, Dimensions, Keypoint, KeypointGraph, Person, PoseDocument, Side,
    };

    use super::*;

    #[test]
    fn parses_body_and_hand_edits() {
        let e: EditSpec = "body:9=120.5,80".parse().unwrap();
        assert_eq!(e.id, KeypointId::Body(9));
        assert_eq!(e.to, Point::new(120.5, 80.0));

        let e: EditSpec = "right_hand:8= 10 , 20 ".parse().unwrap();
        assert_eq!(e.id, KeypointId::Hand(Side::Right, 8));
        assert_eq!(e.to, Point::new(10.0, 20.0));
    }

    #[test]
    fn rejects_malformed_edits() {
        assert!(matches!(
            "body:9".parse::<EditSpec>(),
            Err(ParseEditError::Shape(_))
        ));
        assert!(matches!(
            "elbow=1,2".parse::<EditSpec>(),
            Err(ParseEditError::Id(_))
        ));
        assert!(matches!(
            "body:1=1".parse::<EditSpec>(),
            Err(ParseEditError::Position(_))
        ));
        assert!(matches!(
            "body:1=NaN,2".parse::<EditSpec>(),
            Err(ParseEditError::Position(_))
        ));
    }

    fn surface(source: Dimensions) -> EditSurface {
        let body = (0..17_u32)
            .map(|i| {
                Keypoint::new(
                    KeypointId::Body(i as usize),
                    Point::new(100.0 + f64::from(i), 100.0),
                    if i == 3 { 0.1 } else { 0.9 },
                )
            })
            .collect();
        let graph = KeypointGraph::new(PoseDocument::new(vec![Person::new(body)]), source);
        EditSurface::new(graph, CoordinateMapper::fit(source, 512.0).unwrap())
    }

    #[test]
    fn edits_land_in_source_pixels() {
        // 1024 wide is shown at half size; the edit is still in source pixels.
        let mut s = surface(Dimensions::new(1024, 768));
        let skipped = apply_edits(
            &mut s,
            &[EditSpec {
                id: KeypointId::Body(0),
                to: Point::new(300.0, 200.0),
            }],
        );
        assert!(skipped.is_empty());
        let nose = s.graph().get(KeypointId::Body(0)).unwrap();
        assert!(nose.position.distance(Point::new(300.0, 200.0)) < 1e-9);
        assert_eq!(s.active_drag(), None);
    }

    #[test]
    fn hidden_keypoints_are_skipped() {
        let mut s = surface(Dimensions::new(400, 400));
        let skipped = apply_edits(
            &mut s,
            &[EditSpec {
                id: KeypointId::Body(3),
                to: Point::new(1.0, 1.0),
            }],
        );
        assert_eq!(skipped, vec![KeypointId::Body(3)]);
    }
}
