//! OpenPose-style JSON export.
//!
//! The exported file is the same `pose_data` object the detector returns
//! (`{"people": [...], "canvas_width", "canvas_height"}`), so an export
//! can be fed straight back into [`from_openpose_json`] or into any tool
//! that reads OpenPose keypoint files.

use posedit_core::{Dimensions, PoseData, PoseDocument, WireError};

/// Errors from JSON export and import.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The JSON text could not be produced or parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON parsed but is not a valid pose document.
    #[error("invalid pose document: {0}")]
    Pose(#[from] WireError),
}

/// Serialize a document as pretty-printed OpenPose JSON.
///
/// When the document carries no canvas size, `canvas` (normally the
/// source image dimensions) is written instead so the coordinates stay
/// interpretable on their own.
///
/// # Errors
///
/// Returns [`ExportError::Json`] if serialization fails (non-finite
/// numbers cannot be represented in JSON).
pub fn to_openpose_json(
    document: &PoseDocument,
    canvas: Option<Dimensions>,
) -> Result<String, ExportError> {
    let mut data = PoseData::from_document(document);
    if data.canvas_width.is_none() || data.canvas_height.is_none() {
        if let Some(canvas) = canvas {
            data.canvas_width = Some(canvas.width);
            data.canvas_height = Some(canvas.height);
        }
    }
    Ok(serde_json::to_string_pretty(&data)?)
}

/// Parse an OpenPose JSON document.
///
/// Accepts either a bare `pose_data` object or a full detector response
/// (`{"success": ..., "pose_data": {...}}`).
///
/// # Errors
///
/// Returns [`ExportError::Json`] for malformed JSON and
/// [`ExportError::Pose`] if the keypoint arrays are invalid or nobody
/// is present.
pub fn from_openpose_json(text: &str) -> Result<PoseDocument, ExportError> {
    let mut value: serde_json::Value = serde_json::from_str(text)?;
    if let Some(inner) = value.get_mut("pose_data") {
        value = inner.take();
    }
    let data: PoseData = serde_json::from_value(value)?;
    Ok(data.into_document()?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use posedit_core::{Keypoint, KeypointId, Person, Point};

    use super::*;

    fn document() -> PoseDocument {
        let body = (0..17_u32)
            .map(|i| {
                Keypoint::new(
                    KeypointId::Body(i as usize),
                    Point::new(f64::from(i) * 10.0, 5.0),
                    0.9,
                )
            })
            .collect();
        let mut person = Person::new(body);
        person.pose_score = Some(0.66);
        PoseDocument::new(vec![person])
    }

    #[test]
    fn export_then_import_preserves_document() {
        let doc = document();
        let json = to_openpose_json(&doc, None).unwrap();
        assert_eq!(from_openpose_json(&json).unwrap(), doc);
    }

    #[test]
    fn export_fills_canvas_from_source() {
        let json = to_openpose_json(&document(), Some(Dimensions::new(320, 240))).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["canvas_width"], 320);
        assert_eq!(value["canvas_height"], 240);
        assert_eq!(value["people"][0]["pose_keypoints_2d"][3], 10.0);
        assert_eq!(value["people"][0]["pose_score"], 0.66);
    }

    #[test]
    fn export_keeps_detector_canvas() {
        let mut doc = document();
        doc.canvas = Some(Dimensions::new(10, 20));
        let json = to_openpose_json(&doc, Some(Dimensions::new(320, 240))).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["canvas_width"], 10);
    }

    #[test]
    fn import_accepts_full_detector_response() {
        let inner = to_openpose_json(&document(), None).unwrap();
        let wrapped = format!(r#"{{"success": true, "pose_data": {inner}}}"#);
        assert_eq!(from_openpose_json(&wrapped).unwrap(), document());
    }

    #[test]
    fn import_rejects_empty_people() {
        let err = from_openpose_json(r#"{"people": []}"#).unwrap_err();
        assert!(matches!(err, ExportError::Pose(WireError::NoPeople)), "{err}");
        let err = from_openpose_json("{not json").unwrap_err();
        assert!(matches!(err, ExportError::Json(_)), "{err}");
    }
}
