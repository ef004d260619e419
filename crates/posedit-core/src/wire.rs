//! JSON wire formats of the detection and rasterization collaborators.
//!
//! Keypoints travel as flat `[x, y, confidence, x, y, confidence, ...]`
//! arrays in OpenPose layout: 17 body triples and either 21 or zero
//! triples per hand. [`PoseData::into_document`] validates that layout
//! and [`PoseData::from_document`] produces it again. Both sides are
//! pure data; the HTTP transport lives in the I/O crates.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::config::{DetectorParams, RenderParams};
use crate::types::{
    BODY_KEYPOINTS, Dimensions, HAND_KEYPOINTS, Keypoint, KeypointId, Person, Point, PoseDocument,
    Side,
};

/// Errors produced while decoding wire payloads.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The response had no `people` list.
    #[error("response has no people list")]
    MissingPeople,

    /// The `people` list was empty.
    #[error("no people detected")]
    NoPeople,

    /// A flat keypoint array had the wrong length.
    #[error("person {person}: {field} has {len} values, expected {expected}")]
    BadLength {
        /// Index of the offending person.
        person: usize,
        /// Wire field name.
        field: &'static str,
        /// Number of values received.
        len: usize,
        /// Accepted length(s), for the message.
        expected: &'static str,
    },

    /// A coordinate was NaN or infinite.
    #[error("person {person}: {field} contains a non-finite coordinate")]
    NonFinite {
        /// Index of the offending person.
        person: usize,
        /// Wire field name.
        field: &'static str,
    },

    /// An encoded bitmap was not valid base64.
    #[error("invalid base64 bitmap: {0}")]
    Base64(#[from] base64::DecodeError),

    /// An encoded bitmap could not be identified or measured.
    #[error("unreadable bitmap: {0}")]
    Image(#[from] image::ImageError),

    /// An encoded bitmap was empty.
    #[error("empty bitmap")]
    EmptyBitmap,
}

/// Request body for pose extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectRequest {
    /// Detection processor id.
    pub processor: String,
    /// Base64-encoded source bitmap.
    pub image: String,
    /// Detector parameters.
    pub parameters: DetectorParams,
}

/// Response body of pose extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectResponse {
    /// Whether the detector ran.
    #[serde(default)]
    pub success: bool,
    /// Detected poses, present on success.
    #[serde(default)]
    pub pose_data: Option<PoseData>,
    /// Failure description.
    #[serde(default)]
    pub error: Option<String>,
}

/// OpenPose-style pose document as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseData {
    /// Detected people. `None` means the field was absent.
    #[serde(default)]
    pub people: Option<Vec<PersonRecord>>,
    /// Canvas width the detector worked at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_width: Option<u32>,
    /// Canvas height the detector worked at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_height: Option<u32>,
    /// Format version string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// One person on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    /// 17 body triples.
    pub pose_keypoints_2d: Vec<f64>,
    /// 21 left-hand triples, or empty.
    #[serde(default)]
    pub hand_left_keypoints_2d: Vec<f64>,
    /// 21 right-hand triples, or empty.
    #[serde(default)]
    pub hand_right_keypoints_2d: Vec<f64>,
    /// Face triples, carried through unchanged.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub face_keypoints_2d: Vec<f64>,
    /// Detector-assigned person id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_id: Option<u32>,
    /// Detector-assigned whole-pose score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose_score: Option<f64>,
}

impl PoseData {
    /// Validate and convert into a [`PoseDocument`].
    ///
    /// Confidences outside `[0, 1]` are clamped (NaN becomes 0).
    ///
    /// # Errors
    ///
    /// Returns [`WireError::MissingPeople`] or [`WireError::NoPeople`] if
    /// there is nobody to edit, [`WireError::BadLength`] for a malformed
    /// keypoint array, and [`WireError::NonFinite`] for a NaN or infinite
    /// coordinate.
    pub fn into_document(self) -> Result<PoseDocument, WireError> {
        let records = self.people.ok_or(WireError::MissingPeople)?;
        if records.is_empty() {
            return Err(WireError::NoPeople);
        }

        let people = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| person_from_record(index, record))
            .collect::<Result<Vec<_>, _>>()?;

        let canvas = match (self.canvas_width, self.canvas_height) {
            (Some(w), Some(h)) => Some(Dimensions::new(w, h)),
            _ => None,
        };
        Ok(PoseDocument {
            people,
            canvas,
            version: self.version,
        })
    }

    /// Flatten a document back into wire layout.
    #[must_use]
    pub fn from_document(document: &PoseDocument) -> Self {
        let people = document
            .people
            .iter()
            .map(|person| PersonRecord {
                pose_keypoints_2d: flatten(&person.body),
                hand_left_keypoints_2d: flatten(&person.left_hand),
                hand_right_keypoints_2d: flatten(&person.right_hand),
                face_keypoints_2d: person.face.clone(),
                person_id: person.person_id,
                pose_score: person.pose_score,
            })
            .collect();
        Self {
            people: Some(people),
            canvas_width: document.canvas.map(|c| c.width),
            canvas_height: document.canvas.map(|c| c.height),
            version: document.version.clone(),
        }
    }
}

/// Request body for skeleton rasterization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// The frozen, edited pose document.
    pub pose_data: PoseData,
    /// Width of the original source image.
    pub image_width: u32,
    /// Height of the original source image.
    pub image_height: u32,
    /// Drawing parameters.
    pub parameters: RenderParams,
}

/// Response body of skeleton rasterization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderResponse {
    /// Explicit success flag; absent means success.
    #[serde(default)]
    pub success: Option<bool>,
    /// Base64-encoded rendered bitmap.
    #[serde(default)]
    pub skeleton_image: Option<String>,
    /// Failure description.
    #[serde(default)]
    pub error: Option<String>,
}

/// Base64-encode a bitmap for transport.
#[must_use]
pub fn encode_bitmap(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a base64 bitmap, accepting an optional `data:...;base64,`
/// prefix.
///
/// # Errors
///
/// Returns [`WireError::Base64`] for invalid base64 and
/// [`WireError::EmptyBitmap`] if nothing remains after decoding.
pub fn decode_bitmap(encoded: &str) -> Result<Vec<u8>, WireError> {
    let payload = encoded
        .split_once(";base64,")
        .map_or(encoded, |(_, rest)| rest)
        .trim();
    let bytes = STANDARD.decode(payload)?;
    if bytes.is_empty() {
        return Err(WireError::EmptyBitmap);
    }
    Ok(bytes)
}

/// Read pixel dimensions from an encoded bitmap's header.
///
/// # Errors
///
/// Returns [`WireError::EmptyBitmap`] for empty input and
/// [`WireError::Image`] if the format is unrecognized or the header is
/// unreadable.
pub fn measure_bitmap(bytes: &[u8]) -> Result<Dimensions, WireError> {
    if bytes.is_empty() {
        return Err(WireError::EmptyBitmap);
    }
    let (width, height) = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .into_dimensions()?;
    Ok(Dimensions::new(width, height))
}

fn person_from_record(index: usize, record: PersonRecord) -> Result<Person, WireError> {
    let body = unflatten(
        index,
        "pose_keypoints_2d",
        &record.pose_keypoints_2d,
        &[BODY_KEYPOINTS],
        KeypointId::Body,
    )?;
    let left_hand = unflatten(
        index,
        "hand_left_keypoints_2d",
        &record.hand_left_keypoints_2d,
        &[0, HAND_KEYPOINTS],
        |i| KeypointId::Hand(Side::Left, i),
    )?;
    let right_hand = unflatten(
        index,
        "hand_right_keypoints_2d",
        &record.hand_right_keypoints_2d,
        &[0, HAND_KEYPOINTS],
        |i| KeypointId::Hand(Side::Right, i),
    )?;
    Ok(Person {
        body,
        left_hand,
        right_hand,
        person_id: record.person_id,
        pose_score: record.pose_score,
        face: record.face_keypoints_2d,
    })
}

fn unflatten(
    person: usize,
    field: &'static str,
    values: &[f64],
    accepted: &[usize],
    id: impl Fn(usize) -> KeypointId,
) -> Result<Vec<Keypoint>, WireError> {
    let count = values.len() / 3;
    if values.len() % 3 != 0 || !accepted.contains(&count) {
        return Err(WireError::BadLength {
            person,
            field,
            len: values.len(),
            expected: if accepted.len() == 1 { "51" } else { "0 or 63" },
        });
    }

    values
        .chunks_exact(3)
        .enumerate()
        .map(|(i, triple)| {
            let position = Point::new(triple[0], triple[1]);
            if !position.is_finite() {
                return Err(WireError::NonFinite { person, field });
            }
            Ok(Keypoint::new(id(i), position, clamp_confidence(id(i), triple[2])))
        })
        .collect()
}

fn clamp_confidence(id: KeypointId, raw: f64) -> f64 {
    if (0.0..=1.0).contains(&raw) {
        return raw;
    }
    let clamped = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) };
    tracing::warn!(%id, raw, clamped, "keypoint confidence out of range");
    clamped
}

fn flatten(keypoints: &[Keypoint]) -> Vec<f64> {
    keypoints
        .iter()
        .flat_map(|kp| [kp.position.x, kp.position.y, kp.confidence])
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn triples(n: usize, confidence: f64) -> Vec<f64> {
        (0..n)
            .flat_map(|i| [i as f64 * 10.0, i as f64 * 5.0, confidence])
            .collect()
    }

    fn record() -> PersonRecord {
        PersonRecord {
            pose_keypoints_2d: triples(17, 0.9),
            hand_left_keypoints_2d: triples(21, 0.8),
            hand_right_keypoints_2d: Vec::new(),
            face_keypoints_2d: Vec::new(),
            person_id: None,
            pose_score: None,
        }
    }

    fn pose_data(people: Vec<PersonRecord>) -> PoseData {
        PoseData {
            people: Some(people),
            canvas_width: None,
            canvas_height: None,
            version: None,
        }
    }

    #[test]
    fn parses_detector_response_json() {
        let body = serde_json::json!({
            "success": true,
            "processing_time": 0.42,
            "processor_used": "dwpose",
            "pose_data": {
                "people": [{
                    "pose_keypoints_2d": triples(17, 0.9),
                    "hand_left_keypoints_2d": [],
                    "hand_right_keypoints_2d": triples(21, 0.5),
                    "face_keypoints_2d": [1.0, 2.0, 0.5],
                    "person_id": 3
                }],
                "canvas_width": 640,
                "canvas_height": 480
            }
        });
        let response: DetectResponse = serde_json::from_value(body).unwrap();
        assert!(response.success);
        let doc = response.pose_data.unwrap().into_document().unwrap();
        let person = &doc.people[0];
        assert_eq!(person.body.len(), 17);
        assert!(person.left_hand.is_empty());
        assert_eq!(person.right_hand.len(), 21);
        assert_eq!(person.right_hand[20].id, KeypointId::Hand(Side::Right, 20));
        assert_eq!(person.person_id, Some(3));
        assert_eq!(person.face, vec![1.0, 2.0, 0.5]);
        assert_eq!(doc.canvas, Some(Dimensions::new(640, 480)));
    }

    #[test]
    fn missing_and_empty_people_are_errors() {
        let data = PoseData {
            people: None,
            canvas_width: None,
            canvas_height: None,
            version: None,
        };
        assert!(matches!(data.into_document(), Err(WireError::MissingPeople)));
        assert!(matches!(
            pose_data(Vec::new()).into_document(),
            Err(WireError::NoPeople)
        ));
    }

    #[test]
    fn bad_lengths_are_rejected() {
        let mut r = record();
        r.pose_keypoints_2d.pop();
        let err = pose_data(vec![r]).into_document().unwrap_err();
        assert!(matches!(err, WireError::BadLength { field: "pose_keypoints_2d", .. }), "{err}");

        let mut r = record();
        r.hand_right_keypoints_2d = triples(20, 0.5);
        let err = pose_data(vec![r]).into_document().unwrap_err();
        assert!(
            matches!(err, WireError::BadLength { field: "hand_right_keypoints_2d", len: 60, .. }),
            "{err}"
        );
    }

    #[test]
    fn non_finite_coordinate_is_rejected() {
        let mut r = record();
        r.pose_keypoints_2d[3] = f64::INFINITY;
        assert!(matches!(
            pose_data(vec![r]).into_document(),
            Err(WireError::NonFinite { person: 0, .. })
        ));
    }

    #[test]
    fn confidence_is_clamped() {
        let mut r = record();
        r.pose_keypoints_2d[2] = 1.7;
        r.pose_keypoints_2d[5] = -0.2;
        r.pose_keypoints_2d[8] = f64::NAN;
        let doc = pose_data(vec![r]).into_document().unwrap();
        let body = &doc.people[0].body;
        assert!((body[0].confidence - 1.0).abs() < f64::EPSILON);
        assert!(body[1].confidence.abs() < f64::EPSILON);
        assert!(body[2].confidence.abs() < f64::EPSILON);
    }

    #[test]
    fn document_flattens_back_to_wire_layout() {
        let mut r = record();
        r.pose_score = Some(0.77);
        let data = PoseData {
            version: Some("1.3".to_owned()),
            canvas_width: Some(100),
            canvas_height: Some(50),
            ..pose_data(vec![r])
        };
        let doc = data.clone().into_document().unwrap();
        assert_eq!(PoseData::from_document(&doc), data);
    }

    #[test]
    fn render_request_shape() {
        let doc = pose_data(vec![record()]).into_document().unwrap();
        let request = RenderRequest {
            pose_data: PoseData::from_document(&doc),
            image_width: 640,
            image_height: 480,
            parameters: RenderParams::default(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["image_width"], 640);
        assert_eq!(json["parameters"]["line_width"], 2);
        assert_eq!(json["parameters"]["skeleton_color"], "white");
        assert_eq!(
            json["pose_data"]["people"][0]["pose_keypoints_2d"]
                .as_array()
                .unwrap()
                .len(),
            51
        );
    }

    #[test]
    fn render_response_defaults() {
        let r: RenderResponse = serde_json::from_str(r#"{"skeleton_image": "AAAA"}"#).unwrap();
        assert_eq!(r.success, None);
        assert_eq!(r.skeleton_image.as_deref(), Some("AAAA"));
    }

    #[test]
    fn bitmap_base64_with_data_url_prefix() {
        let encoded = format!("data:image/png;base64,{}", encode_bitmap(b"\x89PNG"));
        assert_eq!(decode_bitmap(&encoded).unwrap(), b"\x89PNG");
        assert!(matches!(decode_bitmap(""), Err(WireError::EmptyBitmap)));
        assert!(matches!(decode_bitmap("!!!"), Err(WireError::Base64(_))));
    }

    #[test]
    fn measure_reads_png_header() {
        let img = image::RgbImage::new(7, 3);
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        assert_eq!(measure_bitmap(&bytes).unwrap(), Dimensions::new(7, 3));
        assert!(measure_bitmap(b"not an image").is_err());
        assert!(matches!(measure_bitmap(&[]), Err(WireError::EmptyBitmap)));
    }
}
