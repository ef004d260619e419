//! Session configuration.
//!
//! All structs deserialize with missing fields falling back to their
//! defaults, so a partial JSON object is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::coords::DEFAULT_MAX_DISPLAY_SIDE;

/// Editor display settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Bound for the longer side of the display frame, in display units.
    pub max_display_side: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_display_side: DEFAULT_MAX_DISPLAY_SIDE,
        }
    }
}

/// Parameters forwarded to the detection collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Minimum keypoint confidence the detector should report.
    pub threshold: f64,
    /// Detect body keypoints.
    pub detect_body: bool,
    /// Detect hand keypoints.
    pub detect_hand: bool,
    /// Detect face keypoints.
    pub detect_face: bool,
}

impl DetectorParams {
    /// Default detector confidence threshold.
    pub const DEFAULT_THRESHOLD: f64 = 0.3;
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            detect_body: true,
            detect_hand: true,
            detect_face: false,
        }
    }
}

/// Parameters forwarded to the rasterization collaborator.
///
/// Colors are CSS color strings, passed through verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    /// Skeleton line width in output pixels.
    pub line_width: u32,
    /// Keypoint marker radius in output pixels.
    pub point_radius: u32,
    /// Fill color behind the skeleton.
    pub background_color: String,
    /// Color of skeleton edges.
    pub skeleton_color: String,
    /// Color of keypoint markers.
    pub point_color: String,
    /// Draw skeleton edges.
    pub draw_skeleton: bool,
    /// Draw keypoint markers.
    pub draw_points: bool,
    /// Keypoints at or below this confidence are not drawn.
    pub threshold: f64,
}

impl RenderParams {
    /// Default skeleton line width.
    pub const DEFAULT_LINE_WIDTH: u32 = 2;
    /// Default keypoint marker radius.
    pub const DEFAULT_POINT_RADIUS: u32 = 4;
    /// Default background color.
    pub const DEFAULT_BACKGROUND_COLOR: &str = "black";
    /// Default skeleton color.
    pub const DEFAULT_SKELETON_COLOR: &str = "white";
    /// Default keypoint color.
    pub const DEFAULT_POINT_COLOR: &str = "red";
    /// Default render confidence threshold.
    pub const DEFAULT_THRESHOLD: f64 = 0.3;
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            line_width: Self::DEFAULT_LINE_WIDTH,
            point_radius: Self::DEFAULT_POINT_RADIUS,
            background_color: Self::DEFAULT_BACKGROUND_COLOR.to_owned(),
            skeleton_color: Self::DEFAULT_SKELETON_COLOR.to_owned(),
            point_color: Self::DEFAULT_POINT_COLOR.to_owned(),
            draw_skeleton: true,
            draw_points: true,
            threshold: Self::DEFAULT_THRESHOLD,
        }
    }
}

/// Everything a [`crate::Session`] needs besides the source image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name recorded in the provenance of placed images.
    pub pipeline_name: String,
    /// Detection processor id sent with the extract request.
    pub processor: String,
    /// Detection parameters.
    pub detector: DetectorParams,
    /// Rendering parameters.
    pub render: RenderParams,
    /// Editor display settings.
    pub editor: EditorConfig,
}

impl SessionConfig {
    /// Default pipeline name.
    pub const DEFAULT_PIPELINE_NAME: &str = "pose_editor";
    /// Default detection processor.
    pub const DEFAULT_PROCESSOR: &str = "dwpose";
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pipeline_name: Self::DEFAULT_PIPELINE_NAME.to_owned(),
            processor: Self::DEFAULT_PROCESSOR.to_owned(),
            detector: DetectorParams::default(),
            render: RenderParams::default(),
            editor: EditorConfig::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.processor, "dwpose");
        assert_eq!(config.pipeline_name, "pose_editor");
        assert!(!config.detector.detect_face);
        assert_eq!(config.render.line_width, 2);
        assert_eq!(config.render.point_radius, 4);
        assert_eq!(config.render.skeleton_color, "white");
        assert_eq!(config.render.background_color, "black");
        assert!((config.editor.max_display_side - 512.0).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"render": {"line_width": 6}, "editor": {"max_display_side": 800}}"#)
                .unwrap();
        assert_eq!(config.render.line_width, 6);
        assert_eq!(config.render.point_radius, 4);
        assert!((config.editor.max_display_side - 800.0).abs() < f64::EPSILON);
        assert_eq!(config.processor, "dwpose");
    }

    #[test]
    fn round_trips_through_json() {
        let mut config = SessionConfig::default();
        config.render.point_color = "#00ff00".to_owned();
        config.detector.detect_hand = false;
        let json = serde_json::to_string(&config).unwrap();
        let back: SessionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
