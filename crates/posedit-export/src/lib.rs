//! posedit-export: Pure format serializers (sans-IO)
//!
//! Converts pose documents into output formats. Currently supports
//! OpenPose-style JSON (the session export) and an SVG skeleton preview.

pub mod json;
pub mod svg;

pub use json::{ExportError, from_openpose_json, to_openpose_json};
pub use svg::{SvgMetadata, to_skeleton_svg};
