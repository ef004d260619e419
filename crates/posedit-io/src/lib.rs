//! posedit-io: Browser I/O and Dioxus component library.
//!
//! Handles the detection and rendering HTTP calls, file uploads, Blob
//! downloads, rendered-image Blob URLs, the in-memory layer stack that
//! receives applied images, and provides the keypoint editor UI
//! components for the posedit web application.

pub mod client;
pub mod components;
pub mod download;
pub mod driver;
pub mod raster;
pub mod scene;

pub use client::{ClientError, PoseBackend};
pub use components::{EditorToolbar, FileUpload, LayerList, PoseEditor};
pub use scene::{Layer, LayerError, LayerStack};
