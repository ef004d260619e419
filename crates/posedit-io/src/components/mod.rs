//! Dioxus UI components for posedit.
//!
//! Provides the image picker, the interactive keypoint editor, the
//! session toolbar, and the layer list of the host scene.

mod editor;
mod layers;
mod toolbar;
mod upload;

pub use editor::PoseEditor;
pub use layers::LayerList;
pub use toolbar::EditorToolbar;
pub use upload::FileUpload;
