//! posedit-core: Keypoint editing model and session state machine (sans-IO).
//!
//! Corrects detected human-pose keypoints through:
//! extract (detector) -> edit (drag keypoints) -> render (rasterizer) ->
//! apply (place the rendered image into a host scene).
//!
//! This crate has **no I/O dependencies** -- the two network steps are
//! expressed as request tickets and response handlers on [`Session`],
//! and the host scene is the [`HostScene`] trait. All browser and
//! native transport lives in `posedit-io` and `posedit-cli`.

pub mod config;
pub mod coords;
pub mod graph;
pub mod group;
pub mod scene;
pub mod session;
pub mod surface;
pub mod topology;
pub mod types;
pub mod wire;

pub use config::{DetectorParams, EditorConfig, RenderParams, SessionConfig};
pub use coords::CoordinateMapper;
pub use graph::KeypointGraph;
pub use group::GroupDrag;
pub use scene::{HostScene, NodeId, Placement, Provenance, SceneNode};
pub use session::{Completion, Delivery, Generation, Session, SourceImage, Ticket};
pub use surface::{DragUpdate, EditSurface};
pub use types::{
    Action, Dimensions, Edge, EdgeKind, Keypoint, KeypointId, Person, Point, PoseDocument,
    RenderedImage, SessionError, Side, Size, Stage,
};
pub use wire::{DetectRequest, DetectResponse, PoseData, RenderRequest, RenderResponse, WireError};
