//! The host scene a finished session places its rendered image into.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::RenderParams;
use crate::types::{Point, RenderedImage};

/// Opaque identifier of a node in the host scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Position, scale and rotation of a scene node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Top-left position in scene units.
    pub position: Point,
    /// Per-axis scale factor.
    pub scale: Point,
    /// Rotation in degrees, clockwise.
    pub rotation: f64,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: Point::new(0.0, 0.0),
            scale: Point::new(1.0, 1.0),
            rotation: 0.0,
        }
    }
}

/// Where a placed image came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Name of the pipeline that produced the image.
    pub pipeline: String,
    /// Milliseconds since the Unix epoch at placement time.
    pub timestamp_ms: u64,
    /// Parameters the image was rendered with.
    pub parameters: RenderParams,
}

/// A node handed to the host scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    /// The rendered bitmap.
    pub image: RenderedImage,
    /// Copied from the source image node.
    pub placement: Placement,
    /// Provenance tag.
    pub provenance: Provenance,
}

/// A scene that can accept rendered images.
///
/// Implemented by the browser layer stack and by the CLI's output
/// directory.
pub trait HostScene {
    /// Rejection reason.
    type Error: fmt::Display;

    /// Insert a node and return its id.
    ///
    /// # Errors
    ///
    /// Returns an implementation-defined error if the node cannot be
    /// placed.
    fn add_node(&mut self, node: SceneNode) -> Result<NodeId, Self::Error>;

    /// The currently selected node.
    fn selected(&self) -> Option<NodeId>;

    /// Change the selection.
    fn set_selected(&mut self, id: Option<NodeId>);
}
