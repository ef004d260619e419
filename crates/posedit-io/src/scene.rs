//! In-memory layer stack used as the browser app's host scene.
//!
//! Layers are kept in insertion order, bottom first. The source image is
//! the first layer; every applied session adds its rendered skeleton on
//! top and selects it.

use posedit_core::{
    Dimensions, HostScene, NodeId, Placement, Provenance, RenderedImage, SceneNode,
};

/// One image in the stack.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Stable id, unique within the stack.
    pub id: NodeId,
    /// Label shown in the layer list.
    pub name: String,
    /// Encoded bitmap.
    pub image: RenderedImage,
    /// Where the layer sits in the scene.
    pub placement: Placement,
    /// Set for layers produced by a pose session; `None` for uploads.
    pub provenance: Option<Provenance>,
}

/// Why a node could not be added.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayerError {
    /// The image has no pixels.
    #[error("image is empty")]
    EmptyImage,
}

/// Ordered collection of layers with a single selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerStack {
    layers: Vec<Layer>,
    selected: Option<NodeId>,
    next_id: u64,
}

impl LayerStack {
    /// An empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All layers, bottom first.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Look up a layer by id.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    /// Number of layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether the stack has no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Add an uploaded image as a plain layer and select it.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::EmptyImage`] when the image has no pixels.
    pub fn add_source(
        &mut self,
        name: impl Into<String>,
        bytes: Vec<u8>,
        dimensions: Dimensions,
        placement: Placement,
    ) -> Result<NodeId, LayerError> {
        let id = self.push(
            name.into(),
            RenderedImage { bytes, dimensions },
            placement,
            None,
        )?;
        self.selected = Some(id);
        Ok(id)
    }

    fn push(
        &mut self,
        name: String,
        image: RenderedImage,
        placement: Placement,
        provenance: Option<Provenance>,
    ) -> Result<NodeId, LayerError> {
        if image.bytes.is_empty() || image.dimensions.is_degenerate() {
            return Err(LayerError::EmptyImage);
        }
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.layers.push(Layer {
            id,
            name,
            image,
            placement,
            provenance,
        });
        Ok(id)
    }
}

impl HostScene for LayerStack {
    type Error = LayerError;

    fn add_node(&mut self, node: SceneNode) -> Result<NodeId, Self::Error> {
        let name = format!("{} {}", node.provenance.pipeline, self.next_id);
        self.push(name, node.image, node.placement, Some(node.provenance))
    }

    fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    fn set_selected(&mut self, id: Option<NodeId>) {
        self.selected = id.filter(|id| self.get(*id).is_some());
    }
}
