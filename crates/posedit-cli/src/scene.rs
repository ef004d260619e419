//! Host scene backed by an output directory.
//!
//! Every placed node becomes `layer-<id>.<ext>` plus a `layer-<id>.json`
//! sidecar holding its placement, size and provenance. The extension
//! follows the encoded bytes, falling back to `png`.

use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use posedit_core::{Dimensions, HostScene, NodeId, Placement, Provenance, SceneNode};
use serde::Serialize;

/// Errors writing a layer to disk.
#[derive(Debug, thiserror::Error)]
pub enum DirectorySceneError {
    /// Filesystem failure.
    #[error("{path}: {source}")]
    Io {
        /// File being written.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The sidecar could not be serialized.
    #[error("sidecar: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct Sidecar<'a> {
    node: NodeId,
    image: &'a str,
    dimensions: Dimensions,
    placement: Placement,
    provenance: &'a Provenance,
}

/// Writes placed nodes into a directory.
#[derive(Debug)]
pub struct DirectoryScene {
    dir: PathBuf,
    next_id: u64,
    selected: Option<NodeId>,
    written: Vec<PathBuf>,
}

impl DirectoryScene {
    /// Use `dir`, creating it if needed.
    ///
    /// Ids continue after any layer image already present, so earlier
    /// runs are never overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`DirectorySceneError::Io`] if the directory cannot be
    /// created or listed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, DirectorySceneError> {
        let dir = dir.into();
        let io = |source| DirectorySceneError::Io {
            path: dir.clone(),
            source,
        };
        fs::create_dir_all(&dir).map_err(io)?;
        let next_id = fs::read_dir(&dir)
            .map_err(io)?
            .filter_map(Result::ok)
            .filter_map(|entry| layer_id(&entry.file_name().to_string_lossy()))
            .max()
            .map_or(0, |id| id + 1);
        Ok(Self {
            dir,
            next_id,
            selected: None,
            written: Vec::new(),
        })
    }

    /// Files written so far, in order.
    #[must_use]
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn write(&mut self, path: &Path, contents: &[u8]) -> Result<(), DirectorySceneError> {
        fs::write(path, contents).map_err(|source| DirectorySceneError::Io {
            path: path.to_owned(),
            source,
        })?;
        self.written.push(path.to_owned());
        Ok(())
    }
}

/// Extensions written for layer images.
const LAYER_EXTENSIONS: [&str; 4] = ["png", "jpg", "webp", "bmp"];

/// File extension matching the encoded image `bytes`.
fn layer_extension(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => "jpg",
        Ok(ImageFormat::WebP) => "webp",
        Ok(ImageFormat::Bmp) => "bmp",
        _ => "png",
    }
}

/// Parse the id out of a `layer-<id>.<ext>` image file name.
fn layer_id(name: &str) -> Option<u64> {
    let (stem, ext) = name.strip_prefix("layer-")?.rsplit_once('.')?;
    if !LAYER_EXTENSIONS.contains(&ext) {
        return None;
    }
    stem.parse().ok()
}

impl HostScene for DirectoryScene {
    type Error = DirectorySceneError;

    fn add_node(&mut self, node: SceneNode) -> Result<NodeId, Self::Error> {
        let id = NodeId(self.next_id);
        let image_name = format!("layer-{}.{}", id.0, layer_extension(&node.image.bytes));
        let image_path = self.dir.join(&image_name);
        let sidecar = serde_json::to_vec_pretty(&Sidecar {
            node: id,
            image: &image_name,
            dimensions: node.image.dimensions,
            placement: node.placement,
            provenance: &node.provenance,
        })?;

        let sidecar_path = self.dir.join(format!("layer-{}.json", id.0));
        self.write(&image_path, &node.image.bytes)?;
        self.write(&sidecar_path, &sidecar)?;
        self.next_id += 1;
        tracing::info!(node = %id, path = %image_path.display(), "layer written");
        Ok(id)
    }

    fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    fn set_selected(&mut self, id: Option<NodeId>) {
        self.selected = id;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use posedit_core::{RenderParams, RenderedImage};

    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "posedit-cli-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn node() -> SceneNode {
        SceneNode {
            image: RenderedImage {
                bytes: vec![0x89, b'P', b'N', b'G'],
                dimensions: Dimensions::new(2, 3),
            },
            placement: Placement::default(),
            provenance: Provenance {
                pipeline: "pose_editor".to_owned(),
                timestamp_ms: 1_700_000_000_000,
                parameters: RenderParams::default(),
            },
        }
    }

    #[test]
    fn layer_names_parse() {
        assert_eq!(layer_id("layer-12.png"), Some(12));
        assert_eq!(layer_id("layer-7.jpg"), Some(7));
        assert_eq!(layer_id("layer-3.webp"), Some(3));
        assert_eq!(layer_id("layer-12.json"), None);
        assert_eq!(layer_id("other.png"), None);
    }

    #[test]
    fn jpeg_layers_keep_their_format() {
        let dir = scratch("jpeg");
        let mut scene = DirectoryScene::open(&dir).unwrap();
        let mut jpeg = node();
        jpeg.image.bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];
        scene.add_node(jpeg.clone()).unwrap();

        assert_eq!(fs::read(dir.join("layer-0.jpg")).unwrap(), jpeg.image.bytes);
        assert!(!dir.join("layer-0.png").exists());
        let sidecar: serde_json::Value =
            serde_json::from_slice(&fs::read(dir.join("layer-0.json")).unwrap()).unwrap();
        assert_eq!(sidecar["image"], "layer-0.jpg");

        // Ids continue past non-PNG layers too.
        let mut scene = DirectoryScene::open(&dir).unwrap();
        assert_eq!(scene.add_node(node()).unwrap(), NodeId(1));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn writes_image_and_sidecar() {
        let dir = scratch("write");
        let mut scene = DirectoryScene::open(&dir).unwrap();
        let id = scene.add_node(node()).unwrap();
        assert_eq!(id, NodeId(0));
        assert_eq!(scene.written().len(), 2);

        assert_eq!(fs::read(dir.join("layer-0.png")).unwrap(), node().image.bytes);
        let sidecar: serde_json::Value =
            serde_json::from_slice(&fs::read(dir.join("layer-0.json")).unwrap()).unwrap();
        assert_eq!(sidecar["provenance"]["pipeline"], "pose_editor");
        assert_eq!(sidecar["dimensions"]["height"], 3);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn ids_continue_after_existing_layers() {
        let dir = scratch("continue");
        {
            let mut scene = DirectoryScene::open(&dir).unwrap();
            scene.add_node(node()).unwrap();
            scene.add_node(node()).unwrap();
        }
        let mut scene = DirectoryScene::open(&dir).unwrap();
        assert_eq!(scene.add_node(node()).unwrap(), NodeId(2));
        let _ = fs::remove_dir_all(&dir);
    }
}
