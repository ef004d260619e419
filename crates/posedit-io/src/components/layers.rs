//! Layer list for the host scene.

use dioxus::prelude::*;
use posedit_core::{HostScene, NodeId};

use crate::download;
use crate::raster;
use crate::scene::{Layer, LayerStack};

/// Props for the [`LayerList`] component.
#[derive(Props, Clone, PartialEq)]
pub struct LayerListProps {
    /// The stack to list and select in.
    layers: Signal<LayerStack>,
}

/// Download filename for a layer's bitmap.
fn layer_filename(layer: &Layer) -> String {
    let ext = match raster::mime_type(&layer.image.bytes) {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        _ => "png",
    };
    let stem: String = layer
        .name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{stem}.{ext}")
}

/// Top-most layer first, with a selection highlight and a download
/// button per layer.
#[component]
pub fn LayerList(props: LayerListProps) -> Element {
    let mut layers = props.layers;
    let mut download_error = use_signal(|| Option::<String>::None);

    let stack = layers.read();
    let selected = stack.selected();
    let rows: Vec<(NodeId, String, String, bool)> = stack
        .layers()
        .iter()
        .rev()
        .map(|layer| {
            let detail = layer.provenance.as_ref().map_or_else(
                || format!("{} source", layer.image.dimensions),
                |p| format!("{} {}", layer.image.dimensions, p.pipeline),
            );
            (layer.id, layer.name.clone(), detail, selected == Some(layer.id))
        })
        .collect();
    drop(stack);

    rsx! {
        div { class: "layer-list",
            h3 { "Layers" }

            if rows.is_empty() {
                p { class: "hint", "No layers yet" }
            }

            if let Some(ref err) = download_error() {
                p { class: "error-text", "{err}" }
            }

            ul {
                for (id, name, detail, is_selected) in rows {
                    li {
                        key: "{id}",
                        class: if is_selected { "layer selected" } else { "layer" },
                        onclick: move |_| layers.write().set_selected(Some(id)),
                        span { class: "layer-name", "{name}" }
                        span { class: "layer-detail", "{detail}" }
                        button {
                            class: "btn btn-small",
                            onclick: move |evt: MouseEvent| {
                                evt.stop_propagation();
                                let stack = layers.read();
                                let Some(layer) = stack.get(id) else {
                                    return;
                                };
                                let result = download::trigger_bytes_download(
                                    &layer.image.bytes,
                                    &layer_filename(layer),
                                    raster::mime_type(&layer.image.bytes),
                                );
                                download_error.set(result.err().map(|e| format!("Download failed: {e}")));
                            },
                            "Save"
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use posedit_core::{Dimensions, Placement, RenderedImage};

    use super::*;

    #[test]
    fn filename_is_sanitized_and_defaults_to_png() {
        let layer = Layer {
            id: NodeId(3),
            name: "pose_editor 3".to_owned(),
            image: RenderedImage {
                bytes: vec![0, 1, 2],
                dimensions: Dimensions::new(1, 1),
            },
            placement: Placement::default(),
            provenance: None,
        };
        assert_eq!(layer_filename(&layer), "pose_editor_3.png");
    }
}
