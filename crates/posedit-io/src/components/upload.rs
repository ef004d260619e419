//! Source image picker with drag-and-drop.

use dioxus::html::{FileData, HasFileData};
use dioxus::prelude::*;

/// Image types the detector accepts.
const ACCEPTED: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp"];

/// Largest upload accepted, in bytes.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Why a picked file was refused.
fn rejection(name: &str, len: Option<usize>) -> Option<String> {
    let accepted = name
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ACCEPTED.iter().any(|a| a.eq_ignore_ascii_case(ext)));
    if !accepted {
        return Some(format!("Unsupported file type: {name}"));
    }
    match len {
        Some(0) => Some(format!("{name} is empty")),
        Some(n) if n > MAX_UPLOAD_BYTES => Some(format!(
            "{name} is too large ({} MiB, limit {} MiB)",
            n / (1024 * 1024),
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )),
        _ => None,
    }
}

/// Props for the [`FileUpload`] component.
#[derive(Props, Clone, PartialEq)]
pub struct FileUploadProps {
    /// Receives `(bytes, filename)` for an accepted image.
    on_upload: EventHandler<(Vec<u8>, String)>,
    /// Disable the picker, e.g. while a request is in flight.
    #[props(default)]
    disabled: bool,
}

/// Drop zone plus "Choose image" button.
///
/// Only the first file of a selection or drop is used.
#[component]
pub fn FileUpload(props: FileUploadProps) -> Element {
    let mut over = use_signal(|| false);
    let mut error = use_signal(|| Option::<String>::None);
    let disabled = props.disabled;

    let accept_first = move |files: Vec<FileData>| async move {
        let Some(file) = files.first() else {
            return;
        };
        let name = file.name();
        if let Some(reason) = rejection(&name, None) {
            error.set(Some(reason));
            return;
        }
        match file.read_bytes().await {
            Ok(bytes) => {
                if let Some(reason) = rejection(&name, Some(bytes.len())) {
                    error.set(Some(reason));
                    return;
                }
                error.set(None);
                tracing::info!(%name, bytes = bytes.len(), "image picked");
                props.on_upload.call((bytes.to_vec(), name));
            }
            Err(e) => error.set(Some(format!("Could not read {name}: {e}"))),
        }
    };

    let zone_class = if over() {
        "drop-zone drop-zone-over"
    } else {
        "drop-zone"
    };

    rsx! {
        div {
            class: "{zone_class}",
            ondragover: move |evt| {
                evt.prevent_default();
                if !disabled {
                    over.set(true);
                }
            },
            ondragleave: move |_| over.set(false),
            ondrop: move |evt: DragEvent| async move {
                evt.prevent_default();
                over.set(false);
                if !disabled {
                    accept_first(evt.files()).await;
                }
            },

            if let Some(ref err) = error() {
                p { class: "error-text", "{err}" }
            }

            label { class: if disabled { "btn btn-disabled" } else { "btn btn-primary" },
                input {
                    r#type: "file",
                    accept: ".png,.jpg,.jpeg,.bmp,.webp",
                    class: "hidden",
                    disabled,
                    onchange: move |evt: FormEvent| async move {
                        accept_first(evt.files()).await;
                    },
                }
                "Choose image"
            }
            p { class: "hint", "or drop a photo of a person here" }
        }
    }
}
