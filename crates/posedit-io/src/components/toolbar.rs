//! Stage indicator and session actions.

use dioxus::prelude::*;
use posedit_core::{KeypointGraph, PoseDocument, Session, Stage};
use posedit_export::{SvgMetadata, to_openpose_json, to_skeleton_svg};

use crate::download;

/// Props for the [`EditorToolbar`] component.
#[derive(Props, Clone, PartialEq)]
pub struct EditorToolbarProps {
    /// The session the buttons act on.
    session: Signal<Option<Session>>,
    /// Uploaded filename, used to name downloads.
    filename: String,
    /// Fired when the operator asks to render and apply.
    on_apply: EventHandler<()>,
    /// Fired when the operator retries placing a rendered layer.
    on_place: EventHandler<()>,
    /// Fired after the session has been cancelled.
    on_cancel: EventHandler<()>,
}

/// Which buttons are enabled in `stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Enabled {
    reset: bool,
    download: bool,
    cancel: bool,
    apply: bool,
    place: bool,
}

impl Enabled {
    const NONE: Self = Self {
        reset: false,
        download: false,
        cancel: false,
        apply: false,
        place: false,
    };

    const fn for_stage(stage: Stage) -> Self {
        let editing = matches!(stage, Stage::Edit);
        Self {
            reset: editing,
            download: matches!(
                stage,
                Stage::Edit | Stage::Render | Stage::Apply | Stage::Done
            ),
            cancel: matches!(stage, Stage::Extract | Stage::Edit),
            apply: editing,
            place: matches!(stage, Stage::Apply),
        }
    }
}

/// Serialize `document` and hand it to the browser as `name`.
fn download_document(session: &Session, document: &PoseDocument, name: &str) -> Result<(), String> {
    let json = to_openpose_json(document, Some(session.source().dimensions()))
        .map_err(|e| e.to_string())?;
    download::trigger_download(&json, name, "application/json").map_err(|e| e.to_string())
}

/// Reset, Download, Cancel, Apply and Place buttons plus the current
/// stage.
///
/// Reset and the downloads run locally. Downloads stay available for as
/// long as the session holds a document. Cancel, Apply and Place are
/// reported to the parent, which owns the network calls and the layer
/// stack.
#[component]
pub fn EditorToolbar(props: EditorToolbarProps) -> Element {
    let mut session = props.session;
    let mut action_error = use_signal(|| Option::<String>::None);

    let stage = session.read().as_ref().map(Session::stage);
    let enabled = stage.map_or(Enabled::NONE, Enabled::for_stage);
    let stage_label = stage.map_or("No image", Stage::label);

    let reset_click = move |_| {
        let outcome = session.write().as_mut().map(Session::reset);
        match outcome {
            Some(Err(e)) => action_error.set(Some(e.to_string())),
            _ => action_error.set(None),
        }
    };

    let json_click = {
        let filename = props.filename.clone();
        move |_| {
            let guard = session.read();
            let Some(s) = guard.as_ref() else {
                return;
            };
            let Some(document) = s.current_document() else {
                return;
            };
            let result =
                download_document(s, document, &download::pose_json_filename(&filename));
            action_error.set(result.err().map(|e| format!("Download failed: {e}")));
        }
    };

    let original_click = {
        let filename = props.filename.clone();
        move |_| {
            let guard = session.read();
            let Some(s) = guard.as_ref() else {
                return;
            };
            let Some(document) = s.original_document() else {
                return;
            };
            let result = download_document(
                s,
                document,
                &download::original_pose_json_filename(&filename),
            );
            action_error.set(result.err().map(|e| format!("Download failed: {e}")));
        }
    };

    let svg_click = {
        let filename = props.filename.clone();
        move |_| {
            let guard = session.read();
            let Some(s) = guard.as_ref() else {
                return;
            };
            let Some(document) = s.current_document() else {
                return;
            };
            let graph = KeypointGraph::new(document.clone(), s.source().dimensions());
            let svg = to_skeleton_svg(
                &graph,
                &SvgMetadata {
                    title: Some(&filename),
                    description: None,
                },
            );
            let result = download::trigger_download(
                &svg,
                &download::pose_svg_filename(&filename),
                "image/svg+xml",
            );
            action_error.set(result.err().map(|e| format!("Download failed: {e}")));
        }
    };

    let cancel_click = move |_| {
        let outcome = session.write().as_mut().map(Session::cancel);
        match outcome {
            Some(Ok(())) => {
                action_error.set(None);
                props.on_cancel.call(());
            }
            Some(Err(e)) => action_error.set(Some(e.to_string())),
            None => {}
        }
    };

    let enabled_class = "btn btn-primary";
    let disabled_class = "btn btn-disabled";
    let class_for = |on: bool| if on { enabled_class } else { disabled_class };

    rsx! {
        div { class: "toolbar",
            span { class: "stage-badge", "{stage_label}" }

            button {
                class: class_for(enabled.reset),
                disabled: !enabled.reset,
                onclick: reset_click,
                "Reset"
            }
            button {
                class: class_for(enabled.download),
                disabled: !enabled.download,
                onclick: json_click,
                "Download JSON"
            }
            button {
                class: class_for(enabled.download),
                disabled: !enabled.download,
                onclick: original_click,
                "Download original"
            }
            button {
                class: class_for(enabled.download),
                disabled: !enabled.download,
                onclick: svg_click,
                "Download SVG"
            }
            button {
                class: class_for(enabled.cancel),
                disabled: !enabled.cancel,
                onclick: cancel_click,
                "Cancel"
            }
            button {
                class: class_for(enabled.apply),
                disabled: !enabled.apply,
                onclick: move |_| props.on_apply.call(()),
                "Apply"
            }
            button {
                class: class_for(enabled.place),
                disabled: !enabled.place,
                onclick: move |_| props.on_place.call(()),
                "Place layer"
            }

            if let Some(ref err) = action_error() {
                p { class: "error-text", "{err}" }
            }
        }
    }
}
