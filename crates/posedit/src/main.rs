use dioxus::prelude::*;
use posedit_core::{
    Delivery, Placement, Session, SessionConfig, SessionError, SourceImage, Stage,
};
use posedit_io::{
    EditorToolbar, FileUpload, LayerList, LayerStack, PoseBackend, PoseEditor, driver, raster,
};

/// Status line for a session that ended in [`Stage::Failed`].
fn failed_status(failure: Option<&SessionError>) -> String {
    match failure {
        Some(err) => format!("{err}. Upload another image to retry."),
        None => "Detection failed. Upload another image to retry.".to_owned(),
    }
}

/// Place the rendered layer and report the result under the editor.
///
/// A rejected placement leaves the session in the apply stage, so this
/// runs again when the operator retries.
fn place_layer(
    session: Signal<Option<Session>>,
    layers: Signal<LayerStack>,
    mut notice: Signal<Option<String>>,
    mut error: Signal<Option<String>>,
) {
    match driver::apply_to_layers(session, layers) {
        Ok(Some(done)) => {
            error.set(None);
            notice.set(Some(format!("Applied as {}", done.node)));
        }
        Ok(None) => {}
        Err(e) => error.set(Some(e.to_string())),
    }
}

fn main() {
    dioxus::logger::initialize_default();
    dioxus::launch(app);
}

/// Turn a session outcome into the text shown under the editor.
fn outcome_message(outcome: &Result<Delivery, SessionError>) -> Option<String> {
    match outcome {
        Ok(_) => None,
        Err(e) => Some(e.to_string()),
    }
}

/// Root application component.
///
/// Owns the session, the layer stack and the source image Blob URL, and
/// runs the detect and render calls. A new upload replaces the session
/// and bumps `epoch` so answers for the old one are dropped.
#[allow(clippy::too_many_lines)]
fn app() -> Element {
    let mut session = use_signal(|| Option::<Session>::None);
    let mut epoch = use_signal(|| 0u64);
    let mut layers = use_signal(LayerStack::new);
    let mut filename = use_signal(String::new);
    let mut image_url = use_signal(|| Option::<String>::None);
    let mut busy = use_signal(|| false);
    let mut error = use_signal(|| Option::<String>::None);
    let mut notice = use_signal(|| Option::<String>::None);
    let backend = use_hook(PoseBackend::default);

    {
        let image_url = image_url;
        use_drop(move || {
            if let Some(ref url) = *image_url.peek() {
                raster::revoke_blob_url(url);
            }
        });
    }

    let on_upload = {
        let backend = backend.clone();
        move |(bytes, name): (Vec<u8>, String)| {
            error.set(None);
            notice.set(None);

            let source = match SourceImage::new(bytes.clone(), Placement::default()) {
                Ok(source) => source,
                Err(e) => {
                    error.set(Some(e.to_string()));
                    return;
                }
            };
            if let Err(e) = layers.write().add_source(
                name.clone(),
                bytes.clone(),
                source.dimensions(),
                source.placement(),
            ) {
                error.set(Some(e.to_string()));
                return;
            }

            if let Some(ref old) = image_url.take() {
                raster::revoke_blob_url(old);
            }
            match raster::bytes_to_blob_url(&bytes) {
                Ok(url) => image_url.set(Some(url)),
                Err(e) => {
                    error.set(Some(format!("Cannot display image: {e}")));
                    return;
                }
            }

            let fresh = match Session::new(SessionConfig::default(), source) {
                Ok(s) => s.with_completion(|done| {
                    tracing::info!(
                        node = %done.node,
                        keypoints = done.modified_document.keypoint_count(),
                        "pose applied"
                    );
                }),
                Err(e) => {
                    error.set(Some(e.to_string()));
                    return;
                }
            };
            filename.set(name);
            session.set(Some(fresh));
            epoch += 1;
            let my_epoch = *epoch.peek();

            busy.set(true);
            let backend = backend.clone();
            spawn(async move {
                let outcome = driver::run_extract(session, epoch, backend).await;
                if *epoch.peek() != my_epoch {
                    return;
                }
                error.set(outcome_message(&outcome));
                busy.set(false);
            });
        }
    };

    let on_apply = {
        let backend = backend.clone();
        move |()| {
            error.set(None);
            let my_epoch = *epoch.peek();
            busy.set(true);
            let backend = backend.clone();
            spawn(async move {
                let outcome = driver::run_render(session, epoch, backend).await;
                if *epoch.peek() != my_epoch {
                    return;
                }
                busy.set(false);
                match outcome {
                    Ok(Delivery::Accepted) => place_layer(session, layers, notice, error),
                    Ok(Delivery::Stale) => {}
                    Err(e) => error.set(Some(e.to_string())),
                }
            });
        }
    };

    let on_place = move |()| place_layer(session, layers, notice, error);

    let on_cancel = move |()| {
        busy.set(false);
        notice.set(Some("Editing cancelled".to_owned()));
    };

    let stage = session.read().as_ref().map(Session::stage);
    let body = match (stage, image_url()) {
        (Some(Stage::Edit), Some(url)) => rsx! {
            PoseEditor { session, image_url: url }
        },
        (Some(Stage::Extract), _) => rsx! {
            p { class: "status pulse", "Detecting pose..." }
        },
        (Some(Stage::Render), _) => rsx! {
            p { class: "status pulse", "Rendering..." }
        },
        (Some(Stage::Apply), _) => rsx! {
            p { class: "status", "Ready to place. Use Place layer to add the rendered pose." }
        },
        (Some(Stage::Failed), _) => {
            let text = failed_status(session.read().as_ref().and_then(Session::failure));
            rsx! {
                p { class: "status", "{text}" }
            }
        }
        (Some(Stage::Done | Stage::Cancelled), _) => rsx! {
            p { class: "status", "Upload another image to edit a new pose" }
        },
        _ => rsx! {
            p { class: "status", "Upload an image to get started" }
        },
    };

    rsx! {
        style { dangerous_inner_html: include_str!("../assets/style.css") }

        div { class: "app",
            header { class: "app-header",
                h1 { "posedit" }
                p { class: "hint", "Drag keypoints to correct a detected pose, then apply it as a new layer" }
            }

            main { class: "app-main",
                section { class: "editor-column",
                    EditorToolbar {
                        session,
                        filename: filename(),
                        on_apply,
                        on_place,
                        on_cancel,
                    }

                    {body}

                    if let Some(ref msg) = notice() {
                        p { class: "notice-text", "{msg}" }
                    }
                    if let Some(ref err) = error() {
                        div { class: "error-box",
                            p { class: "error-text", "{err}" }
                        }
                    }

                    FileUpload { on_upload, disabled: busy() }
                }

                aside { class: "layers-column",
                    LayerList { layers }
                }
            }
        }
    }
}
