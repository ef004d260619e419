//! Drives a [`Session`] held in a Dioxus signal through its network steps.
//!
//! Each step takes the request ticket out of the session, releases the
//! signal while the HTTP call is in flight, and hands the response back.
//! The app bumps `epoch` whenever it replaces the session (new upload);
//! a response that arrives after that is discarded as stale without
//! touching the new session.

use dioxus::prelude::*;
use posedit_core::{Completion, Delivery, Session, SessionError};

use crate::client::PoseBackend;
use crate::scene::LayerStack;

/// Run detection for the session in `slot`.
///
/// # Errors
///
/// Returns the session's error when extraction cannot start or the
/// detector's answer is unusable. A missing or replaced session yields
/// `Ok(Delivery::Stale)`.
pub async fn run_extract(
    mut slot: Signal<Option<Session>>,
    epoch: Signal<u64>,
    backend: PoseBackend,
) -> Result<Delivery, SessionError> {
    let my_epoch = *epoch.peek();
    let ticket = {
        let mut guard = slot.write();
        let Some(session) = guard.as_mut() else {
            return Ok(Delivery::Stale);
        };
        session.begin_extract()?
    };

    let response = backend.detect(&ticket.request).await;

    if *epoch.peek() != my_epoch {
        tracing::debug!(generation = %ticket.generation, "session replaced during extract");
        return Ok(Delivery::Stale);
    }
    let mut guard = slot.write();
    let Some(session) = guard.as_mut() else {
        return Ok(Delivery::Stale);
    };
    session.complete_extract(ticket.generation, response)
}

/// Freeze the edited document and have the backend render it.
///
/// # Errors
///
/// Returns the session's error when the session is not editing or the
/// render failed. After a render failure the session is editing again
/// with its edits intact.
pub async fn run_render(
    mut slot: Signal<Option<Session>>,
    epoch: Signal<u64>,
    backend: PoseBackend,
) -> Result<Delivery, SessionError> {
    let my_epoch = *epoch.peek();
    let ticket = {
        let mut guard = slot.write();
        let Some(session) = guard.as_mut() else {
            return Ok(Delivery::Stale);
        };
        session.request_apply()?
    };

    let response = backend.render(&ticket.request).await;

    if *epoch.peek() != my_epoch {
        tracing::debug!(generation = %ticket.generation, "session replaced during render");
        return Ok(Delivery::Stale);
    }
    let mut guard = slot.write();
    let Some(session) = guard.as_mut() else {
        return Ok(Delivery::Stale);
    };
    session.complete_render(ticket.generation, response)
}

/// Place the rendered image into `layers`.
///
/// Returns `Ok(None)` when there is no session.
///
/// # Errors
///
/// Returns the session's error when it is not in the apply stage or the
/// layer stack rejects the image.
pub fn apply_to_layers(
    mut slot: Signal<Option<Session>>,
    mut layers: Signal<LayerStack>,
) -> Result<Option<Completion>, SessionError> {
    let mut guard = slot.write();
    let Some(session) = guard.as_mut() else {
        return Ok(None);
    };
    let mut stack = layers.write();
    session.apply(&mut *stack).map(Some)
}
