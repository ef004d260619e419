//! File download via Blob URLs.
//!
//! Dioxus has no built-in file download API. Downloads are triggered by
//! wrapping the payload in a `Blob`, generating an object URL, and
//! clicking a temporary `<a download>` element.
//!
//! Everything except filename handling requires a browser environment
//! (`wasm32-unknown-unknown` target).

use wasm_bindgen::{JsCast, JsValue};
use web_sys::BlobPropertyBag;

/// Errors that can occur when triggering a file download.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// A browser API call returned an error.
    #[error("browser API error: {0}")]
    JsError(String),
}

impl From<JsValue> for DownloadError {
    fn from(value: JsValue) -> Self {
        Self::JsError(format!("{value:?}"))
    }
}

/// Filename for a pose JSON export of the image `source_name`.
///
/// `photo.jpg` becomes `photo.pose.json`; an empty name becomes
/// `pose.json`.
#[must_use]
pub fn pose_json_filename(source_name: &str) -> String {
    derived_filename(source_name, "pose.json")
}

/// Filename for the unedited pose of the image `source_name`.
///
/// `photo.jpg` becomes `photo.original.pose.json`.
#[must_use]
pub fn original_pose_json_filename(source_name: &str) -> String {
    derived_filename(source_name, "original.pose.json")
}

/// Filename for an SVG skeleton preview of the image `source_name`.
#[must_use]
pub fn pose_svg_filename(source_name: &str) -> String {
    derived_filename(source_name, "pose.svg")
}

fn derived_filename(source_name: &str, suffix: &str) -> String {
    let base = source_name
        .rsplit_once('.')
        .map_or(source_name, |(base, _)| base)
        .trim();
    if base.is_empty() {
        suffix.to_owned()
    } else {
        format!("{base}.{suffix}")
    }
}

/// Trigger a download of `data` as `filename`.
///
/// The object URL is revoked right after the click.
///
/// # Errors
///
/// Returns [`DownloadError::JsError`] if any browser API call fails
/// (`Blob` creation, `URL.createObjectURL`, element creation).
pub fn trigger_download(data: &str, filename: &str, mime_type: &str) -> Result<(), DownloadError> {
    let parts = js_sys::Array::new();
    parts.push(&JsValue::from_str(data));

    let opts = BlobPropertyBag::new();
    opts.set_type(mime_type);
    let blob = web_sys::Blob::new_with_str_sequence_and_options(&parts, &opts)?;

    click_download(&blob, filename)
}

/// Trigger a download of binary `bytes` as `filename`.
///
/// # Errors
///
/// Returns [`DownloadError::JsError`] if any browser API call fails.
pub fn trigger_bytes_download(
    bytes: &[u8],
    filename: &str,
    mime_type: &str,
) -> Result<(), DownloadError> {
    let parts = js_sys::Array::new();
    parts.push(&js_sys::Uint8Array::from(bytes));

    let opts = BlobPropertyBag::new();
    opts.set_type(mime_type);
    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &opts)?;

    click_download(&blob, filename)
}

fn click_download(blob: &web_sys::Blob, filename: &str) -> Result<(), DownloadError> {
    let window =
        web_sys::window().ok_or_else(|| DownloadError::JsError("no global window".into()))?;
    let document = window
        .document()
        .ok_or_else(|| DownloadError::JsError("no document".into()))?;

    let url = web_sys::Url::create_object_url_with_blob(blob)?;

    let anchor: web_sys::HtmlAnchorElement = document
        .create_element("a")?
        .dyn_into::<web_sys::HtmlAnchorElement>()
        .map_err(|e| DownloadError::JsError(format!("failed to cast element: {e:?}")))?;
    anchor.set_href(&url);
    anchor.set_download(filename);

    let body = document
        .body()
        .ok_or_else(|| DownloadError::JsError("no document body".into()))?;
    body.append_child(&anchor)?;
    anchor.click();

    // The download has started; cleanup failures are not download failures.
    let _ = body.remove_child(&anchor);
    let _ = web_sys::Url::revoke_object_url(&url);

    Ok(())
}
