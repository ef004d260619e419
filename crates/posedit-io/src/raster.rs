//! Blob URLs for encoded bitmaps.
//!
//! The source image and rendered skeletons arrive as encoded bytes
//! (PNG, JPEG, ...). To show them in an `<img>` or SVG `<image>`, they
//! are wrapped in a `Blob` with the right MIME type and given an object
//! URL.

use wasm_bindgen::JsValue;
use web_sys::BlobPropertyBag;

/// Errors that can occur during Blob URL creation.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    /// A browser API call returned an error.
    #[error("browser API error: {0}")]
    JsError(String),
}

impl From<JsValue> for RasterError {
    fn from(value: JsValue) -> Self {
        Self::JsError(format!("{value:?}"))
    }
}

/// MIME type of an encoded bitmap, sniffed from its magic bytes.
///
/// Falls back to `application/octet-stream` for unknown formats.
#[must_use]
pub fn mime_type(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes).map_or("application/octet-stream", |format| {
        format.to_mime_type()
    })
}

/// Wrap encoded image bytes in a Blob URL for use as an image source.
///
/// The returned URL must be revoked via [`revoke_blob_url`] when no
/// longer needed to avoid memory leaks.
///
/// # Errors
///
/// Returns [`RasterError::JsError`] if Blob or URL creation fails.
pub fn bytes_to_blob_url(bytes: &[u8]) -> Result<String, RasterError> {
    let uint8_array = js_sys::Uint8Array::from(bytes);
    let parts = js_sys::Array::new();
    parts.push(&uint8_array);

    let opts = BlobPropertyBag::new();
    opts.set_type(mime_type(bytes));
    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &opts)?;

    Ok(web_sys::Url::create_object_url_with_blob(&blob)?)
}

/// Revoke a Blob URL previously created by [`bytes_to_blob_url`].
///
/// Best-effort: the URL may already have been revoked.
pub fn revoke_blob_url(url: &str) {
    let _ = web_sys::Url::revoke_object_url(url);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn sniffs_png() {
        let img = image::RgbImage::new(2, 2);
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        assert_eq!(mime_type(&bytes), "image/png");
    }

    #[test]
    fn unknown_bytes_are_octet_stream() {
        assert_eq!(mime_type(b"hello"), "application/octet-stream");
        assert_eq!(mime_type(&[]), "application/octet-stream");
    }
}
