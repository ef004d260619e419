//! HTTP client for the pose backend, over the browser `fetch` API.
//!
//! The backend exposes two JSON endpoints: `POST /api/pose/extract`
//! (detection) and `POST /api/pose/render` (rasterization). Requests
//! carry no client-side timeout; a slow backend simply leaves the
//! session waiting until the operator cancels.
//!
//! The `fetch` half requires a browser environment
//! (`wasm32-unknown-unknown` target); URL building and response
//! decoding are plain Rust.

use posedit_core::{DetectRequest, DetectResponse, RenderRequest, RenderResponse};
use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, RequestMode, Response};

/// Path of the detection endpoint.
pub const EXTRACT_PATH: &str = "/api/pose/extract";
/// Path of the rendering endpoint.
pub const RENDER_PATH: &str = "/api/pose/render";

/// Errors from a backend call.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A browser API call returned an error (network failure, CORS, ...).
    #[error("browser API error: {0}")]
    JsError(String),

    /// The backend answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The request or response body was not the expected JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<JsValue> for ClientError {
    fn from(value: JsValue) -> Self {
        Self::JsError(format!("{value:?}"))
    }
}

/// The pose backend at one base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoseBackend {
    base_url: String,
}

impl PoseBackend {
    /// Base URL used when none is configured (same origin).
    pub const DEFAULT_BASE_URL: &str = "";

    /// Create a client for `base_url` (e.g. `http://localhost:8000`).
    ///
    /// A trailing slash is ignored. An empty base URL targets the page's
    /// own origin.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// The normalized base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of an endpoint path.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Run pose detection.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the backend is unreachable, answers
    /// with an HTTP error, or returns something other than a detection
    /// response.
    pub async fn detect(&self, request: &DetectRequest) -> Result<DetectResponse, ClientError> {
        self.post_json(EXTRACT_PATH, request).await
    }

    /// Render a skeleton image.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the backend is unreachable, answers
    /// with an HTTP error, or returns something other than a render
    /// response.
    pub async fn render(&self, request: &RenderRequest) -> Result<RenderResponse, ClientError> {
        self.post_json(RENDER_PATH, request).await
    }

    async fn post_json<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp, ClientError> {
        let url = self.endpoint(path);
        let body = serde_json::to_string(body)?;

        let headers = Headers::new()?;
        headers.set("Content-Type", "application/json")?;
        headers.set("Accept", "application/json")?;

        let opts = RequestInit::new();
        opts.set_method("POST");
        opts.set_mode(RequestMode::Cors);
        opts.set_headers(&headers);
        opts.set_body(&JsValue::from_str(&body));

        let request = Request::new_with_str_and_init(&url, &opts)?;
        let window =
            web_sys::window().ok_or_else(|| ClientError::JsError("no global window".into()))?;

        tracing::debug!(%url, bytes = body.len(), "POST");
        let response: Response = JsFuture::from(window.fetch_with_request(&request))
            .await?
            .dyn_into()
            .map_err(|e| ClientError::JsError(format!("fetch did not return a Response: {e:?}")))?;

        let text = JsFuture::from(response.text()?)
            .await?
            .as_string()
            .unwrap_or_default();

        decode_response(response.status(), &text)
    }
}

impl Default for PoseBackend {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BASE_URL)
    }
}

/// Turn an HTTP status and body into a typed response.
fn decode_response<Resp: DeserializeOwned>(status: u16, text: &str) -> Result<Resp, ClientError> {
    if !(200..300).contains(&status) {
        return Err(ClientError::Status {
            status,
            body: text.to_owned(),
        });
    }
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_trimmed() {
        let backend = PoseBackend::new("http://localhost:8000//");
        assert_eq!(backend.base_url(), "http://localhost:8000");
        assert_eq!(
            backend.endpoint(EXTRACT_PATH),
            "http://localhost:8000/api/pose/extract"
        );
    }

    #[test]
    fn default_backend_is_same_origin() {
        assert_eq!(PoseBackend::default().endpoint(RENDER_PATH), "/api/pose/render");
    }

    #[test]
    fn http_error_status_is_reported_with_body() {
        let err = decode_response::<RenderResponse>(502, "bad gateway").unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 502, .. }));
        assert_eq!(err.to_string(), "HTTP 502: bad gateway");
    }

    #[test]
    fn success_body_is_decoded() {
        let resp: RenderResponse =
            decode_response(200, r#"{"success": false, "error": "no processor"}"#).unwrap();
        assert_eq!(resp.success, Some(false));
        assert_eq!(resp.error.as_deref(), Some("no processor"));
    }

    #[test]
    fn malformed_body_is_json_error() {
        let err = decode_response::<DetectResponse>(200, "<html>").unwrap_err();
        assert!(matches!(err, ClientError::Json(_)));
    }
}
