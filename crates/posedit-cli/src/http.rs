//! Blocking HTTP transport to the pose backend.

use std::time::Duration;

use posedit_core::{DetectRequest, DetectResponse, RenderRequest, RenderResponse};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Path of the detection endpoint.
pub const EXTRACT_PATH: &str = "/api/pose/extract";
/// Path of the rendering endpoint.
pub const RENDER_PATH: &str = "/api/pose/render";

/// Errors from a backend call.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// Connection, timeout or body decoding failure.
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },
}

/// The pose backend at one base URL.
#[derive(Debug, Clone)]
pub struct Backend {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl Backend {
    /// Create a client for `base_url`; `timeout` of `None` waits forever.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Request`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, HttpError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            client,
        })
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
    /// Returns [`HttpError`] when the call fails or the answer is not a
    /// detection response.
    pub fn detect(&self, request: &DetectRequest) -> Result<DetectResponse, HttpError> {
        self.post_json(EXTRACT_PATH, request)
    }

    /// Render a skeleton image.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] when the call fails or the answer is not a
    /// render response.
    pub fn render(&self, request: &RenderRequest) -> Result<RenderResponse, HttpError> {
        self.post_json(RENDER_PATH, request)
    }

    fn post_json<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp, HttpError> {
        let url = self.endpoint(path);
        tracing::debug!(%url, "POST");
        let response = self.client.post(&url).json(body).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }
        Ok(response.json()?)
    }
}
