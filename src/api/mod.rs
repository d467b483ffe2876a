//! HTTP gateway to the Roamly backend.
//!
//! One method per endpoint, exactly one request per call.  The client
//! performs no retries and no deduplication, and it never touches
//! storage — persistence belongs to the session controller.
//!
//! ## Error normalization
//! The backend's historical surface is inconsistent: some endpoints return
//! JSON `{error, message}` bodies, others plain text.  Every non-success
//! response is drained here and folded into a typed [`ApiError`] carrying
//! the server's message when one is present.

pub mod auth;
pub mod error;
pub mod friends;
pub mod profile;

pub use auth::{AuthGateway, AuthResponse, RegisterRequest, User};
pub use error::ApiError;
pub use friends::Friend;
pub use profile::{ProfileDto, ProfileUpdate};

use crate::config::ClientConfig;
use serde::Deserialize;
use std::time::Duration;

/// JSON error body shape.  Both fields are optional; some endpoints send
/// plain text instead.
#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Stateless HTTP client for the backend REST surface.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client from the given config.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Map a non-success response to a typed error, preferring the server's
/// own message over the per-endpoint fallback.
async fn classify_failure(resp: reqwest::Response, fallback: &str) -> ApiError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let message = extract_message(&body).unwrap_or_else(|| fallback.to_string());

    match status.as_u16() {
        401 | 403 => ApiError::Unauthorized(message),
        400 | 422 => ApiError::Validation(message),
        409 => ApiError::Conflict(message),
        404 => ApiError::NotFound(message),
        _ => ApiError::Server(message),
    }
}

/// Pull a message out of an error body.  JSON `message` wins over `error`;
/// a non-empty plain-text body is used verbatim.
fn extract_message(body: &str) -> Option<String> {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.message.filter(|m| !m.is_empty()) {
            return Some(message);
        }
        if let Some(error) = parsed.error.filter(|e| !e.is_empty()) {
            return Some(error);
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed.starts_with('{') {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Decode a 2xx body, mapping a malformed payload to [`ApiError::Server`]
/// rather than a transport error.
async fn decode_json<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| ApiError::Server(format!("unexpected response body: {e}")))
}
