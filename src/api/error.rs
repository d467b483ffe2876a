//! Typed error taxonomy for backend calls.
//!
//! Every non-success response is folded into one of these variants; the
//! `Display` text is the human-readable message surfaced to the user
//! (the server's own message when it provided one, a fixed per-endpoint
//! fallback otherwise).

use thiserror::Error;

/// Failure of a single backend call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 401/403-class: bad credentials or a missing/invalid bearer token.
    #[error("{0}")]
    Unauthorized(String),

    /// 400/422-class: the server rejected the request payload.
    #[error("{0}")]
    Validation(String),

    /// 409: duplicate email or username on registration.
    #[error("{0}")]
    Conflict(String),

    /// 404: unknown email or reset token.
    #[error("{0}")]
    NotFound(String),

    /// Transport failure: the request never produced a usable response.
    #[error("network error: {0}")]
    Network(String),

    /// 5xx, an unmapped status, or a success body that failed to decode.
    #[error("{0}")]
    Server(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}
