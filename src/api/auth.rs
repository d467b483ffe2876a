//! Auth endpoints: login, registration, profile fetch, password change
//! and password reset.
//!
//! ## Wire contract
//! - `POST /api/Auth/login` and `POST /api/Auth/register` return
//!   `{accessToken, expiresUtc, user}`.  Older backend builds named the
//!   token field `token`; both spellings decode.
//! - Authenticated calls send `Authorization: Bearer <token>`.
//! - A 2xx body without a token is a failure, never a session.

use super::error::ApiError;
use super::{classify_failure, decode_json, ApiClient};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Canonical user record.  The server copy is authoritative; the client
/// caches whole snapshots and never merges fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: Option<String>,
    pub email: String,
    pub display_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_name: Option<String>,
    pub profile_image_url: Option<String>,
}

/// Successful login/registration payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthResponse {
    /// Bearer token for subsequent authenticated calls.
    #[serde(alias = "token")]
    pub access_token: String,
    /// Server-side token expiry, when the backend reports one.
    pub expires_utc: Option<DateTime<Utc>>,
    pub user: User,
}

/// Registration request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
}

/// Seam between the session controller and the backend.  [`ApiClient`] is
/// the production implementation; tests substitute stubs.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError>;
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError>;
    async fn fetch_profile(&self, token: &str) -> Result<User, ApiError>;
    async fn change_password(&self, token: &str, current: &str, next: &str) -> Result<(), ApiError>;
    async fn reset_password(&self, email: &str, reset_token: &str, next: &str) -> Result<(), ApiError>;
}

#[async_trait]
impl AuthGateway for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let resp = self
            .http
            .post(self.url("/api/Auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(classify_failure(resp, "Login failed").await);
        }
        decode_auth_response(resp).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let resp = self
            .http
            .post(self.url("/api/Auth/register"))
            .json(request)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(classify_failure(resp, "Registration failed").await);
        }
        decode_auth_response(resp).await
    }

    async fn fetch_profile(&self, token: &str) -> Result<User, ApiError> {
        let resp = self
            .http
            .get(self.url("/api/Auth/me"))
            .bearer_auth(token)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(classify_failure(resp, "Failed to fetch current user").await);
        }
        decode_json(resp).await
    }

    async fn change_password(&self, token: &str, current: &str, next: &str) -> Result<(), ApiError> {
        let resp = self
            .http
            .post(self.url("/api/Auth/password/change"))
            .bearer_auth(token)
            .json(&json!({ "currentPassword": current, "newPassword": next }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(classify_failure(resp, "Password change failed").await);
        }
        // Success body is empty or uninteresting; drain and ignore it.
        let _ = resp.text().await;
        Ok(())
    }

    async fn reset_password(&self, email: &str, reset_token: &str, next: &str) -> Result<(), ApiError> {
        let resp = self
            .http
            .post(self.url("/api/Auth/password/reset"))
            .json(&json!({ "email": email, "token": reset_token, "newPassword": next }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(classify_failure(resp, "Password reset failed").await);
        }
        let _ = resp.text().await;
        Ok(())
    }
}

/// Decode a login/registration success body.  An empty token means the
/// session never materialized.
async fn decode_auth_response(resp: reqwest::Response) -> Result<AuthResponse, ApiError> {
    let parsed: AuthResponse = decode_json(resp).await?;
    if parsed.access_token.is_empty() {
        return Err(ApiError::Unauthorized(
            "missing token in authentication response".into(),
        ));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(&ClientConfig::new(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn login_decodes_canonical_success_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/Auth/login"))
            .and(body_json(json!({ "email": "a@b.c", "password": "Secret1!" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accessToken": "T",
                "expiresUtc": "2025-01-01T00:00:00Z",
                "user": { "id": "u1", "email": "a@b.c", "displayName": "Ada" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server).login("a@b.c", "Secret1!").await.unwrap();
        assert_eq!(response.access_token, "T");
        assert_eq!(
            response.expires_utc.unwrap().to_rfc3339(),
            "2025-01-01T00:00:00+00:00"
        );
        assert_eq!(response.user.display_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn login_accepts_legacy_token_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/Auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "T2",
                "user": { "email": "a@b.c" }
            })))
            .mount(&server)
            .await;

        let response = client_for(&server).login("a@b.c", "Secret1!").await.unwrap();
        assert_eq!(response.access_token, "T2");
        assert!(response.expires_utc.is_none());
    }

    #[tokio::test]
    async fn login_401_surfaces_the_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/Auth/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "error": "Invalid credentials" })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .login("a@b.c", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        assert_eq!(err.to_string(), "Invalid credentials");
    }

    #[tokio::test]
    async fn success_without_token_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/Auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": { "email": "a@b.c" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .login("a@b.c", "Secret1!")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        assert!(err.to_string().contains("missing token"));
    }

    #[tokio::test]
    async fn register_conflict_uses_plain_text_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/Auth/register"))
            .respond_with(ResponseTemplate::new(409).set_body_string("Username already taken"))
            .mount(&server)
            .await;

        let request = RegisterRequest {
            email: "a@b.c".into(),
            password: "Secret1!".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            user_name: "ada".into(),
        };
        let err = client_for(&server).register(&request).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(err.to_string(), "Username already taken");
    }

    #[tokio::test]
    async fn register_error_without_body_uses_fallback_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/Auth/register"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let request = RegisterRequest {
            email: "a@b.c".into(),
            password: "Secret1!".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            user_name: "ada".into(),
        };
        let err = client_for(&server).register(&request).await.unwrap_err();
        assert!(matches!(err, ApiError::Server(_)));
        assert_eq!(err.to_string(), "Registration failed");
    }

    #[tokio::test]
    async fn fetch_profile_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/Auth/me"))
            .and(header("Authorization", "Bearer T"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "u1",
                "email": "a@b.c",
                "userName": "ada"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let user = client_for(&server).fetch_profile("T").await.unwrap();
        assert_eq!(user.user_name.as_deref(), Some("ada"));
    }

    #[tokio::test]
    async fn change_password_tolerates_an_empty_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/Auth/password/change"))
            .and(header("Authorization", "Bearer T"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        client_for(&server)
            .change_password("T", "Old1!pwd", "New1!pwd")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn reset_password_404_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/Auth/password/reset"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "message": "Unknown email" })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .reset_password("ghost@b.c", "tok", "New1!pwd")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(err.to_string(), "Unknown email");
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_network_error() {
        // Port 9 (discard) is not listening in the test environment.
        let client = ApiClient::new(&ClientConfig::new("http://127.0.0.1:9")).unwrap();
        let err = client.login("a@b.c", "Secret1!").await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }
}
