//! Profile endpoints (`/api/Profiles/me`).
//!
//! Screens call these directly with a token borrowed from the session;
//! they are not part of the [`super::AuthGateway`] seam because they never
//! change the session state.

use super::error::ApiError;
use super::{classify_failure, decode_json, ApiClient};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Profile record as served by `/api/Profiles/me`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileDto {
    pub id: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
}

/// Editable profile fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
}

impl ApiClient {
    /// GET `/api/Profiles/me`.
    pub async fn current_profile(&self, token: &str) -> Result<ProfileDto, ApiError> {
        let resp = self
            .http
            .get(self.url("/api/Profiles/me"))
            .bearer_auth(token)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(classify_failure(resp, "Failed to fetch current user profile").await);
        }
        decode_json(resp).await
    }

    /// PATCH `/api/Profiles/me` with the editable name fields.
    pub async fn update_profile(
        &self,
        token: &str,
        update: &ProfileUpdate,
    ) -> Result<ProfileDto, ApiError> {
        let resp = self
            .http
            .patch(self.url("/api/Profiles/me"))
            .bearer_auth(token)
            .json(update)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(classify_failure(resp, "Failed to update profile").await);
        }
        decode_json(resp).await
    }

    /// POST `/api/Profiles/me/profile-picture`.
    pub async fn update_profile_image(
        &self,
        token: &str,
        image_url: &str,
    ) -> Result<ProfileDto, ApiError> {
        let resp = self
            .http
            .post(self.url("/api/Profiles/me/profile-picture"))
            .bearer_auth(token)
            .json(&json!({ "profileImageUrl": image_url }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(classify_failure(resp, "Failed to update profile image").await);
        }
        decode_json(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn update_profile_patches_name_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/Profiles/me"))
            .and(header("Authorization", "Bearer T"))
            .and(body_json(json!({ "firstName": "Ada", "lastName": "Lovelace" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "u1",
                "firstName": "Ada",
                "lastName": "Lovelace"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&ClientConfig::new(server.uri())).unwrap();
        let update = ProfileUpdate {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
        };
        let profile = client.update_profile("T", &update).await.unwrap();
        assert_eq!(profile.first_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn current_profile_maps_401_to_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/Profiles/me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = ApiClient::new(&ClientConfig::new(server.uri())).unwrap();
        let err = client.current_profile("stale").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
