//! Friends list endpoint (`/api/Friends/friends`).

use super::error::ApiError;
use super::{classify_failure, decode_json, ApiClient};
use serde::{Deserialize, Serialize};

/// A friend entry.  Everything is optional; the list renderer copes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Friend {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FriendsResponse {
    friends_list: Vec<Friend>,
}

impl ApiClient {
    /// GET `/api/Friends/friends`, unwrapping the `{friendsList}` envelope.
    pub async fn friends(&self, token: &str) -> Result<Vec<Friend>, ApiError> {
        let resp = self
            .http
            .get(self.url("/api/Friends/friends"))
            .bearer_auth(token)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(classify_failure(resp, "Fetch friends failed").await);
        }
        let envelope: FriendsResponse = decode_json(resp).await?;
        Ok(envelope.friends_list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn friends_unwraps_the_list_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/Friends/friends"))
            .and(header("Authorization", "Bearer T"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "friendsList": [
                    { "id": "f1", "userName": "grace" },
                    { "id": "f2" }
                ]
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&ClientConfig::new(server.uri())).unwrap();
        let friends = client.friends("T").await.unwrap();
        assert_eq!(friends.len(), 2);
        assert_eq!(friends[0].user_name.as_deref(), Some("grace"));
        assert!(friends[1].user_name.is_none());
    }

    #[tokio::test]
    async fn friends_error_without_body_uses_fallback_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/Friends/friends"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = ApiClient::new(&ClientConfig::new(server.uri())).unwrap();
        let err = client.friends("T").await.unwrap_err();
        assert_eq!(err.to_string(), "Fetch friends failed");
    }
}
