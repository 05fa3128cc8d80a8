//! HTTP transport for the `/auth/*` endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{ApiError, Transport};
use crate::config::Config;
use crate::models::{Credentials, LoginResponse, RefreshRequest, RefreshResponse};

/// Transport backed by `reqwest`.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(&config.api_base_url, config.request_timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        let url = self.url("/auth/login");
        debug!(url = %url, email = %credentials.email, "Sending login request");

        let response = self
            .client
            .post(&url)
            .json(credentials)
            .send()
            .await
            .map_err(ApiError::from_send)?;

        Self::parse(Self::check_response(response).await?).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError> {
        let url = self.url("/auth/refresh");
        debug!(url = %url, "Sending refresh request");

        let body = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::from_send)?;

        Self::parse(Self::check_response(response).await?).await
    }

    async fn logout(&self, headers: HeaderMap) -> Result<(), ApiError> {
        let url = self.url("/auth/logout");
        debug!(url = %url, "Sending logout request");

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .send()
            .await
            .map_err(ApiError::from_send)?;

        Self::check_response(response).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Role;
    use reqwest::header::{self, HeaderValue};
    use wiremock::matchers::{body_json, header as header_matcher, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(server: &MockServer) -> HttpTransport {
        HttpTransport::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_login_posts_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(serde_json::json!({"email": "kid@x.com", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "user": {"email": "kid@x.com", "name": "kid", "role": "user"},
                "token": "a.b.c",
                "refreshToken": "r.s.t"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = transport(&server)
            .login(&Credentials::new("kid@x.com", "pw"))
            .await
            .unwrap();

        assert_eq!(response.token.as_deref(), Some("a.b.c"));
        assert_eq!(response.refresh_token.as_deref(), Some("r.s.t"));
        assert_eq!(response.user.unwrap().role, Role::User);
    }

    #[tokio::test]
    async fn test_login_bad_request_surfaces_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"error": "Email and password are required"})),
            )
            .mount(&server)
            .await;

        let err = transport(&server)
            .login(&Credentials::new("", ""))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Email and password are required"));
    }

    #[tokio::test]
    async fn test_refresh_sends_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .and(body_json(serde_json::json!({"refreshToken": "r.s.t"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": "new.access.token"})),
            )
            .mount(&server)
            .await;

        let response = transport(&server).refresh("r.s.t").await.unwrap();
        assert_eq!(response.token, "new.access.token");
        assert!(response.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_refresh_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = transport(&server).refresh("stale").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_logout_forwards_auth_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .and(header_matcher("authorization", "Bearer a.b.c"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer a.b.c"));
        transport(&server).logout(headers).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_json_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = transport(&server)
            .login(&Credentials::new("kid@x.com", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(server.uri(), Duration::from_millis(100)).unwrap();
        let err = transport
            .login(&Credentials::new("kid@x.com", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Timeout));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let transport = HttpTransport::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(transport.url("/auth/login"), "http://localhost:8080/auth/login");
    }
}
