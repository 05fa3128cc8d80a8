use async_trait::async_trait;
use reqwest::header::HeaderMap;

use super::ApiError;
use crate::models::{Credentials, LoginResponse, RefreshResponse};

/// Network operations the session manager depends on.
///
/// Timeouts are the implementation's business; the session manager waits
/// for every call to settle.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError>;

    /// Exchange a refresh token for a new access token
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError>;

    /// `headers` carries the bearer token, when there is one
    async fn logout(&self, headers: HeaderMap) -> Result<(), ApiError>;
}
