use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Login response did not include an access token")]
    MissingToken,

    #[error("Login response did not identify the user")]
    MissingIdentity,
}

impl SessionError {
    /// Message suitable for showing next to a login form.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Api(ApiError::Unauthorized(_)) => {
                "Invalid email or password".to_string()
            }
            SessionError::Api(ApiError::BadRequest(message)) if !message.is_empty() => {
                message.clone()
            }
            SessionError::Api(ApiError::NetworkError(_)) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            SessionError::Api(ApiError::Timeout) => {
                "Connection timed out. Please try again.".to_string()
            }
            SessionError::Api(ApiError::RateLimited) => {
                "Too many attempts. Please wait and try again.".to_string()
            }
            other => format!("Login failed: {}", other),
        }
    }
}
