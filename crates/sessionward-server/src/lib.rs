//! Reference issuance endpoint for sessionward.
//!
//! Issues signed access and refresh tokens on login, verifies them on
//! `/auth/me` and `/auth/refresh`, and keeps an httpOnly session cookie in
//! step with the access token.

pub mod config;
pub mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

pub use config::ServerConfig;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::me))
        .route("/auth/refresh", post(handlers::refresh))
        .with_state(state)
}
