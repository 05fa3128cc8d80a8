//! `/auth/*` request handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use sessionward_core::models::{
    Credentials, ErrorBody, LoginResponse, LogoutResponse, MeResponse, RefreshRequest,
    RefreshResponse, ServerUser,
};
use sessionward_core::token::{self, TokenSubject};
use tracing::{debug, error, info, warn};

use crate::AppState;

/// Name of the httpOnly cookie carrying the access token
pub const SESSION_COOKIE: &str = "session";

fn error_response(status: StatusCode, message: &str) -> Response {
    let body = ErrorBody {
        error: message.to_string(),
    };
    (status, Json(body)).into_response()
}

/// `Set-Cookie` value for the session cookie. `max_age_secs = 0` clears it.
fn session_cookie(value: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, value, max_age_secs
    )
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Sign a fresh access/refresh pair for `subject`.
fn issue_pair(state: &AppState, subject: &TokenSubject) -> Result<(String, String), Response> {
    let config = &state.config;
    let pair = token::issue(subject, &config.signing_secret, config.access_ttl_secs).and_then(
        |access| {
            token::issue(subject, &config.refresh_secret, config.refresh_ttl_secs)
                .map(|refresh| (access, refresh))
        },
    );
    pair.map_err(|e| {
        error!(error = %e, "Failed to issue tokens");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to issue token")
    })
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Response {
    let credentials = match body {
        Ok(Json(credentials)) => credentials,
        Err(e) => {
            debug!(error = %e, "Unreadable login body");
            Credentials::new("", "")
        }
    };
    if credentials.is_blank() {
        return error_response(StatusCode::BAD_REQUEST, "Email and password are required");
    }

    let subject = TokenSubject::from_email(credentials.email.trim());
    let (access, refresh) = match issue_pair(&state, &subject) {
        Ok(pair) => pair,
        Err(response) => return response,
    };
    info!(email = %subject.email, role = subject.role.as_str(), "Login succeeded");

    let cookie = session_cookie(&access, state.config.access_ttl_secs);
    let body = LoginResponse {
        user: Some(ServerUser {
            email: subject.email,
            name: subject.name,
            role: subject.role,
        }),
        token: Some(access),
        refresh_token: Some(refresh),
    };
    (StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(body)).into_response()
}

/// POST /auth/logout
pub async fn logout() -> Response {
    let cookie = session_cookie("", 0);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(LogoutResponse { success: true }),
    )
        .into_response()
}

/// GET /auth/me
///
/// The session cookie is preferred; a bearer token is accepted for clients
/// without a cookie jar.
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let token = cookie_value(&headers, SESSION_COOKIE).or_else(|| extract_bearer_token(&headers));
    let Some(token) = token else {
        return error_response(StatusCode::UNAUTHORIZED, "Not authenticated");
    };

    match token::verify(token, &state.config.signing_secret) {
        Some(claims) => Json(MeResponse {
            user: ServerUser::from(&claims),
        })
        .into_response(),
        None => error_response(StatusCode::UNAUTHORIZED, "Invalid or expired session"),
    }
}

/// POST /auth/refresh
///
/// Refresh tokens are rotated: every successful call returns a new pair.
pub async fn refresh(
    State(state): State<AppState>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = body else {
        return error_response(StatusCode::UNAUTHORIZED, "Refresh token required");
    };

    let Some(claims) = token::verify(&request.refresh_token, &state.config.refresh_secret) else {
        warn!("Rejected refresh token");
        return error_response(StatusCode::UNAUTHORIZED, "Invalid or expired refresh token");
    };

    let (access, refresh) = match issue_pair(&state, &claims.subject()) {
        Ok(pair) => pair,
        Err(response) => return response,
    };
    debug!(sub = %claims.sub, "Refreshed access token");

    let cookie = session_cookie(&access, state.config.access_ttl_secs);
    let body = RefreshResponse {
        token: access,
        refresh_token: Some(refresh),
    };
    (StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(body)).into_response()
}

// ===== Tests =====
