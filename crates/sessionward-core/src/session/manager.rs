//! The session state machine.
//!
//! `SessionManager` owns the only copy of the session state and publishes it
//! through a `watch` channel; front ends subscribe with `SessionWatcher`
//! instead of keeping their own copy.
//!
//! Public operations run one at a time per manager (FIFO async mutex). A
//! logout issued while a refresh is in flight therefore runs after the
//! refresh settles, and its result is the one left standing.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, Mutex, OnceCell};
use tracing::{debug, error, info, warn};

use super::error::SessionError;
use super::navigator::Navigator;
use super::state::{AuthState, Session, Snapshot, UserIdentity};
use crate::api::Transport;
use crate::auth::TokenStore;
use crate::cache::SnapshotCache;
use crate::models::{Credentials, ServerUser};
use crate::token::{decode_unverified, Claims};

/// Default page to leave for after logout
const DEFAULT_LOGOUT_REDIRECT: &str = "/login";

pub struct SessionManager {
    transport: Arc<dyn Transport>,
    navigator: Arc<dyn Navigator>,
    tokens: TokenStore,
    snapshots: SnapshotCache,
    logout_redirect: String,

    state: watch::Sender<AuthState>,
    op_lock: Mutex<()>,
    initialized: OnceCell<()>,
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        tokens: TokenStore,
        snapshots: SnapshotCache,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::Loading { provisional: None });
        Self {
            transport,
            navigator,
            tokens,
            snapshots,
            logout_redirect: DEFAULT_LOGOUT_REDIRECT.to_string(),
            state,
            op_lock: Mutex::new(()),
            initialized: OnceCell::new(),
        }
    }

    pub fn with_logout_redirect(mut self, path: impl Into<String>) -> Self {
        self.logout_redirect = path.into();
        self
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Current observable session
    pub fn session(&self) -> Session {
        self.state.borrow().session()
    }

    /// Current logical state
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> SessionWatcher {
        SessionWatcher {
            rx: self.state.subscribe(),
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Paint the cached snapshot, then run the authoritative check.
    ///
    /// Runs once per manager; later or concurrent calls wait for the first
    /// one and return without doing anything.
    pub async fn initialize(&self) {
        self.initialized
            .get_or_init(|| async move {
                let provisional = match self.snapshots.read_cached() {
                    Some(cached) => {
                        debug!(
                            age = %cached.age_display(),
                            logged_in = cached.data.is_logged_in,
                            "Painting cached session snapshot"
                        );
                        cached.data.user.filter(|_| cached.data.is_logged_in)
                    }
                    None => None,
                };
                self.set_state(AuthState::Loading { provisional });
                self.check_auth_status().await;
            })
            .await;
    }

    /// Decide the session from the stored access token, refreshing it if
    /// it has expired.
    pub async fn check_auth_status(&self) {
        let _guard = self.op_lock.lock().await;

        let Some(token) = self.tokens.access_token() else {
            debug!("No stored access token");
            self.settle_unauthenticated();
            return;
        };

        let Some(claims) = decode_unverified(&token) else {
            warn!("Stored access token could not be decoded, clearing tokens");
            self.tokens.clear_all();
            self.settle_unauthenticated();
            return;
        };

        if !claims.is_expired_at(Utc::now().timestamp()) {
            debug!(sub = %claims.sub, "Stored access token still valid");
            self.settle_authenticated(UserIdentity::from_claims(&claims));
            return;
        }

        info!(sub = %claims.sub, "Access token expired, attempting refresh");
        self.set_state(AuthState::Loading {
            provisional: self.current_user(),
        });

        match self.refresh_access_token().await {
            Some(user) => {
                info!(sub = %user.subject, "Access token refreshed");
                self.settle_authenticated(user);
            }
            None => {
                self.tokens.clear_all();
                self.settle_unauthenticated();
            }
        }
    }

    /// Log in and persist the issued tokens.
    ///
    /// On failure the error is returned and published in `Session::error`;
    /// an identity held before the attempt is kept, not demoted.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserIdentity, SessionError> {
        let _guard = self.op_lock.lock().await;

        let previous = self.current_user();
        self.set_state(AuthState::Loading {
            provisional: previous.clone(),
        });

        match self.exchange_credentials(credentials).await {
            Ok(user) => {
                info!(sub = %user.subject, role = user.role.as_str(), "Login successful");
                self.settle_authenticated(user.clone());
                Ok(user)
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                self.set_state(AuthState::TransientError {
                    message: e.user_message(),
                    user: previous,
                });
                Err(e)
            }
        }
    }

    /// Log out locally, telling the server on a best-effort basis.
    pub async fn logout(&self) {
        let _guard = self.op_lock.lock().await;

        self.set_state(AuthState::Loading {
            provisional: self.current_user(),
        });

        if let Err(e) = self.transport.logout(self.tokens.auth_header()).await {
            debug!(error = %e, "Server logout failed, clearing local session anyway");
        }

        self.tokens.clear_all();
        self.settle_unauthenticated();
        info!("Logged out");
        self.navigator.navigate(&self.logout_redirect);
    }

    /// Send an already signed-in user to `path`. Not a state transition.
    ///
    /// Matches what `Session` shows: a settled state holding an identity,
    /// including an error state that kept the previous user.
    pub fn redirect_if_logged_in(&self, path: &str) {
        let logged_in = {
            let state = self.state.borrow();
            !state.is_loading() && state.user().is_some()
        };
        if logged_in {
            self.navigator.navigate(path);
        }
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|state| {
            let AuthState::TransientError { user, .. } = state else {
                return false;
            };
            let next = match user.take() {
                Some(user) => AuthState::Authenticated(user),
                None => AuthState::Unauthenticated,
            };
            *state = next;
            true
        });
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn exchange_credentials(
        &self,
        credentials: &Credentials,
    ) -> Result<UserIdentity, SessionError> {
        let response = self.transport.login(credentials).await?;

        let token = response
            .token
            .filter(|t| !t.is_empty())
            .ok_or(SessionError::MissingToken)?;
        let decoded = decode_unverified(&token);
        let user = merge_identity(response.user, decoded.as_ref())
            .ok_or(SessionError::MissingIdentity)?;

        self.tokens.set_access_token(&token);
        if let Some(refresh_token) = response.refresh_token {
            self.tokens.set_refresh_token(&refresh_token);
        }
        Ok(user)
    }

    /// Returns the refreshed identity, or `None` on any failure.
    async fn refresh_access_token(&self) -> Option<UserIdentity> {
        let Some(refresh_token) = self.tokens.refresh_token() else {
            debug!("No refresh token stored");
            return None;
        };

        let response = match self.transport.refresh(&refresh_token).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                return None;
            }
        };

        self.tokens.set_access_token(&response.token);
        if let Some(rotated) = response.refresh_token {
            self.tokens.set_refresh_token(&rotated);
        }

        match decode_unverified(&response.token) {
            Some(claims) => Some(UserIdentity::from_claims(&claims)),
            None => {
                warn!("Refreshed access token could not be decoded");
                None
            }
        }
    }

    fn current_user(&self) -> Option<UserIdentity> {
        self.state.borrow().user().cloned()
    }

    fn set_state(&self, next: AuthState) {
        debug!(to = ?next, "Session state changed");
        self.state.send_replace(next);
    }

    fn settle_authenticated(&self, user: UserIdentity) {
        self.snapshots.write(&Snapshot::logged_in(user.clone()));
        self.set_state(AuthState::Authenticated(user));
    }

    fn settle_unauthenticated(&self) {
        self.snapshots.write(&Snapshot::logged_out());
        self.set_state(AuthState::Unauthenticated);
    }
}

/// Server-reported fields win; subject and timestamps come from the token.
fn merge_identity(server: Option<ServerUser>, decoded: Option<&Claims>) -> Option<UserIdentity> {
    match (server, decoded) {
        (Some(server), decoded) => Some(UserIdentity {
            subject: decoded
                .map(|c| c.sub.clone())
                .unwrap_or_else(|| server.email.clone()),
            email: server.email,
            name: server.name,
            role: server.role,
            iat: decoded.and_then(|c| c.iat),
            exp: decoded.and_then(|c| c.exp),
        }),
        (None, Some(claims)) => Some(UserIdentity::from_claims(claims)),
        (None, None) => None,
    }
}

/// Read-only view of a manager's session for front ends.
#[derive(Clone)]
pub struct SessionWatcher {
    rx: watch::Receiver<AuthState>,
}

impl SessionWatcher {
    pub fn current(&self) -> Session {
        self.rx.borrow().session()
    }

    /// Wait for the next change. `None` once the manager is gone.
    pub async fn changed(&mut self) -> Option<Session> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().session())
    }

    /// Wait until no operation is in flight.
    pub async fn settled(&mut self) -> Option<Session> {
        let state = self.rx.wait_for(|state| !state.is_loading()).await.ok()?;
        Some(state.session())
    }
}

// ============================================================================
// Tests
// ============================================================================
