use serde::{Deserialize, Serialize};

use crate::token::{Claims, Role};

/// Who the current user is, as far as the client knows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub subject: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl UserIdentity {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            subject: claims.sub.clone(),
            email: claims.email.clone(),
            name: claims.name.clone(),
            role: claims.role,
            iat: claims.iat,
            exp: claims.exp,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// The observable session record.
///
/// `is_logged_in` implies `user.is_some()`; the projection from `AuthState`
/// guarantees it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub is_logged_in: bool,
    pub user: Option<UserIdentity>,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Advisory copy of the last known session, persisted across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub is_logged_in: bool,
    pub user: Option<UserIdentity>,
}

impl Snapshot {
    pub fn logged_out() -> Self {
        Self::default()
    }

    pub fn logged_in(user: UserIdentity) -> Self {
        Self {
            is_logged_in: true,
            user: Some(user),
        }
    }
}

/// Logical session state. Only the session manager transitions it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// An operation is in flight. `provisional` is what the UI may show
    /// meanwhile: a cached snapshot or the identity held before the call.
    Loading { provisional: Option<UserIdentity> },
    Authenticated(UserIdentity),
    Unauthenticated,
    /// A user-visible failure. `user` is the identity still held, if any.
    TransientError {
        message: String,
        user: Option<UserIdentity>,
    },
}

impl AuthState {
    /// The identity this state carries, whether settled or provisional.
    pub fn user(&self) -> Option<&UserIdentity> {
        match self {
            AuthState::Loading { provisional } => provisional.as_ref(),
            AuthState::Authenticated(user) => Some(user),
            AuthState::Unauthenticated => None,
            AuthState::TransientError { user, .. } => user.as_ref(),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, AuthState::Loading { .. })
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }

    /// Project onto the four observable fields
    pub fn session(&self) -> Session {
        let user = self.user().cloned();
        Session {
            is_logged_in: user.is_some(),
            user,
            is_loading: self.is_loading(),
            error: match self {
                AuthState::TransientError { message, .. } => Some(message.clone()),
                _ => None,
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenSubject;

    fn user() -> UserIdentity {
        UserIdentity::from_claims(&Claims::new(TokenSubject::from_email("kid@x.com"), 1, 2))
    }

    #[test]
    fn test_identity_from_claims() {
        let identity = user();
        assert_eq!(identity.subject, "kid@x.com");
        assert_eq!(identity.name, "kid");
        assert_eq!(identity.exp, Some(2));
        assert!(!identity.is_admin());
    }

    #[test]
    fn test_projection_authenticated() {
        let session = AuthState::Authenticated(user()).session();
        assert!(session.is_logged_in);
        assert_eq!(session.user, Some(user()));
        assert!(!session.is_loading);
        assert_eq!(session.error, None);
    }

    #[test]
    fn test_projection_unauthenticated() {
        assert_eq!(AuthState::Unauthenticated.session(), Session::default());
    }

    #[test]
    fn test_projection_loading_with_provisional_user() {
        let session = AuthState::Loading {
            provisional: Some(user()),
        }
        .session();
        assert!(session.is_logged_in);
        assert!(session.is_loading);

        let empty = AuthState::Loading { provisional: None }.session();
        assert!(!empty.is_logged_in);
        assert!(empty.user.is_none());
        assert!(empty.is_loading);
    }

    #[test]
    fn test_projection_error_keeps_user() {
        let session = AuthState::TransientError {
            message: "Invalid email or password".to_string(),
            user: Some(user()),
        }
        .session();
        assert!(session.is_logged_in);
        assert!(!session.is_loading);
        assert_eq!(session.error.as_deref(), Some("Invalid email or password"));
    }

    #[test]
    fn test_session_serializes_camel_case() {
        let json = serde_json::to_value(Session::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"isLoggedIn": false, "user": null, "isLoading": false, "error": null})
        );
    }
}
