use serde::{Deserialize, Serialize};

/// Access level carried in a token. Only two levels exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// Role assignment used by the reference issuance endpoint:
    /// admin iff the email contains "admin".
    pub fn for_email(email: &str) -> Self {
        if email.contains("admin") {
            Role::Admin
        } else {
            Role::User
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

/// Identity facts to be signed into a token, before timestamps are attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSubject {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl TokenSubject {
    /// Build a subject from an email address. The display name is the
    /// local part before `@`.
    pub fn from_email(email: &str) -> Self {
        let name = email.split('@').next().unwrap_or(email).to_string();
        Self {
            sub: email.to_string(),
            email: email.to_string(),
            name,
            role: Role::for_email(email),
        }
    }
}

/// Decoded token payload.
///
/// `iat` and `exp` are optional on the wire: tokens without `exp` never
/// expire as far as verification is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl Claims {
    pub fn new(subject: TokenSubject, iat: i64, exp: i64) -> Self {
        Self {
            sub: subject.sub,
            email: subject.email,
            name: subject.name,
            role: subject.role,
            iat: Some(iat),
            exp: Some(exp),
        }
    }

    /// The identity part of the claims, without timestamps.
    pub fn subject(&self) -> TokenSubject {
        TokenSubject {
            sub: self.sub.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }

    /// True when `exp` is present and not after `now` (seconds since epoch).
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp.is_some_and(|exp| exp <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_for_email() {
        assert_eq!(Role::for_email("admin@x.com"), Role::Admin);
        assert_eq!(Role::for_email("sysadmin.ops@x.com"), Role::Admin);
        assert_eq!(Role::for_email("kid@x.com"), Role::User);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(serde_json::from_str::<Role>("\"user\"").unwrap(), Role::User);
        assert!(serde_json::from_str::<Role>("\"root\"").is_err());
    }

    #[test]
    fn test_subject_from_email_uses_local_part() {
        let subject = TokenSubject::from_email("kid@x.com");
        assert_eq!(subject.name, "kid");
        assert_eq!(subject.sub, "kid@x.com");
        assert_eq!(subject.role, Role::User);
    }

    #[test]
    fn test_is_expired_at() {
        let claims = Claims::new(TokenSubject::from_email("a@b.c"), 100, 200);
        assert!(!claims.is_expired_at(199));
        assert!(claims.is_expired_at(200));
        assert!(claims.is_expired_at(201));

        let no_exp = Claims { exp: None, ..claims };
        assert!(!no_exp.is_expired_at(i64::MAX));
    }
}
