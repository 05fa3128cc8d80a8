//! Compact signed token encoding.
//!
//! Wire format: `base64url(header).base64url(payload).base64url(tag)` where
//! the tag is HMAC-SHA256 over the first two segments joined by `.`.
//! HS256 is the only algorithm; the header is checked, never negotiated.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

use super::{Claims, TokenSubject};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";
const TOKEN_TYPE: &str = "JWT";

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Failed to encode token segment: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Token lifetime of {0}s overflows the expiry timestamp")]
    TtlOverflow(i64),
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

impl Header {
    fn hs256() -> Self {
        Self {
            alg: ALGORITHM.to_string(),
            typ: TOKEN_TYPE.to_string(),
        }
    }
}

/// Issue a token for `subject` valid for `ttl_secs` from now.
pub fn issue(subject: &TokenSubject, secret: &[u8], ttl_secs: i64) -> Result<String, TokenError> {
    issue_at(subject, secret, ttl_secs, Utc::now().timestamp())
}

/// Issue a token with an explicit issue time (seconds since epoch).
pub fn issue_at(
    subject: &TokenSubject,
    secret: &[u8],
    ttl_secs: i64,
    now: i64,
) -> Result<String, TokenError> {
    let exp = now
        .checked_add(ttl_secs)
        .ok_or(TokenError::TtlOverflow(ttl_secs))?;
    let claims = Claims::new(subject.clone(), now, exp);

    let header = encode_segment(&Header::hs256())?;
    let payload = encode_segment(&claims)?;
    let signing_input = format!("{}.{}", header, payload);

    let mut mac = keyed_mac(secret);
    mac.update(signing_input.as_bytes());
    let tag = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", signing_input, tag))
}

/// Verify a token against `secret`. Returns `None` for anything that is
/// malformed, wrongly signed or expired; never panics on bad input.
pub fn verify(token: &str, secret: &[u8]) -> Option<Claims> {
    verify_at(token, secret, Utc::now().timestamp())
}

pub fn verify_at(token: &str, secret: &[u8], now: i64) -> Option<Claims> {
    let (header, payload, signature) = split(token)?;
    let signing_input = &token[..header.len() + 1 + payload.len()];

    let Ok(tag) = URL_SAFE_NO_PAD.decode(signature) else {
        debug!("Token signature is not base64url");
        return None;
    };

    let mut mac = keyed_mac(secret);
    mac.update(signing_input.as_bytes());
    // verify_slice compares in constant time
    if mac.verify_slice(&tag).is_err() {
        debug!("Token signature mismatch");
        return None;
    }

    let header: Header = decode_segment(header)?;
    if header.alg != ALGORITHM {
        debug!(alg = %header.alg, "Unsupported token algorithm");
        return None;
    }

    let claims: Claims = decode_segment(payload)?;
    if claims.is_expired_at(now) {
        debug!(sub = %claims.sub, exp = ?claims.exp, "Token expired");
        return None;
    }

    Some(claims)
}

/// Structural decode without signature verification.
///
/// This is what a client holding no signing secret can do: it tells who the
/// token claims to be for, not that the claim is genuine.
pub fn decode_unverified(token: &str) -> Option<Claims> {
    let (header, payload, _) = split(token)?;
    let _: Header = decode_segment(header)?;
    decode_segment(payload)
}

/// Split into exactly three segments.
fn split(token: &str) -> Option<(&str, &str, &str)> {
    let mut parts = token.split('.');
    let header = parts.next()?;
    let payload = parts.next()?;
    let signature = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some((header, payload, signature))
}

fn keyed_mac(secret: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(secret).expect("HMAC can accept any key length")
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Option<T> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    serde_json::from_slice(&bytes).ok()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Role;

    const SECRET: &[u8] = b"test-signing-secret";

    fn subject() -> TokenSubject {
        TokenSubject::from_email("admin@x.com")
    }

    #[test]
    fn test_round_trip_preserves_claims() {
        let token = issue(&subject(), SECRET, 3600).unwrap();
        let claims = verify(&token, SECRET).expect("token should verify");

        assert_eq!(claims.subject(), subject());
        assert_eq!(claims.role, Role::Admin);
        let (iat, exp) = (claims.iat.unwrap(), claims.exp.unwrap());
        assert_eq!(exp - iat, 3600);
    }

    #[test]
    fn test_token_has_three_base64url_segments() {
        let token = issue(&subject(), SECRET, 60).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);
        for part in parts {
            assert!(!part.contains('='));
            assert!(!part.contains('+'));
            assert!(!part.contains('/'));
        }
    }

    #[test]
    fn test_header_is_hs256_jwt() {
        let token = issue(&subject(), SECRET, 60).unwrap();
        let header = token.split('.').next().unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header).unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"alg": "HS256", "typ": "JWT"}));
    }

    #[test]
    fn test_ttl_overflow_is_an_error() {
        let err = issue_at(&subject(), SECRET, i64::MAX, 1_700_000_000).unwrap_err();
        assert!(matches!(err, TokenError::TtlOverflow(i64::MAX)));
    }

    #[test]
    fn test_empty_and_long_keys_sign() {
        let long_key = vec![7u8; 200];
        for key in [&b""[..], &long_key[..]] {
            let token = issue(&subject(), key, 60).unwrap();
            assert!(verify(&token, key).is_some());
        }
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let token = issue(&subject(), SECRET, 3600).unwrap();
        let sig_start = token.rfind('.').unwrap() + 1;
        let mut bytes = token.into_bytes();
        bytes[sig_start] = if bytes[sig_start] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(verify(&tampered, SECRET).is_none());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let token = issue(&TokenSubject::from_email("kid@x.com"), SECRET, 3600).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged = Claims::new(TokenSubject::from_email("admin@x.com"), 0, i64::MAX);
        let forged_payload = encode_segment(&forged).unwrap();
        let forged_token = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert!(verify(&forged_token, SECRET).is_none());
        // the structural decode still reads it; that is why the client never trusts it for authz
        assert!(decode_unverified(&forged_token).is_some());
    }

    #[test]
    fn test_secret_mismatch_rejected() {
        let token = issue(&subject(), b"secret-one", 3600).unwrap();
        assert!(verify(&token, b"secret-two").is_none());
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue(&subject(), SECRET, -1).unwrap();
        assert!(verify(&token, SECRET).is_none());
    }

    #[test]
    fn test_expiry_boundary() {
        let token = issue_at(&subject(), SECRET, 10, 1_000).unwrap();
        assert!(verify_at(&token, SECRET, 1_009).is_some());
        assert!(verify_at(&token, SECRET, 1_010).is_none());
    }

    #[test]
    fn test_token_without_exp_verifies() {
        let claims = Claims {
            exp: None,
            iat: None,
            ..Claims::new(subject(), 0, 0)
        };
        let header = encode_segment(&Header::hs256()).unwrap();
        let payload = encode_segment(&claims).unwrap();
        let input = format!("{}.{}", header, payload);
        let mut mac = HmacSha256::new_from_slice(SECRET).unwrap();
        mac.update(input.as_bytes());
        let token = format!("{}.{}", input, URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()));

        assert_eq!(verify(&token, SECRET), Some(claims));
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = encode_segment(&Claims::new(subject(), 0, i64::MAX)).unwrap();
        let input = format!("{}.{}", header, payload);
        let mut mac = HmacSha256::new_from_slice(SECRET).unwrap();
        mac.update(input.as_bytes());
        let token = format!("{}.{}", input, URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()));

        assert!(verify(&token, SECRET).is_none());
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        assert!(verify("a.b", SECRET).is_none());
        assert!(verify("a.b.c.d", SECRET).is_none());
        assert!(verify("", SECRET).is_none());
        assert!(verify("a.b.c", SECRET).is_none());
        assert!(verify("..", SECRET).is_none());
    }

    #[test]
    fn test_decode_unverified_reads_expired_token() {
        let token = issue(&subject(), SECRET, -60).unwrap();
        let claims = decode_unverified(&token).expect("structural decode");
        assert_eq!(claims.email, "admin@x.com");
        assert!(claims.is_expired_at(Utc::now().timestamp()));
    }

    #[test]
    fn test_decode_unverified_rejects_garbage() {
        assert!(decode_unverified("not-a-token").is_none());
        assert!(decode_unverified("a.b.c").is_none());
        assert!(decode_unverified("a.b.c.d").is_none());
    }
}
