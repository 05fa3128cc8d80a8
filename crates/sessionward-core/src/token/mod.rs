//! Compact signed session tokens.
//!
//! This module provides:
//! - `Claims` / `TokenSubject` / `Role`: what a token says about its bearer
//! - `issue` / `verify`: HMAC-SHA256 signing and verification (server side)
//! - `decode_unverified`: structural decode for clients without the secret

pub mod claims;
pub mod codec;

pub use claims::{Claims, Role, TokenSubject};
pub use codec::{decode_unverified, issue, issue_at, verify, verify_at, TokenError};
