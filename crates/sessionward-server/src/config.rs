//! Server configuration from the environment.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use tracing::warn;

const BIND_ENV: &str = "SESSIONWARD_BIND";
const SECRET_ENV: &str = "SESSIONWARD_SECRET";
const REFRESH_SECRET_ENV: &str = "SESSIONWARD_REFRESH_SECRET";
const ACCESS_TTL_ENV: &str = "SESSIONWARD_ACCESS_TTL_SECS";
const REFRESH_TTL_ENV: &str = "SESSIONWARD_REFRESH_TTL_SECS";

const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Access tokens and the session cookie live 12 hours.
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 12 * 60 * 60;

/// Refresh tokens live 7 days.
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Upper bound for either TTL: one year.
pub const MAX_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Length of generated development secrets in bytes
const GENERATED_SECRET_LEN: usize = 32;

#[derive(Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Signs and verifies access tokens
    pub signing_secret: Vec<u8>,
    /// Signs and verifies refresh tokens; distinct so one kind cannot stand in for the other
    pub refresh_secret: Vec<u8>,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

impl ServerConfig {
    pub fn new(signing_secret: impl Into<Vec<u8>>, refresh_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            signing_secret: signing_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
            refresh_ttl_secs: DEFAULT_REFRESH_TTL_SECS,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr: SocketAddr = get(BIND_ENV)
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse()
            .with_context(|| format!("Invalid {}", BIND_ENV))?;

        let signing_secret = match get(SECRET_ENV) {
            Some(secret) => secret.into_bytes(),
            None => {
                warn!("{} not set, using a random secret; tokens will not survive a restart", SECRET_ENV);
                generate_secret()
            }
        };
        let refresh_secret = match get(REFRESH_SECRET_ENV) {
            Some(secret) => secret.into_bytes(),
            None => {
                warn!("{} not set, using a random secret", REFRESH_SECRET_ENV);
                generate_secret()
            }
        };

        let access_ttl_secs = parse_ttl(get(ACCESS_TTL_ENV), ACCESS_TTL_ENV, DEFAULT_ACCESS_TTL_SECS)?;
        let refresh_ttl_secs =
            parse_ttl(get(REFRESH_TTL_ENV), REFRESH_TTL_ENV, DEFAULT_REFRESH_TTL_SECS)?;

        Ok(Self {
            bind_addr,
            signing_secret,
            refresh_secret,
            access_ttl_secs,
            refresh_ttl_secs,
        })
    }
}

fn parse_ttl(value: Option<String>, key: &str, default: i64) -> Result<i64> {
    let Some(value) = value else {
        return Ok(default);
    };
    let ttl: i64 = value
        .trim()
        .parse()
        .with_context(|| format!("Invalid {}", key))?;
    if ttl <= 0 {
        anyhow::bail!("{} must be positive", key);
    }
    if ttl > MAX_TTL_SECS {
        anyhow::bail!("{} must not exceed {} seconds", key, MAX_TTL_SECS);
    }
    Ok(ttl)
}

fn generate_secret() -> Vec<u8> {
    let mut bytes = [0u8; GENERATED_SECRET_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes).into_bytes()
}
