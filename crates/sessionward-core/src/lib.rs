//! Core library for sessionward.
//!
//! Issues and verifies compact HMAC-SHA256 signed session tokens, and keeps
//! client-side authentication state consistent across restarts, expiry and
//! partial network failure.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod session;
pub mod token;

pub use api::{ApiError, HttpTransport, Transport};
pub use auth::{FileStorage, KeyringStorage, MemoryStorage, SlotStorage, StorageError, TokenStore};
pub use cache::SnapshotCache;
pub use config::{Config, TokenBackend};
pub use models::Credentials;
pub use session::{
    AuthState, LogNavigator, Navigator, Session, SessionError, SessionManager, SessionWatcher,
    UserIdentity,
};
pub use token::{Claims, Role, TokenSubject};
