//! Client-side authentication state.
//!
//! This module provides:
//! - `SessionManager`: login, logout, expiry-triggered refresh and
//!   cross-restart recovery as a single state machine
//! - `SessionWatcher`: subscriber handle for front ends
//! - `Session` / `UserIdentity`: the observable record
//! - `Navigator`: the routing hook used after logout

pub mod error;
pub mod manager;
pub mod navigator;
pub mod state;

pub use error::SessionError;
pub use manager::{SessionManager, SessionWatcher};
pub use navigator::{LogNavigator, Navigator};
pub use state::{AuthState, Session, Snapshot, UserIdentity};
