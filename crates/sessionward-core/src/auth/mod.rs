//! Client-side token persistence.
//!
//! This module provides:
//! - `SlotStorage`: get/set/remove over named string slots, with in-memory,
//!   file and OS keychain implementations
//! - `TokenStore`: access and refresh tokens on top of a `SlotStorage`
//!
//! Storage failures never escape this module; an unreadable slot is an
//! absent token.

pub mod credentials;
pub mod storage;
pub mod tokens;

pub use credentials::KeyringStorage;
pub use storage::{FileStorage, MemoryStorage, SlotStorage, StorageError};
pub use tokens::TokenStore;
