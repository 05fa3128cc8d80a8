//! Session snapshot caching.
//!
//! This module provides the `SnapshotCache`, which remembers the last known
//! session across restarts so the first paint does not flash "logged out"
//! while the authoritative check is still running.

pub mod snapshot;

pub use snapshot::{CachedData, SnapshotCache};
