use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::SlotStorage;
use crate::session::Snapshot;

/// Slot holding the serialized snapshot
const SNAPSHOT_SLOT: &str = "session_snapshot";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}

/// Cross-restart cache of the last known session.
///
/// Purely advisory: it only seeds the first paint before the authoritative
/// check resolves. Every failure reads as a miss.
#[derive(Clone)]
pub struct SnapshotCache {
    storage: Arc<dyn SlotStorage>,
}

impl SnapshotCache {
    pub fn new(storage: Arc<dyn SlotStorage>) -> Self {
        Self { storage }
    }

    pub fn write(&self, snapshot: &Snapshot) {
        let contents = match serde_json::to_string(&CachedData::new(snapshot)) {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "Failed to serialize session snapshot");
                return;
            }
        };
        if let Err(e) = self.storage.set(SNAPSHOT_SLOT, &contents) {
            debug!(error = %e, "Failed to write session snapshot");
        }
    }

    pub fn read(&self) -> Option<Snapshot> {
        self.read_cached().map(|cached| cached.data)
    }

    /// Read with the time the snapshot was taken
    pub fn read_cached(&self) -> Option<CachedData<Snapshot>> {
        let contents = match self.storage.get(SNAPSHOT_SLOT) {
            Ok(Some(c)) => c,
            Ok(None) => return None,
            Err(e) => {
                debug!(error = %e, "Session snapshot unreadable");
                return None;
            }
        };

        match serde_json::from_str::<CachedData<Snapshot>>(&contents) {
            Ok(cached) => Some(cached),
            Err(e) => {
                debug!(error = %e, "Session snapshot corrupt, ignoring");
                None
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
