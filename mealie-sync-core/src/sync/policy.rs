//! When an automatic sync is worth running.

use chrono::{DateTime, Duration, Utc};

/// Minimum time between automatic syncs.
pub const SYNC_COOLDOWN_SECS: i64 = 300;

/// True if the store is empty, has never synced, or last synced more than
/// [`SYNC_COOLDOWN_SECS`] before `now`.
pub fn should_sync(local_count: usize, last_sync: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    if local_count == 0 {
        return true;
    }
    match last_sync {
        None => true,
        Some(last) => now - last > Duration::seconds(SYNC_COOLDOWN_SECS),
    }
}
