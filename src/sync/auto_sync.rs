//! Auto-sync before read commands.
//!
//! Runs an optimized pass when `server.auto_sync` is enabled, credentials are
//! present, and the local store is empty or the last sync is past the cooldown.
//! Failures are reported and otherwise ignored so reads keep working offline.

use chrono::{DateTime, Utc};
use mealie_sync_core::sync::{should_sync, RecipeStore, SyncMode, SyncOutcome};
use tokio_util::sync::CancellationToken;

use super::build_engine;
use crate::config::Config;
use crate::db::SqliteRecipeStore;

/// True when auto-sync is enabled, configured, and due.
pub fn auto_sync_due(
    config: &Config,
    local_count: usize,
    last_sync: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    config.server.auto_sync
        && config.server.is_configured()
        && should_sync(local_count, last_sync, now)
}

pub async fn try_auto_sync(config: &Config, store: &SqliteRecipeStore) {
    if !config.server.auto_sync || !config.server.is_configured() {
        return;
    }

    let local_count = match store.count().await {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!("Auto-sync: could not read local store: {}", e);
            return;
        }
    };
    let last_sync = store.last_synced_at().await.unwrap_or_else(|e| {
        tracing::warn!("Auto-sync: could not read last sync time: {}", e);
        None
    });

    if !auto_sync_due(config, local_count, last_sync, Utc::now()) {
        tracing::debug!("Auto-sync: last sync is recent, skipping");
        return;
    }

    let engine = match build_engine(config, store.clone()) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Auto-sync: {}", e);
            return;
        }
    };

    match engine
        .sync(SyncMode::Optimized, &CancellationToken::new())
        .await
    {
        Ok(SyncOutcome::Completed(report)) => {
            tracing::debug!(
                "Auto-sync: {} inserted, {} updated, {} deleted",
                report.inserted,
                report.updated,
                report.deleted
            );
        }
        Ok(SyncOutcome::Skipped) => {}
        Err(e) => eprintln!("Auto-sync: {}", e),
    }
}
