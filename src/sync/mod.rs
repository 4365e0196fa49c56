//! Wiring between the CLI configuration, the SQLite store and the core sync engine.

pub mod auto_sync;

use mealie_sync_core::api::{ApiError, MealieClient};
use mealie_sync_core::sync::SyncEngine;

use crate::config::Config;
use crate::db::SqliteRecipeStore;

pub use auto_sync::try_auto_sync;

pub type RecipeSyncEngine = SyncEngine<MealieClient, SqliteRecipeStore>;

/// Builds a sync engine over `store` using the configured server and tunables.
///
/// Each command builds one engine and runs every pass through it; the
/// in-flight guard does not span engines built over clones of one store.
pub fn build_engine(config: &Config, store: SqliteRecipeStore) -> Result<RecipeSyncEngine, ApiError> {
    let client = config.server.client()?;
    Ok(SyncEngine::new(client, store).with_fetch_concurrency(config.server.fetch_concurrency))
}
