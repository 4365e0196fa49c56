//! Recipe synchronization between a remote catalog and a local store.
//!
//! A pass lists the catalog, fetches the full recipe only where the local
//! copy is missing or stale, then reconciles the result into the store in a
//! single transaction. Local favorite flags survive ordinary passes;
//! [`SyncEngine::sync_favorites`] is the only path that overwrites them.
//!
//! ```text
//! Idle -> Listing -> Fetching -> Reconciling -> Committed
//!                                            \-> Failed
//! ```

mod catalog;
mod classifier;
mod engine;
mod error;
mod favorites;
mod memory;
mod policy;
mod reconcile;
mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{FavoritesSource, RemoteCatalog};
pub use classifier::{classify, needs_detail_fetch, Classification, LocalIndex};
pub use engine::{
    SyncCounts, SyncEngine, SyncMode, SyncOutcome, SyncPhase, SyncReport, SyncResult,
};
pub use error::{StoreError, SyncError};
pub use favorites::favorite_changes;
pub use memory::MemoryRecipeStore;
pub use policy::{should_sync, SYNC_COOLDOWN_SECS};
pub use reconcile::{apply, merge_onto, plan, reconcile, ChangeSet};
pub use store::RecipeStore;
