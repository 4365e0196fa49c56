//! The sync pass: list, classify, fetch, reconcile, commit.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::catalog::{FavoritesSource, RemoteCatalog};
use super::classifier::{classify, Classification, LocalIndex};
use super::error::SyncError;
use super::favorites::favorite_changes;
use super::reconcile::{self, ChangeSet};
use super::store::RecipeStore;
use crate::models::Recipe;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Fetch only new, unhydrated or stale recipes.
    #[default]
    Optimized,
    /// Fetch every recipe in the catalog.
    Forced,
}

/// How each listed recipe was resolved during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncCounts {
    /// Reused from the local store.
    pub cached: usize,
    /// Already known locally and fetched again.
    pub fetched: usize,
    /// Not known locally and fetched.
    pub new: usize,
}

/// Output of [`SyncEngine::collect`]: the full target recipe set in catalog order.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncResult {
    pub merged: Vec<Recipe>,
    pub counts: SyncCounts,
}

/// What a committed pass did.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub counts: SyncCounts,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub finished_at: DateTime<Utc>,
    /// False when the changes committed but the sync time could not be
    /// stored, so the next cooldown check treats the store as never synced.
    pub recorded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// Another pass was already running on this engine.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Listing,
    Fetching,
    Reconciling,
    Committed,
    Failed,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Listing => "listing",
            SyncPhase::Fetching => "fetching",
            SyncPhase::Reconciling => "reconciling",
            SyncPhase::Committed => "committed",
            SyncPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Holds the in-flight flag for the duration of a pass.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

enum Slot {
    Cached(Recipe),
    Fetch { slug: String, is_favorite: bool },
}

/// Synchronizes a [`RecipeStore`] with a [`RemoteCatalog`].
///
/// At most one pass runs per engine; a trigger while a pass is in flight
/// returns [`SyncOutcome::Skipped`]. The guard lives on the engine, so build
/// exactly one engine per local store and share it rather than wrapping
/// clones of the same store in separate engines.
pub struct SyncEngine<C, S> {
    catalog: C,
    store: S,
    fetch_concurrency: usize,
    in_flight: AtomicBool,
    phase: watch::Sender<SyncPhase>,
}

impl<C: RemoteCatalog, S: RecipeStore> SyncEngine<C, S> {
    pub fn new(catalog: C, store: S) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self {
            catalog,
            store,
            fetch_concurrency: 1,
            in_flight: AtomicBool::new(false),
            phase,
        }
    }

    /// Number of detail fetches allowed in flight at once (minimum 1).
    pub fn with_fetch_concurrency(mut self, fetch_concurrency: usize) -> Self {
        self.fetch_concurrency = fetch_concurrency.max(1);
        self
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    pub fn watch_phase(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    /// Builds the target recipe set against the store's current contents
    /// without writing anything.
    pub async fn collect(&self, mode: SyncMode) -> Result<SyncResult, SyncError> {
        let current = self.store.load_all().await?;
        self.collect_against(&current, mode, &CancellationToken::new())
            .await
    }

    /// Runs a full pass and commits it in one store transaction.
    pub async fn sync(
        &self,
        mode: SyncMode,
        cancel: &CancellationToken,
    ) -> Result<SyncOutcome, SyncError> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::info!("Sync already in progress, skipping");
            return Ok(SyncOutcome::Skipped);
        };

        match self.run_pass(mode, cancel).await {
            Ok(report) => {
                self.set_phase(SyncPhase::Committed);
                Ok(SyncOutcome::Completed(report))
            }
            Err(e) => {
                self.set_phase(SyncPhase::Failed);
                tracing::warn!("Sync failed: {}", e);
                Err(e)
            }
        }
    }

    async fn run_pass(
        &self,
        mode: SyncMode,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let current = self.store.load_all().await?;
        let SyncResult { merged, counts } = self.collect_against(&current, mode, cancel).await?;

        self.set_phase(SyncPhase::Reconciling);
        let changes = reconcile::plan(&merged, &current);

        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        reconcile::apply(&self.store, &changes).await?;

        let finished_at = Utc::now();
        let recorded = match self.store.record_sync(finished_at).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Recipes saved but sync time not recorded: {}", e);
                false
            }
        };

        tracing::info!(
            "Recipe sync: {} cached, {} updated, {} new ({} inserted, {} updated, {} deleted)",
            counts.cached,
            counts.fetched,
            counts.new,
            changes.inserts.len(),
            changes.updates.len(),
            changes.deletes.len()
        );

        Ok(SyncReport {
            counts,
            inserted: changes.inserts.len(),
            updated: changes.updates.len(),
            deleted: changes.deletes.len(),
            finished_at,
            recorded,
        })
    }

    async fn collect_against(
        &self,
        current: &[Recipe],
        mode: SyncMode,
        cancel: &CancellationToken,
    ) -> Result<SyncResult, SyncError> {
        self.set_phase(SyncPhase::Listing);
        let summaries = self
            .catalog
            .list_summaries()
            .await
            .map_err(SyncError::ListFailed)?;
        tracing::debug!("Listed {} recipe summaries", summaries.len());

        let index = LocalIndex::new(current);
        let mut counts = SyncCounts::default();
        let mut seen = HashSet::with_capacity(summaries.len());
        let mut slots = Vec::with_capacity(summaries.len());

        for summary in &summaries {
            let Some(slug) = summary.usable_slug() else {
                tracing::debug!("Skipping summary without slug (id {:?})", summary.id);
                continue;
            };
            if !seen.insert(slug) {
                tracing::debug!("Skipping repeated slug {}", slug);
                continue;
            }

            let existing = index.find(summary);
            let classification = match (mode, existing) {
                (SyncMode::Optimized, _) => classify(summary, existing),
                (SyncMode::Forced, Some(_)) => Classification::Stale,
                (SyncMode::Forced, None) => Classification::New,
            };
            tracing::debug!("{}: {:?}", slug, classification);

            match (classification, existing) {
                (Classification::Current, Some(local)) => {
                    counts.cached += 1;
                    slots.push(Slot::Cached(local.clone()));
                }
                (Classification::New, _) | (_, None) => {
                    counts.new += 1;
                    slots.push(Slot::Fetch {
                        slug: slug.to_string(),
                        is_favorite: false,
                    });
                }
                (_, Some(local)) => {
                    counts.fetched += 1;
                    slots.push(Slot::Fetch {
                        slug: slug.to_string(),
                        is_favorite: local.is_favorite,
                    });
                }
            }
        }

        self.set_phase(SyncPhase::Fetching);
        let merged: Vec<Recipe> = stream::iter(slots)
            .map(move |slot| async move {
                match slot {
                    Slot::Cached(recipe) => Ok(recipe),
                    Slot::Fetch { slug, is_favorite } => {
                        if cancel.is_cancelled() {
                            return Err(SyncError::Cancelled);
                        }
                        tracing::debug!("Fetching recipe {}", slug);
                        let mut recipe = self
                            .catalog
                            .fetch_detail(&slug)
                            .await
                            .map_err(|source| SyncError::DetailFetchFailed {
                                slug: slug.clone(),
                                source,
                            })?;
                        recipe.is_favorite = is_favorite;
                        Ok(recipe)
                    }
                }
            })
            .buffered(self.fetch_concurrency)
            .try_collect()
            .await?;

        Ok(SyncResult { merged, counts })
    }

    fn set_phase(&self, phase: SyncPhase) {
        tracing::debug!("Sync phase: {}", phase);
        self.phase.send_replace(phase);
    }
}

impl<C: RemoteCatalog + FavoritesSource, S: RecipeStore> SyncEngine<C, S> {
    /// Sets every local favorite flag from the server's favorites list.
    ///
    /// Returns the number of recipes changed, or `None` when a pass was
    /// already in flight.
    pub async fn sync_favorites(&self) -> Result<Option<usize>, SyncError> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::info!("Sync already in progress, skipping favorites");
            return Ok(None);
        };

        let ratings = FavoritesSource::favorites(&self.catalog)
            .await
            .map_err(SyncError::FavoritesFailed)?;
        let current = self.store.load_all().await?;

        let changes = ChangeSet {
            updates: favorite_changes(&ratings, &current),
            ..ChangeSet::default()
        };
        let changed = changes.updates.len();
        reconcile::apply(&self.store, &changes).await?;

        tracing::info!("Favorites sync: {} recipes changed", changed);
        Ok(Some(changed))
    }
}
