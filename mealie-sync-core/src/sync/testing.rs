//! Test doubles for the sync engine.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use super::catalog::{FavoritesSource, RemoteCatalog};
use super::error::StoreError;
use super::reconcile::ChangeSet;
use super::store::RecipeStore;
use crate::api::ApiError;
use crate::models::{FavoriteRating, Ingredient, Instruction, Recipe, RecipeSummary};

/// A recipe with one ingredient and one step, so it counts as hydrated.
pub fn hydrated_recipe(remote_id: &str, slug: &str, date_updated: &str) -> Recipe {
    Recipe::new(remote_id, slug)
        .with_name(slug.replace('-', " "))
        .with_date_updated(date_updated)
        .with_ingredients(vec![Ingredient::new("salt", 1.0, "tsp")])
        .with_instructions(vec![Instruction::new(1, "Season to taste")])
}

/// Lets a test pause a pass right after listing.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

#[derive(Default)]
struct CatalogState {
    recipes: Vec<Recipe>,
    extra_summaries: Vec<RecipeSummary>,
    failing_slugs: HashSet<String>,
    fail_list: bool,
    favorites: Vec<FavoriteRating>,
}

/// Scripted in-memory catalog. Summaries are derived from the published recipes.
#[derive(Default)]
pub struct FakeCatalog {
    state: Mutex<CatalogState>,
    detail_calls: AtomicUsize,
    gate: Option<Arc<Gate>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recipes(recipes: Vec<Recipe>) -> Self {
        let catalog = Self::new();
        for recipe in recipes {
            catalog.publish(recipe);
        }
        catalog
    }

    /// Installs a gate that holds `list_summaries` until released.
    pub fn gated(mut self) -> (Self, Arc<Gate>) {
        let gate = Arc::new(Gate::default());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    /// Adds a recipe, or replaces the one with the same remote id.
    pub fn publish(&self, recipe: Recipe) {
        let mut state = self.state.lock().unwrap();
        match state
            .recipes
            .iter_mut()
            .find(|r| r.remote_id == recipe.remote_id)
        {
            Some(slot) => *slot = recipe,
            None => state.recipes.push(recipe),
        }
    }

    pub fn remove(&self, remote_id: &str) {
        self.state
            .lock()
            .unwrap()
            .recipes
            .retain(|r| r.remote_id != remote_id);
    }

    pub fn set_date_updated(&self, remote_id: &str, date_updated: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(recipe) = state.recipes.iter_mut().find(|r| r.remote_id == remote_id) {
            recipe.date_updated = Some(date_updated.to_string());
        }
    }

    /// Adds a raw summary with no matching detail.
    pub fn push_summary(&self, summary: RecipeSummary) {
        self.state.lock().unwrap().extra_summaries.push(summary);
    }

    pub fn fail_detail(&self, slug: &str) {
        self.state.lock().unwrap().failing_slugs.insert(slug.to_string());
    }

    pub fn fail_list(&self) {
        self.state.lock().unwrap().fail_list = true;
    }

    pub fn set_favorites(&self, remote_ids: &[&str]) {
        self.state.lock().unwrap().favorites = remote_ids
            .iter()
            .map(|id| FavoriteRating {
                recipe_id: id.to_string(),
                is_favorite: true,
                rating: None,
            })
            .collect();
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteCatalog for FakeCatalog {
    async fn list_summaries(&self) -> Result<Vec<RecipeSummary>, ApiError> {
        let summaries = {
            let state = self.state.lock().unwrap();
            if state.fail_list {
                return Err(ApiError::Status {
                    status: 503,
                    message: "catalog unavailable".to_string(),
                });
            }
            let mut summaries: Vec<RecipeSummary> = state
                .recipes
                .iter()
                .map(|r| RecipeSummary {
                    id: Some(r.remote_id.clone()),
                    slug: Some(r.slug.clone()),
                    name: r.name.clone(),
                    date_updated: r.date_updated.clone(),
                })
                .collect();
            summaries.extend(state.extra_summaries.iter().cloned());
            summaries
        };

        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        Ok(summaries)
    }

    async fn fetch_detail(&self, slug: &str) -> Result<Recipe, ApiError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.failing_slugs.contains(slug) {
            return Err(ApiError::Status {
                status: 500,
                message: format!("boom fetching {}", slug),
            });
        }
        state
            .recipes
            .iter()
            .find(|r| r.slug == slug)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(slug.to_string()))
    }
}

#[async_trait]
impl FavoritesSource for FakeCatalog {
    async fn favorites(&self) -> Result<Vec<FavoriteRating>, ApiError> {
        Ok(self.state.lock().unwrap().favorites.clone())
    }
}

/// Wraps a store and rejects every `apply`, or only `record_sync`.
pub struct FailingStore<S> {
    inner: S,
    fail_apply: bool,
    fail_record: bool,
}

impl<S> FailingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_apply: true,
            fail_record: false,
        }
    }

    /// Applies changes normally but cannot store the sync time.
    pub fn without_sync_time(inner: S) -> Self {
        Self {
            inner,
            fail_apply: false,
            fail_record: true,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: RecipeStore> RecipeStore for FailingStore<S> {
    async fn load_all(&self) -> Result<Vec<Recipe>, StoreError> {
        self.inner.load_all().await
    }

    async fn get(&self, remote_id: &str) -> Result<Option<Recipe>, StoreError> {
        self.inner.get(remote_id).await
    }

    async fn apply(&self, changes: &ChangeSet) -> Result<(), StoreError> {
        if self.fail_apply {
            return Err(StoreError::Database("disk I/O error".to_string()));
        }
        self.inner.apply(changes).await
    }

    async fn last_synced_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.inner.last_synced_at().await
    }

    async fn record_sync(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        if self.fail_record {
            return Err(StoreError::Database("database is locked".to_string()));
        }
        self.inner.record_sync(at).await
    }
}
