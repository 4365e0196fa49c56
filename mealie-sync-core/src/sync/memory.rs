//! In-memory [`RecipeStore`], used by tests and by callers that do not need
//! persistence.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::error::StoreError;
use super::reconcile::ChangeSet;
use super::store::RecipeStore;
use crate::models::Recipe;

#[derive(Debug, Default)]
struct Inner {
    recipes: BTreeMap<String, Recipe>,
    last_sync: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct MemoryRecipeStore {
    inner: RwLock<Inner>,
}

impl MemoryRecipeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recipes(recipes: Vec<Recipe>) -> Self {
        let recipes = recipes
            .into_iter()
            .map(|r| (r.remote_id.clone(), r))
            .collect();
        Self {
            inner: RwLock::new(Inner {
                recipes,
                last_sync: None,
            }),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.recipes.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RecipeStore for MemoryRecipeStore {
    async fn load_all(&self) -> Result<Vec<Recipe>, StoreError> {
        Ok(self.inner.read().await.recipes.values().cloned().collect())
    }

    async fn get(&self, remote_id: &str) -> Result<Option<Recipe>, StoreError> {
        Ok(self.inner.read().await.recipes.get(remote_id).cloned())
    }

    async fn apply(&self, changes: &ChangeSet) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;

        // Work on a copy so a rejected change leaves the store as it was.
        let mut next = inner.recipes.clone();
        for remote_id in &changes.deletes {
            if next.remove(remote_id).is_none() {
                return Err(StoreError::NotFound(remote_id.clone()));
            }
        }
        for recipe in &changes.updates {
            match next.get_mut(&recipe.remote_id) {
                Some(slot) => *slot = recipe.clone(),
                None => return Err(StoreError::NotFound(recipe.remote_id.clone())),
            }
        }
        for recipe in &changes.inserts {
            if next.contains_key(&recipe.remote_id) {
                return Err(StoreError::InvalidData(format!(
                    "recipe {} already exists",
                    recipe.remote_id
                )));
            }
            next.insert(recipe.remote_id.clone(), recipe.clone());
        }

        inner.recipes = next;
        Ok(())
    }

    async fn last_synced_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.inner.read().await.last_sync)
    }

    async fn record_sync(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.inner.write().await.last_sync = Some(at);
        Ok(())
    }
}
