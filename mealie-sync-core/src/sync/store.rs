//! The local side of a sync: a keyed collection of recipe aggregates.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::StoreError;
use super::reconcile::ChangeSet;
use crate::models::Recipe;

/// Local recipe store keyed by `remote_id`.
///
/// Implementations must apply a [`ChangeSet`] as a single transaction and
/// cascade deletes to a recipe's ingredients and instructions.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Every stored recipe with its children in order.
    async fn load_all(&self) -> Result<Vec<Recipe>, StoreError>;

    async fn get(&self, remote_id: &str) -> Result<Option<Recipe>, StoreError>;

    /// Applies inserts, updates and deletes atomically. On error nothing is written.
    async fn apply(&self, changes: &ChangeSet) -> Result<(), StoreError>;

    async fn last_synced_at(&self) -> Result<Option<DateTime<Utc>>, StoreError>;

    async fn record_sync(&self, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Recipe>, StoreError> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .find(|r| r.slug.eq_ignore_ascii_case(slug)))
    }

    /// Inserts or fully replaces one recipe.
    async fn save(&self, recipe: &Recipe) -> Result<(), StoreError> {
        let mut changes = ChangeSet::default();
        if self.get(&recipe.remote_id).await?.is_some() {
            changes.updates.push(recipe.clone());
        } else {
            changes.inserts.push(recipe.clone());
        }
        self.apply(&changes).await
    }

    /// Deletes one recipe and its children. Returns false if it did not exist.
    async fn delete(&self, remote_id: &str) -> Result<bool, StoreError> {
        if self.get(remote_id).await?.is_none() {
            return Ok(false);
        }
        let changes = ChangeSet {
            deletes: vec![remote_id.to_string()],
            ..ChangeSet::default()
        };
        self.apply(&changes).await?;
        Ok(true)
    }

    /// Sets the local favorite flag. Returns false if the recipe does not exist.
    async fn set_favorite(&self, remote_id: &str, is_favorite: bool) -> Result<bool, StoreError> {
        match self.get(remote_id).await? {
            Some(mut recipe) => {
                recipe.is_favorite = is_favorite;
                let changes = ChangeSet {
                    updates: vec![recipe],
                    ..ChangeSet::default()
                };
                self.apply(&changes).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl<T: RecipeStore + ?Sized> RecipeStore for Arc<T> {
    async fn load_all(&self) -> Result<Vec<Recipe>, StoreError> {
        (**self).load_all().await
    }

    async fn get(&self, remote_id: &str) -> Result<Option<Recipe>, StoreError> {
        (**self).get(remote_id).await
    }

    async fn apply(&self, changes: &ChangeSet) -> Result<(), StoreError> {
        (**self).apply(changes).await
    }

    async fn last_synced_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        (**self).last_synced_at().await
    }

    async fn record_sync(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        (**self).record_sync(at).await
    }
}
