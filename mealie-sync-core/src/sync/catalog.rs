//! The remote side of a sync: where summaries and full recipes come from.

use std::sync::Arc;

use async_trait::async_trait;

use crate::api::ApiError;
use crate::models::{FavoriteRating, Recipe, RecipeSummary};

/// Remote recipe catalog.
///
/// `list_summaries` returns the whole catalog for one pass; implementations
/// walk server-side pagination themselves.
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    async fn list_summaries(&self) -> Result<Vec<RecipeSummary>, ApiError>;

    async fn fetch_detail(&self, slug: &str) -> Result<Recipe, ApiError>;
}

/// Source of the signed-in user's favorite ratings.
#[async_trait]
pub trait FavoritesSource: Send + Sync {
    async fn favorites(&self) -> Result<Vec<FavoriteRating>, ApiError>;
}

#[async_trait]
impl<T: RemoteCatalog + ?Sized> RemoteCatalog for Arc<T> {
    async fn list_summaries(&self) -> Result<Vec<RecipeSummary>, ApiError> {
        (**self).list_summaries().await
    }

    async fn fetch_detail(&self, slug: &str) -> Result<Recipe, ApiError> {
        (**self).fetch_detail(slug).await
    }
}

#[async_trait]
impl<T: FavoritesSource + ?Sized> FavoritesSource for Arc<T> {
    async fn favorites(&self) -> Result<Vec<FavoriteRating>, ApiError> {
        (**self).favorites().await
    }
}
