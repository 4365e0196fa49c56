//! Bringing local favorite flags in line with the server's favorites list.

use std::collections::HashSet;

use crate::models::{FavoriteRating, Recipe};

/// Returns the recipes whose favorite flag differs from the server's list,
/// with the flag already corrected.
pub fn favorite_changes(ratings: &[FavoriteRating], recipes: &[Recipe]) -> Vec<Recipe> {
    let favorites: HashSet<&str> = ratings
        .iter()
        .filter(|r| r.is_favorite)
        .map(|r| r.recipe_id.as_str())
        .collect();

    recipes
        .iter()
        .filter_map(|recipe| {
            let is_favorite = favorites.contains(recipe.remote_id.as_str());
            (recipe.is_favorite != is_favorite).then(|| recipe.clone().with_favorite(is_favorite))
        })
        .collect()
}
