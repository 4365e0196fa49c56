//! Turns a merged target list into the inserts, updates and deletes that bring
//! the local store in line with it.

use std::collections::{HashMap, HashSet};

use super::error::SyncError;
use super::store::RecipeStore;
use crate::models::Recipe;

/// Changes to apply to a store in one transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub inserts: Vec<Recipe>,
    pub updates: Vec<Recipe>,
    /// Remote ids to delete, children included.
    pub deletes: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inserts.len() + self.updates.len() + self.deletes.len()
    }
}

/// Computes the changes that make `current` match `target`, keyed by `remote_id`.
///
/// Updates that would leave a record unchanged are left out. If `target`
/// repeats a remote id the first occurrence wins.
pub fn plan(target: &[Recipe], current: &[Recipe]) -> ChangeSet {
    let current_by_id: HashMap<&str, &Recipe> = current
        .iter()
        .map(|r| (r.remote_id.as_str(), r))
        .collect();

    let mut seen = HashSet::with_capacity(target.len());
    let mut changes = ChangeSet::default();

    for remote in target {
        if !seen.insert(remote.remote_id.as_str()) {
            tracing::debug!("Ignoring repeated remote id {}", remote.remote_id);
            continue;
        }

        match current_by_id.get(remote.remote_id.as_str()) {
            None => {
                let mut inserted = remote.clone();
                inserted.renumber_ingredients();
                inserted.renumber_instructions();
                changes.inserts.push(inserted);
            }
            Some(existing) => {
                let merged = merge_onto(existing, remote);
                if merged != **existing {
                    changes.updates.push(merged);
                }
            }
        }
    }

    changes.deletes = current
        .iter()
        .filter(|r| !seen.contains(r.remote_id.as_str()))
        .map(|r| r.remote_id.clone())
        .collect();

    changes
}

/// Copies the server-owned fields of `remote` onto `existing`.
///
/// The favorite flag stays local. Ingredients and instructions are replaced
/// wholesale and renumbered.
pub fn merge_onto(existing: &Recipe, remote: &Recipe) -> Recipe {
    let mut merged = existing.clone();

    merged.user_id = remote.user_id.clone();
    merged.group_id = remote.group_id.clone();
    merged.household_id = remote.household_id.clone();
    merged.name = remote.name.clone();
    merged.slug = remote.slug.clone();
    merged.image = remote.image.clone();
    merged.description = remote.description.clone();
    merged.servings = remote.servings;
    merged.yield_quantity = remote.yield_quantity;
    merged.recipe_yield = remote.recipe_yield.clone();
    merged.total_time = remote.total_time.clone();
    merged.prep_time = remote.prep_time.clone();
    merged.cook_time = remote.cook_time.clone();
    merged.perform_time = remote.perform_time.clone();
    merged.rating = remote.rating;
    merged.org_url = remote.org_url.clone();
    merged.date_added = remote.date_added.clone();
    merged.date_updated = remote.date_updated.clone();
    merged.created_at = remote.created_at.clone();
    merged.last_made = remote.last_made.clone();
    merged.update_at = remote.update_at.clone();

    merged.ingredients = remote.ingredients.clone();
    merged.instructions = remote.instructions.clone();
    merged.renumber_ingredients();
    merged.renumber_instructions();

    merged
}

/// Writes `changes` in a single store transaction.
pub async fn apply<S: RecipeStore + ?Sized>(store: &S, changes: &ChangeSet) -> Result<(), SyncError> {
    if changes.is_empty() {
        return Ok(());
    }
    store.apply(changes).await.map_err(SyncError::CommitFailed)
}

/// Plans and applies in one step, returning what was written.
pub async fn reconcile<S: RecipeStore + ?Sized>(
    store: &S,
    target: &[Recipe],
    current: &[Recipe],
) -> Result<ChangeSet, SyncError> {
    let changes = plan(target, current);
    apply(store, &changes).await?;
    Ok(changes)
}
