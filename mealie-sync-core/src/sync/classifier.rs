//! Decides whether a catalog entry needs its full recipe fetched.
//!
//! Pure: no I/O. A pass costs one detail request per new or changed recipe
//! rather than one per recipe in the catalog.

use std::collections::HashMap;

use crate::date::{effectively_equal, parse_api_date};
use crate::models::{Recipe, RecipeSummary};

/// Why a summary does or does not need a detail fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Not present locally.
    New,
    /// Present locally but with no ingredients and no instructions.
    Unhydrated,
    /// Remote timestamp differs from the local one.
    Stale,
    /// Local copy can be reused as is.
    Current,
}

impl Classification {
    pub fn needs_fetch(self) -> bool {
        !matches!(self, Classification::Current)
    }
}

/// Classifies `summary` against the matching local recipe, if any.
pub fn classify(summary: &RecipeSummary, existing: Option<&Recipe>) -> Classification {
    let Some(existing) = existing else {
        return Classification::New;
    };

    if !existing.is_hydrated() {
        return Classification::Unhydrated;
    }

    let remote = parse_api_date(summary.date_updated.as_deref());
    let local = parse_api_date(existing.date_updated.as_deref());
    match (remote, local) {
        (Some(remote), Some(local)) if effectively_equal(remote, local) => Classification::Current,
        (Some(_), Some(_)) => Classification::Stale,
        // Staleness cannot be shown either way.
        (None, None) => Classification::Current,
        _ => Classification::Stale,
    }
}

pub fn needs_detail_fetch(summary: &RecipeSummary, existing: Option<&Recipe>) -> bool {
    classify(summary, existing).needs_fetch()
}

/// Lookup of local recipes by remote id, or by slug for summaries without an id.
pub struct LocalIndex<'a> {
    by_id: HashMap<&'a str, &'a Recipe>,
    by_slug: HashMap<&'a str, &'a Recipe>,
}

impl<'a> LocalIndex<'a> {
    pub fn new(recipes: &'a [Recipe]) -> Self {
        let mut by_id = HashMap::with_capacity(recipes.len());
        let mut by_slug = HashMap::with_capacity(recipes.len());
        for recipe in recipes {
            by_id.entry(recipe.remote_id.as_str()).or_insert(recipe);
            if !recipe.slug.is_empty() {
                by_slug.entry(recipe.slug.as_str()).or_insert(recipe);
            }
        }
        Self { by_id, by_slug }
    }

    /// A summary that carries an id only matches that id. A local recipe
    /// sharing its slug under another id is a different recipe that was
    /// deleted and recreated on the server.
    pub fn find(&self, summary: &RecipeSummary) -> Option<&'a Recipe> {
        match summary.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => self.by_id.get(id).copied(),
            None => summary
                .usable_slug()
                .and_then(|slug| self.by_slug.get(slug).copied()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ingredient, Instruction};

    fn hydrated(date_updated: Option<&str>) -> Recipe {
        let mut recipe = Recipe::new("r1", "soup")
            .with_ingredients(vec![Ingredient::new("water", 1.0, "l")])
            .with_instructions(vec![Instruction::new(1, "Boil")]);
        recipe.date_updated = date_updated.map(String::from);
        recipe
    }

    fn summary(date_updated: Option<&str>) -> RecipeSummary {
        RecipeSummary {
            id: Some("r1".into()),
            slug: Some("soup".into()),
            name: Some("Soup".into()),
            date_updated: date_updated.map(String::from),
        }
    }

    #[test]
    fn test_missing_local_is_new() {
        assert_eq!(classify(&summary(None), None), Classification::New);
        assert!(needs_detail_fetch(&summary(None), None));
    }

    #[test]
    fn test_unhydrated_local_needs_fetch() {
        let mut local = Recipe::new("r1", "soup");
        local.date_updated = Some("2024-01-01T00:00:00Z".into());
        let s = summary(Some("2024-01-01T00:00:00Z"));
        assert_eq!(classify(&s, Some(&local)), Classification::Unhydrated);
    }

    #[test]
    fn test_half_second_skew_is_current() {
        let local = hydrated(Some("2024-01-01T12:00:00.000Z"));
        let s = summary(Some("2024-01-01T12:00:00.500Z"));
        assert_eq!(classify(&s, Some(&local)), Classification::Current);
        assert!(!needs_detail_fetch(&s, Some(&local)));
    }

    #[test]
    fn test_one_and_a_half_second_skew_is_stale() {
        let local = hydrated(Some("2024-01-01T12:00:00.000Z"));
        let s = summary(Some("2024-01-01T12:00:01.500Z"));
        assert_eq!(classify(&s, Some(&local)), Classification::Stale);
    }

    #[test]
    fn test_mixed_formats_compare_as_instants() {
        let local = hydrated(Some("2024-01-01T12:00:00Z"));
        let s = summary(Some("2024-01-01T12:00:00.000000"));
        assert_eq!(classify(&s, Some(&local)), Classification::Current);
    }

    #[test]
    fn test_both_absent_is_current() {
        let local = hydrated(None);
        assert_eq!(classify(&summary(None), Some(&local)), Classification::Current);

        let local = hydrated(Some("garbage"));
        let s = summary(Some("also garbage"));
        assert_eq!(classify(&s, Some(&local)), Classification::Current);
    }

    #[test]
    fn test_exactly_one_present_is_stale() {
        let local = hydrated(None);
        let s = summary(Some("2024-01-01"));
        assert_eq!(classify(&s, Some(&local)), Classification::Stale);

        let local = hydrated(Some("2024-01-01"));
        assert_eq!(classify(&summary(None), Some(&local)), Classification::Stale);
    }

    #[test]
    fn test_local_index_prefers_id_then_slug() {
        let recipes = vec![Recipe::new("id-a", "alpha"), Recipe::new("id-b", "beta")];
        let index = LocalIndex::new(&recipes);

        let by_id = RecipeSummary::new("renamed").with_id("id-b");
        assert_eq!(index.find(&by_id).unwrap().remote_id, "id-b");

        let by_slug = RecipeSummary::new("alpha");
        assert_eq!(index.find(&by_slug).unwrap().remote_id, "id-a");

        let unknown = RecipeSummary::new("gamma").with_id("id-c");
        assert!(index.find(&unknown).is_none());
    }

    #[test]
    fn test_local_index_ignores_slug_match_under_other_id() {
        let recipes = vec![Recipe::new("old-id", "apple-pie")];
        let index = LocalIndex::new(&recipes);

        let recreated = RecipeSummary::new("apple-pie").with_id("new-id");
        assert!(index.find(&recreated).is_none());
        assert_eq!(classify(&recreated, index.find(&recreated)), Classification::New);
    }
}
