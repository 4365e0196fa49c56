use serde::{Deserialize, Serialize};

/// Catalog entry as listed by the server; only enough to decide whether the
/// full recipe needs fetching.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RecipeSummary {
    pub id: Option<String>,
    pub slug: Option<String>,
    pub name: Option<String>,
    pub date_updated: Option<String>,
}

impl RecipeSummary {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: Some(slug.into()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_date_updated(mut self, date_updated: impl Into<String>) -> Self {
        self.date_updated = Some(date_updated.into());
        self
    }

    /// The slug, if present and non-blank.
    pub fn usable_slug(&self) -> Option<&str> {
        self.slug.as_deref().filter(|s| !s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usable_slug() {
        assert_eq!(RecipeSummary::new("soup").usable_slug(), Some("soup"));
        assert_eq!(RecipeSummary::new("  ").usable_slug(), None);
        assert_eq!(RecipeSummary::default().usable_slug(), None);
    }
}
