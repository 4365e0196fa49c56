use serde::{Deserialize, Serialize};

/// The signed-in server user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct User {
    pub id: String,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub email: String,
    pub admin: bool,
    pub group: String,
    pub group_id: String,
    pub group_slug: String,
    pub household: String,
    pub household_id: String,
    pub household_slug: String,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or(&self.email)
    }
}

/// A user's rating entry for one recipe, as returned by the favorites endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FavoriteRating {
    pub recipe_id: String,
    pub is_favorite: bool,
    pub rating: Option<f64>,
}
