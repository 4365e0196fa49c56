//! Typed request and response bodies for the Mealie API, plus the mapping
//! from wire records into the local models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    FavoriteRating, Ingredient, IngredientUnit, Instruction, Recipe, RecipeSummary, User,
};

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginForm<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub remember_me: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Paginated<T> {
    pub page: u32,
    pub per_page: u32,
    #[serde(default)]
    pub total: u32,
    pub total_pages: u32,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSummaryOutput {
    pub id: Option<String>,
    pub slug: Option<String>,
    pub name: Option<String>,
    pub date_updated: Option<String>,
}

impl From<RecipeSummaryOutput> for RecipeSummary {
    fn from(out: RecipeSummaryOutput) -> Self {
        Self {
            id: out.id,
            slug: out.slug,
            name: out.name,
            date_updated: out.date_updated,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitOutput {
    pub name: String,
    pub plural_name: Option<String>,
    pub abbreviation: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodOutput {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeIngredientOutput {
    pub quantity: Option<f64>,
    pub unit: Option<UnitOutput>,
    pub food: Option<FoodOutput>,
    pub note: Option<String>,
    pub display: Option<String>,
    pub title: Option<String>,
    pub original_text: Option<String>,
}

impl RecipeIngredientOutput {
    fn into_ingredient(self, order_index: u32) -> Ingredient {
        let original_text = self
            .original_text
            .clone()
            .or_else(|| self.display.clone())
            .unwrap_or_default();
        let name = self
            .food
            .map(|f| f.name)
            .filter(|n| !n.trim().is_empty())
            .or(self.display)
            .unwrap_or_else(|| original_text.clone());
        let unit = self
            .unit
            .map(|u| IngredientUnit {
                name: u.name,
                plural_name: u.plural_name,
                abbreviation: u.abbreviation,
            })
            .unwrap_or_default();

        Ingredient {
            order_index,
            name,
            quantity: self.quantity.unwrap_or(0.0).max(0.0),
            unit,
            original_text,
            note: self.note.unwrap_or_default(),
            title: self.title.filter(|t| !t.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecipeStep {
    pub id: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub ingredient_references: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeOutput {
    pub id: Option<String>,
    pub user_id: Option<String>,
    pub group_id: Option<String>,
    pub household_id: Option<String>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub image: Option<serde_json::Value>,
    pub description: Option<String>,
    pub recipe_servings: Option<f64>,
    pub recipe_yield_quantity: Option<f64>,
    pub recipe_yield: Option<String>,
    pub total_time: Option<String>,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub perform_time: Option<String>,
    pub rating: Option<f64>,
    #[serde(rename = "orgURL")]
    pub org_url: Option<String>,
    pub date_added: Option<String>,
    pub date_updated: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub last_made: Option<String>,
    #[serde(default)]
    pub recipe_ingredient: Vec<RecipeIngredientOutput>,
    #[serde(default)]
    pub recipe_instructions: Vec<RecipeStep>,
}

impl From<RecipeOutput> for Recipe {
    fn from(out: RecipeOutput) -> Self {
        let image = out.image.and_then(|value| match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.is_empty() => None,
            serde_json::Value::String(s) => Some(s),
            other => Some(other.to_string()),
        });

        let ingredients = out
            .recipe_ingredient
            .into_iter()
            .enumerate()
            .map(|(index, ingredient)| ingredient.into_ingredient(index as u32))
            .collect();
        let instructions = out
            .recipe_instructions
            .into_iter()
            .enumerate()
            .map(|(index, step)| Instruction {
                id: step.id,
                step: index as u32 + 1,
                text: step.text,
                title: step.title.filter(|t| !t.is_empty()),
            })
            .collect();

        Recipe {
            remote_id: out.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            user_id: out.user_id.unwrap_or_default(),
            group_id: out.group_id.unwrap_or_default(),
            household_id: out.household_id.unwrap_or_default(),
            name: out.name,
            slug: out.slug.unwrap_or_default(),
            image,
            description: out.description.unwrap_or_default(),
            servings: out.recipe_servings.unwrap_or(0.0) as i32,
            yield_quantity: out.recipe_yield_quantity.unwrap_or(0.0) as i32,
            recipe_yield: out.recipe_yield,
            total_time: out.total_time,
            prep_time: out.prep_time,
            cook_time: out.cook_time,
            perform_time: out.perform_time,
            rating: out.rating.map(|r| r as i32),
            org_url: out.org_url,
            date_added: out.date_added,
            date_updated: out.date_updated,
            created_at: out.created_at,
            last_made: out.last_made,
            update_at: out.updated_at,
            is_favorite: false,
            ingredients,
            instructions,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRecipe<'a> {
    pub name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRecipe<'a> {
    pub url: &'a str,
    pub include_tags: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NamedInput {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecipeIngredientInput {
    pub quantity: f64,
    pub unit: Option<NamedInput>,
    pub food: Option<NamedInput>,
    pub note: String,
    pub disable_amount: bool,
    pub display: String,
    pub title: Option<String>,
    pub original_text: String,
}

/// Body of `PUT /api/recipes/{slug}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecipeUpdate {
    pub id: String,
    pub user_id: String,
    pub household_id: String,
    pub group_id: String,
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub description: String,
    pub recipe_servings: f64,
    pub recipe_yield_quantity: f64,
    pub recipe_yield: String,
    pub total_time: Option<String>,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub perform_time: Option<String>,
    pub rating: Option<f64>,
    #[serde(rename = "orgURL")]
    pub org_url: Option<String>,
    pub date_added: String,
    pub date_updated: String,
    pub created_at: String,
    #[serde(rename = "update_at")]
    pub update_at: String,
    pub last_made: Option<String>,
    pub recipe_ingredient: Vec<RecipeIngredientInput>,
    pub recipe_instructions: Vec<RecipeStep>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOut {
    pub id: String,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub group_slug: String,
    #[serde(default)]
    pub household: String,
    #[serde(default)]
    pub household_id: String,
    #[serde(default)]
    pub household_slug: String,
}

impl From<UserOut> for User {
    fn from(out: UserOut) -> Self {
        Self {
            id: out.id,
            username: out.username,
            full_name: out.full_name,
            email: out.email,
            admin: out.admin,
            group: out.group,
            group_id: out.group_id,
            group_slug: out.group_slug,
            household: out.household,
            household_id: out.household_id,
            household_slug: out.household_slug,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingOut {
    pub recipe_id: String,
    pub rating: Option<f64>,
    pub is_favorite: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatingsResponse {
    #[serde(default)]
    pub ratings: Vec<RatingOut>,
}

impl From<RatingOut> for FavoriteRating {
    fn from(out: RatingOut) -> Self {
        Self {
            recipe_id: out.recipe_id,
            is_favorite: out.is_favorite.unwrap_or(false),
            rating: out.rating,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipe_output_maps_children_with_dense_indices() {
        let json = r#"{
            "id": "abc-123",
            "name": "Tomato Soup",
            "slug": "tomato-soup",
            "image": "Xy12",
            "recipeServings": 4.0,
            "orgURL": "https://example.com/soup",
            "dateUpdated": "2024-03-01T10:00:00.123456",
            "recipeIngredient": [
                {"quantity": 2.0, "unit": {"name": "cup", "pluralName": "cups"},
                 "food": {"name": "tomato"}, "note": "chopped", "display": "2 cups tomato",
                 "originalText": "2 cups chopped tomatoes"},
                {"quantity": null, "food": null, "display": "salt to taste", "title": "Seasoning"}
            ],
            "recipeInstructions": [
                {"id": "s1", "text": "Simmer"},
                {"id": "s2", "title": "", "text": "Blend"}
            ]
        }"#;
        let out: RecipeOutput = serde_json::from_str(json).unwrap();
        let recipe = Recipe::from(out);

        assert_eq!(recipe.remote_id, "abc-123");
        assert_eq!(recipe.slug, "tomato-soup");
        assert_eq!(recipe.servings, 4);
        assert_eq!(recipe.image.as_deref(), Some("Xy12"));
        assert_eq!(recipe.org_url.as_deref(), Some("https://example.com/soup"));
        assert!(!recipe.is_favorite);

        assert_eq!(recipe.ingredients.len(), 2);
        assert_eq!(recipe.ingredients[0].order_index, 0);
        assert_eq!(recipe.ingredients[0].name, "tomato");
        assert_eq!(recipe.ingredients[0].unit.plural_name.as_deref(), Some("cups"));
        assert_eq!(recipe.ingredients[0].original_text, "2 cups chopped tomatoes");
        assert_eq!(recipe.ingredients[1].order_index, 1);
        assert_eq!(recipe.ingredients[1].name, "salt to taste");
        assert_eq!(recipe.ingredients[1].quantity, 0.0);
        assert_eq!(recipe.ingredients[1].title.as_deref(), Some("Seasoning"));

        let steps: Vec<u32> = recipe.instructions.iter().map(|i| i.step).collect();
        assert_eq!(steps, vec![1, 2]);
        assert_eq!(recipe.instructions[1].title, None);
    }

    #[test]
    fn test_recipe_output_without_id_gets_generated_id() {
        let out: RecipeOutput = serde_json::from_str(r#"{"slug": "x"}"#).unwrap();
        let recipe = Recipe::from(out);
        assert!(Uuid::parse_str(&recipe.remote_id).is_ok());
        assert!(recipe.ingredients.is_empty());
    }

    #[test]
    fn test_paginated_summaries() {
        let json = r#"{"page": 1, "per_page": 50, "total": 2, "total_pages": 1,
            "items": [{"id": "1", "slug": "a", "name": "A", "dateUpdated": "2024-01-01"},
                      {"id": "2", "slug": null, "name": "B"}]}"#;
        let page: Paginated<RecipeSummaryOutput> = serde_json::from_str(json).unwrap();
        let summaries: Vec<RecipeSummary> = page.items.into_iter().map(Into::into).collect();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].date_updated.as_deref(), Some("2024-01-01"));
        assert_eq!(summaries[1].slug, None);
    }

    #[test]
    fn test_ratings_response() {
        let json = r#"{"ratings": [
            {"recipeId": "r1", "rating": 4.0, "isFavorite": true},
            {"recipeId": "r2", "rating": null, "isFavorite": null}
        ]}"#;
        let response: RatingsResponse = serde_json::from_str(json).unwrap();
        let ratings: Vec<FavoriteRating> = response.ratings.into_iter().map(Into::into).collect();
        assert!(ratings[0].is_favorite);
        assert!(!ratings[1].is_favorite);
    }

    #[test]
    fn test_recipe_update_serializes_wire_names() {
        let update = RecipeUpdate {
            id: "r1".into(),
            user_id: "u".into(),
            household_id: "h".into(),
            group_id: "g".into(),
            name: "Soup".into(),
            slug: "soup".into(),
            image: None,
            description: String::new(),
            recipe_servings: 2.0,
            recipe_yield_quantity: 0.0,
            recipe_yield: String::new(),
            total_time: None,
            prep_time: None,
            cook_time: None,
            perform_time: None,
            rating: None,
            org_url: Some("https://example.com".into()),
            date_added: "2024-01-01T00:00:00.000Z".into(),
            date_updated: "2024-01-02T00:00:00.000Z".into(),
            created_at: "2024-01-01T00:00:00.000Z".into(),
            update_at: "2024-01-02T00:00:00.000Z".into(),
            last_made: None,
            recipe_ingredient: vec![],
            recipe_instructions: vec![],
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["orgURL"], "https://example.com");
        assert_eq!(value["update_at"], "2024-01-02T00:00:00.000Z");
        assert_eq!(value["recipeServings"], 2.0);
        assert!(value.get("image").is_none());
    }
}
