//! Local editing of a recipe before it is pushed back to the server.

use chrono::{DateTime, TimeZone};
use thiserror::Error;

use crate::api::types::{NamedInput, RecipeIngredientInput, RecipeStep};
use crate::api::RecipeUpdate;
use crate::date::format_date_for_api;
use crate::models::{Ingredient, Instruction, Recipe, User};

const UNTITLED: &str = "Untitled Recipe";
const FALLBACK_UNIT: &str = "item";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("User ID is required")]
    MissingUserId,
    #[error("Group ID is required")]
    MissingGroupId,
    #[error("Household ID is required")]
    MissingHouseholdId,
}

/// The result of [`RecipeDraft::finish`]: the request body for the server and
/// the recipe as it should be stored locally once the server accepts it.
#[derive(Debug, Clone)]
pub struct FinishedEdit {
    pub update: RecipeUpdate,
    pub recipe: Recipe,
}

/// An editable copy of a recipe.
#[derive(Debug, Clone)]
pub struct RecipeDraft {
    base: Recipe,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub org_url: String,
    pub servings: i32,
    pub recipe_yield: String,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub perform_time: Option<String>,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<Instruction>,
}

impl RecipeDraft {
    pub fn from_recipe(recipe: &Recipe) -> Self {
        Self {
            base: recipe.clone(),
            name: recipe.name.clone().unwrap_or_default(),
            slug: recipe.slug.clone(),
            description: recipe.description.clone(),
            org_url: recipe.org_url.clone().unwrap_or_default(),
            servings: recipe.servings,
            recipe_yield: recipe.recipe_yield.clone().unwrap_or_default(),
            prep_time: recipe.prep_time.clone(),
            cook_time: recipe.cook_time.clone(),
            perform_time: recipe.perform_time.clone(),
            ingredients: recipe.ingredients.clone(),
            instructions: recipe.instructions.clone(),
        }
    }

    pub fn base(&self) -> &Recipe {
        &self.base
    }

    pub fn add_ingredient(&mut self, mut ingredient: Ingredient) {
        ingredient.order_index = self.ingredients.len() as u32;
        self.ingredients.push(ingredient);
    }

    pub fn remove_ingredient(&mut self, index: usize) -> Option<Ingredient> {
        if index >= self.ingredients.len() {
            return None;
        }
        let removed = self.ingredients.remove(index);
        self.renumber_ingredients();
        Some(removed)
    }

    pub fn move_ingredient(&mut self, from: usize, to: usize) -> bool {
        let moved = move_item(&mut self.ingredients, from, to);
        if moved {
            self.renumber_ingredients();
        }
        moved
    }

    pub fn add_instruction(&mut self, text: impl Into<String>) {
        let step = self.instructions.len() as u32 + 1;
        self.instructions.push(Instruction::new(step, text));
    }

    pub fn remove_instruction(&mut self, index: usize) -> Option<Instruction> {
        if index >= self.instructions.len() {
            return None;
        }
        let removed = self.instructions.remove(index);
        self.renumber_instructions();
        Some(removed)
    }

    pub fn move_instruction(&mut self, from: usize, to: usize) -> bool {
        let moved = move_item(&mut self.instructions, from, to);
        if moved {
            self.renumber_instructions();
        }
        moved
    }

    /// Appends an empty step titled "Section N", N counting existing titled steps.
    pub fn add_instruction_section(&mut self) -> String {
        let titled = self
            .instructions
            .iter()
            .filter(|i| i.title.as_deref().is_some_and(|t| !t.is_empty()))
            .count();
        let title = format!("Section {}", titled + 1);
        let step = self.instructions.len() as u32 + 1;
        self.instructions
            .push(Instruction::new(step, "").with_title(title.clone()));
        title
    }

    pub fn update_slug_from_name(&mut self) {
        self.slug = slug_from_name(&self.name);
    }

    /// Validates the draft and builds the server update plus the new local recipe.
    ///
    /// Blank ingredients and steps are dropped, text fields are flattened to
    /// one line, and indices are renumbered. Owner ids missing on the recipe
    /// are taken from `user`. `now` sets the update timestamps.
    pub fn finish<Tz: TimeZone>(&self, user: &User, now: &DateTime<Tz>) -> Result<FinishedEdit, EditError> {
        let name = match self.name.trim() {
            "" => UNTITLED.to_string(),
            trimmed => trimmed.to_string(),
        };
        let slug = match self.slug.trim() {
            "" => match slug_from_name(self.name.trim()) {
                generated if generated.is_empty() => uuid::Uuid::new_v4().to_string(),
                generated => generated,
            },
            trimmed => trimmed.to_string(),
        };
        let description = single_line(&self.description);
        let recipe_yield = single_line(&self.recipe_yield);
        let org_url = Some(self.org_url.trim().to_string()).filter(|u| !u.is_empty());

        let user_id = first_non_empty(&self.base.user_id, &user.id).ok_or(EditError::MissingUserId)?;
        let group_id =
            first_non_empty(&self.base.group_id, &user.group_id).ok_or(EditError::MissingGroupId)?;
        let household_id = first_non_empty(&self.base.household_id, &user.household_id)
            .ok_or(EditError::MissingHouseholdId)?;

        let ingredients: Vec<Ingredient> = self
            .ingredients
            .iter()
            .filter(|i| !i.name.trim().is_empty())
            .enumerate()
            .map(|(index, ingredient)| {
                let mut cleaned = ingredient.clone();
                cleaned.name = single_line(&ingredient.name);
                cleaned.order_index = index as u32;
                cleaned
            })
            .collect();
        let instructions: Vec<Instruction> = self
            .instructions
            .iter()
            .filter(|i| !i.text.trim().is_empty())
            .enumerate()
            .map(|(index, instruction)| {
                let mut cleaned = instruction.clone();
                cleaned.step = index as u32 + 1;
                cleaned
            })
            .collect();

        let today = format_date_for_api(now);
        let date_added = non_empty_or(self.base.date_added.as_deref(), &today);
        let created_at = non_empty_or(self.base.created_at.as_deref(), &today);

        let update = RecipeUpdate {
            id: self.base.remote_id.clone(),
            user_id: user_id.clone(),
            household_id: household_id.clone(),
            group_id: group_id.clone(),
            name: name.clone(),
            slug: slug.clone(),
            image: self
                .base
                .image
                .as_deref()
                .map(str::trim)
                .filter(|i| !i.is_empty())
                .map(String::from),
            description: description.clone(),
            recipe_servings: f64::from(self.servings.max(0)),
            recipe_yield_quantity: f64::from(self.base.yield_quantity),
            recipe_yield: recipe_yield.clone(),
            total_time: self.base.total_time.clone(),
            prep_time: self.prep_time.clone(),
            cook_time: self.cook_time.clone(),
            perform_time: self.perform_time.clone(),
            rating: self.base.rating.map(f64::from),
            org_url: org_url.clone(),
            date_added: date_added.clone(),
            date_updated: today.clone(),
            created_at: created_at.clone(),
            update_at: today.clone(),
            last_made: self.base.last_made.clone(),
            recipe_ingredient: ingredients.iter().map(ingredient_input).collect(),
            recipe_instructions: instructions
                .iter()
                .map(|i| RecipeStep {
                    id: None,
                    title: i.title.clone(),
                    summary: None,
                    text: i.text.clone(),
                    ingredient_references: Vec::new(),
                })
                .collect(),
        };

        let mut recipe = self.base.clone();
        recipe.user_id = user_id;
        recipe.group_id = group_id;
        recipe.household_id = household_id;
        recipe.name = Some(name);
        recipe.slug = slug;
        recipe.description = description;
        recipe.org_url = org_url;
        recipe.servings = self.servings.max(0);
        recipe.recipe_yield = Some(recipe_yield).filter(|y| !y.is_empty());
        recipe.prep_time = self.prep_time.clone();
        recipe.cook_time = self.cook_time.clone();
        recipe.perform_time = self.perform_time.clone();
        recipe.date_added = Some(date_added);
        recipe.created_at = Some(created_at);
        recipe.date_updated = Some(today.clone());
        recipe.update_at = Some(today);
        recipe.ingredients = ingredients;
        recipe.instructions = instructions;

        Ok(FinishedEdit { update, recipe })
    }

    fn renumber_ingredients(&mut self) {
        for (index, ingredient) in self.ingredients.iter_mut().enumerate() {
            ingredient.order_index = index as u32;
        }
    }

    fn renumber_instructions(&mut self) {
        for (index, instruction) in self.instructions.iter_mut().enumerate() {
            instruction.step = index as u32 + 1;
        }
    }
}

/// Lowercased, trimmed name with spaces turned into dashes.
pub fn slug_from_name(name: &str) -> String {
    name.trim().replace(' ', "-").to_lowercase()
}

fn ingredient_input(ingredient: &Ingredient) -> RecipeIngredientInput {
    let unit = match ingredient.unit.name.trim().to_lowercase() {
        u if u.is_empty() || u == "to" => FALLBACK_UNIT.to_string(),
        u => u,
    };
    RecipeIngredientInput {
        quantity: ingredient.quantity,
        unit: Some(NamedInput { name: unit }),
        food: Some(NamedInput {
            name: ingredient.name.clone(),
        }),
        note: ingredient.note.clone(),
        disable_amount: true,
        display: ingredient.original_text.clone(),
        title: ingredient.title.clone(),
        original_text: ingredient.original_text.clone(),
    }
}

fn single_line(value: &str) -> String {
    value.trim().replace(['\n', '\r'], " ")
}

fn first_non_empty(preferred: &str, fallback: &str) -> Option<String> {
    [preferred, fallback]
        .into_iter()
        .find(|v| !v.is_empty())
        .map(String::from)
}

fn non_empty_or(value: Option<&str>, fallback: &str) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or(fallback).to_string()
}

fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from >= items.len() || to >= items.len() {
        return false;
    }
    let item = items.remove(from);
    items.insert(to, item);
    true
}
