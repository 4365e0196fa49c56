use serde::{Deserialize, Serialize};
use std::fmt;

use super::ingredient::Ingredient;
use super::instruction::Instruction;

/// A recipe aggregate: the recipe row plus its owned ingredients and instructions.
///
/// `remote_id` is the server-side identifier and the merge key for sync.
/// `is_favorite` is local state; sync never overwrites it except through the
/// explicit favorites sync.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    pub remote_id: String,
    pub user_id: String,
    pub group_id: String,
    pub household_id: String,
    pub name: Option<String>,
    pub slug: String,
    pub image: Option<String>,
    pub description: String,
    pub servings: i32,
    pub yield_quantity: i32,
    pub recipe_yield: Option<String>,
    pub total_time: Option<String>,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub perform_time: Option<String>,
    pub rating: Option<i32>,
    pub org_url: Option<String>,
    pub date_added: Option<String>,
    pub date_updated: Option<String>,
    pub created_at: Option<String>,
    pub last_made: Option<String>,
    pub update_at: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

impl Recipe {
    pub fn new(remote_id: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            remote_id: remote_id.into(),
            user_id: String::new(),
            group_id: String::new(),
            household_id: String::new(),
            name: None,
            slug: slug.into(),
            image: None,
            description: String::new(),
            servings: 0,
            yield_quantity: 0,
            recipe_yield: None,
            total_time: None,
            prep_time: None,
            cook_time: None,
            perform_time: None,
            rating: None,
            org_url: None,
            date_added: None,
            date_updated: None,
            created_at: None,
            last_made: None,
            update_at: None,
            is_favorite: false,
            ingredients: Vec::new(),
            instructions: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_date_updated(mut self, date_updated: impl Into<String>) -> Self {
        self.date_updated = Some(date_updated.into());
        self
    }

    pub fn with_servings(mut self, servings: i32) -> Self {
        self.servings = servings;
        self
    }

    pub fn with_favorite(mut self, is_favorite: bool) -> Self {
        self.is_favorite = is_favorite;
        self
    }

    /// Sets the ingredient list, assigning dense order indices in list order.
    pub fn with_ingredients(mut self, ingredients: Vec<Ingredient>) -> Self {
        self.ingredients = ingredients;
        self.renumber_ingredients();
        self
    }

    /// Sets the instruction list, assigning dense step numbers in list order.
    pub fn with_instructions(mut self, instructions: Vec<Instruction>) -> Self {
        self.instructions = instructions;
        self.renumber_instructions();
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Untitled Recipe")
    }

    /// A recipe with neither ingredients nor instructions has only ever been
    /// recorded from a summary and still needs its detail fetched.
    pub fn is_hydrated(&self) -> bool {
        !(self.ingredients.is_empty() && self.instructions.is_empty())
    }

    pub fn toggle_favorite(&mut self) {
        self.is_favorite = !self.is_favorite;
    }

    pub fn renumber_ingredients(&mut self) {
        for (index, ingredient) in self.ingredients.iter_mut().enumerate() {
            ingredient.order_index = index as u32;
        }
    }

    pub fn renumber_instructions(&mut self) {
        for (index, instruction) in self.instructions.iter_mut().enumerate() {
            instruction.step = index as u32 + 1;
        }
    }

    pub fn push_ingredient(&mut self, ingredient: Ingredient) {
        self.ingredients.push(ingredient);
        self.renumber_ingredients();
    }

    /// Removes the ingredient at `index` and closes the gap in order indices.
    pub fn remove_ingredient(&mut self, index: usize) -> Option<Ingredient> {
        if index >= self.ingredients.len() {
            return None;
        }
        let removed = self.ingredients.remove(index);
        self.renumber_ingredients();
        Some(removed)
    }

    pub fn move_ingredient(&mut self, from: usize, to: usize) -> bool {
        if !move_item(&mut self.ingredients, from, to) {
            return false;
        }
        self.renumber_ingredients();
        true
    }

    pub fn push_instruction(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
        self.renumber_instructions();
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
        if !move_item(&mut self.instructions, from, to) {
            return false;
        }
        self.renumber_instructions();
        true
    }

    /// Ingredients grouped under their section headings, preserving order.
    ///
    /// A heading applies to its ingredient and every following ingredient
    /// until the next heading. Ingredients before the first heading are
    /// grouped under `None`.
    pub fn ingredient_sections(&self) -> Vec<(Option<&str>, Vec<&Ingredient>)> {
        let mut sections: Vec<(Option<&str>, Vec<&Ingredient>)> = Vec::new();
        for ingredient in &self.ingredients {
            let heading = ingredient.title.as_deref().filter(|t| !t.is_empty());
            match (heading, sections.last_mut()) {
                (None, Some((_, items))) => items.push(ingredient),
                (heading, _) => sections.push((heading, vec![ingredient])),
            }
        }
        sections
    }
}

fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from >= items.len() || to >= items.len() {
        return false;
    }
    let item = items.remove(from);
    items.insert(to, item);
    true
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.display_name();
        writeln!(f, "{}{}", name, if self.is_favorite { " ★" } else { "" })?;
        writeln!(f, "{}", "=".repeat(name.chars().count()))?;

        if !self.description.is_empty() {
            writeln!(f, "{}", self.description)?;
        }
        if self.servings > 0 {
            writeln!(f, "Servings: {}", self.servings)?;
        }
        if let Some(recipe_yield) = self.recipe_yield.as_deref().filter(|y| !y.is_empty()) {
            writeln!(f, "Yield: {}", recipe_yield)?;
        }

        let times: Vec<String> = [
            ("prep", &self.prep_time),
            ("cook", &self.cook_time),
            ("total", &self.total_time),
        ]
        .into_iter()
        .filter_map(|(label, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| format!("{}: {}", label, v))
        })
        .collect();
        if !times.is_empty() {
            writeln!(f, "Time: {}", times.join(", "))?;
        }
        if let Some(url) = &self.org_url {
            writeln!(f, "Source: {}", url)?;
        }

        if !self.ingredients.is_empty() {
            writeln!(f, "\nIngredients:")?;
            for (heading, items) in self.ingredient_sections() {
                if let Some(heading) = heading {
                    writeln!(f, "  [{}]", heading)?;
                }
                for ingredient in items {
                    writeln!(f, "  - {}", ingredient)?;
                }
            }
        }

        if !self.instructions.is_empty() {
            writeln!(f, "\nInstructions:")?;
            for instruction in &self.instructions {
                if let Some(title) = instruction.title.as_deref().filter(|t| !t.is_empty()) {
                    writeln!(f, "  [{}]", title)?;
                }
                writeln!(f, "  {}", instruction)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Recipe {
        Recipe::new("r1", "pancakes")
            .with_name("Pancakes")
            .with_ingredients(vec![
                Ingredient::new("flour", 2.0, "cups"),
                Ingredient::new("milk", 1.0, "cup"),
                Ingredient::new("egg", 1.0, ""),
            ])
            .with_instructions(vec![
                Instruction::new(0, "Mix"),
                Instruction::new(0, "Rest"),
                Instruction::new(0, "Fry"),
            ])
    }

    fn ingredient_indices(recipe: &Recipe) -> Vec<u32> {
        recipe.ingredients.iter().map(|i| i.order_index).collect()
    }

    fn steps(recipe: &Recipe) -> Vec<u32> {
        recipe.instructions.iter().map(|i| i.step).collect()
    }

    #[test]
    fn test_builder_assigns_dense_indices() {
        let recipe = sample();
        assert_eq!(ingredient_indices(&recipe), vec![0, 1, 2]);
        assert_eq!(steps(&recipe), vec![1, 2, 3]);
    }

    #[test]
    fn test_remove_ingredient_keeps_indices_contiguous() {
        let mut recipe = sample();
        let removed = recipe.remove_ingredient(1).unwrap();
        assert_eq!(removed.name, "milk");
        assert_eq!(ingredient_indices(&recipe), vec![0, 1]);
        assert_eq!(recipe.ingredients[1].name, "egg");
    }

    #[test]
    fn test_remove_ingredient_out_of_range() {
        let mut recipe = sample();
        assert!(recipe.remove_ingredient(7).is_none());
        assert_eq!(recipe.ingredients.len(), 3);
    }

    #[test]
    fn test_move_ingredient_renumbers() {
        let mut recipe = sample();
        assert!(recipe.move_ingredient(2, 0));
        assert_eq!(recipe.ingredients[0].name, "egg");
        assert_eq!(ingredient_indices(&recipe), vec![0, 1, 2]);
    }

    #[test]
    fn test_remove_and_move_instruction_renumbers_steps() {
        let mut recipe = sample();
        recipe.remove_instruction(0);
        assert_eq!(steps(&recipe), vec![1, 2]);
        assert_eq!(recipe.instructions[0].text, "Rest");

        recipe.push_instruction(Instruction::new(99, "Serve"));
        assert!(recipe.move_instruction(2, 0));
        assert_eq!(recipe.instructions[0].text, "Serve");
        assert_eq!(steps(&recipe), vec![1, 2, 3]);
    }

    #[test]
    fn test_is_hydrated() {
        assert!(!Recipe::new("r", "s").is_hydrated());
        assert!(sample().is_hydrated());
        let only_steps = Recipe::new("r", "s").with_instructions(vec![Instruction::new(1, "Go")]);
        assert!(only_steps.is_hydrated());
    }

    #[test]
    fn test_ingredient_sections() {
        let recipe = Recipe::new("r", "s").with_ingredients(vec![
            Ingredient::new("salt", 1.0, "tsp"),
            Ingredient::new("flour", 2.0, "cups").with_title("Dough"),
            Ingredient::new("water", 1.0, "cup"),
            Ingredient::new("tomato", 3.0, "").with_title("Sauce"),
        ]);
        let sections = recipe.ingredient_sections();
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].0, None);
        assert_eq!(sections[1].0, Some("Dough"));
        assert_eq!(sections[1].1.len(), 2);
        assert_eq!(sections[2].0, Some("Sauce"));
    }

    #[test]
    fn test_recipe_display() {
        let output = format!("{}", sample().with_servings(4).with_favorite(true));
        assert!(output.contains("Pancakes ★"));
        assert!(output.contains("Servings: 4"));
        assert!(output.contains("2 cups flour"));
        assert!(output.contains("3. Fry"));
    }
}
