use chrono::Local;
use clap::{Args, Subcommand};
use mealie_sync_core::api::MealieClient;
use mealie_sync_core::editing::RecipeDraft;
use mealie_sync_core::models::{Ingredient, Recipe};
use mealie_sync_core::sync::RecipeStore;

use super::OutputFormat;
use crate::config::Config;
use crate::db::SqliteRecipeStore;

#[derive(Args)]
pub struct RecipeCommand {
    #[command(subcommand)]
    pub command: RecipeSubcommand,
}

#[derive(Subcommand)]
pub enum RecipeSubcommand {
    /// List recipes in the local store
    List {
        /// Only show favorites
        #[arg(long)]
        favorites: bool,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a recipe's details
    Show {
        /// Recipe slug
        slug: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Mark a recipe as a favorite
    Favorite {
        /// Recipe slug
        slug: String,
    },

    /// Remove a recipe from favorites
    Unfavorite {
        /// Recipe slug
        slug: String,
    },

    /// Import a recipe by scraping a web page
    Import {
        /// Page URL
        url: String,
    },

    /// Create an empty recipe on the server
    Create {
        /// Name of the recipe
        name: String,
    },

    /// Edit a recipe and push the changes to the server
    Edit {
        /// Recipe slug
        slug: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// Regenerate the slug from the (new) name
        #[arg(long)]
        update_slug: bool,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// Number of servings
        #[arg(long)]
        servings: Option<i32>,

        /// Prep time (e.g. "15 minutes")
        #[arg(long)]
        prep_time: Option<String>,

        /// Cook time (e.g. "1 hour")
        #[arg(long)]
        cook_time: Option<String>,

        /// Add an ingredient as "QTY UNIT NAME" (can be repeated)
        #[arg(long = "add-ingredient", value_name = "TEXT")]
        add_ingredients: Vec<String>,

        /// Remove the Nth ingredient, starting at 1 (can be repeated)
        #[arg(long = "remove-ingredient", value_name = "N")]
        remove_ingredients: Vec<usize>,

        /// Append a step (can be repeated)
        #[arg(long = "add-step", value_name = "TEXT")]
        add_steps: Vec<String>,

        /// Remove the Nth step, starting at 1 (can be repeated)
        #[arg(long = "remove-step", value_name = "N")]
        remove_steps: Vec<usize>,

        /// Append an empty titled section to the steps
        #[arg(long)]
        add_section: bool,
    },
}

impl RecipeSubcommand {
    /// Commands that only read the local store and benefit from auto-sync.
    pub fn is_read_command(&self) -> bool {
        matches!(
            self,
            RecipeSubcommand::List { .. } | RecipeSubcommand::Show { .. }
        )
    }
}

/// Field changes requested on the command line for `recipe edit`.
#[derive(Default)]
struct EditOptions {
    name: Option<String>,
    update_slug: bool,
    description: Option<String>,
    servings: Option<i32>,
    prep_time: Option<String>,
    cook_time: Option<String>,
    add_ingredients: Vec<String>,
    remove_ingredients: Vec<usize>,
    add_steps: Vec<String>,
    remove_steps: Vec<usize>,
    add_section: bool,
}

impl RecipeCommand {
    pub async fn run(
        &self,
        store: &SqliteRecipeStore,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            RecipeSubcommand::List { favorites, format } => {
                let recipes = select_recipes(store.load_all().await?, *favorites);

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&recipes)?);
                    }
                    OutputFormat::Text => {
                        if recipes.is_empty() {
                            println!("No recipes found.");
                        } else {
                            for recipe in &recipes {
                                println!(
                                    "{:<40} {}{}",
                                    recipe.slug,
                                    recipe.display_name(),
                                    if recipe.is_favorite { " ★" } else { "" }
                                );
                            }
                        }
                    }
                }
                Ok(())
            }

            RecipeSubcommand::Show { slug, format } => {
                let recipe = find_local(store, slug).await?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&recipe)?);
                    }
                    OutputFormat::Text => {
                        print!("{}", recipe);
                    }
                }
                Ok(())
            }

            RecipeSubcommand::Favorite { slug } => set_favorite(store, config, slug, true).await,

            RecipeSubcommand::Unfavorite { slug } => {
                set_favorite(store, config, slug, false).await
            }

            RecipeSubcommand::Import { url } => {
                let client = config.server.client()?;
                println!("Importing {}...", url);
                let slug = client.create_recipe_from_url(url).await?;
                let recipe = fetch_and_save(&client, store, &slug).await?;
                println!("Imported recipe: {} ({})", recipe.display_name(), recipe.slug);
                Ok(())
            }

            RecipeSubcommand::Create { name } => {
                if name.trim().is_empty() {
                    return Err("Recipe name cannot be empty".into());
                }
                let client = config.server.client()?;
                let slug = client.create_recipe(name.trim()).await?;
                let recipe = fetch_and_save(&client, store, &slug).await?;
                println!("Created recipe: {} ({})", recipe.display_name(), recipe.slug);
                Ok(())
            }

            RecipeSubcommand::Edit {
                slug,
                name,
                update_slug,
                description,
                servings,
                prep_time,
                cook_time,
                add_ingredients,
                remove_ingredients,
                add_steps,
                remove_steps,
                add_section,
            } => {
                let recipe = find_local(store, slug).await?;
                let options = EditOptions {
                    name: name.clone(),
                    update_slug: *update_slug,
                    description: description.clone(),
                    servings: *servings,
                    prep_time: prep_time.clone(),
                    cook_time: cook_time.clone(),
                    add_ingredients: add_ingredients.clone(),
                    remove_ingredients: remove_ingredients.clone(),
                    add_steps: add_steps.clone(),
                    remove_steps: remove_steps.clone(),
                    add_section: *add_section,
                };
                let draft = build_draft(&recipe, &options)?;

                let client = config.server.client()?;
                let user = client.current_user().await?;
                let edit = draft.finish(&user, &Local::now())?;

                client.update_recipe(&recipe.slug, &edit.update).await?;
                store.save(&edit.recipe).await?;

                println!("Updated recipe:");
                print!("{}", edit.recipe);
                Ok(())
            }
        }
    }
}

/// Sorts by display name (case-insensitive) and optionally keeps only favorites.
fn select_recipes(recipes: Vec<Recipe>, favorites_only: bool) -> Vec<Recipe> {
    let mut recipes: Vec<Recipe> = recipes
        .into_iter()
        .filter(|r| !favorites_only || r.is_favorite)
        .collect();
    recipes.sort_by_key(|r| r.display_name().to_lowercase());
    recipes
}

async fn find_local(
    store: &SqliteRecipeStore,
    slug: &str,
) -> Result<Recipe, Box<dyn std::error::Error>> {
    store
        .find_by_slug(slug)
        .await?
        .ok_or_else(|| format!("Recipe not found: {}", slug).into())
}

async fn set_favorite(
    store: &SqliteRecipeStore,
    config: &Config,
    slug: &str,
    is_favorite: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let recipe = find_local(store, slug).await?;
    let client = config.server.client()?;

    if is_favorite {
        client.add_favorite(&recipe.slug).await?;
    } else {
        client.remove_favorite(&recipe.slug).await?;
    }
    store.set_favorite(&recipe.remote_id, is_favorite).await?;

    if is_favorite {
        println!("Added {} to favorites", recipe.display_name());
    } else {
        println!("Removed {} from favorites", recipe.display_name());
    }
    Ok(())
}

async fn fetch_and_save(
    client: &MealieClient,
    store: &SqliteRecipeStore,
    slug: &str,
) -> Result<Recipe, Box<dyn std::error::Error>> {
    let recipe = client.recipe(slug).await?;
    store.save(&recipe).await?;
    Ok(recipe)
}

/// Applies command-line edits to a fresh draft of `recipe`.
///
/// Removal positions are 1-based and refer to the recipe as stored, so they
/// are applied highest first and before any additions.
fn build_draft(recipe: &Recipe, options: &EditOptions) -> Result<RecipeDraft, String> {
    let mut draft = RecipeDraft::from_recipe(recipe);

    if let Some(name) = &options.name {
        draft.name = name.clone();
    }
    if options.update_slug {
        draft.update_slug_from_name();
    }
    if let Some(description) = &options.description {
        draft.description = description.clone();
    }
    if let Some(servings) = options.servings {
        draft.servings = servings;
    }
    if let Some(prep_time) = &options.prep_time {
        draft.prep_time = Some(prep_time.clone());
    }
    if let Some(cook_time) = &options.cook_time {
        draft.cook_time = Some(cook_time.clone());
    }

    for position in descending(&options.remove_ingredients) {
        draft
            .remove_ingredient(position.wrapping_sub(1))
            .ok_or_else(|| format!("No ingredient at position {}", position))?;
    }
    for position in descending(&options.remove_steps) {
        draft
            .remove_instruction(position.wrapping_sub(1))
            .ok_or_else(|| format!("No step at position {}", position))?;
    }

    for text in &options.add_ingredients {
        draft.add_ingredient(parse_ingredient(text));
    }
    if options.add_section {
        draft.add_instruction_section();
    }
    for text in &options.add_steps {
        draft.add_instruction(text.clone());
    }

    Ok(draft)
}

fn descending(positions: &[usize]) -> Vec<usize> {
    let mut positions = positions.to_vec();
    positions.sort_unstable_by(|a, b| b.cmp(a));
    positions.dedup();
    positions
}

/// Parses "2 cup flour" into quantity, unit and name.
///
/// Without a leading number the whole text is the name. A number followed by
/// a single word is a quantity and name with no unit.
fn parse_ingredient(text: &str) -> Ingredient {
    let text = text.trim();
    let mut parts = text.splitn(3, char::is_whitespace);
    let first = parts.next().unwrap_or_default();

    let Ok(quantity) = first.parse::<f64>() else {
        return Ingredient::new(text, 0.0, "").with_original_text(text);
    };
    let rest: Vec<&str> = parts.filter(|p| !p.is_empty()).collect();
    let ingredient = match rest.as_slice() {
        [] => Ingredient::new(first, 0.0, ""),
        [name] => Ingredient::new(*name, quantity, ""),
        [unit, name] => Ingredient::new(name.trim(), quantity, *unit),
        _ => Ingredient::new(rest.join(" "), quantity, ""),
    };
    ingredient.with_original_text(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mealie_sync_core::models::Instruction;

    fn sample_recipe() -> Recipe {
        Recipe::new("r1", "pancakes")
            .with_name("Pancakes")
            .with_ingredients(vec![
                Ingredient::new("flour", 2.0, "cup"),
                Ingredient::new("milk", 1.0, "cup"),
                Ingredient::new("egg", 2.0, ""),
            ])
            .with_instructions(vec![
                Instruction::new(1, "Mix"),
                Instruction::new(2, "Rest"),
                Instruction::new(3, "Fry"),
            ])
    }

    #[test]
    fn test_parse_ingredient_with_unit() {
        let ingredient = parse_ingredient("2 cup plain flour");
        assert_eq!(ingredient.quantity, 2.0);
        assert_eq!(ingredient.unit.name, "cup");
        assert_eq!(ingredient.name, "plain flour");
        assert_eq!(ingredient.original_text, "2 cup plain flour");
    }

    #[test]
    fn test_parse_ingredient_without_quantity() {
        let ingredient = parse_ingredient("salt to taste");
        assert_eq!(ingredient.quantity, 0.0);
        assert_eq!(ingredient.name, "salt to taste");
    }

    #[test]
    fn test_parse_ingredient_quantity_and_name() {
        let ingredient = parse_ingredient("3 eggs");
        assert_eq!(ingredient.quantity, 3.0);
        assert_eq!(ingredient.name, "eggs");
        assert!(ingredient.unit.name.is_empty());
    }

    #[test]
    fn test_select_recipes_sorts_and_filters() {
        let recipes = vec![
            Recipe::new("1", "waffles").with_name("waffles"),
            Recipe::new("2", "apple-pie").with_name("Apple Pie").with_favorite(true),
            Recipe::new("3", "bread").with_name("Bread"),
        ];

        let all = select_recipes(recipes.clone(), false);
        let slugs: Vec<&str> = all.iter().map(|r| r.slug.as_str()).collect();
        assert_eq!(slugs, vec!["apple-pie", "bread", "waffles"]);

        let favorites = select_recipes(recipes, true);
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].slug, "apple-pie");
    }

    #[test]
    fn test_build_draft_removes_by_original_position() {
        let options = EditOptions {
            remove_ingredients: vec![1, 3],
            remove_steps: vec![2],
            ..EditOptions::default()
        };
        let draft = build_draft(&sample_recipe(), &options).unwrap();

        let names: Vec<&str> = draft.ingredients.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["milk"]);
        let steps: Vec<(u32, &str)> = draft
            .instructions
            .iter()
            .map(|i| (i.step, i.text.as_str()))
            .collect();
        assert_eq!(steps, vec![(1, "Mix"), (2, "Fry")]);
    }

    #[test]
    fn test_build_draft_adds_after_removals() {
        let options = EditOptions {
            name: Some("Fluffy Pancakes".to_string()),
            update_slug: true,
            servings: Some(4),
            add_ingredients: vec!["1 tsp salt".to_string()],
            remove_ingredients: vec![3],
            add_section: true,
            add_steps: vec!["Serve".to_string()],
            ..EditOptions::default()
        };
        let draft = build_draft(&sample_recipe(), &options).unwrap();

        assert_eq!(draft.name, "Fluffy Pancakes");
        assert_eq!(draft.slug, "fluffy-pancakes");
        assert_eq!(draft.servings, 4);
        assert_eq!(draft.ingredients.len(), 3);
        assert_eq!(draft.ingredients[2].name, "salt");
        assert_eq!(draft.instructions.len(), 5);
        assert_eq!(draft.instructions[3].title.as_deref(), Some("Section 1"));
        assert_eq!(draft.instructions[4].text, "Serve");
    }

    #[test]
    fn test_build_draft_rejects_bad_position() {
        let options = EditOptions {
            remove_steps: vec![9],
            ..EditOptions::default()
        };
        let err = build_draft(&sample_recipe(), &options).err().unwrap();
        assert_eq!(err, "No step at position 9");

        let options = EditOptions {
            remove_ingredients: vec![0],
            ..EditOptions::default()
        };
        assert!(build_draft(&sample_recipe(), &options).is_err());
    }

    #[test]
    fn test_read_commands() {
        let list = RecipeSubcommand::List {
            favorites: false,
            format: OutputFormat::Text,
        };
        let favorite = RecipeSubcommand::Favorite {
            slug: "x".to_string(),
        };
        assert!(list.is_read_command());
        assert!(!favorite.is_read_command());
    }
}
