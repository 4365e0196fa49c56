mod ingredient;
mod instruction;
mod recipe;
mod summary;
mod user;

pub use ingredient::{Ingredient, IngredientUnit};
pub use instruction::Instruction;
pub use recipe::Recipe;
pub use summary::RecipeSummary;
pub use user::{FavoriteRating, User};
