//! Mealie Sync Core Library
//!
//! Recipe models, the Mealie API client and the sync engine shared by the
//! `mealie` CLI.

pub mod api;
pub mod date;
pub mod editing;
pub mod models;
pub mod sync;

pub use api::{ApiError, ClientOptions, MealieClient, RecipeUpdate};
pub use editing::{slug_from_name, EditError, FinishedEdit, RecipeDraft};
pub use models::{FavoriteRating, Ingredient, IngredientUnit, Instruction, Recipe, RecipeSummary, User};
pub use sync::{
    should_sync, ChangeSet, FavoritesSource, MemoryRecipeStore, RecipeStore, RemoteCatalog,
    StoreError, SyncCounts, SyncEngine, SyncError, SyncMode, SyncOutcome, SyncPhase, SyncReport,
    SyncResult,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
