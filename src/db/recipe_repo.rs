use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mealie_sync_core::models::{Ingredient, IngredientUnit, Instruction, Recipe};
use mealie_sync_core::sync::{ChangeSet, RecipeStore, StoreError};
use sqlx::{SqliteConnection, SqlitePool};

/// SQLite-backed recipe store. Every `apply` is one transaction.
#[derive(Clone)]
pub struct SqliteRecipeStore {
    pool: SqlitePool,
}

// Row types for database queries
#[derive(sqlx::FromRow)]
struct RecipeRow {
    remote_id: String,
    user_id: String,
    group_id: String,
    household_id: String,
    name: Option<String>,
    slug: String,
    image: Option<String>,
    description: String,
    servings: i32,
    yield_quantity: i32,
    recipe_yield: Option<String>,
    total_time: Option<String>,
    prep_time: Option<String>,
    cook_time: Option<String>,
    perform_time: Option<String>,
    rating: Option<i32>,
    org_url: Option<String>,
    date_added: Option<String>,
    date_updated: Option<String>,
    created_at: Option<String>,
    last_made: Option<String>,
    update_at: Option<String>,
    is_favorite: bool,
}

#[derive(sqlx::FromRow)]
struct IngredientRow {
    recipe_id: String,
    order_index: i64,
    name: String,
    quantity: f64,
    unit_name: String,
    unit_plural_name: Option<String>,
    unit_abbreviation: Option<String>,
    original_text: String,
    note: String,
    title: Option<String>,
}

#[derive(sqlx::FromRow)]
struct InstructionRow {
    recipe_id: String,
    step: i64,
    remote_id: Option<String>,
    text: String,
    title: Option<String>,
}

impl RecipeRow {
    fn into_recipe(self, ingredients: Vec<Ingredient>, instructions: Vec<Instruction>) -> Recipe {
        Recipe {
            remote_id: self.remote_id,
            user_id: self.user_id,
            group_id: self.group_id,
            household_id: self.household_id,
            name: self.name,
            slug: self.slug,
            image: self.image,
            description: self.description,
            servings: self.servings,
            yield_quantity: self.yield_quantity,
            recipe_yield: self.recipe_yield,
            total_time: self.total_time,
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            perform_time: self.perform_time,
            rating: self.rating,
            org_url: self.org_url,
            date_added: self.date_added,
            date_updated: self.date_updated,
            created_at: self.created_at,
            last_made: self.last_made,
            update_at: self.update_at,
            is_favorite: self.is_favorite,
            ingredients,
            instructions,
        }
    }
}

impl From<IngredientRow> for Ingredient {
    fn from(row: IngredientRow) -> Self {
        Ingredient {
            order_index: row.order_index as u32,
            name: row.name,
            quantity: row.quantity,
            unit: IngredientUnit {
                name: row.unit_name,
                plural_name: row.unit_plural_name,
                abbreviation: row.unit_abbreviation,
            },
            original_text: row.original_text,
            note: row.note,
            title: row.title,
        }
    }
}

impl From<InstructionRow> for Instruction {
    fn from(row: InstructionRow) -> Self {
        Instruction {
            id: row.remote_id,
            step: row.step as u32,
            text: row.text,
            title: row.title,
        }
    }
}

fn db_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::InvalidData(db.message().to_string());
        }
    }
    StoreError::Database(e.to_string())
}

impl SqliteRecipeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(count as usize)
    }

    async fn hydrate(&self, row: RecipeRow) -> Result<Recipe, sqlx::Error> {
        let ingredients: Vec<IngredientRow> = sqlx::query_as(
            "SELECT * FROM ingredients WHERE recipe_id = ? ORDER BY order_index",
        )
        .bind(&row.remote_id)
        .fetch_all(&self.pool)
        .await?;

        let instructions: Vec<InstructionRow> =
            sqlx::query_as("SELECT * FROM instructions WHERE recipe_id = ? ORDER BY step")
                .bind(&row.remote_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(row.into_recipe(
            ingredients.into_iter().map(Into::into).collect(),
            instructions.into_iter().map(Into::into).collect(),
        ))
    }
}

async fn insert_recipe(conn: &mut SqliteConnection, recipe: &Recipe) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO recipes (remote_id, user_id, group_id, household_id, name, slug, image, description,
            servings, yield_quantity, recipe_yield, total_time, prep_time, cook_time, perform_time,
            rating, org_url, date_added, date_updated, created_at, last_made, update_at, is_favorite)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&recipe.remote_id)
    .bind(&recipe.user_id)
    .bind(&recipe.group_id)
    .bind(&recipe.household_id)
    .bind(&recipe.name)
    .bind(&recipe.slug)
    .bind(&recipe.image)
    .bind(&recipe.description)
    .bind(recipe.servings)
    .bind(recipe.yield_quantity)
    .bind(&recipe.recipe_yield)
    .bind(&recipe.total_time)
    .bind(&recipe.prep_time)
    .bind(&recipe.cook_time)
    .bind(&recipe.perform_time)
    .bind(recipe.rating)
    .bind(&recipe.org_url)
    .bind(&recipe.date_added)
    .bind(&recipe.date_updated)
    .bind(&recipe.created_at)
    .bind(&recipe.last_made)
    .bind(&recipe.update_at)
    .bind(recipe.is_favorite)
    .execute(&mut *conn)
    .await?;

    insert_children(conn, recipe).await
}

/// Updates the recipe row and rebuilds its children. Returns false if the row is missing.
async fn update_recipe(conn: &mut SqliteConnection, recipe: &Recipe) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE recipes
        SET user_id = ?, group_id = ?, household_id = ?, name = ?, slug = ?, image = ?,
            description = ?, servings = ?, yield_quantity = ?, recipe_yield = ?, total_time = ?,
            prep_time = ?, cook_time = ?, perform_time = ?, rating = ?, org_url = ?,
            date_added = ?, date_updated = ?, created_at = ?, last_made = ?, update_at = ?,
            is_favorite = ?
        WHERE remote_id = ?
        "#,
    )
    .bind(&recipe.user_id)
    .bind(&recipe.group_id)
    .bind(&recipe.household_id)
    .bind(&recipe.name)
    .bind(&recipe.slug)
    .bind(&recipe.image)
    .bind(&recipe.description)
    .bind(recipe.servings)
    .bind(recipe.yield_quantity)
    .bind(&recipe.recipe_yield)
    .bind(&recipe.total_time)
    .bind(&recipe.prep_time)
    .bind(&recipe.cook_time)
    .bind(&recipe.perform_time)
    .bind(recipe.rating)
    .bind(&recipe.org_url)
    .bind(&recipe.date_added)
    .bind(&recipe.date_updated)
    .bind(&recipe.created_at)
    .bind(&recipe.last_made)
    .bind(&recipe.update_at)
    .bind(recipe.is_favorite)
    .bind(&recipe.remote_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    // Replace children
    sqlx::query("DELETE FROM ingredients WHERE recipe_id = ?")
        .bind(&recipe.remote_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM instructions WHERE recipe_id = ?")
        .bind(&recipe.remote_id)
        .execute(&mut *conn)
        .await?;

    insert_children(conn, recipe).await?;
    Ok(true)
}

async fn insert_children(conn: &mut SqliteConnection, recipe: &Recipe) -> Result<(), sqlx::Error> {
    for (index, ingredient) in recipe.ingredients.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO ingredients (recipe_id, order_index, name, quantity, unit_name,
                unit_plural_name, unit_abbreviation, original_text, note, title)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&recipe.remote_id)
        .bind(index as i64)
        .bind(&ingredient.name)
        .bind(ingredient.quantity)
        .bind(&ingredient.unit.name)
        .bind(&ingredient.unit.plural_name)
        .bind(&ingredient.unit.abbreviation)
        .bind(&ingredient.original_text)
        .bind(&ingredient.note)
        .bind(&ingredient.title)
        .execute(&mut *conn)
        .await?;
    }

    for (index, instruction) in recipe.instructions.iter().enumerate() {
        sqlx::query(
            "INSERT INTO instructions (recipe_id, step, remote_id, text, title) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&recipe.remote_id)
        .bind(index as i64 + 1)
        .bind(&instruction.id)
        .bind(&instruction.text)
        .bind(&instruction.title)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

#[async_trait]
impl RecipeStore for SqliteRecipeStore {
    async fn load_all(&self) -> Result<Vec<Recipe>, StoreError> {
        let rows: Vec<RecipeRow> = sqlx::query_as("SELECT * FROM recipes ORDER BY remote_id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        let ingredient_rows: Vec<IngredientRow> =
            sqlx::query_as("SELECT * FROM ingredients ORDER BY recipe_id, order_index")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;
        let instruction_rows: Vec<InstructionRow> =
            sqlx::query_as("SELECT * FROM instructions ORDER BY recipe_id, step")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;

        let mut ingredients: HashMap<String, Vec<Ingredient>> = HashMap::new();
        for row in ingredient_rows {
            ingredients
                .entry(row.recipe_id.clone())
                .or_default()
                .push(row.into());
        }
        let mut instructions: HashMap<String, Vec<Instruction>> = HashMap::new();
        for row in instruction_rows {
            instructions
                .entry(row.recipe_id.clone())
                .or_default()
                .push(row.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let children = (
                    ingredients.remove(&row.remote_id).unwrap_or_default(),
                    instructions.remove(&row.remote_id).unwrap_or_default(),
                );
                row.into_recipe(children.0, children.1)
            })
            .collect())
    }

    async fn get(&self, remote_id: &str) -> Result<Option<Recipe>, StoreError> {
        let row: Option<RecipeRow> = sqlx::query_as("SELECT * FROM recipes WHERE remote_id = ?")
            .bind(remote_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        match row {
            Some(row) => self.hydrate(row).await.map(Some).map_err(db_error),
            None => Ok(None),
        }
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Recipe>, StoreError> {
        let row: Option<RecipeRow> =
            sqlx::query_as("SELECT * FROM recipes WHERE LOWER(slug) = LOWER(?)")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        match row {
            Some(row) => self.hydrate(row).await.map(Some).map_err(db_error),
            None => Ok(None),
        }
    }

    async fn apply(&self, changes: &ChangeSet) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Children go with the recipe row (ON DELETE CASCADE).
        for remote_id in &changes.deletes {
            let result = sqlx::query("DELETE FROM recipes WHERE remote_id = ?")
                .bind(remote_id)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(remote_id.clone()));
            }
        }

        for recipe in &changes.updates {
            if !update_recipe(&mut *tx, recipe).await.map_err(db_error)? {
                return Err(StoreError::NotFound(recipe.remote_id.clone()));
            }
        }

        for recipe in &changes.inserts {
            insert_recipe(&mut *tx, recipe).await.map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        tracing::debug!(
            "Applied {} inserts, {} updates, {} deletes",
            changes.inserts.len(),
            changes.updates.len(),
            changes.deletes.len()
        );
        Ok(())
    }

    async fn last_synced_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT last_synced_at FROM sync_state WHERE id = 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        row.map(|(value,)| {
            DateTime::parse_from_rfc3339(&value)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| StoreError::InvalidData(format!("last sync time '{}': {}", value, e)))
        })
        .transpose()
    }

    async fn record_sync(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sync_state (id, last_synced_at) VALUES (1, ?)
            ON CONFLICT(id) DO UPDATE SET last_synced_at = excluded.last_synced_at
            "#,
        )
        .bind(at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use mealie_sync_core::api::ApiError;
    use mealie_sync_core::models::RecipeSummary;
    use mealie_sync_core::sync::{RemoteCatalog, SyncEngine, SyncMode, SyncOutcome};
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    struct TestContext {
        store: SqliteRecipeStore,
        _temp_dir: TempDir, // Keep alive for duration of test
    }

    async fn setup_store() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let pool = init_db(&db_path).await.unwrap();
        TestContext {
            store: SqliteRecipeStore::new(pool),
            _temp_dir: temp_dir,
        }
    }

    fn recipe(id: &str, slug: &str) -> Recipe {
        Recipe::new(id, slug)
            .with_name(slug.replace('-', " "))
            .with_date_updated("2024-01-01T00:00:00Z")
            .with_ingredients(vec![
                Ingredient::new("flour", 2.0, "cups").with_title("Dough"),
                Ingredient::new("water", 1.0, "cup").with_note("warm"),
                Ingredient::new("salt", 1.0, "tsp"),
            ])
            .with_instructions(vec![
                Instruction::new(1, "Mix"),
                Instruction::new(2, "Knead").with_title("Shaping"),
            ])
    }

    fn inserts(recipes: Vec<Recipe>) -> ChangeSet {
        ChangeSet {
            inserts: recipes,
            ..ChangeSet::default()
        }
    }

    async fn child_count(store: &SqliteRecipeStore, table: &str) -> i64 {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&store.pool)
            .await
            .unwrap();
        count
    }

    #[tokio::test]
    async fn test_insert_and_load_round_trip() {
        let ctx = setup_store().await;
        let store = &ctx.store;
        let original = recipe("r1", "bread").with_favorite(true);

        store.apply(&inserts(vec![original.clone()])).await.unwrap();

        let loaded = store.get("r1").await.unwrap().unwrap();
        assert_eq!(loaded, original);
        assert_eq!(store.load_all().await.unwrap(), vec![original]);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_replaces_children() {
        let ctx = setup_store().await;
        let store = &ctx.store;
        store.apply(&inserts(vec![recipe("r1", "bread")])).await.unwrap();

        let mut updated = recipe("r1", "bread");
        updated.remove_ingredient(1);
        updated.description = "Crusty".to_string();
        let changes = ChangeSet {
            updates: vec![updated],
            ..ChangeSet::default()
        };
        store.apply(&changes).await.unwrap();

        let loaded = store.get("r1").await.unwrap().unwrap();
        assert_eq!(loaded.description, "Crusty");
        let indices: Vec<u32> = loaded.ingredients.iter().map(|i| i.order_index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(loaded.ingredients[1].name, "salt");
        assert_eq!(child_count(store, "ingredients").await, 2);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let ctx = setup_store().await;
        let store = &ctx.store;
        store
            .apply(&inserts(vec![recipe("r1", "bread"), recipe("r2", "rolls")]))
            .await
            .unwrap();

        assert!(store.delete("r1").await.unwrap());
        assert!(!store.delete("r1").await.unwrap());

        assert_eq!(child_count(store, "ingredients").await, 3);
        assert_eq!(child_count(store, "instructions").await, 2);
        assert!(store.get("r1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_apply_rolls_back() {
        let ctx = setup_store().await;
        let store = &ctx.store;
        store.apply(&inserts(vec![recipe("r1", "bread")])).await.unwrap();

        let changes = ChangeSet {
            inserts: vec![recipe("r2", "rolls")],
            deletes: vec!["r1".to_string(), "missing".to_string()],
            ..ChangeSet::default()
        };
        let err = store.apply(&changes).await.unwrap_err();

        assert!(matches!(err, StoreError::NotFound(_)));
        let remaining = store.load_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].remote_id, "r1");
        assert_eq!(child_count(store, "ingredients").await, 3);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_invalid_data() {
        let ctx = setup_store().await;
        let store = &ctx.store;
        store.apply(&inserts(vec![recipe("r1", "bread")])).await.unwrap();

        let err = store
            .apply(&inserts(vec![recipe("r1", "bread")]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_find_by_slug_case_insensitive() {
        let ctx = setup_store().await;
        let store = &ctx.store;
        store.apply(&inserts(vec![recipe("r1", "sour-dough")])).await.unwrap();

        let found = store.find_by_slug("SOUR-Dough").await.unwrap();
        assert_eq!(found.map(|r| r.remote_id), Some("r1".to_string()));
        assert!(store.find_by_slug("rye").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_favorite_and_save() {
        let ctx = setup_store().await;
        let store = &ctx.store;
        store.save(&recipe("r1", "bread")).await.unwrap();

        assert!(store.set_favorite("r1", true).await.unwrap());
        assert!(store.get("r1").await.unwrap().unwrap().is_favorite);
        assert!(!store.set_favorite("nope", true).await.unwrap());
    }

    #[tokio::test]
    async fn test_record_sync_round_trip() {
        let ctx = setup_store().await;
        let store = &ctx.store;
        assert!(store.last_synced_at().await.unwrap().is_none());

        let first = Utc::now() - chrono::Duration::minutes(10);
        store.record_sync(first).await.unwrap();
        let now = Utc::now();
        store.record_sync(now).await.unwrap();

        assert_eq!(store.last_synced_at().await.unwrap(), Some(now));
    }

    struct StaticCatalog(Vec<Recipe>);

    #[async_trait]
    impl RemoteCatalog for StaticCatalog {
        async fn list_summaries(&self) -> Result<Vec<RecipeSummary>, ApiError> {
            Ok(self
                .0
                .iter()
                .map(|r| {
                    RecipeSummary::new(r.slug.clone())
                        .with_id(r.remote_id.clone())
                        .with_date_updated(r.date_updated.clone().unwrap_or_default())
                })
                .collect())
        }

        async fn fetch_detail(&self, slug: &str) -> Result<Recipe, ApiError> {
            self.0
                .iter()
                .find(|r| r.slug == slug)
                .cloned()
                .ok_or_else(|| ApiError::NotFound(slug.to_string()))
        }
    }

    #[tokio::test]
    async fn test_engine_pass_into_sqlite() {
        let ctx = setup_store().await;
        let catalog = StaticCatalog(vec![recipe("r1", "bread"), recipe("r2", "rolls")]);
        let engine = SyncEngine::new(catalog, ctx.store);
        let cancel = CancellationToken::new();

        let first = engine.sync(SyncMode::Optimized, &cancel).await.unwrap();
        let second = engine.sync(SyncMode::Optimized, &cancel).await.unwrap();

        match (first, second) {
            (SyncOutcome::Completed(first), SyncOutcome::Completed(second)) => {
                assert_eq!(first.inserted, 2);
                assert_eq!(second.counts.cached, 2);
                assert_eq!((second.inserted, second.updated, second.deleted), (0, 0, 0));
            }
            other => panic!("unexpected outcomes: {:?}", other),
        }
        assert_eq!(engine.store().count().await.unwrap(), 2);
        assert!(engine.store().last_synced_at().await.unwrap().is_some());
    }
}
