use async_trait::async_trait;
use sqlx::PgPool;

use super::model::{Recipe, RecipeDraft, RecipeOrder, RecipePatch};
use crate::error::AppResult;

/// Persistence seam of the recipe store. Every query is scoped to an owner.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn insert(&self, owner_id: i64, draft: RecipeDraft) -> AppResult<Recipe>;
    async fn list_for_owner(&self, owner_id: i64, order: RecipeOrder) -> AppResult<Vec<Recipe>>;
    async fn find_for_owner(&self, owner_id: i64, id: i64) -> AppResult<Option<Recipe>>;
    async fn update_for_owner(
        &self,
        owner_id: i64,
        id: i64,
        patch: RecipePatch,
    ) -> AppResult<Option<Recipe>>;
    /// `false` when nothing owned by `owner_id` had that id.
    async fn delete_for_owner(&self, owner_id: i64, id: i64) -> AppResult<bool>;
}

const RECIPE_COLUMNS: &str =
    "id, user_id, title, time_minutes, price, description, link, created_at";

#[derive(Clone)]
pub struct PgRecipeStore {
    pool: PgPool,
}

impl PgRecipeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecipeStore for PgRecipeStore {
    async fn insert(&self, owner_id: i64, draft: RecipeDraft) -> AppResult<Recipe> {
        let sql = format!(
            r#"
            INSERT INTO recipes (user_id, title, time_minutes, price, description, link)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {RECIPE_COLUMNS}
            "#
        );
        let recipe = sqlx::query_as::<_, Recipe>(&sql)
            .bind(owner_id)
            .bind(draft.title)
            .bind(draft.time_minutes)
            .bind(draft.price)
            .bind(draft.description)
            .bind(draft.link)
            .fetch_one(&self.pool)
            .await?;
        Ok(recipe)
    }

    async fn list_for_owner(&self, owner_id: i64, order: RecipeOrder) -> AppResult<Vec<Recipe>> {
        let sql = format!(
            r#"
            SELECT {RECIPE_COLUMNS}
              FROM recipes
             WHERE user_id = $1
             ORDER BY id {}
            "#,
            order.sql()
        );
        let rows = sqlx::query_as::<_, Recipe>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_for_owner(&self, owner_id: i64, id: i64) -> AppResult<Option<Recipe>> {
        let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND user_id = $2");
        let row = sqlx::query_as::<_, Recipe>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_for_owner(
        &self,
        owner_id: i64,
        id: i64,
        patch: RecipePatch,
    ) -> AppResult<Option<Recipe>> {
        let sql = format!(
            r#"
            UPDATE recipes
               SET title = COALESCE($3, title),
                   time_minutes = COALESCE($4, time_minutes),
                   price = COALESCE($5, price),
                   description = COALESCE($6, description),
                   link = COALESCE($7, link)
             WHERE id = $1 AND user_id = $2
            RETURNING {RECIPE_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, Recipe>(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(patch.title)
            .bind(patch.time_minutes)
            .bind(patch.price)
            .bind(patch.description)
            .bind(patch.link)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_for_owner(&self, owner_id: i64, id: i64) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
