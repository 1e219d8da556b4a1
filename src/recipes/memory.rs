use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use super::{
    model::{Recipe, RecipeDraft, RecipeOrder, RecipePatch},
    repo::RecipeStore,
};
use crate::error::AppResult;

/// Process-local [`RecipeStore`], used by `AppState::fake()` and tests.
#[derive(Default)]
pub struct MemoryRecipeStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    recipes: Vec<Recipe>,
}

impl MemoryRecipeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecipeStore for MemoryRecipeStore {
    async fn insert(&self, owner_id: i64, draft: RecipeDraft) -> AppResult<Recipe> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let recipe = Recipe {
            id: inner.next_id,
            user_id: owner_id,
            title: draft.title,
            time_minutes: draft.time_minutes,
            price: draft.price,
            description: draft.description,
            link: draft.link,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.recipes.push(recipe.clone());
        Ok(recipe)
    }

    async fn list_for_owner(&self, owner_id: i64, order: RecipeOrder) -> AppResult<Vec<Recipe>> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<Recipe> = inner
            .recipes
            .iter()
            .filter(|r| r.user_id == owner_id)
            .cloned()
            .collect();
        match order {
            RecipeOrder::Asc => rows.sort_by_key(|r| r.id),
            RecipeOrder::Desc => rows.sort_by_key(|r| std::cmp::Reverse(r.id)),
        }
        Ok(rows)
    }

    async fn find_for_owner(&self, owner_id: i64, id: i64) -> AppResult<Option<Recipe>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .recipes
            .iter()
            .find(|r| r.id == id && r.user_id == owner_id)
            .cloned())
    }

    async fn update_for_owner(
        &self,
        owner_id: i64,
        id: i64,
        patch: RecipePatch,
    ) -> AppResult<Option<Recipe>> {
        let mut inner = self.inner.lock().await;
        let Some(recipe) = inner
            .recipes
            .iter_mut()
            .find(|r| r.id == id && r.user_id == owner_id)
        else {
            return Ok(None);
        };
        patch.apply(recipe);
        Ok(Some(recipe.clone()))
    }

    async fn delete_for_owner(&self, owner_id: i64, id: i64) -> AppResult<bool> {
        let mut inner = self.inner.lock().await;
        let before = inner.recipes.len();
        inner.recipes.retain(|r| !(r.id == id && r.user_id == owner_id));
        Ok(inner.recipes.len() < before)
    }
}
