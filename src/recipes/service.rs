use std::sync::Arc;

use tracing::{info, instrument};

use super::{
    dto::{CreateRecipeRequest, UpdateRecipeRequest},
    model::{
        validate_link, validate_price, validate_title, Recipe, RecipeDraft, RecipeOrder,
        RecipePatch,
    },
    repo::RecipeStore,
};
use crate::{
    error::{AppError, AppResult},
    users::User,
};

#[derive(Clone)]
pub struct RecipeService {
    store: Arc<dyn RecipeStore>,
    default_order: RecipeOrder,
}

impl RecipeService {
    pub fn new(store: Arc<dyn RecipeStore>, default_order: RecipeOrder) -> Self {
        Self {
            store,
            default_order,
        }
    }

    /// The owner always comes from the authenticated caller, never from the payload.
    #[instrument(skip(self, owner, payload), fields(user_id = owner.id))]
    pub async fn create_recipe(
        &self,
        owner: &User,
        payload: CreateRecipeRequest,
    ) -> AppResult<Recipe> {
        let draft = RecipeDraft {
            title: validate_title(&payload.title).map_err(AppError::Validation)?,
            time_minutes: payload.time_minutes,
            price: validate_price(payload.price).map_err(AppError::Validation)?,
            description: payload.description,
            link: validate_link(&payload.link).map_err(AppError::Validation)?,
        };
        let recipe = self.store.insert(owner.id, draft).await?;
        info!(recipe_id = recipe.id, title = %recipe, "recipe created");
        Ok(recipe)
    }

    pub async fn list_recipes(
        &self,
        owner: &User,
        order: Option<RecipeOrder>,
    ) -> AppResult<Vec<Recipe>> {
        let order = order.unwrap_or(self.default_order);
        self.store.list_for_owner(owner.id, order).await
    }

    /// Someone else's recipe is reported exactly like a missing one.
    pub async fn get_recipe(&self, owner: &User, id: i64) -> AppResult<Recipe> {
        self.store
            .find_for_owner(owner.id, id)
            .await?
            .ok_or(AppError::NotFound)
    }

    #[instrument(skip(self, owner, payload), fields(user_id = owner.id))]
    pub async fn update_recipe(
        &self,
        owner: &User,
        id: i64,
        payload: UpdateRecipeRequest,
    ) -> AppResult<Recipe> {
        let patch = RecipePatch {
            title: payload
                .title
                .as_deref()
                .map(validate_title)
                .transpose()
                .map_err(AppError::Validation)?,
            time_minutes: payload.time_minutes,
            price: payload
                .price
                .map(validate_price)
                .transpose()
                .map_err(AppError::Validation)?,
            description: payload.description,
            link: payload
                .link
                .as_deref()
                .map(validate_link)
                .transpose()
                .map_err(AppError::Validation)?,
        };
        if patch.is_empty() {
            return self.get_recipe(owner, id).await;
        }

        let recipe = self
            .store
            .update_for_owner(owner.id, id, patch)
            .await?
            .ok_or(AppError::NotFound)?;
        info!(recipe_id = recipe.id, "recipe updated");
        Ok(recipe)
    }

    #[instrument(skip(self, owner), fields(user_id = owner.id))]
    pub async fn delete_recipe(&self, owner: &User, id: i64) -> AppResult<()> {
        if !self.store.delete_for_owner(owner.id, id).await? {
            return Err(AppError::NotFound);
        }
        info!(recipe_id = id, "recipe deleted");
        Ok(())
    }
}
