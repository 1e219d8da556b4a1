mod dto;
pub mod handlers;
pub mod memory;
mod model;
pub mod repo;
pub mod service;

use crate::state::AppState;
use axum::Router;

pub use dto::{CreateRecipeRequest, UpdateRecipeRequest};
pub use model::{Recipe, RecipeDraft, RecipeOrder, RecipePatch};
pub use service::RecipeService;

pub fn router() -> Router<AppState> {
    handlers::recipe_routes()
}
