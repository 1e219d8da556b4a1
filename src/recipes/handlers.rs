use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::{CreateRecipeRequest, ListQuery, RecipeDetail, RecipeSummary, UpdateRecipeRequest};
use crate::{auth::AuthUser, error::AppResult, state::AppState};

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/recipe/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/recipe/recipes/:id",
            get(get_recipe).patch(update_recipe).delete(delete_recipe),
        )
}

#[instrument(skip(state, user, query), fields(user_id = user.id))]
pub async fn list_recipes(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> AppResult<Json<Vec<RecipeSummary>>> {
    let Query(query) = query?;
    let recipes = state.recipes.list_recipes(&user, query.order).await?;
    Ok(Json(recipes.into_iter().map(RecipeSummary::from).collect()))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateRecipeRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let recipe = state.recipes.create_recipe(&user, payload).await?;
    let location = format!("/api/recipe/recipes/{}", recipe.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(RecipeDetail::from(recipe)),
    ))
}

#[instrument(skip(state, user, id), fields(user_id = user.id))]
pub async fn get_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<RecipeDetail>> {
    let Path(id) = id?;
    let recipe = state.recipes.get_recipe(&user, id).await?;
    Ok(Json(recipe.into()))
}

#[instrument(skip(state, user, id, payload), fields(user_id = user.id))]
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateRecipeRequest>, JsonRejection>,
) -> AppResult<Json<RecipeDetail>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let recipe = state.recipes.update_recipe(&user, id, payload).await?;
    Ok(Json(recipe.into()))
}

#[instrument(skip(state, user, id), fields(user_id = user.id))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path(id) = id?;
    state.recipes.delete_recipe(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
