use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{
        CreateUserRequest, PublicUser, TokenRequest, TokenResponse, UpdateProfileRequest,
        UserListItem,
    },
    model::{ProfileUpdate, UserExtras},
    service::IdentityService,
};
use crate::{auth::AuthUser, error::AppResult, state::AppState};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/create", post(create_user))
        .route("/user/token", post(create_token))
        .route("/user/me", get(get_me).patch(update_me).put(update_me))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/users", get(list_users))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<PublicUser>)> {
    let Json(payload) = payload?;
    IdentityService::validate_signup(&payload.email, &payload.password)?;

    let extras = UserExtras {
        name: payload.name.trim().to_string(),
        ..UserExtras::default()
    };
    let user = state
        .identity
        .create_user(&payload.email, &payload.password, extras)
        .await?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn create_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> AppResult<Json<TokenResponse>> {
    let Json(payload) = payload?;
    let user = state
        .identity
        .authenticate(&payload.email, &payload.password)
        .await?;
    let token = state.identity.issue_token(&user)?;
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(user), fields(user_id = user.id))]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(user.into())
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> AppResult<Json<PublicUser>> {
    let Json(payload) = payload?;
    let updated = state
        .identity
        .update_profile(
            user.id,
            ProfileUpdate {
                name: payload.name,
                password: payload.password,
            },
        )
        .await?;
    Ok(Json(updated.into()))
}

#[instrument(skip(state, caller), fields(user_id = caller.id))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> AppResult<Json<Vec<UserListItem>>> {
    let users = state.identity.list_users(&caller).await?;
    Ok(Json(users.into_iter().map(UserListItem::from).collect()))
}
