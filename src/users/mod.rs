mod dto;
mod email;
pub mod handlers;
pub mod memory;
mod model;
pub mod repo;
pub mod service;

use crate::state::AppState;
use axum::Router;

pub use email::{is_valid_email, normalize_email};
pub use model::{
    validate_name, NewUser, ProfileUpdate, Role, User, UserChanges, UserExtras, MAX_NAME_LEN,
};
pub use service::IdentityService;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::user_routes())
        .merge(handlers::admin_routes())
}
