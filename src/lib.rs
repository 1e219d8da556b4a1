pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod recipes;
pub mod state;
pub mod users;

pub use app::{build_app, serve};
pub use error::{AppError, AppResult};
pub use state::AppState;
