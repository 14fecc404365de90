use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use repo::{MemoryUserRepo, PgUserRepo, UserRepo};
pub use services::UserService;

/// CRUD routes. All of them sit behind the access guard.
pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
