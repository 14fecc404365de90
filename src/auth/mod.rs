use crate::state::AppState;
use axum::Router;

mod claims;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod services;

pub use claims::Claims;
pub use extractors::{require_auth, AuthUser};
pub use jwt::{IssuedToken, JwtKeys};
pub use password::PasswordHashing;
pub use services::AuthService;

/// Register and login; reachable without a token.
pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
