use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse},
        extractors::AuthUser,
    },
    error::{AppError, AppResult, TokenError},
    state::AppState,
    users::dto::PublicUser,
};

/// Unauthenticated endpoints.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Needs the access guard in front of it.
pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let Json(payload) = payload?;
    let user = state.auth.register(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Register successful",
            user,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let Json(payload) = payload?;
    let (issued, user) = state.auth.login(payload).await?;
    Ok(Json(LoginResponse {
        message: "Login successful",
        token: issued.token,
        token_type: "Bearer",
        issued_at: issued.issued_at.unix_timestamp(),
        expires_at: issued.expires_at.unix_timestamp(),
        user,
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    match state.users.get(user_id).await {
        Ok(user) => Ok(Json(user)),
        Err(AppError::NotFound(_)) => {
            warn!(user_id = %user_id, "token subject no longer exists");
            Err(TokenError::Malformed("unknown subject".into()).into())
        }
        Err(e) => Err(e),
    }
}
