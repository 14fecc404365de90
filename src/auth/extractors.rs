use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::{AppError, TokenError};
use crate::state::AppState;

/// The verified subject of the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub Uuid);

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, TokenError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(TokenError::MissingHeader)?;

    let (scheme, token) = value.split_once(' ').ok_or(TokenError::BadScheme)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(TokenError::BadScheme);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(TokenError::Malformed("empty bearer token".into()));
    }
    Ok(token)
}

/// Router middleware guarding every non-auth endpoint. On success the subject id is
/// stored in the request extensions for handlers to read.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = state.auth.authorize(bearer_token(req.headers())?)?;
    req.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(req).await)
}

/// Reads the subject stored by `require_auth`. A handler reached without the
/// guard in front of it is refused.
#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or(AppError::Unauthorized(TokenError::MissingHeader))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{HeaderValue, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
        assert_eq!(bearer_token(&headers_with("bearer abc")), Ok("abc"));
    }

    #[test]
    fn rejects_missing_or_foreign_schemes() {
        assert_eq!(bearer_token(&HeaderMap::new()), Err(TokenError::MissingHeader));
        assert_eq!(bearer_token(&headers_with("Basic dXNlcjpwdw==")), Err(TokenError::BadScheme));
        assert_eq!(bearer_token(&headers_with("abc.def.ghi")), Err(TokenError::BadScheme));
        assert!(matches!(
            bearer_token(&headers_with("Bearer   ")),
            Err(TokenError::Malformed(_))
        ));
    }

    fn guarded(state: AppState) -> Router {
        Router::new()
            .route("/whoami", get(|AuthUser(id): AuthUser| async move { id.to_string() }))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
            .with_state(state)
    }

    async fn call(app: Router, auth: Option<&str>) -> (StatusCode, String) {
        let mut req = Request::builder().uri("/whoami");
        if let Some(auth) = auth {
            req = req.header(AUTHORIZATION, auth);
        }
        let resp = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn guard_passes_the_authorized_subject_to_handlers() {
        let state = AppState::fake();
        let user_id = Uuid::new_v4();
        let issued = state.auth.keys().issue(user_id).unwrap();
        assert_eq!(state.auth.authorize(&issued.token), Ok(user_id));

        let (status, body) = call(guarded(state), Some(&format!("Bearer {}", issued.token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, user_id.to_string());
    }

    #[tokio::test]
    async fn guard_rejects_what_authorize_rejects() {
        let state = AppState::fake();
        assert!(state.auth.authorize("abc.def.ghi").is_err());
        let (status, _) = call(guarded(state.clone()), Some("Bearer abc.def.ghi")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = call(guarded(state), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn extractor_without_guard_is_refused() {
        let app = Router::new().route("/whoami", get(|AuthUser(id): AuthUser| async move { id.to_string() }));
        let issued = AppState::fake().auth.keys().issue(Uuid::new_v4()).unwrap();
        let (status, _) = call(app, Some(&format!("Bearer {}", issued.token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
