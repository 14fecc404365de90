use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        jwt::{IssuedToken, JwtKeys},
    },
    error::{AppError, AppResult, TokenError},
    users::{
        dto::PublicUser,
        services::{UserService, MAX_PASSWORD_BYTES},
    },
};

/// Registration, login and token checks.
#[derive(Clone)]
pub struct AuthService {
    users: UserService,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(users: UserService, keys: JwtKeys) -> Self {
        Self { users, keys }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    pub async fn register(&self, req: RegisterRequest) -> AppResult<PublicUser> {
        let user = self.users.create(req).await?;
        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Unknown email and wrong password fail identically, and both paths spend
    /// one Argon2 verification.
    pub async fn login(&self, req: LoginRequest) -> AppResult<(IssuedToken, PublicUser)> {
        let email = req.email.trim();
        if req.password.len() > MAX_PASSWORD_BYTES {
            warn!("login password over size limit");
            return Err(AppError::InvalidCredentials);
        }

        let Some(user) = self.users.find_by_email(email).await? else {
            self.users
                .hashing()
                .burn_verify_blocking(req.password)
                .await;
            warn!("login unknown email");
            return Err(AppError::InvalidCredentials);
        };

        let ok = self
            .users
            .hashing()
            .verify_blocking(req.password, user.password_hash.clone())
            .await?;
        if !ok {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }

        let token = self.keys.issue(user.id)?;
        info!(user_id = %user.id, "user logged in");
        Ok((token, user.into()))
    }

    /// Gate for every non-auth endpoint: verifies a raw bearer token and yields its subject.
    pub fn authorize(&self, raw_token: &str) -> Result<Uuid, TokenError> {
        self.keys.verify(raw_token).map(|claims| claims.sub)
    }
}
