use std::sync::Arc;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::Claims;
use crate::config::JwtConfig;
use crate::error::{AppError, AppResult, TokenError};

/// Signing and verification keys, built once at startup and shared read-only.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
    algorithm: Algorithm,
    issuer: String,
    audience: String,
    ttl: Duration,
}

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> AppResult<Self> {
        if cfg.secret.trim().is_empty() {
            return Err(AppError::Signing("JWT secret is empty".into()));
        }
        if !matches!(
            cfg.algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(AppError::Signing(format!(
                "{:?} is not an HMAC algorithm",
                cfg.algorithm
            )));
        }
        if cfg.ttl_minutes <= 0 {
            return Err(AppError::Signing("token TTL must be positive".into()));
        }
        Ok(Self {
            encoding: Arc::new(EncodingKey::from_secret(cfg.secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(cfg.secret.as_bytes())),
            algorithm: cfg.algorithm,
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::minutes(cfg.ttl_minutes),
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: Uuid) -> AppResult<IssuedToken> {
        self.issue_at(user_id, OffsetDateTime::now_utc())
    }

    /// Signs a token for `user_id` valid from `now` (truncated to the second) for one TTL.
    pub fn issue_at(&self, user_id: Uuid, now: OffsetDateTime) -> AppResult<IssuedToken> {
        let issued_at = now.replace_nanosecond(0).unwrap_or(now);
        let expires_at = issued_at + self.ttl;
        let claims = Claims {
            sub: user_id,
            iat: issued_at.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| AppError::Signing(e.to_string()))?;
        debug!(user_id = %user_id, exp = claims.exp, "jwt signed");
        Ok(IssuedToken {
            token,
            issued_at,
            expires_at,
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// Checks the signature first, then claim shape, issuer and audience, and finally
    /// that `now` is strictly before `exp`.
    pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        // expiry is checked below against the caller's clock, without leeway
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(classify)?;
        if now.unix_timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }

    /// Signs and verifies a throwaway token. Run at startup so a broken key aborts boot.
    pub fn self_check(&self) -> AppResult<()> {
        let now = OffsetDateTime::now_utc();
        let sample = self.issue_at(Uuid::nil(), now)?;
        self.verify_at(&sample.token, now)
            .map_err(|e| AppError::Signing(format!("self-check token rejected: {e}")))?;
        Ok(())
    }
}

fn classify(e: jsonwebtoken::errors::Error) -> TokenError {
    match e.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::BadSignature,
        ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => TokenError::WrongAudience,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed(e.to_string()),
    }
}
