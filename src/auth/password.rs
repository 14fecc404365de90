use std::sync::Arc;

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::config::HashConfig;
use crate::error::{AppError, AppResult};

/// Argon2id hashing with configurable cost.
///
/// Both operations are CPU bound; async callers should use the `*_blocking`
/// variants, which run on tokio's blocking pool.
#[derive(Clone)]
pub struct PasswordHashing {
    params: Params,
    // hash of a throwaway password, verified against when the account does not exist
    decoy: Arc<str>,
}

impl PasswordHashing {
    pub fn new(cfg: &HashConfig) -> AppResult<Self> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| {
                error!(error = %e, "invalid argon2 parameters");
                AppError::Hashing(e.to_string())
            })?;
        let mut hashing = Self {
            params,
            decoy: Arc::from(""),
        };
        hashing.decoy = hashing.hash("decoy-password-never-matches")?.into();
        Ok(hashing)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, plain: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                AppError::Hashing(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// `Ok(false)` on mismatch; `Err` only when the stored hash cannot be parsed or checked.
    pub fn verify(&self, plain: &str, hash: &str) -> AppResult<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            AppError::Hashing(e.to_string())
        })?;
        match self.argon2().verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => {
                error!(error = %e, "argon2 verify_password error");
                Err(AppError::Hashing(e.to_string()))
            }
        }
    }

    /// Spends one verification on the decoy hash; the outcome is discarded.
    pub fn burn_verify(&self, plain: &str) {
        let _ = self.verify(plain, &self.decoy);
    }

    pub async fn hash_blocking(&self, plain: String) -> AppResult<String> {
        let hashing = self.clone();
        tokio::task::spawn_blocking(move || hashing.hash(&plain))
            .await
            .map_err(|e| AppError::Hashing(format!("hashing task failed: {e}")))?
    }

    pub async fn verify_blocking(&self, plain: String, hash: String) -> AppResult<bool> {
        let hashing = self.clone();
        tokio::task::spawn_blocking(move || hashing.verify(&plain, &hash))
            .await
            .map_err(|e| AppError::Hashing(format!("verify task failed: {e}")))?
    }

    pub async fn burn_verify_blocking(&self, plain: String) {
        let hashing = self.clone();
        let _ = tokio::task::spawn_blocking(move || hashing.burn_verify(&plain)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hashing() -> PasswordHashing {
        PasswordHashing::new(&HashConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .expect("cheap params are valid")
    }

    #[test]
    fn hash_and_verify_roundtrip() {
        let h = hashing();
        let password = "Secur3P@ssw0rd!";
        let hash = h.hash(password).expect("hashing should succeed");
        assert_ne!(hash, password);
        assert!(hash.starts_with("$argon2id$"));
        assert!(h.verify(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let h = hashing();
        let hash = h.hash("correct-horse-battery-staple").unwrap();
        assert!(!h.verify("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn same_password_gets_distinct_salted_hashes() {
        let h = hashing();
        let first = h.hash("secret1").unwrap();
        let second = h.hash("secret1").unwrap();
        assert_ne!(first, second);
        assert!(h.verify("secret1", &first).unwrap());
        assert!(h.verify("secret1", &second).unwrap());
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = hashing().verify("anything", "not-a-valid-hash").unwrap_err();
        assert!(matches!(err, AppError::Hashing(_)));
    }

    #[test]
    fn rejects_invalid_cost_params() {
        let err = PasswordHashing::new(&HashConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        })
        .err()
        .expect("zero iterations must be rejected");
        assert!(matches!(err, AppError::Hashing(_)));
    }

    #[tokio::test]
    async fn blocking_variants_match_sync_ones() {
        let h = hashing();
        let hash = h.hash_blocking("async-secret".into()).await.unwrap();
        assert!(h.verify_blocking("async-secret".into(), hash.clone()).await.unwrap());
        assert!(!h.verify_blocking("nope".into(), hash).await.unwrap());
    }
}
