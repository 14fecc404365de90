use std::net::SocketAddr;

use anyhow::{anyhow, bail, Context};
use jsonwebtoken::Algorithm;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct HashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub jwt: JwtConfig,
    pub hash: HashConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. A missing or blank `JWT_SECRET` is an error,
    /// there is no fallback secret.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL is not set")?;

        let host = lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(&lookup, "APP_PORT", 8080)?;
        let listen_addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .map_err(|_| anyhow!("APP_HOST has an invalid value: {host:?}"))?;

        let secret = lookup("JWT_SECRET").context("JWT_SECRET is not set")?;
        if secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }

        let algorithm = match lookup("JWT_ALGORITHM").as_deref() {
            None | Some("HS256") => Algorithm::HS256,
            Some("HS384") => Algorithm::HS384,
            Some("HS512") => Algorithm::HS512,
            Some(other) => bail!("JWT_ALGORITHM {other:?} is not supported (use HS256, HS384 or HS512)"),
        };

        let ttl_minutes = parse_or(&lookup, "JWT_TTL_MINUTES", 60 * 24)?;
        if ttl_minutes <= 0 {
            bail!("JWT_TTL_MINUTES must be positive");
        }

        let jwt = JwtConfig {
            secret,
            algorithm,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "user-api".into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "user-api-clients".into()),
            ttl_minutes,
        };

        let defaults = HashConfig::default();
        let hash = HashConfig {
            memory_kib: parse_or(&lookup, "HASH_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or(&lookup, "HASH_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or(&lookup, "HASH_PARALLELISM", defaults.parallelism)?,
        };

        Ok(Self {
            database_url,
            listen_addr,
            jwt,
            hash,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow!("{key} has an invalid value: {raw:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn loads_defaults_with_required_vars() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/app"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .expect("config should load");

        assert_eq!(cfg.jwt.algorithm, Algorithm::HS256);
        assert_eq!(cfg.jwt.ttl_minutes, 1440);
        assert_eq!(cfg.jwt.issuer, "user-api");
        assert_eq!(cfg.hash.memory_kib, 19_456);
        assert_eq!(cfg.listen_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
    }

    fn with_required(extra: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let mut pairs = vec![("DATABASE_URL", "postgres://x"), ("JWT_SECRET", "k")];
        pairs.extend_from_slice(extra);
        AppConfig::from_lookup(lookup_from(&pairs))
    }

    #[test]
    fn listen_address_comes_from_host_and_port() {
        let cfg = with_required(&[("APP_HOST", "127.0.0.1"), ("APP_PORT", "3000")]).unwrap();
        assert_eq!(cfg.listen_addr, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());

        let err = with_required(&[("APP_PORT", "99999")]).unwrap_err();
        assert!(err.to_string().contains("APP_PORT"));

        let err = with_required(&[("APP_HOST", "not a host")]).unwrap_err();
        assert!(err.to_string().contains("APP_HOST"));
    }

    #[test]
    fn missing_secret_fails() {
        let err = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://x")]))
            .unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn blank_secret_fails() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "   "),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn rejects_asymmetric_algorithm_and_bad_numbers() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "k"),
            ("JWT_ALGORITHM", "RS256"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("JWT_ALGORITHM"));

        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "k"),
            ("HASH_ITERATIONS", "many"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("HASH_ITERATIONS"));

        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "k"),
            ("JWT_TTL_MINUTES", "0"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("positive"));
    }
}
