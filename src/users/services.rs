use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::password::PasswordHashing,
    error::{AppError, AppResult},
    users::{
        dto::{CreateUserRequest, PublicUser, UpdateUserRequest},
        repo::UserRepo,
        repo_types::{NewUser, User, UserChanges},
    },
};

const MAX_NAME_CHARS: usize = 100;
pub(crate) const MAX_PASSWORD_BYTES: usize = 1024;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trims and checks an email. Case is preserved; lookups are exact.
pub(crate) fn normalize_email(raw: &str) -> AppResult<String> {
    let email = raw.trim();
    if !is_valid_email(email) {
        return Err(AppError::Validation("Invalid email".into()));
    }
    Ok(email.to_string())
}

pub(crate) fn normalize_name(raw: &str) -> AppResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".into()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::Validation("Name is too long".into()));
    }
    Ok(name.to_string())
}

pub(crate) fn check_password(password: &str) -> AppResult<()> {
    if password.is_empty() {
        return Err(AppError::Validation("Password is required".into()));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::Validation("Password is too long".into()));
    }
    Ok(())
}

/// CRUD over user records. Every password that reaches the store goes through
/// `PasswordHashing` here first.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepo>,
    hashing: PasswordHashing,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepo>, hashing: PasswordHashing) -> Self {
        Self { repo, hashing }
    }

    pub fn hashing(&self) -> &PasswordHashing {
        &self.hashing
    }

    pub(crate) async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.repo.find_by_email(email).await?)
    }

    /// Validate, check uniqueness, hash, insert. A unique violation raised by the
    /// store after the check (concurrent insert) maps to the same conflict.
    pub async fn create(&self, req: CreateUserRequest) -> AppResult<PublicUser> {
        let name = normalize_name(&req.name)?;
        let email = normalize_email(&req.email)?;
        check_password(&req.password)?;

        if self.repo.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AppError::DuplicateEmail);
        }

        let password_hash = self.hashing.hash_blocking(req.password).await?;
        let user = self
            .repo
            .create(NewUser {
                name,
                email,
                password_hash,
            })
            .await?;

        info!(user_id = %user.id, "user created");
        Ok(user.into())
    }

    pub async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<PublicUser>> {
        let users = self.repo.list(limit, offset).await?;
        Ok(users.into_iter().map(PublicUser::from).collect())
    }

    pub async fn get(&self, id: Uuid) -> AppResult<PublicUser> {
        self.repo
            .find_by_id(id)
            .await?
            .map(PublicUser::from)
            .ok_or(AppError::NotFound("User"))
    }

    /// Partial update. An update that changes nothing is rejected as a validation error.
    pub async fn update(&self, id: Uuid, req: UpdateUserRequest) -> AppResult<PublicUser> {
        if self.repo.find_by_id(id).await?.is_none() {
            return Err(AppError::NotFound("User"));
        }

        let mut changes = UserChanges::default();
        if let Some(name) = req.name.as_deref() {
            changes.name = Some(normalize_name(name)?);
        }
        if let Some(email) = req.email.as_deref() {
            let email = normalize_email(email)?;
            if let Some(other) = self.repo.find_by_email(&email).await? {
                if other.id != id {
                    warn!(user_id = %id, email = %email, "email already in use");
                    return Err(AppError::DuplicateEmail);
                }
            }
            changes.email = Some(email);
        }
        let password = req.password.filter(|p| !p.is_empty());
        if let Some(password) = &password {
            check_password(password)?;
        }
        if changes.is_empty() && password.is_none() {
            return Err(AppError::Validation("No fields to update".into()));
        }
        if let Some(password) = password {
            changes.password_hash = Some(self.hashing.hash_blocking(password).await?);
        }

        let user = self
            .repo
            .update(id, changes)
            .await?
            .ok_or(AppError::NotFound("User"))?;
        info!(user_id = %user.id, "user updated");
        Ok(user.into())
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.repo.delete(id).await? {
            return Err(AppError::NotFound("User"));
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }
}
