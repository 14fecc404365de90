//! User registration, login and CRUD over a Postgres `users` table, with
//! stateless JWT access tokens.

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod state;
pub mod users;
