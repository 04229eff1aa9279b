//! # Taskcamp Shared Library
//!
//! This crate contains the data layer and business rules shared by the
//! Taskcamp API server and any auxiliary binaries.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their CRUD operations
//! - `auth`: Password hashing, JWT tokens, single-use tokens, project authorization
//! - `db`: Connection pool and migration runner
//! - `gateway`: External service traits (file storage, outbound email)

pub mod auth;
pub mod db;
pub mod gateway;
pub mod models;

/// Current version of the Taskcamp shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
