/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Account lifecycle (register, verify, login, refresh, reset)
/// - `projects`: Project CRUD and leave
/// - `members`: Project membership management
/// - `tasks`: Task CRUD and attachments
/// - `subtasks`: Subtask CRUD and the status recomputation hook
/// - `notes`: Project notes

pub mod auth;
pub mod health;
pub mod members;
pub mod notes;
pub mod projects;
pub mod subtasks;
pub mod tasks;
