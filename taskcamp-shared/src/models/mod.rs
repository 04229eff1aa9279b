/// Database models for Taskcamp
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: User accounts and credential bookkeeping
/// - `project`: Projects, the unit of collaboration
/// - `membership`: User-project relationships with roles
/// - `task`: Tasks, attachments, and the derived-status machine
/// - `subtask`: Checklist items that drive task status
/// - `note`: Free-form project notes
///
/// # Example
///
/// ```no_run
/// use taskcamp_shared::models::user::{User, CreateUser};
/// use taskcamp_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let new_user = CreateUser {
///     email: "user@example.com".to_string(),
///     username: "user1".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     full_name: Some("Jordan Doe".to_string()),
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod membership;
pub mod note;
pub mod project;
pub mod subtask;
pub mod task;
pub mod user;
