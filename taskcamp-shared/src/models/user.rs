/// User model and database operations
///
/// This module provides the User model and the credential bookkeeping that
/// the authentication flows depend on: the Argon2id password hash, the
/// hashed single-use tokens for email verification and password reset, and
/// the currently valid refresh token.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL UNIQUE,
///     username VARCHAR(100) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     full_name VARCHAR(255),
///     avatar_url VARCHAR(512),
///     avatar_file_id VARCHAR(255),
///     email_verified BOOLEAN NOT NULL DEFAULT FALSE,
///     email_verification_token_hash VARCHAR(64),
///     email_verification_expires_at TIMESTAMPTZ,
///     password_reset_token_hash VARCHAR(64),
///     password_reset_expires_at TIMESTAMPTZ,
///     refresh_token TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// The struct deliberately does not implement `Serialize`; API responses use
/// [`PublicUser`] or [`UserSummary`], which never carry credential columns.
///
/// # Example
///
/// ```no_run
/// use taskcamp_shared::models::user::{CreateUser, User};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "user@example.com".to_string(),
///     username: "user1".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     full_name: Some("Jordan Doe".to_string()),
/// }).await?;
///
/// let found = User::find_by_email(&pool, "user@example.com").await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// All user columns, in the order the struct expects them
const USER_COLUMNS: &str = "id, email, username, password_hash, full_name, avatar_url, \
     avatar_file_id, email_verified, email_verification_token_hash, \
     email_verification_expires_at, password_reset_token_hash, \
     password_reset_expires_at, refresh_token, created_at, updated_at, last_login_at";

/// User model representing a user account
///
/// Passwords are stored as Argon2id hashes, temporary tokens as SHA-256
/// digests. Neither is ever returned to API clients.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address (stored lowercase, unique)
    pub email: String,

    /// Username (stored lowercase, unique)
    pub username: String,

    /// Argon2id password hash
    pub password_hash: String,

    /// Optional display name
    pub full_name: Option<String>,

    /// Optional avatar URL
    pub avatar_url: Option<String>,

    /// Storage gateway file id for the avatar, if one was uploaded
    pub avatar_file_id: Option<String>,

    /// Whether the email address has been verified
    pub email_verified: bool,

    /// SHA-256 digest of the pending email verification token
    pub email_verification_token_hash: Option<String>,

    /// When the pending verification token expires
    pub email_verification_expires_at: Option<DateTime<Utc>>,

    /// SHA-256 digest of the pending password reset token
    pub password_reset_token_hash: Option<String>,

    /// When the pending reset token expires
    pub password_reset_expires_at: Option<DateTime<Utc>>,

    /// The one currently valid refresh token (single active session)
    pub refresh_token: Option<String>,

    /// When the user account was created
    pub created_at: DateTime<Utc>,

    /// When the user account was last updated
    pub updated_at: DateTime<Utc>,

    /// When the user last logged in (None if never logged in)
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    /// Email address (will be stored lowercase)
    pub email: String,

    /// Username (will be stored lowercase)
    pub username: String,

    /// Argon2id password hash (NOT the plaintext password)
    pub password_hash: String,

    /// Optional display name
    pub full_name: Option<String>,
}

/// Compact user profile for embedding in other responses
///
/// Used wherever a task assignee, subtask creator, or project member is
/// rendered alongside another resource.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSummary {
    /// User ID
    pub id: Uuid,

    /// Email address
    pub email: String,

    /// Username
    pub username: String,

    /// Optional display name
    pub full_name: Option<String>,

    /// Optional avatar URL
    pub avatar_url: Option<String>,
}

/// Full sanitized user for auth responses (`/me`, login, register)
///
/// Never contains the password hash, token digests, or refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    /// User ID
    pub id: Uuid,

    /// Email address
    pub email: String,

    /// Username
    pub username: String,

    /// Optional display name
    pub full_name: Option<String>,

    /// Optional avatar URL
    pub avatar_url: Option<String>,

    /// Whether the email address has been verified
    pub email_verified: bool,

    /// Account creation time
    pub created_at: DateTime<Utc>,

    /// Last login time
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            avatar_url: user.avatar_url.clone(),
            email_verified: user.email_verified,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

impl User {
    /// Returns the compact profile for this user
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            full_name: self.full_name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }

    /// Creates a new user in the database
    ///
    /// Email and username are normalized to lowercase before insert.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Email or username already exists (unique constraint violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, username, password_hash, full_name)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(data.email.trim().to_lowercase())
            .bind(data.username.trim().to_lowercase())
            .bind(data.password_hash)
            .bind(data.full_name)
            .fetch_one(pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by email address (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        let user = sqlx::query_as::<_, User>(&query)
            .bind(email.trim().to_lowercase())
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Stores a fresh email verification token digest and expiry
    ///
    /// Overwrites any previous pending token, so only the most recently
    /// issued link works.
    pub async fn set_verification_token(
        pool: &PgPool,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email_verification_token_hash = $2,
                email_verification_expires_at = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Consumes an email verification token
    ///
    /// A single UPDATE matches on the token digest and a still-valid expiry,
    /// marks the email verified, and clears the token columns. The statement
    /// is atomic, so a token can only ever be consumed once.
    ///
    /// # Returns
    ///
    /// The verified user, or None if the token is unknown, expired, or
    /// already used.
    pub async fn consume_verification_token(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE users
             SET email_verified = TRUE,
                 email_verification_token_hash = NULL,
                 email_verification_expires_at = NULL,
                 updated_at = NOW()
             WHERE email_verification_token_hash = $1
               AND email_verification_expires_at > NOW()
             RETURNING {USER_COLUMNS}"
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(token_hash)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Stores a fresh password reset token digest and expiry
    pub async fn set_password_reset_token(
        pool: &PgPool,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token_hash = $2,
                password_reset_expires_at = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Consumes a password reset token and installs the new password hash
    ///
    /// The same atomic single-statement pattern as
    /// [`consume_verification_token`](User::consume_verification_token).
    /// Also clears the refresh token: sessions issued under the old password
    /// die with it.
    pub async fn consume_password_reset_token(
        pool: &PgPool,
        token_hash: &str,
        new_password_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE users
             SET password_hash = $2,
                 password_reset_token_hash = NULL,
                 password_reset_expires_at = NULL,
                 refresh_token = NULL,
                 updated_at = NOW()
             WHERE password_reset_token_hash = $1
               AND password_reset_expires_at > NOW()
             RETURNING {USER_COLUMNS}"
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(token_hash)
            .bind(new_password_hash)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Replaces the stored password hash
    pub async fn update_password(
        pool: &PgPool,
        id: Uuid,
        new_password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(new_password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stores (or clears) the currently valid refresh token
    ///
    /// Writing a new token rotates the session: the previously issued
    /// refresh token no longer matches and is rejected on the next refresh.
    pub async fn store_refresh_token(
        pool: &PgPool,
        id: Uuid,
        refresh_token: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET refresh_token = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(refresh_token)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Updates the last login timestamp for a user
    ///
    /// Called after successful authentication.
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            username: "tester".to_string(),
            password_hash: "$argon2id$hash".to_string(),
            full_name: Some("Test User".to_string()),
            avatar_url: None,
            avatar_file_id: None,
            email_verified: false,
            email_verification_token_hash: Some("digest".to_string()),
            email_verification_expires_at: Some(Utc::now()),
            password_reset_token_hash: None,
            password_reset_expires_at: None,
            refresh_token: Some("refresh".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn test_public_user_has_no_credentials() {
        let user = sample_user();
        let public = PublicUser::from(&user);

        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("token"));
        assert!(!json.contains("$argon2id$hash"));
        assert!(json.contains("test@example.com"));
    }

    #[test]
    fn test_summary_fields() {
        let user = sample_user();
        let summary = user.summary();

        assert_eq!(summary.id, user.id);
        assert_eq!(summary.username, "tester");
        assert_eq!(summary.full_name.as_deref(), Some("Test User"));
    }

    // Integration tests for database operations are in taskcamp-api/tests/
}
