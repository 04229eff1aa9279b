/// Authentication and authorization utilities
///
/// This module provides the security primitives for Taskcamp:
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength validation
/// - [`jwt`]: JWT access/refresh token generation and validation
/// - [`token`]: Single-use temporary tokens (email verification, password reset)
/// - [`authorization`]: Project-scoped role checks and membership invariants
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **JWT Tokens**: HS256 signing, separate access and refresh token types
/// - **Temporary Tokens**: Random tokens stored only as SHA-256 digests
/// - **Constant-time Comparison**: All secret verification uses constant-time operations
///
/// # Example
///
/// ```no_run
/// use taskcamp_shared::auth::password::{hash_password, verify_password};
/// use taskcamp_shared::auth::jwt::{create_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), TokenType::Access);
/// let token = create_token(&claims, "secret-key-at-least-32-bytes-long!!")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod password;
pub mod token;
