/// Single-use temporary token utilities
///
/// Temporary tokens back the email verification and password reset flows.
/// The plaintext token travels in a link sent to the user; the database only
/// ever stores its SHA-256 digest, so a leaked table cannot be replayed.
///
/// # Security
///
/// - **Format**: 40 hex characters (20 random bytes)
/// - **Storage**: SHA-256 digest (hex) plus an expiry timestamp
/// - **Lifetime**: 20 minutes
/// - **Single use**: consumption clears the stored digest atomically
///
/// # Example
///
/// ```
/// use taskcamp_shared::auth::token::{generate_temp_token, hash_temp_token};
///
/// let (token, hash) = generate_temp_token();
/// assert_eq!(token.len(), 40);
/// assert_eq!(hash.len(), 64);
///
/// // Same input = same digest (deterministic)
/// assert_eq!(hash_temp_token(&token), hash);
/// ```

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random bytes in a temporary token
const TOKEN_BYTES: usize = 20;

/// How long a temporary token stays valid
pub const TOKEN_TTL_MINUTES: i64 = 20;

/// Generates a new temporary token
///
/// # Returns
///
/// Tuple of (plaintext_token, sha256_digest). The plaintext goes into the
/// email link; the digest goes into the database.
///
/// # Example
///
/// ```
/// use taskcamp_shared::auth::token::generate_temp_token;
///
/// let (token, hash) = generate_temp_token();
/// assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
/// assert_ne!(token, hash);
/// ```
pub fn generate_temp_token() -> (String, String) {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);

    let token = hex::encode(bytes);
    let hash = hash_temp_token(&token);

    (token, hash)
}

/// Hashes a temporary token using SHA-256
///
/// # Returns
///
/// Hex-encoded SHA-256 digest (64 characters)
pub fn hash_temp_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Returns the expiry timestamp for a token generated now
pub fn token_expiry() -> DateTime<Utc> {
    Utc::now() + Duration::minutes(TOKEN_TTL_MINUTES)
}

/// Constant-time string comparison
///
/// Prevents timing attacks when comparing stored secrets (refresh tokens,
/// token digests) by ensuring comparison time does not depend on where the
/// strings first differ.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_temp_token_format() {
        let (token, hash) = generate_temp_token();

        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_tokens_are_unique() {
        let (token1, _) = generate_temp_token();
        let (token2, _) = generate_temp_token();
        assert_ne!(token1, token2);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let (token, hash) = generate_temp_token();
        assert_eq!(hash_temp_token(&token), hash);
        assert_eq!(hash_temp_token(&token), hash_temp_token(&token));
    }

    #[test]
    fn test_hash_differs_from_token() {
        let (token, hash) = generate_temp_token();
        assert_ne!(token, hash);
    }

    #[test]
    fn test_token_expiry_is_in_future() {
        let expiry = token_expiry();
        assert!(expiry > Utc::now());
        assert!(expiry <= Utc::now() + Duration::minutes(TOKEN_TTL_MINUTES));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
        assert!(constant_time_compare("", ""));
    }
}
