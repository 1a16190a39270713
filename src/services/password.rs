//! Password hashing and the password strength policy
//!
//! Hashes use Argon2id with the crate's default parameters and a random salt
//! per hash, stored in PHC string format.

use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::forms::validators::PASSWORD_MIN_LENGTH;

/// Passwords rejected outright regardless of length
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "password123",
    "12345678",
    "123456789",
    "1234567890",
    "qwertyuiop",
    "qwerty123",
    "iloveyou",
    "sunshine",
    "princess",
    "football",
    "baseball",
    "welcome1",
    "letmein1",
    "admin123",
    "abc12345",
    "11111111",
    "00000000",
    "blogicum",
];

/// Hash a password using Argon2id.
///
/// ```ignore
/// use blogicum::services::password::hash_password;
///
/// let hash = hash_password("war-and-peace")?;
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
        .context("Password hashing failed")?;

    Ok(password_hash.to_string())
}

/// Verify a password against a stored hash.
///
/// A wrong password is `Ok(false)`; a malformed hash is an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))
        .context("Failed to parse password hash")?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Password verification failed: {}", e))
            .context("Password verification error"),
    }
}

/// Check a new password against the strength policy.
///
/// Returns every message that applies, empty when the password is
/// acceptable.
pub fn password_problems(password: &str, username: &str) -> Vec<String> {
    let mut problems = Vec::new();

    if password.chars().count() < PASSWORD_MIN_LENGTH {
        problems.push(format!(
            "This password is too short. It must contain at least {} characters.",
            PASSWORD_MIN_LENGTH
        ));
    }

    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        problems.push("This password is too common.".to_string());
    }

    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }

    if too_similar(&lowered, &username.to_lowercase()) {
        problems.push("The password is too similar to the username.".to_string());
    }

    problems
}

/// The password contains the username or the other way round
fn too_similar(password: &str, username: &str) -> bool {
    if password.is_empty() || username.chars().count() < 3 {
        return false;
    }
    password.contains(username) || username.contains(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_produces_argon2id_hash() {
        let hash = hash_password("test_password_123").expect("Failed to hash password");
        assert!(hash.starts_with("$argon2id$"), "Hash should use Argon2id");
    }

    #[test]
    fn test_hash_password_produces_different_hashes() {
        let hash1 = hash_password("same_password").expect("Failed to hash password");
        let hash2 = hash_password("same_password").expect("Failed to hash password");
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("correct_password").expect("Failed to hash password");

        assert!(verify_password("correct_password", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
        assert!(verify_password("password", "invalid_hash_format").is_err());
    }

    #[test]
    fn test_hash_password_unicode() {
        let hash = hash_password("пароль-война-и-мир").expect("Failed to hash unicode password");
        assert!(verify_password("пароль-война-и-мир", &hash).unwrap());
    }

    #[test]
    fn test_strong_password_accepted() {
        assert!(password_problems("war-and-peace-1869", "leo").is_empty());
    }

    #[test]
    fn test_password_policy_messages() {
        let problems = password_problems("1234567", "leo");
        assert_eq!(problems.len(), 2, "{:?}", problems);
        assert!(problems[0].contains("too short"));
        assert!(problems[1].contains("entirely numeric"));

        assert_eq!(
            password_problems("Password123", "leo"),
            vec!["This password is too common.".to_string()]
        );
        assert_eq!(
            password_problems("tolstoy-leo", "Tolstoy"),
            vec!["The password is too similar to the username.".to_string()]
        );
    }

    #[test]
    fn test_short_usernames_do_not_trigger_similarity() {
        assert!(password_problems("abacaba-xyz", "ab").is_empty());
    }
}
