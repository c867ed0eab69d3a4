/// Password Hashing and Verification
///
/// bcrypt with a configurable work factor. Input length is checked by
/// `validators::is_valid_password` before anything reaches this module.

use bcrypt::{hash, verify};

use crate::error::AppError;

/// Hash a password using bcrypt
///
/// # Errors
/// Returns a server error if bcrypt rejects the cost or input
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[test]
    fn test_hash_password() {
        let password = "longenough1";
        let hash = hash_password(password, TEST_COST).expect("Failed to hash password");

        assert_ne!(password, hash);
        assert!(hash.starts_with("$2"));
    }

    #[test]
    fn test_same_password_hashes_differently() {
        let a = hash_password("longenough1", TEST_COST).unwrap();
        let b = hash_password("longenough1", TEST_COST).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("longenough1", TEST_COST).unwrap();
        assert!(verify_password("longenough1", &hash).unwrap());
        assert!(!verify_password("wrongpassword", &hash).unwrap());
    }

    #[test]
    fn test_invalid_cost_is_server_error() {
        assert!(matches!(hash_password("longenough1", 1), Err(AppError::Internal(_))));
    }

    #[test]
    fn test_malformed_hash_is_server_error() {
        assert!(verify_password("longenough1", "not-a-bcrypt-hash").is_err());
    }
}
