/// Refresh Token Records
///
/// Refresh tokens are signed JWTs handed to the client in an HTTP-only
/// cookie. The server keeps one record per active session holding only the
/// SHA-256 of the token string; deleting the record revokes the session.

use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::RefreshTokenRecord;

/// Hash a refresh token using SHA-256 (hex encoded)
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Build the record persisted alongside a freshly issued refresh token
pub fn new_record(user_id: Uuid, token: &str, expiry_seconds: i64) -> RefreshTokenRecord {
    let now = Utc::now();
    RefreshTokenRecord {
        id: Uuid::new_v4(),
        user_id,
        token_hash: hash_token(token),
        expires_at: now + Duration::seconds(expiry_seconds),
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_hashing() {
        let hash1 = hash_token("header.payload.signature");
        let hash2 = hash_token("header.payload.signature");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, "header.payload.signature");
        // SHA-256 hex
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_tokens_different_hashes() {
        assert_ne!(hash_token("a.b.c"), hash_token("a.b.d"));
    }

    #[test]
    fn test_new_record() {
        let user_id = Uuid::new_v4();
        let record = new_record(user_id, "a.b.c", 60);

        assert_eq!(record.user_id, user_id);
        assert_eq!(record.token_hash, hash_token("a.b.c"));
        assert_eq!((record.expires_at - record.created_at).num_seconds(), 60);
    }
}
