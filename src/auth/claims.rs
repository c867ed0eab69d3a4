/// JWT Claims structure
///
/// Represents the payload of both token kinds: user identity, role and
/// the standard JWT claims (RFC 7519).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Role;
use crate::error::{AppError, AuthError};

/// Which of the two token kinds a JWT was minted as
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    pub role: Role,
    pub kind: TokenKind,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Unique token id; keeps tokens minted in the same second distinct
    pub jti: String,
}

impl Claims {
    pub fn new(
        user_id: Uuid,
        role: Role,
        kind: TokenKind,
        expiry_seconds: i64,
        issuer: String,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            role,
            kind,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Extract user ID from claims
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Auth(AuthError::TokenInvalid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, Role::Admin, TokenKind::Access, 3600, "test".to_string());

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.iss, "test");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_user_id_extraction() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, Role::User, TokenKind::Refresh, 3600, "test".to_string());

        assert_eq!(claims.user_id().unwrap(), user_id);
    }

    #[test]
    fn test_invalid_user_id() {
        let mut claims = Claims::new(Uuid::new_v4(), Role::User, TokenKind::Access, 3600, "test".to_string());
        claims.sub = "invalid-uuid".to_string();

        assert!(matches!(claims.user_id(), Err(AppError::Auth(AuthError::TokenInvalid))));
    }

    #[test]
    fn test_each_claims_gets_its_own_jti() {
        let user_id = Uuid::new_v4();
        let a = Claims::new(user_id, Role::User, TokenKind::Refresh, 60, "test".to_string());
        let b = Claims::new(user_id, Role::User, TokenKind::Refresh, 60, "test".to_string());

        assert_ne!(a.jti, b.jti);
    }
}
