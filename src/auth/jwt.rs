/// JWT Token Issuance and Validation
///
/// Access and refresh tokens are HS256 JWTs signed with separate secrets.
/// Verification fails closed: any signature, expiry, issuer or kind mismatch
/// is an authentication error.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenKind};
use crate::auth::Role;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

#[derive(Clone)]
pub struct TokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_expiry: i64,
    refresh_expiry: i64,
    issuer: String,
}

impl TokenIssuer {
    pub fn new(config: &JwtSettings) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            access_expiry: config.access_token_expiry,
            refresh_expiry: config.refresh_token_expiry,
            issuer: config.issuer.clone(),
        }
    }

    /// Lifetime of refresh tokens in seconds
    pub fn refresh_expiry(&self) -> i64 {
        self.refresh_expiry
    }

    /// Short-lived token carrying identity and role
    pub fn issue_access_token(&self, user_id: Uuid, role: Role) -> Result<String, AppError> {
        let claims = Claims::new(user_id, role, TokenKind::Access, self.access_expiry, self.issuer.clone());
        self.sign(&claims, &self.access_encoding)
    }

    /// Long-lived token, valid only while a matching store record exists
    pub fn issue_refresh_token(&self, user_id: Uuid, role: Role) -> Result<String, AppError> {
        let claims = Claims::new(user_id, role, TokenKind::Refresh, self.refresh_expiry, self.issuer.clone());
        self.sign(&claims, &self.refresh_encoding)
    }

    /// Validate a token of the expected kind and return its claims
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, AppError> {
        let key = match expected {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.leeway = 0;

        let claims = decode::<Claims>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, kind = ?expected, "JWT validation error");
                match e.kind() {
                    ErrorKind::ExpiredSignature => AppError::Auth(AuthError::TokenExpired),
                    _ => AppError::Auth(AuthError::TokenInvalid),
                }
            })?;

        if claims.kind != expected {
            tracing::warn!(user_id = %claims.sub, "Token presented as the wrong kind");
            return Err(AppError::Auth(AuthError::TokenInvalid));
        }

        Ok(claims)
    }

    fn sign(&self, claims: &Claims, key: &EncodingKey) -> Result<String, AppError> {
        encode(&Header::default(), claims, key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            access_secret: "test-access-secret-at-least-32-characters".to_string(),
            refresh_secret: "test-refresh-secret-at-least-32-characters".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
        }
    }

    #[test]
    fn test_issue_and_verify_access_token() {
        let issuer = TokenIssuer::new(&get_test_config());
        let user_id = Uuid::new_v4();

        let token = issuer.issue_access_token(user_id, Role::Admin).expect("Failed to issue token");
        let claims = issuer.verify(&token, TokenKind::Access).expect("Failed to verify token");

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.iss, "test");
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_kinds_are_not_interchangeable() {
        let issuer = TokenIssuer::new(&get_test_config());
        let user_id = Uuid::new_v4();

        let access = issuer.issue_access_token(user_id, Role::User).unwrap();
        let refresh = issuer.issue_refresh_token(user_id, Role::User).unwrap();

        assert!(issuer.verify(&access, TokenKind::Refresh).is_err());
        assert!(issuer.verify(&refresh, TokenKind::Access).is_err());
        assert!(issuer.verify(&refresh, TokenKind::Refresh).is_ok());
    }

    #[test]
    fn test_kind_claim_checked_even_with_shared_secret() {
        let mut config = get_test_config();
        config.refresh_secret = config.access_secret.clone();
        let issuer = TokenIssuer::new(&config);

        let refresh = issuer.issue_refresh_token(Uuid::new_v4(), Role::User).unwrap();
        assert!(matches!(
            issuer.verify(&refresh, TokenKind::Access),
            Err(AppError::Auth(AuthError::TokenInvalid))
        ));
    }

    #[test]
    fn test_invalid_token() {
        let issuer = TokenIssuer::new(&get_test_config());
        assert!(issuer.verify("invalid.token.here", TokenKind::Access).is_err());
    }

    #[test]
    fn test_tampered_token() {
        let issuer = TokenIssuer::new(&get_test_config());
        let token = issuer.issue_access_token(Uuid::new_v4(), Role::User).unwrap();

        let tampered = format!("{}X", token);
        assert!(issuer.verify(&tampered, TokenKind::Access).is_err());
    }

    #[test]
    fn test_expired_token() {
        let mut config = get_test_config();
        config.access_token_expiry = -10;
        let issuer = TokenIssuer::new(&config);

        let token = issuer.issue_access_token(Uuid::new_v4(), Role::User).unwrap();
        assert!(matches!(
            issuer.verify(&token, TokenKind::Access),
            Err(AppError::Auth(AuthError::TokenExpired))
        ));
    }

    #[test]
    fn test_wrong_issuer() {
        let config = get_test_config();
        let token = TokenIssuer::new(&config)
            .issue_access_token(Uuid::new_v4(), Role::User)
            .unwrap();

        let mut other = config.clone();
        other.issuer = "wrong-issuer".to_string();
        assert!(TokenIssuer::new(&other).verify(&token, TokenKind::Access).is_err());
    }
}
