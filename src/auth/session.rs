/// Session Lifecycle
///
/// Orchestrates register, login, refresh and logout on top of the token
/// issuer, the password hasher and the user/token stores. Each call runs to
/// completion on its own; the token store is the only coordination point.

use std::sync::Arc;

use crate::auth::claims::TokenKind;
use crate::auth::jwt::TokenIssuer;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::refresh_token::new_record;
use crate::auth::Role;
use crate::configuration::{AuthSettings, JwtSettings};
use crate::content::generate_username;
use crate::error::{AppError, AuthError, StoreError, ValidationError};
use crate::models::User;
use crate::store::{TokenStore, UserStore};
use crate::validators::{
    is_valid_email, is_valid_password, is_valid_role, FieldErrors, MAX_PASSWORD_LENGTH,
};

/// Attempts at finding a free generated username before giving up
const USERNAME_ATTEMPTS: usize = 5;

/// A freshly authenticated session
#[derive(Debug)]
pub struct AuthSession {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a refresh: both tokens are new
#[derive(Debug)]
pub struct RotatedTokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct SessionService {
    issuer: TokenIssuer,
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn TokenStore>,
    settings: AuthSettings,
}

impl SessionService {
    pub fn new(
        jwt: &JwtSettings,
        settings: AuthSettings,
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            issuer: TokenIssuer::new(jwt),
            users,
            tokens,
            settings,
        }
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Create an account and open its first session
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        role: Option<&str>,
    ) -> Result<AuthSession, AppError> {
        let mut errors = FieldErrors::new();
        let email = errors.check(is_valid_email(email));
        let password = errors.check(is_valid_password(password));
        let role = errors.check(is_valid_role(role));
        errors.into_result()?;

        // All three are Some once into_result passed
        let (email, password, role) = match (email, password, role) {
            (Some(e), Some(p), Some(r)) => (e, p, r),
            _ => return Err(AppError::Internal("validated fields missing".to_string())),
        };

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(ValidationError::field("email", "Email already in use").into());
        }

        if role == Role::Admin && !self.settings.is_admin_email(&email) {
            tracing::warn!(email = %email, "Rejected admin registration for non-allow-listed email");
            return Err(ValidationError::field("role", "You cannot register as an admin").into());
        }

        let password_hash = hash_password(&password, self.settings.hash_cost)?;
        let user = self.create_user(email, password_hash, role).await?;

        let (access_token, refresh_token) = self.open_session(&user).await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User registered successfully");

        Ok(AuthSession {
            user,
            access_token,
            refresh_token,
        })
    }

    /// Verify credentials and open an additional session
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let mut errors = FieldErrors::new();
        let email = errors.check(is_valid_email(email));
        if password.is_empty() {
            errors.check::<()>(Err(ValidationError::field("password", "Password is required")));
        }
        errors.into_result()?;
        let email = email.ok_or_else(|| AppError::Internal("validated email missing".to_string()))?;

        // No stored password can be longer; bcrypt would silently truncate it
        if password.len() > MAX_PASSWORD_LENGTH {
            return Err(AppError::Auth(AuthError::InvalidCredentials));
        }

        // Same error for unknown email and wrong password
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

        if !verify_password(password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "Login with wrong password");
            return Err(AppError::Auth(AuthError::InvalidCredentials));
        }

        match self.tokens.purge_expired().await {
            Ok(0) => {}
            Ok(purged) => tracing::debug!(purged, "Expired refresh tokens purged"),
            Err(e) => tracing::warn!(error = %e, "Failed to purge expired refresh tokens"),
        }

        let (access_token, refresh_token) = self.open_session(&user).await?;

        tracing::info!(user_id = %user.id, "User logged in successfully");

        Ok(AuthSession {
            user,
            access_token,
            refresh_token,
        })
    }

    /// Exchange a refresh token for a new pair; the presented token is
    /// consumed and cannot be used again.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RotatedTokens, AppError> {
        let claims = self.issuer.verify(refresh_token, TokenKind::Refresh)?;
        let user_id = claims.user_id()?;

        let user = match self.users.find_by_id(user_id).await? {
            Some(user) => user,
            None => {
                self.tokens.delete_by_token(refresh_token).await?;
                tracing::warn!(user_id = %user_id, "Refresh token for a deleted user");
                return Err(AppError::Auth(AuthError::TokenRevoked));
            }
        };

        let new_refresh = self.issuer.issue_refresh_token(user.id, user.role)?;
        let record = new_record(user.id, &new_refresh, self.issuer.refresh_expiry());

        if !self.tokens.rotate(refresh_token, &record).await? {
            tracing::warn!(user_id = %user.id, "Attempt to reuse a rotated or revoked refresh token");
            return Err(AppError::Auth(AuthError::TokenRevoked));
        }

        // Role comes from the store so role changes apply on the next refresh
        let access_token = self.issuer.issue_access_token(user.id, user.role)?;

        tracing::info!(user_id = %user.id, "Token refreshed successfully");

        Ok(RotatedTokens {
            access_token,
            refresh_token: new_refresh,
        })
    }

    /// Revoke the session for `refresh_token`. Unknown tokens are ignored.
    pub async fn logout(&self, refresh_token: Option<&str>) -> Result<(), AppError> {
        if let Some(token) = refresh_token {
            if self.tokens.delete_by_token(token).await? {
                tracing::info!("Refresh token revoked");
            } else {
                tracing::debug!("Logout with unknown refresh token");
            }
        }
        Ok(())
    }

    async fn create_user(&self, email: String, password_hash: String, role: Role) -> Result<User, AppError> {
        for _ in 0..USERNAME_ATTEMPTS {
            let user = User::new(generate_username(), email.clone(), password_hash.clone(), role);
            match self.users.create(&user).await {
                Ok(()) => return Ok(user),
                Err(StoreError::Duplicate(constraint)) if constraint.contains("username") => continue,
                Err(StoreError::Duplicate(_)) => {
                    // Lost a race with a concurrent registration of the same email
                    return Err(ValidationError::field("email", "Email already in use").into());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(AppError::Internal("could not allocate a unique username".to_string()))
    }

    async fn open_session(&self, user: &User) -> Result<(String, String), AppError> {
        let access_token = self.issuer.issue_access_token(user.id, user.role)?;
        let refresh_token = self.issuer.issue_refresh_token(user.id, user.role)?;

        self.tokens
            .create(&new_record(user.id, &refresh_token, self.issuer.refresh_expiry()))
            .await?;

        Ok((access_token, refresh_token))
    }
}
