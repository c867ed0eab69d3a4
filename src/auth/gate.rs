/// Authorization gate: role allow-lists per route
use crate::auth::{Claims, Role};
use crate::error::AppError;

/// Fails with 403 when the token's role is not in `allowed`
pub fn authorize(claims: &Claims, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&claims.role) {
        Ok(())
    } else {
        tracing::warn!(
            user_id = %claims.sub,
            role = %claims.role,
            "Role not permitted for this route"
        );
        Err(AppError::Forbidden(
            "Access denied, insufficient permissions".to_string(),
        ))
    }
}

/// Resource-level check: the owner, or an admin, may act on it
pub fn authorize_owner_or_admin(claims: &Claims, owner_id: &uuid::Uuid) -> Result<(), AppError> {
    if claims.role == Role::Admin || claims.sub == owner_id.to_string() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You are not allowed to modify this resource".to_string(),
        ))
    }
}
