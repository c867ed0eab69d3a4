/// Authentication module
///
/// Handles JWT issuance/validation, password hashing, refresh token
/// records, role checks and the session lifecycle built on top of them.

mod claims;
mod gate;
mod jwt;
mod password;
mod refresh_token;
mod role;
mod session;

pub use claims::{Claims, TokenKind};
pub use gate::{authorize, authorize_owner_or_admin};
pub use jwt::TokenIssuer;
pub use password::{hash_password, verify_password};
pub use refresh_token::{hash_token, new_record as new_refresh_record};
pub use role::{Role, UnknownRole, ADMIN_ONLY, ANY_ROLE};
pub use session::{AuthSession, RotatedTokens, SessionService};
