/// Middleware module
///
/// Custom middleware for authentication and authorization.

mod jwt_middleware;

pub use jwt_middleware::JwtMiddleware;
