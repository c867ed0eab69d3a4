/// JWT Authentication Middleware
///
/// Validates the bearer access token, applies the route's role allow-list
/// and injects the claims into request extensions for handlers
/// (`web::ReqData<Claims>`).

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{authorize, Claims, Role, TokenIssuer, TokenKind, ANY_ROLE};
use crate::error::{AppError, AuthError};
use crate::logger::RequestId;

/// JWT middleware for protecting routes
///
/// Missing or invalid tokens are rejected with 401; a valid token whose
/// role is not allowed is rejected with 403. Rejections are rendered here
/// so outer middleware sees them as ordinary responses.
pub struct JwtMiddleware {
    issuer: TokenIssuer,
    allowed: &'static [Role],
}

impl JwtMiddleware {
    /// Any authenticated role is accepted until `allow` narrows it
    pub fn new(issuer: TokenIssuer) -> Self {
        Self {
            issuer,
            allowed: ANY_ROLE,
        }
    }

    pub fn allow(mut self, roles: &'static [Role]) -> Self {
        self.allowed = roles;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            issuer: self.issuer.clone(),
            allowed: self.allowed,
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    issuer: TokenIssuer,
    allowed: &'static [Role],
}

/// Pull the token out of `Authorization: Bearer <token>`
fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

impl<S> JwtMiddlewareService<S> {
    fn authenticate(&self, req: &ServiceRequest) -> Result<Claims, AppError> {
        let token = bearer_token(req).ok_or(AppError::Auth(AuthError::MissingToken))?;
        let claims = self.issuer.verify(&token, TokenKind::Access)?;
        authorize(&claims, self.allowed)?;
        Ok(claims)
    }
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match self.authenticate(&req) {
            Ok(claims) => {
                tracing::debug!(
                    user_id = %claims.sub,
                    role = %claims.role,
                    "JWT validated successfully"
                );
                req.extensions_mut().insert(claims);

                let service = self.service.clone();
                Box::pin(async move {
                    service
                        .call(req)
                        .await
                        .map(ServiceResponse::map_into_left_body)
                })
            }
            Err(e) => {
                let request_id = req
                    .extensions()
                    .get::<RequestId>()
                    .map(|id| id.0.clone())
                    .unwrap_or_default();
                tracing::debug!(
                    request_id = %request_id,
                    path = %req.path(),
                    error = %e,
                    "Request rejected by JWT middleware"
                );
                Box::pin(async move { Ok(req.error_response(e).map_into_right_body()) })
            }
        }
    }
}
