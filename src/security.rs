/// Security middleware module for hardening every response
/// Features:
/// - Rate limiting per client address (token bucket)
/// - CORS restricted to the configured origins, with credentials
/// - Security headers (MIME sniffing, clickjacking, CSP, HSTS)

use actix_cors::Cors;
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{
        header::{self, HeaderName},
        Method,
    },
    middleware::DefaultHeaders,
    Error,
};
use futures::future::LocalBoxFuture;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::configuration::{Environment, SecuritySettings, Settings};
use crate::error::AppError;
use crate::logger::REQUEST_ID_HEADER;

/// Buckets are only swept once this many clients are tracked
const PRUNE_THRESHOLD: usize = 1024;
/// A bucket untouched this long is full again and can be dropped
const IDLE_AFTER: Duration = Duration::from_secs(60);
const CORS_MAX_AGE_SECS: usize = 3600;

/// Simple token bucket rate limiter implementation
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
    capacity: u32,
    refill_rate: f64, // tokens per second
}

impl TokenBucket {
    fn new(requests_per_minute: u32) -> Self {
        Self {
            tokens: requests_per_minute as f64,
            last_refill: Instant::now(),
            capacity: requests_per_minute,
            refill_rate: requests_per_minute as f64 / 60.0,
        }
    }

    fn try_take_token(&mut self) -> bool {
        let elapsed_secs = self.last_refill.elapsed().as_secs_f64();
        self.tokens = (self.tokens + elapsed_secs * self.refill_rate).min(self.capacity as f64);
        self.last_refill = Instant::now();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn is_idle(&self) -> bool {
        self.last_refill.elapsed() >= IDLE_AFTER
    }
}

/// Tracks one bucket per client address; clones share the same buckets
#[derive(Clone)]
pub struct RateLimiterManager {
    requests_per_minute: u32,
    limiters: Arc<Mutex<HashMap<String, TokenBucket>>>,
}

impl RateLimiterManager {
    /// A limit of 0 disables rate limiting
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
            limiters: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Take one request from the client's budget
    pub fn check_rate_limit(&self, client: &str) -> Result<(), AppError> {
        if self.requests_per_minute == 0 {
            return Ok(());
        }

        // A poisoned map still holds usable buckets
        let mut limiters = self.limiters.lock().unwrap_or_else(|e| e.into_inner());

        if limiters.len() >= PRUNE_THRESHOLD {
            limiters.retain(|_, bucket| !bucket.is_idle());
        }

        let allowed = limiters
            .entry(client.to_string())
            .or_insert_with(|| TokenBucket::new(self.requests_per_minute))
            .try_take_token();

        if allowed {
            Ok(())
        } else {
            Err(AppError::RateLimited)
        }
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.limiters.lock().map(|l| l.len()).unwrap_or_default()
    }
}

/// Rejects clients that exceed their per-minute budget with 429
pub struct RateLimit {
    limiter: RateLimiterManager,
}

impl RateLimit {
    pub fn new(limiter: RateLimiterManager) -> Self {
        Self { limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RateLimitService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
        }))
    }
}

pub struct RateLimitService<S> {
    service: Rc<S>,
    limiter: RateLimiterManager,
}

impl<S, B> Service<ServiceRequest> for RateLimitService<S>
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
        // Honours Forwarded / X-Forwarded-For, so run behind a proxy that sets them
        let client = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();

        match self.limiter.check_rate_limit(&client) {
            Ok(()) => {
                let service = self.service.clone();
                Box::pin(async move {
                    service
                        .call(req)
                        .await
                        .map(ServiceResponse::map_into_left_body)
                })
            }
            Err(e) => {
                tracing::debug!(client = %client, path = %req.path(), "Request over rate limit");
                Box::pin(async move { Ok(req.error_response(e).map_into_right_body()) })
            }
        }
    }
}

/// Security headers for HTTP responses
pub fn security_headers(environment: Environment) -> Vec<(HeaderName, &'static str)> {
    let mut headers = vec![
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::X_FRAME_OPTIONS, "SAMEORIGIN"),
        (header::X_XSS_PROTECTION, "0"),
        (
            header::CONTENT_SECURITY_POLICY,
            "default-src 'self'; frame-ancestors 'self'; object-src 'none'",
        ),
        (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
        (
            HeaderName::from_static("cross-origin-resource-policy"),
            "same-origin",
        ),
    ];

    // Production is served over HTTPS
    if environment == Environment::Production {
        headers.push((
            header::STRICT_TRANSPORT_SECURITY,
            "max-age=31536000; includeSubDomains",
        ));
    }
    headers
}

/// `DefaultHeaders` middleware carrying `security_headers`
pub fn default_headers(environment: Environment) -> DefaultHeaders {
    security_headers(environment)
        .into_iter()
        .fold(DefaultHeaders::new(), |headers, pair| headers.add(pair))
}

fn is_allowed_origin(security: &SecuritySettings, origin: &str) -> bool {
    security
        .allowed_origins
        .iter()
        .any(|allowed| allowed.trim_end_matches('/') == origin)
}

/// CORS policy: any origin in development, the allow-list otherwise.
/// Requests without an `Origin` header are not affected.
pub fn cors(settings: &Settings) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec![Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers(vec![HeaderName::from_static(REQUEST_ID_HEADER)])
        .supports_credentials()
        .max_age(CORS_MAX_AGE_SECS);

    if settings.application.environment == Environment::Development {
        return cors.allowed_origin_fn(|_origin, _req| true);
    }

    let security = settings.security.clone();
    cors.allowed_origin_fn(move |origin, _req| {
        origin
            .to_str()
            .map(|origin| is_allowed_origin(&security, origin))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_allows_up_to_budget() {
        let manager = RateLimiterManager::new(3);

        for _ in 0..3 {
            assert!(manager.check_rate_limit("127.0.0.1").is_ok());
        }
        assert!(matches!(
            manager.check_rate_limit("127.0.0.1"),
            Err(AppError::RateLimited)
        ));
    }

    #[test]
    fn test_rate_limiter_tracks_clients_separately() {
        let manager = RateLimiterManager::new(1);

        assert!(manager.check_rate_limit("10.0.0.1").is_ok());
        assert!(manager.check_rate_limit("10.0.0.1").is_err());
        assert!(manager.check_rate_limit("10.0.0.2").is_ok());
        assert_eq!(manager.tracked_clients(), 2);
    }

    #[test]
    fn test_zero_limit_disables_rate_limiting() {
        let manager = RateLimiterManager::new(0);

        for _ in 0..100 {
            assert!(manager.check_rate_limit("127.0.0.1").is_ok());
        }
        assert_eq!(manager.tracked_clients(), 0);
    }

    #[test]
    fn test_bucket_refills_over_time() {
        let mut bucket = TokenBucket::new(60);
        bucket.tokens = 0.0;
        bucket.last_refill = Instant::now() - Duration::from_secs(2);

        assert!(bucket.try_take_token());
        assert!(bucket.tokens <= 1.5);
    }

    #[test]
    fn test_security_headers() {
        let names: Vec<_> = security_headers(Environment::Development)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert!(names.contains(&header::X_CONTENT_TYPE_OPTIONS));
        assert!(names.contains(&header::CONTENT_SECURITY_POLICY));
        assert!(!names.contains(&header::STRICT_TRANSPORT_SECURITY));

        let names: Vec<_> = security_headers(Environment::Production)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert!(names.contains(&header::STRICT_TRANSPORT_SECURITY));
    }

    #[test]
    fn test_origin_allow_list_ignores_trailing_slash() {
        let security = SecuritySettings {
            allowed_origins: vec!["https://blog.example.com/".to_string()],
            rate_limit_per_minute: 60,
        };

        assert!(is_allowed_origin(&security, "https://blog.example.com"));
        assert!(!is_allowed_origin(&security, "http://evil.example"));
    }
}
