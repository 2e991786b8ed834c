use std::net::IpAddr;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::extract::Request;
use axum::extract::State;
use axum::middleware::Next;
use axum::response::Response;
use governor::DefaultKeyedRateLimiter;
use governor::Quota;
use governor::RateLimiter;

use super::handlers::ApiError;
use crate::config::RateLimitConfig;

/// Per-client-address quota for a single route.
pub struct RouteLimiter {
    route: &'static str,
    retry_after_secs: u64,
    limiter: DefaultKeyedRateLimiter<IpAddr>,
}

impl RouteLimiter {
    pub fn per_minute(route: &'static str, per_minute: NonZeroU32) -> Self {
        Self {
            route,
            // One cell replenishes every 60 / quota seconds.
            retry_after_secs: 60u64.div_ceil(u64::from(per_minute.get())),
            limiter: RateLimiter::keyed(Quota::per_minute(per_minute)),
        }
    }

    /// Count one request from `client`.
    ///
    /// # Returns
    /// The seconds to wait before retrying when the quota is spent
    pub fn check(&self, client: IpAddr) -> Result<(), u64> {
        self.limiter
            .check_key(&client)
            .map_err(|_| self.retry_after_secs)
    }

    /// Forget clients whose quota has fully replenished.
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
    }
}

/// Limiters for the credential endpoints.
#[derive(Clone)]
pub struct AuthRateLimits {
    pub login: Arc<RouteLimiter>,
    pub register: Arc<RouteLimiter>,
    pub refresh: Arc<RouteLimiter>,
    pub logout: Arc<RouteLimiter>,
}

impl AuthRateLimits {
    /// `None` when limiting is disabled or a quota is zero.
    pub fn from_config(config: &RateLimitConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }

        let limiter = |route, per_minute| {
            NonZeroU32::new(per_minute).map(|n| Arc::new(RouteLimiter::per_minute(route, n)))
        };

        Some(Self {
            login: limiter("login", config.login_per_minute)?,
            register: limiter("register", config.register_per_minute)?,
            refresh: limiter("refresh", config.refresh_per_minute)?,
            logout: limiter("logout", config.logout_per_minute)?,
        })
    }

    pub fn retain_recent(&self) {
        for limiter in [&self.login, &self.register, &self.refresh, &self.logout] {
            limiter.retain_recent();
        }
    }
}

/// Middleware that rejects a client once it exhausts the route's quota
pub async fn enforce(
    State(limiter): State<Arc<RouteLimiter>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Err(retry_after) = limiter.check(peer.ip()) {
        tracing::warn!(
            route = limiter.route,
            client = %peer.ip(),
            retry_after,
            "Rate limit exceeded"
        );
        return Err(ApiError::TooManyRequests(
            "Too many requests".to_string(),
            retry_after,
        ));
    }

    Ok(next.run(req).await)
}
