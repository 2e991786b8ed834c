use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::MethodRouter;
use axum::routing::patch;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::change_password::change_password;
use super::handlers::health::health;
use super::handlers::login::login;
use super::handlers::logout::logout;
use super::handlers::me::me;
use super::handlers::oidc_callback::oidc_callback;
use super::handlers::oidc_login::oidc_login;
use super::handlers::refresh::refresh;
use super::handlers::register::register;
use super::middleware::authenticate as auth_middleware;
use super::rate_limit;
use super::rate_limit::AuthRateLimits;
use super::rate_limit::RouteLimiter;
use crate::account::ports::AccountServicePort;
use crate::session::ports::SessionServicePort;

#[derive(Clone)]
pub struct AppState {
    pub session_service: Arc<dyn SessionServicePort>,
    pub account_service: Arc<dyn AccountServicePort>,
}

pub fn create_router(
    session_service: Arc<dyn SessionServicePort>,
    account_service: Arc<dyn AccountServicePort>,
    rate_limits: Option<AuthRateLimits>,
) -> Router {
    let state = AppState {
        session_service,
        account_service,
    };

    let limits = rate_limits.as_ref();
    let public_routes = Router::new()
        .route("/health", get(health))
        .route(
            "/api/v1/auth/register",
            limited(post(register), limits.map(|l| &l.register)),
        )
        .route(
            "/api/v1/auth/login",
            limited(post(login), limits.map(|l| &l.login)),
        )
        .route(
            "/api/v1/auth/refresh",
            limited(post(refresh), limits.map(|l| &l.refresh)),
        )
        .route(
            "/api/v1/auth/logout",
            limited(post(logout), limits.map(|l| &l.logout)),
        )
        .route("/api/v1/auth/oidc/login", get(oidc_login))
        .route("/api/v1/auth/oidc/callback", get(oidc_callback));

    let protected_routes = Router::new()
        .route("/api/v1/users/me", get(me))
        .route("/api/v1/users/me/password", patch(change_password))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Headers are left out of the span: they carry bearer tokens.
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                path = %request.uri().path(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                path = %request.uri().path(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Requires `ConnectInfo<SocketAddr>`: serve with `into_make_service_with_connect_info`.
fn limited(
    route: MethodRouter<AppState>,
    limiter: Option<&Arc<RouteLimiter>>,
) -> MethodRouter<AppState> {
    match limiter {
        Some(limiter) => route.route_layer(middleware::from_fn_with_state(
            Arc::clone(limiter),
            rate_limit::enforce,
        )),
        None => route,
    }
}
