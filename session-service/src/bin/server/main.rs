use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use auth::TokenIssuer;
use auth::TokenValidator;
use session_service::config::Config;
use session_service::domain::account::service::AccountService;
use session_service::domain::session::oidc::OidcCoordinator;
use session_service::domain::session::oidc::OidcSettings;
use session_service::domain::session::ports::ExchangeStateStore;
use session_service::domain::session::service::SessionService;
use session_service::inbound::http::rate_limit::AuthRateLimits;
use session_service::inbound::http::router::create_router;
use session_service::outbound::oidc::HttpIdentityProvider;
use session_service::outbound::repositories::PostgresAccountRepository;
use session_service::outbound::state_store::ExchangeStateBackend;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "session-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        access_token_ttl_minutes = config.jwt.access_token_ttl_minutes,
        refresh_token_ttl_days = config.jwt.refresh_token_ttl_days,
        oidc_enabled = config.oidc.enabled,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = config.database.max_connections,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let token_settings = config.jwt.token_settings();
    let secret = config.jwt.secret.as_bytes();
    let token_issuer = Arc::new(TokenIssuer::new(secret, token_settings.clone()));
    let token_validator = Arc::new(TokenValidator::new(secret, &token_settings));

    let account_repository = Arc::new(PostgresAccountRepository::new(pg_pool));
    let account_service = Arc::new(AccountService::new(Arc::clone(&account_repository)));

    let state_store = Arc::new(ExchangeStateBackend::from_url(config.cache.redis_url.as_deref()).await?);
    tracing::info!(backend = state_store.kind(), "OIDC exchange-state store ready");

    let mut session_service = SessionService::new(
        Arc::clone(&account_repository),
        token_issuer,
        token_validator,
    );

    if config.oidc.enabled {
        let provider = HttpIdentityProvider::discover(&config.oidc).await?;
        tracing::info!(issuer = %provider.issuer(), "OIDC provider discovered");

        let settings = OidcSettings {
            auto_provision: config.oidc.auto_provision,
            state_ttl: Duration::from_secs(config.oidc.state_ttl_seconds),
            post_logout_redirect_uri: config.oidc.post_logout_redirect_uri.clone(),
        };
        session_service = session_service.with_oidc(OidcCoordinator::new(
            Arc::clone(&account_repository),
            Arc::clone(&state_store),
            Arc::new(provider),
            settings,
        ));
    }

    let rate_limits = AuthRateLimits::from_config(&config.rate_limit);
    tracing::info!(
        enabled = rate_limits.is_some(),
        login_per_minute = config.rate_limit.login_per_minute,
        "Rate limiting configured"
    );

    let sweep_interval = Duration::from_secs(config.cache.sweep_interval_seconds.max(1));
    let sweeper = tokio::spawn(sweep_exchange_state(
        Arc::clone(&state_store),
        rate_limits.clone(),
        sweep_interval,
    ));

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(Arc::new(session_service), account_service, rate_limits);
    axum::serve(
        http_listener,
        http_application.into_make_service_with_connect_info::<SocketAddr>(),
    )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    tracing::info!("Server exited successfully");

    Ok(())
}

/// Periodically drop abandoned OIDC exchange state and idle rate-limit entries.
async fn sweep_exchange_state<S: ExchangeStateStore>(
    store: Arc<S>,
    rate_limits: Option<AuthRateLimits>,
    every: Duration,
) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        match store.sweep_expired().await {
            Ok(0) => {}
            Ok(removed) => tracing::debug!(removed, "Expired OIDC exchange state swept"),
            Err(e) => tracing::warn!(error = %e, "OIDC exchange-state sweep failed"),
        }
        if let Some(limits) = &rate_limits {
            limits.retain_recent();
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
