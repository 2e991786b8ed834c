use std::env;

use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

/// Minimum signing secret length for HS256.
pub const MIN_SECRET_LENGTH: usize = 32;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub oidc: OidcConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_access_token_ttl_minutes")]
    pub access_token_ttl_minutes: i64,
    #[serde(default = "default_refresh_token_ttl_days")]
    pub refresh_token_ttl_days: i64,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
}

/// External identity provider settings.
///
/// OIDC login is available only when `enabled` is set; the remaining fields
/// are then required.
#[derive(Debug, Deserialize, Clone)]
pub struct OidcConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub issuer_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uri: String,
    /// Space or comma separated
    #[serde(default = "default_scopes")]
    pub scopes: String,
    #[serde(default)]
    pub auto_provision: bool,
    #[serde(default = "default_state_ttl_seconds")]
    pub state_ttl_seconds: u64,
    #[serde(default = "default_http_timeout_seconds")]
    pub http_timeout_seconds: u64,
    #[serde(default)]
    pub post_logout_redirect_uri: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Shared exchange-state store; in-process when absent
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

/// Per-client request quotas on the credential endpoints, in requests per
/// minute for each client address.
#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,
    #[serde(default = "default_login_per_minute")]
    pub login_per_minute: u32,
    #[serde(default = "default_register_per_minute")]
    pub register_per_minute: u32,
    #[serde(default = "default_refresh_per_minute")]
    pub refresh_per_minute: u32,
    #[serde(default = "default_logout_per_minute")]
    pub logout_per_minute: u32,
}

fn default_max_connections() -> u32 {
    5
}

fn default_access_token_ttl_minutes() -> i64 {
    auth::TokenSettings::DEFAULT_ACCESS_TTL_MINUTES
}

fn default_refresh_token_ttl_days() -> i64 {
    auth::TokenSettings::DEFAULT_REFRESH_TTL_DAYS
}

fn default_scopes() -> String {
    "openid email profile".to_string()
}

fn default_state_ttl_seconds() -> u64 {
    600
}

fn default_http_timeout_seconds() -> u64 {
    10
}

fn default_sweep_interval_seconds() -> u64 {
    60
}

fn default_rate_limit_enabled() -> bool {
    true
}

fn default_login_per_minute() -> u32 {
    5
}

fn default_register_per_minute() -> u32 {
    3
}

fn default_refresh_per_minute() -> u32 {
    10
}

fn default_logout_per_minute() -> u32 {
    20
}

impl Default for OidcConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            issuer_url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            scopes: default_scopes(),
            auto_provision: false,
            state_ttl_seconds: default_state_ttl_seconds(),
            http_timeout_seconds: default_http_timeout_seconds(),
            post_logout_redirect_uri: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_rate_limit_enabled(),
            login_per_minute: default_login_per_minute(),
            register_per_minute: default_register_per_minute(),
            refresh_per_minute: default_refresh_per_minute(),
            logout_per_minute: default_logout_per_minute(),
        }
    }
}

impl JwtConfig {
    pub fn token_settings(&self) -> auth::TokenSettings {
        let mut settings = auth::TokenSettings::new(
            chrono::Duration::minutes(self.access_token_ttl_minutes),
            chrono::Duration::days(self.refresh_token_ttl_days),
        );
        if let Some(issuer) = &self.issuer {
            settings = settings.with_issuer(issuer.clone());
        }
        if let Some(audience) = &self.audience {
            settings = settings.with_audience(audience.clone());
        }
        settings
    }
}

impl OidcConfig {
    /// Requested scopes, accepting either separator.
    pub fn scope_list(&self) -> Vec<String> {
        self.scopes
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DATABASE__URL, JWT__SECRET, OIDC__CLIENT_ID, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: OIDC__ISSUER_URL=https://... overrides oidc.issuer_url
            .add_source(Environment::with_prefix("").separator("__"))
            .build()?;

        let config: Config = configuration.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::Message(format!(
                "jwt.secret must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }

        if self.jwt.access_token_ttl_minutes <= 0 || self.jwt.refresh_token_ttl_days <= 0 {
            return Err(ConfigError::Message(
                "token lifetimes must be positive".to_string(),
            ));
        }

        if self.oidc.enabled {
            let missing: Vec<&str> = [
                ("oidc.issuer_url", &self.oidc.issuer_url),
                ("oidc.client_id", &self.oidc.client_id),
                ("oidc.redirect_uri", &self.oidc.redirect_uri),
            ]
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect();

            if !missing.is_empty() {
                return Err(ConfigError::Message(format!(
                    "OIDC is enabled but {} not set",
                    missing.join(", ")
                )));
            }
        }

        if self.rate_limit.enabled {
            let limits = [
                self.rate_limit.login_per_minute,
                self.rate_limit.register_per_minute,
                self.rate_limit.refresh_per_minute,
                self.rate_limit.logout_per_minute,
            ];
            if limits.contains(&0) {
                return Err(ConfigError::Message(
                    "rate limits must be positive; set rate_limit.enabled = false to disable"
                        .to_string(),
                ));
            }
        }

        Ok(())
    }
}
