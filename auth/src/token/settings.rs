use chrono::Duration;

/// Lifetimes and identity claims shared by the issuer and the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSettings {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl TokenSettings {
    pub const DEFAULT_ACCESS_TTL_MINUTES: i64 = 15;
    pub const DEFAULT_REFRESH_TTL_DAYS: i64 = 7;

    pub fn new(access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            access_ttl,
            refresh_ttl,
            issuer: None,
            audience: None,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self::new(
            Duration::minutes(Self::DEFAULT_ACCESS_TTL_MINUTES),
            Duration::days(Self::DEFAULT_REFRESH_TTL_DAYS),
        )
    }
}
