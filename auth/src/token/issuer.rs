use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use super::errors::TokenError;
use super::settings::TokenSettings;
use crate::jwt::Claims;
use crate::jwt::JwtHandler;
use crate::jwt::TokenType;

/// Access/refresh token pair handed to clients after any successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// Refresh token lifetime in seconds
    pub refresh_expires_in: i64,
}

/// Mints signed, self-contained session tokens.
///
/// Nothing is persisted: the output depends only on the subject, the clock and
/// the signing secret.
pub struct TokenIssuer {
    handler: JwtHandler,
    settings: TokenSettings,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], settings: TokenSettings) -> Self {
        Self {
            handler: JwtHandler::new(secret),
            settings,
        }
    }

    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Issue an access and a refresh token for `subject` at wall-clock time.
    pub fn issue_pair(&self, subject: &str) -> Result<TokenPair, TokenError> {
        self.issue_pair_at(subject, Utc::now())
    }

    /// Issue an access and a refresh token for `subject` as of `now`.
    ///
    /// # Errors
    /// * `Issuance` - Signing failed
    pub fn issue_pair_at(
        &self,
        subject: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, TokenError> {
        let access_token = self.sign(subject, TokenType::Access, now)?;
        let refresh_token = self.sign(subject, TokenType::Refresh, now)?;

        Ok(self.pair(access_token, refresh_token))
    }

    /// Issue a fresh access token and pair it with an existing refresh token.
    ///
    /// The refresh token is returned unchanged and stays valid until its own
    /// expiry.
    pub fn reissue_access_at(
        &self,
        subject: &str,
        refresh_token: String,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, TokenError> {
        let access_token = self.sign(subject, TokenType::Access, now)?;
        Ok(self.pair(access_token, refresh_token))
    }

    fn sign(
        &self,
        subject: &str,
        token_type: TokenType,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let ttl = match token_type {
            TokenType::Access => self.settings.access_ttl,
            TokenType::Refresh => self.settings.refresh_ttl,
        };

        let mut claims = Claims::new(subject, token_type, now, ttl);
        if let Some(issuer) = &self.settings.issuer {
            claims = claims.with_issuer(issuer.clone());
        }
        if let Some(audience) = &self.settings.audience {
            claims = claims.with_audience(audience.clone());
        }

        Ok(self.handler.encode(&claims)?)
    }

    fn pair(&self, access_token: String, refresh_token: String) -> TokenPair {
        TokenPair {
            access_token,
            refresh_token,
            token_type: "bearer",
            expires_in: self.settings.access_ttl.num_seconds(),
            refresh_expires_in: self.settings.refresh_ttl.num_seconds(),
        }
    }
}
