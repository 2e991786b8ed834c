use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;

use super::errors::TokenError;
use super::settings::TokenSettings;
use crate::jwt::Claims;
use crate::jwt::JwtHandler;
use crate::jwt::TokenType;

/// Lookup of revoked token identifiers. Not wired by default.
pub trait JtiDenyList: Send + Sync {
    fn is_denied(&self, jti: &str) -> bool;
}

/// Verifies bearer tokens without any store lookup.
pub struct TokenValidator {
    handler: JwtHandler,
    deny_list: Option<Arc<dyn JtiDenyList>>,
}

impl TokenValidator {
    pub fn new(secret: &[u8], settings: &TokenSettings) -> Self {
        let mut handler = JwtHandler::new(secret);
        if let Some(issuer) = &settings.issuer {
            handler = handler.with_issuer(issuer);
        }
        if let Some(audience) = &settings.audience {
            handler = handler.with_audience(audience);
        }

        Self {
            handler,
            deny_list: None,
        }
    }

    pub fn with_deny_list(mut self, deny_list: Arc<dyn JtiDenyList>) -> Self {
        self.deny_list = Some(deny_list);
        self
    }

    /// Validate `token` as `expected` against the wall clock.
    pub fn validate(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        self.validate_at(token, expected, Utc::now())
    }

    /// Validate `token` as `expected` as of `now`.
    ///
    /// Checks run in order: structure, signature, issuer/audience, expiry,
    /// type, deny-list. An expired token is reported as `Expired` whatever its
    /// type.
    ///
    /// # Errors
    /// * `Malformed` - Not a decodable claim set
    /// * `SignatureInvalid` - Not signed with the current secret
    /// * `InvalidClaims` - Issuer or audience mismatch
    /// * `Expired` - `now` is at or past `exp`
    /// * `WrongType` - Refresh token used as access token or vice versa
    /// * `Revoked` - JTI present in the deny-list
    pub fn validate_at(
        &self,
        token: &str,
        expected: TokenType,
        now: DateTime<Utc>,
    ) -> Result<Claims, TokenError> {
        let claims = self.handler.decode(token)?;

        if claims.is_expired(now.timestamp()) {
            return Err(TokenError::Expired);
        }

        if claims.token_type != expected {
            return Err(TokenError::WrongType {
                expected,
                found: claims.token_type,
            });
        }

        if claims.sub.is_empty() {
            return Err(TokenError::Malformed("empty subject".to_string()));
        }

        if let Some(deny_list) = &self.deny_list {
            if deny_list.is_denied(&claims.jti) {
                return Err(TokenError::Revoked);
            }
        }

        Ok(claims)
    }
}
