use std::time::Duration;

use async_trait::async_trait;
use auth::TokenPair;

use crate::account::models::Account;
use crate::session::errors::SessionError;
use crate::session::models::AuthorizationParams;
use crate::session::models::AuthorizationRedirect;
use crate::session::models::LogoutOutcome;
use crate::session::models::LogoutRequest;
use crate::session::models::OidcExchangeState;
use crate::session::models::OidcLogin;
use crate::session::models::ProviderIdentity;

/// Port for the session lifecycle: login, refresh, logout and access checks.
#[async_trait]
pub trait SessionServicePort: Send + Sync + 'static {
    /// Verify email and password and issue a token pair.
    ///
    /// # Errors
    /// * `NotFound` - No account for this email
    /// * `InvalidCredentials` - Wrong password, or the account has none
    /// * `AccountInactive` - Account is deactivated
    async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<TokenPair, SessionError>;

    /// Start an authorization-code flow with PKCE.
    ///
    /// # Errors
    /// * `OidcDisabled` - No identity provider configured
    async fn begin_oidc_login(
        &self,
        redirect_to: Option<&str>,
    ) -> Result<AuthorizationRedirect, SessionError>;

    /// Finish the flow started by `begin_oidc_login`.
    ///
    /// # Errors
    /// * `InvalidState` - Unknown, reused or expired `state`
    /// * `AccountNotLinked` - Identity maps to no account and provisioning is off
    /// * `ProviderUnavailable` / `ProviderRejected` - Code exchange failed
    async fn login_with_oidc_callback(
        &self,
        code: &str,
        state: &str,
    ) -> Result<OidcLogin, SessionError>;

    /// Discard the exchange state of a flow the provider ended with an error.
    ///
    /// Unknown or already used states are ignored.
    async fn abandon_oidc_login(&self, state: &str) -> Result<(), SessionError>;

    /// Exchange a refresh token for a new access token.
    ///
    /// The refresh token itself is returned unchanged.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError>;

    /// End the session. Never fails.
    async fn logout(&self, request: LogoutRequest) -> LogoutOutcome;

    /// Resolve an access token to its account.
    async fn authenticate(&self, access_token: &str) -> Result<Account, SessionError>;
}

/// Short-lived storage for OIDC exchange state.
///
/// Implementations must make `take` atomic: when two callers race for the
/// same key at most one gets the entry.
#[async_trait]
pub trait ExchangeStateStore: Send + Sync + 'static {
    /// Store `entry` under `key` unless the key is already present.
    ///
    /// # Returns
    /// `false` if the key was taken
    async fn insert_if_absent(
        &self,
        key: &str,
        entry: OidcExchangeState,
        ttl: Duration,
    ) -> Result<bool, SessionError>;

    /// Remove and return the live entry under `key`.
    async fn take(&self, key: &str) -> Result<Option<OidcExchangeState>, SessionError>;

    /// Drop expired entries, returning how many were removed.
    async fn sweep_expired(&self) -> Result<usize, SessionError>;
}

/// External OpenID Connect provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    fn authorization_url(&self, params: &AuthorizationParams) -> Result<String, SessionError>;

    /// Redeem an authorization code and return the asserted identity.
    ///
    /// # Errors
    /// * `ProviderUnavailable` - Timeout, connection failure or 5xx
    /// * `ProviderRejected` - Provider refused the code, or the ID token failed checks
    async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: &str,
        nonce: &str,
    ) -> Result<ProviderIdentity, SessionError>;

    /// RP-initiated logout URL, when the provider supports it.
    fn end_session_url(&self, post_logout_redirect: Option<String>) -> Option<String>;
}
