use auth::TokenPair;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Transient record binding an OIDC `state` to its nonce and PKCE verifier.
///
/// Keyed by `state` in the exchange-state store and consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcExchangeState {
    pub nonce: String,
    pub pkce_verifier: String,
    pub redirect_to: String,
    pub created_at: DateTime<Utc>,
}

/// Values the provider echoes or verifies during the authorization round trip.
///
/// Only the S256 challenge derived from `pkce_verifier` leaves the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationParams {
    pub state: String,
    pub nonce: String,
    pub pkce_verifier: String,
}

/// Where to send the user agent to start an OIDC login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRedirect {
    pub authorization_url: String,
    pub state: String,
}

/// Identity asserted by the provider after a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIdentity {
    pub issuer: String,
    pub subject: String,
    pub email: Option<String>,
    /// `None` when the provider does not report verification.
    pub email_verified: Option<bool>,
    pub name: Option<String>,
}

/// Result of a completed OIDC callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcLogin {
    pub tokens: TokenPair,
    pub redirect_to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogoutRequest {
    /// The session was established through the identity provider.
    pub oidc_session: bool,
    pub post_logout_redirect: Option<String>,
}

/// Logout is always a local success. Provider-side logout is best effort.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogoutOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_session_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limitation: Option<String>,
}

impl LogoutOutcome {
    pub const TOKENS_REMAIN_VALID: &'static str =
        "Issued tokens stay valid until they expire; discard them client-side";

    pub fn local() -> Self {
        Self {
            end_session_url: None,
            limitation: Some(Self::TOKENS_REMAIN_VALID.to_string()),
        }
    }
}

/// Keep only same-origin relative paths as post-login redirect targets.
pub fn sanitize_redirect(redirect_to: Option<&str>) -> String {
    match redirect_to {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}
