use std::time::Duration;

use async_trait::async_trait;
use openidconnect::core::CoreAuthenticationFlow;
use openidconnect::core::CoreClient;
use openidconnect::core::CoreUserInfoClaims;
use openidconnect::AccessToken;
use openidconnect::AuthorizationCode;
use openidconnect::ClientId;
use openidconnect::ClientSecret;
use openidconnect::CsrfToken;
use openidconnect::DiscoveryError;
use openidconnect::EndpointMaybeSet;
use openidconnect::EndpointNotSet;
use openidconnect::EndpointSet;
use openidconnect::IssuerUrl;
use openidconnect::Nonce;
use openidconnect::OAuth2TokenResponse;
use openidconnect::PkceCodeChallenge;
use openidconnect::PkceCodeVerifier;
use openidconnect::ProviderMetadataWithLogout;
use openidconnect::RedirectUrl;
use openidconnect::RequestTokenError;
use openidconnect::Scope;
use openidconnect::SubjectIdentifier;
use openidconnect::TokenResponse;
use openidconnect::UserInfoError;
use url::Url;

use crate::config::OidcConfig;
use crate::session::errors::SessionError;
use crate::session::models::AuthorizationParams;
use crate::session::models::ProviderIdentity;
use crate::session::ports::IdentityProvider;

/// Client built from discovery: authorization endpoint known, token and
/// userinfo endpoints as advertised.
type DiscoveredClient = CoreClient<
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointMaybeSet,
    EndpointMaybeSet,
>;

/// Authorization-code client for a discovered OpenID provider.
///
/// ID tokens are verified against the provider's published JWKS (RS256 by
/// default); unsigned and HMAC-signed tokens are refused.
pub struct HttpIdentityProvider {
    client: DiscoveredClient,
    issuer: String,
    client_id: String,
    scopes: Vec<String>,
    has_userinfo: bool,
    end_session_endpoint: Option<Url>,
    http: reqwest::Client,
}

impl HttpIdentityProvider {
    /// Fetch the discovery document and signing keys of the configured issuer.
    ///
    /// # Errors
    /// * `ProviderUnavailable` - Discovery or JWKS endpoint unreachable or failing
    /// * `ProviderMisconfigured` - Bad URLs, or the document names another issuer
    pub async fn discover(config: &OidcConfig) -> Result<Self, SessionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| SessionError::ProviderMisconfigured(format!("http client: {}", e)))?;

        let issuer_url = IssuerUrl::new(config.issuer_url.clone())
            .map_err(|e| SessionError::ProviderMisconfigured(format!("issuer_url: {}", e)))?;

        let metadata = ProviderMetadataWithLogout::discover_async(issuer_url, &http)
            .await
            .map_err(|err| {
                let message = format!("discovery: {}", err);
                match err {
                    DiscoveryError::Request(_) => SessionError::ProviderUnavailable(message),
                    DiscoveryError::Response(status, _, _) if status.is_server_error() => {
                        SessionError::ProviderUnavailable(message)
                    }
                    _ => SessionError::ProviderMisconfigured(message),
                }
            })?;

        Self::from_metadata(config, metadata, http)
    }

    fn from_metadata(
        config: &OidcConfig,
        metadata: ProviderMetadataWithLogout,
        http: reqwest::Client,
    ) -> Result<Self, SessionError> {
        let redirect_url = RedirectUrl::new(config.redirect_uri.clone())
            .map_err(|e| SessionError::ProviderMisconfigured(format!("redirect_uri: {}", e)))?;
        let client_secret = Some(config.client_secret.clone())
            .filter(|secret| !secret.is_empty())
            .map(ClientSecret::new);

        let has_userinfo = metadata.userinfo_endpoint().is_some();
        let end_session_endpoint = metadata
            .additional_metadata()
            .end_session_endpoint
            .as_ref()
            .map(|endpoint| endpoint.url().clone());

        let client = CoreClient::from_provider_metadata(
            metadata,
            ClientId::new(config.client_id.clone()),
            client_secret,
        )
        .set_redirect_uri(redirect_url);

        Ok(Self {
            client,
            issuer: config.issuer_url.clone(),
            client_id: config.client_id.clone(),
            // `openid` is always requested by the client itself.
            scopes: config
                .scope_list()
                .into_iter()
                .filter(|scope| scope != "openid")
                .collect(),
            has_userinfo,
            end_session_endpoint,
            http,
        })
    }

    /// Issuer identifier the discovery document was validated against.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    async fn user_info(
        &self,
        access_token: AccessToken,
        subject: SubjectIdentifier,
    ) -> Result<CoreUserInfoClaims, SessionError> {
        self.client
            .user_info(access_token, Some(subject))
            .map_err(|e| SessionError::ProviderMisconfigured(format!("userinfo endpoint: {}", e)))?
            .request_async(&self.http)
            .await
            .map_err(|err| {
                let message = format!("userinfo: {}", err);
                tracing::warn!(error = %message, "Identity provider userinfo request failed");
                match err {
                    UserInfoError::Request(_) => SessionError::ProviderUnavailable(message),
                    UserInfoError::Response(status, _, _) if status.is_server_error() => {
                        SessionError::ProviderUnavailable(message)
                    }
                    _ => SessionError::ProviderRejected(message),
                }
            })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    fn authorization_url(&self, params: &AuthorizationParams) -> Result<String, SessionError> {
        let challenge = PkceCodeChallenge::from_code_verifier_sha256(&PkceCodeVerifier::new(
            params.pkce_verifier.clone(),
        ));
        let state = params.state.clone();
        let nonce = params.nonce.clone();

        let mut request = self
            .client
            .authorize_url(
                CoreAuthenticationFlow::AuthorizationCode,
                move || CsrfToken::new(state),
                move || Nonce::new(nonce),
            )
            .set_pkce_challenge(challenge);
        for scope in &self.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }

        let (url, _, _) = request.url();
        Ok(url.into())
    }

    async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: &str,
        nonce: &str,
    ) -> Result<ProviderIdentity, SessionError> {
        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .map_err(|e| SessionError::ProviderMisconfigured(format!("token endpoint: {}", e)))?
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|err| {
                let message = format!("token exchange: {}", err);
                tracing::warn!(error = %message, "Identity provider token request failed");
                match err {
                    // Transport failures, and error statuses without a body.
                    RequestTokenError::Request(_) | RequestTokenError::Other(_) => {
                        SessionError::ProviderUnavailable(message)
                    }
                    _ => SessionError::ProviderRejected(message),
                }
            })?;

        let id_token = response.id_token().ok_or_else(|| {
            SessionError::ProviderRejected("no id_token in token response".to_string())
        })?;
        let claims = id_token
            .claims(&self.client.id_token_verifier(), &Nonce::new(nonce.to_string()))
            .map_err(|e| {
                tracing::warn!(error = %e, "ID token rejected");
                SessionError::ProviderRejected(format!("id_token: {}", e))
            })?;

        let mut identity = ProviderIdentity {
            issuer: self.issuer.clone(),
            subject: claims.subject().to_string(),
            email: claims.email().map(|email| email.as_str().to_string()),
            email_verified: claims.email_verified(),
            name: claims
                .name()
                .and_then(|name| name.get(None))
                .map(|name| name.as_str().to_string()),
        };

        if identity.email.is_none() && self.has_userinfo {
            let info = self
                .user_info(response.access_token().clone(), claims.subject().clone())
                .await?;
            identity.email = info.email().map(|email| email.as_str().to_string());
            identity.email_verified = info.email_verified();
            identity.name = identity.name.or_else(|| {
                info.name()
                    .and_then(|name| name.get(None))
                    .map(|name| name.as_str().to_string())
            });
        }

        Ok(identity)
    }

    fn end_session_url(&self, post_logout_redirect: Option<String>) -> Option<String> {
        let mut url = self.end_session_endpoint.clone()?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.client_id);
            if let Some(redirect) = &post_logout_redirect {
                query.append_pair("post_logout_redirect_uri", redirect);
            }
        }
        Some(url.into())
    }
}
