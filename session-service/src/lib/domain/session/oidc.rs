use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::account::errors::AccountError;
use crate::account::models::Account;
use crate::account::models::EmailAddress;
use crate::account::models::ExternalIdentity;
use crate::account::ports::AccountRepository;
use crate::session::errors::SessionError;
use crate::session::models::sanitize_redirect;
use crate::session::models::AuthorizationParams;
use crate::session::models::AuthorizationRedirect;
use crate::session::models::OidcExchangeState;
use crate::session::models::ProviderIdentity;
use crate::session::ports::ExchangeStateStore;
use crate::session::ports::IdentityProvider;

#[derive(Debug, Clone)]
pub struct OidcSettings {
    /// Create a local account for identities matching no existing one.
    pub auto_provision: bool,
    pub state_ttl: Duration,
    pub post_logout_redirect_uri: Option<String>,
}

impl Default for OidcSettings {
    fn default() -> Self {
        Self {
            auto_provision: false,
            state_ttl: Duration::from_secs(600),
            post_logout_redirect_uri: None,
        }
    }
}

/// Drives the authorization-code flow with PKCE and maps provider identities
/// onto local accounts.
pub struct OidcCoordinator<AR, SS, IP>
where
    AR: AccountRepository,
    SS: ExchangeStateStore,
    IP: IdentityProvider,
{
    repository: Arc<AR>,
    state_store: Arc<SS>,
    provider: Arc<IP>,
    settings: OidcSettings,
}

impl<AR, SS, IP> OidcCoordinator<AR, SS, IP>
where
    AR: AccountRepository,
    SS: ExchangeStateStore,
    IP: IdentityProvider,
{
    pub fn new(
        repository: Arc<AR>,
        state_store: Arc<SS>,
        provider: Arc<IP>,
        settings: OidcSettings,
    ) -> Self {
        Self {
            repository,
            state_store,
            provider,
            settings,
        }
    }

    pub fn settings(&self) -> &OidcSettings {
        &self.settings
    }

    /// Generate state, nonce and PKCE verifier, remember them, and build the
    /// provider authorization URL.
    pub async fn begin(
        &self,
        redirect_to: Option<&str>,
    ) -> Result<AuthorizationRedirect, SessionError> {
        let state = auth::pkce::generate_state();
        let nonce = auth::pkce::generate_nonce();
        let pkce_verifier = auth::pkce::generate_code_verifier();

        let params = AuthorizationParams {
            state: state.clone(),
            nonce: nonce.clone(),
            pkce_verifier: pkce_verifier.clone(),
        };
        let authorization_url = self.provider.authorization_url(&params)?;

        let entry = OidcExchangeState {
            nonce,
            pkce_verifier,
            redirect_to: sanitize_redirect(redirect_to),
            created_at: Utc::now(),
        };

        let inserted = self
            .state_store
            .insert_if_absent(&state, entry, self.settings.state_ttl)
            .await?;
        if !inserted {
            return Err(SessionError::Internal(
                "OIDC state collision".to_string(),
            ));
        }

        tracing::debug!("OIDC authorization started");
        Ok(AuthorizationRedirect {
            authorization_url,
            state,
        })
    }

    /// Consume `state`, redeem `code`, and resolve the local account.
    ///
    /// The state entry is removed before the provider is contacted, so a
    /// failed attempt cannot be retried with the same state. Identity links
    /// are only written once the account is known to be active.
    ///
    /// # Returns
    /// The account and the sanitized post-login redirect path
    pub async fn complete(
        &self,
        code: &str,
        state: &str,
    ) -> Result<(Account, String), SessionError> {
        if state.is_empty() {
            return Err(SessionError::InvalidState);
        }

        let entry = self
            .state_store
            .take(state)
            .await?
            .ok_or(SessionError::InvalidState)?;

        if code.is_empty() {
            return Err(SessionError::ProviderRejected(
                "authorization code missing".to_string(),
            ));
        }

        let identity = self
            .provider
            .exchange_code(code, &entry.pkce_verifier, &entry.nonce)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "OIDC code exchange failed"))?;

        let account = match self.resolve_account(&identity).await? {
            Resolution::Linked(account) => {
                ensure_active(&account)?;
                self.repository
                    .touch_external_identity(&identity.issuer, &identity.subject, Utc::now())
                    .await?;
                account
            }
            Resolution::Matched(account) => {
                ensure_active(&account)?;
                self.link(&account, &identity).await?;
                tracing::info!(account_id = %account.id, issuer = %identity.issuer, "External identity linked");
                account
            }
            Resolution::Provisioned(account) => {
                self.link(&account, &identity).await?;
                tracing::info!(account_id = %account.id, issuer = %identity.issuer, "Account provisioned from OIDC identity");
                account
            }
        };

        Ok((account, entry.redirect_to))
    }

    /// Drop the exchange state for a flow the provider ended with an error.
    ///
    /// # Returns
    /// `true` if a live entry was removed
    pub async fn abandon(&self, state: &str) -> Result<bool, SessionError> {
        if state.is_empty() {
            return Ok(false);
        }
        Ok(self.state_store.take(state).await?.is_some())
    }

    pub fn end_session_url(&self, post_logout_redirect: Option<String>) -> Option<String> {
        let redirect = post_logout_redirect.or_else(|| self.settings.post_logout_redirect_uri.clone());
        self.provider.end_session_url(redirect)
    }

    /// Linked identity first, then a matching email, then provisioning.
    ///
    /// Nothing is linked or touched here.
    async fn resolve_account(&self, identity: &ProviderIdentity) -> Result<Resolution, SessionError> {
        if let Some(account) = self
            .repository
            .find_by_external_identity(&identity.issuer, &identity.subject)
            .await?
        {
            return Ok(Resolution::Linked(account));
        }

        let Some(raw_email) = identity.email.as_deref() else {
            tracing::info!(issuer = %identity.issuer, "OIDC identity without email claim");
            return Err(SessionError::AccountNotLinked);
        };
        let email = EmailAddress::new(raw_email.to_string())
            .map_err(|e| SessionError::ProviderRejected(format!("invalid email claim: {}", e)))?;

        if let Some(account) = self.repository.find_by_email(&email).await? {
            return matched(account, identity);
        }

        if !self.settings.auto_provision {
            return Err(SessionError::AccountNotLinked);
        }

        match self
            .repository
            .create(Account::new(email.clone(), None, identity.name.clone()))
            .await
        {
            Ok(account) => Ok(Resolution::Provisioned(account)),
            // Another callback created the account first; treat it as an existing match.
            Err(AccountError::EmailAlreadyExists(_)) => {
                let account = self
                    .repository
                    .find_by_email(&email)
                    .await?
                    .ok_or(SessionError::AccountNotLinked)?;
                matched(account, identity)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn link(&self, account: &Account, identity: &ProviderIdentity) -> Result<(), SessionError> {
        let link = ExternalIdentity {
            account_id: account.id,
            issuer: identity.issuer.clone(),
            subject: identity.subject.clone(),
            email: identity.email.clone(),
            name: identity.name.clone(),
            last_login_at: Utc::now(),
        };

        match self.repository.link_external_identity(link).await {
            Ok(()) => Ok(()),
            Err(AccountError::IdentityAlreadyLinked(_)) => Err(SessionError::AccountNotLinked),
            Err(e) => Err(e.into()),
        }
    }
}

/// Outcome of mapping a provider identity onto a local account.
enum Resolution {
    /// The identity is already linked to this account.
    Linked(Account),
    /// An existing account with the same email; the link is not written yet.
    Matched(Account),
    /// Created for this identity.
    Provisioned(Account),
}

/// An existing account is only claimed through an email the provider has not
/// marked unverified.
fn matched(account: Account, identity: &ProviderIdentity) -> Result<Resolution, SessionError> {
    if identity.email_verified == Some(false) {
        tracing::warn!(
            account_id = %account.id,
            issuer = %identity.issuer,
            "Refusing to link unverified provider email"
        );
        return Err(SessionError::AccountNotLinked);
    }
    Ok(Resolution::Matched(account))
}

fn ensure_active(account: &Account) -> Result<(), SessionError> {
    if account.is_active {
        Ok(())
    } else {
        Err(SessionError::AccountInactive)
    }
}
