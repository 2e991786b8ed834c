use std::sync::Arc;

use async_trait::async_trait;
use auth::TokenIssuer;
use auth::TokenPair;
use auth::TokenType;
use auth::TokenValidator;
use chrono::Utc;

use crate::account::models::Account;
use crate::account::models::AccountId;
use crate::account::ports::AccountRepository;
use crate::session::credentials::CredentialVerifier;
use crate::session::errors::SessionError;
use crate::session::models::AuthorizationRedirect;
use crate::session::models::LogoutOutcome;
use crate::session::models::LogoutRequest;
use crate::session::models::OidcLogin;
use crate::session::oidc::OidcCoordinator;
use crate::session::ports::ExchangeStateStore;
use crate::session::ports::IdentityProvider;
use crate::session::ports::SessionServicePort;

/// Session orchestration over password and OIDC logins.
///
/// Holds no per-session state: every request is answered from the token
/// itself plus an account lookup.
pub struct SessionService<AR, SS, IP>
where
    AR: AccountRepository,
    SS: ExchangeStateStore,
    IP: IdentityProvider,
{
    repository: Arc<AR>,
    verifier: CredentialVerifier<AR>,
    oidc: Option<OidcCoordinator<AR, SS, IP>>,
    issuer: Arc<TokenIssuer>,
    validator: Arc<TokenValidator>,
}

impl<AR, SS, IP> SessionService<AR, SS, IP>
where
    AR: AccountRepository,
    SS: ExchangeStateStore,
    IP: IdentityProvider,
{
    pub fn new(
        repository: Arc<AR>,
        issuer: Arc<TokenIssuer>,
        validator: Arc<TokenValidator>,
    ) -> Self {
        Self {
            verifier: CredentialVerifier::new(Arc::clone(&repository)),
            repository,
            oidc: None,
            issuer,
            validator,
        }
    }

    pub fn with_oidc(mut self, coordinator: OidcCoordinator<AR, SS, IP>) -> Self {
        self.oidc = Some(coordinator);
        self
    }

    fn coordinator(&self) -> Result<&OidcCoordinator<AR, SS, IP>, SessionError> {
        self.oidc.as_ref().ok_or(SessionError::OidcDisabled)
    }

    async fn active_account(&self, subject: &str) -> Result<Account, SessionError> {
        let id = AccountId::from_string(subject)
            .map_err(|e| SessionError::Malformed(format!("subject: {}", e)))?;

        let account = self
            .repository
            .find_by_id(&id)
            .await?
            .ok_or(SessionError::NotFound)?;

        if !account.is_active {
            return Err(SessionError::AccountInactive);
        }
        Ok(account)
    }
}

#[async_trait]
impl<AR, SS, IP> SessionServicePort for SessionService<AR, SS, IP>
where
    AR: AccountRepository,
    SS: ExchangeStateStore,
    IP: IdentityProvider,
{
    async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<TokenPair, SessionError> {
        let account = self.verifier.verify(email, password).await?;
        let tokens = self.issuer.issue_pair(&account.id.to_string())?;

        tracing::info!(account_id = %account.id, method = "password", "Login succeeded");
        Ok(tokens)
    }

    async fn begin_oidc_login(
        &self,
        redirect_to: Option<&str>,
    ) -> Result<AuthorizationRedirect, SessionError> {
        self.coordinator()?.begin(redirect_to).await
    }

    async fn login_with_oidc_callback(
        &self,
        code: &str,
        state: &str,
    ) -> Result<OidcLogin, SessionError> {
        let (account, redirect_to) = self.coordinator()?.complete(code, state).await?;
        let tokens = self.issuer.issue_pair(&account.id.to_string())?;

        tracing::info!(account_id = %account.id, method = "oidc", "Login succeeded");
        Ok(OidcLogin {
            tokens,
            redirect_to,
        })
    }

    async fn abandon_oidc_login(&self, state: &str) -> Result<(), SessionError> {
        if self.coordinator()?.abandon(state).await? {
            tracing::debug!("OIDC exchange state discarded");
        }
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
        let claims = self.validator.validate(refresh_token, TokenType::Refresh)?;
        let account = self.active_account(&claims.sub).await?;

        let tokens = self.issuer.reissue_access_at(
            &account.id.to_string(),
            refresh_token.to_string(),
            Utc::now(),
        )?;

        tracing::debug!(account_id = %account.id, "Access token refreshed");
        Ok(tokens)
    }

    async fn logout(&self, request: LogoutRequest) -> LogoutOutcome {
        if !request.oidc_session {
            return LogoutOutcome::local();
        }

        let Some(coordinator) = self.oidc.as_ref() else {
            return LogoutOutcome::local();
        };

        match coordinator.end_session_url(request.post_logout_redirect) {
            Some(url) => LogoutOutcome {
                end_session_url: Some(url),
                limitation: Some(LogoutOutcome::TOKENS_REMAIN_VALID.to_string()),
            },
            None => LogoutOutcome {
                end_session_url: None,
                limitation: Some(
                    "Identity provider has no end-session endpoint; provider session remains active"
                        .to_string(),
                ),
            },
        }
    }

    async fn authenticate(&self, access_token: &str) -> Result<Account, SessionError> {
        let claims = self.validator.validate(access_token, TokenType::Access)?;
        self.active_account(&claims.sub).await
    }
}

#[cfg(test)]
mod tests {
    use auth::TokenSettings;

    use super::*;
    use crate::session::mocks::password_account;
    use crate::session::mocks::MockAccountRepo;
    use crate::session::mocks::MockProvider;
    use crate::session::mocks::MockStateStore;
    use crate::session::oidc::OidcSettings;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    type TestService = SessionService<MockAccountRepo, MockStateStore, MockProvider>;

    fn service(repository: MockAccountRepo) -> TestService {
        let settings = TokenSettings::default();
        SessionService::new(
            Arc::new(repository),
            Arc::new(TokenIssuer::new(SECRET, settings.clone())),
            Arc::new(TokenValidator::new(SECRET, &settings)),
        )
    }

    fn repository_with(account: Account) -> MockAccountRepo {
        let mut repository = MockAccountRepo::new();
        let by_email = account.clone();
        repository
            .expect_find_by_email()
            .returning(move |_| Ok(Some(by_email.clone())));
        repository
            .expect_find_by_id()
            .returning(move |_| Ok(Some(account.clone())));
        repository
    }

    #[tokio::test]
    async fn test_password_login_issues_pair() {
        let account = password_account("a@b.com", "pass-word-1");
        let service = service(repository_with(account.clone()));

        let tokens = service
            .login_with_password("a@b.com", "pass-word-1")
            .await
            .unwrap();

        assert_eq!(tokens.token_type, "bearer");
        assert_eq!(tokens.expires_in, 900);
        assert_eq!(tokens.refresh_expires_in, 604_800);

        let authenticated = service.authenticate(&tokens.access_token).await.unwrap();
        assert_eq!(authenticated.id, account.id);
    }

    #[tokio::test]
    async fn test_password_login_wrong_password_issues_nothing() {
        let service = service(repository_with(password_account("a@b.com", "pass-word-1")));

        assert_eq!(
            service.login_with_password("a@b.com", "wrong").await,
            Err(SessionError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn test_refresh_returns_same_refresh_token() {
        let service = service(repository_with(password_account("a@b.com", "pass-word-1")));
        let tokens = service
            .login_with_password("a@b.com", "pass-word-1")
            .await
            .unwrap();

        let refreshed = service.refresh(&tokens.refresh_token).await.unwrap();

        assert_eq!(refreshed.refresh_token, tokens.refresh_token);
        assert_ne!(refreshed.access_token, tokens.access_token);
        assert!(service.authenticate(&refreshed.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let service = service(repository_with(password_account("a@b.com", "pass-word-1")));
        let tokens = service
            .login_with_password("a@b.com", "pass-word-1")
            .await
            .unwrap();

        assert_eq!(
            service.refresh(&tokens.access_token).await,
            Err(SessionError::WrongType {
                expected: TokenType::Refresh,
                found: TokenType::Access,
            })
        );
    }

    #[tokio::test]
    async fn test_authenticate_rejects_refresh_token() {
        let service = service(repository_with(password_account("a@b.com", "pass-word-1")));
        let tokens = service
            .login_with_password("a@b.com", "pass-word-1")
            .await
            .unwrap();

        assert!(matches!(
            service.authenticate(&tokens.refresh_token).await,
            Err(SessionError::WrongType { .. })
        ));
    }

    #[tokio::test]
    async fn test_refresh_for_deleted_account() {
        let mut repository = MockAccountRepo::new();
        repository.expect_find_by_id().returning(|_| Ok(None));
        let service = service(repository);

        let issuer = TokenIssuer::new(SECRET, TokenSettings::default());
        let tokens = issuer.issue_pair(&AccountId::new().to_string()).unwrap();

        assert_eq!(
            service.refresh(&tokens.refresh_token).await,
            Err(SessionError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_tokens_from_rotated_secret_rejected() {
        let service = service(MockAccountRepo::new());
        let old_issuer = TokenIssuer::new(
            b"an-old-secret-that-was-rotated-out!",
            TokenSettings::default(),
        );
        let tokens = old_issuer.issue_pair(&AccountId::new().to_string()).unwrap();

        assert_eq!(
            service.authenticate(&tokens.access_token).await,
            Err(SessionError::SignatureInvalid)
        );
    }

    #[tokio::test]
    async fn test_oidc_disabled() {
        let service = service(MockAccountRepo::new());

        assert_eq!(
            service.begin_oidc_login(None).await,
            Err(SessionError::OidcDisabled)
        );
        assert_eq!(
            service.login_with_oidc_callback("code", "state").await,
            Err(SessionError::OidcDisabled)
        );
        assert_eq!(
            service.abandon_oidc_login("state").await,
            Err(SessionError::OidcDisabled)
        );
    }

    #[tokio::test]
    async fn test_oidc_callback_issues_pair() {
        let mut repository = MockAccountRepo::new();
        let mut store = MockStateStore::new();
        let mut provider = MockProvider::new();
        let account = Account::new(crate::session::mocks::email("alice@example.com"), None, None);
        let linked = account.clone();

        store.expect_take().times(1).returning(|_| {
            let mut entry = crate::session::mocks::exchange_state("n", "v");
            entry.redirect_to = "/inbox".to_string();
            Ok(Some(entry))
        });
        provider.expect_exchange_code().returning(|_, _, _| {
            Ok(crate::session::models::ProviderIdentity {
                issuer: "https://idp.example.com".to_string(),
                subject: "sub-1".to_string(),
                email: Some("alice@example.com".to_string()),
                email_verified: Some(true),
                name: None,
            })
        });
        repository
            .expect_find_by_external_identity()
            .returning(move |_, _| Ok(Some(linked.clone())));
        repository
            .expect_touch_external_identity()
            .returning(|_, _, _| Ok(()));

        let repository = Arc::new(repository);
        let settings = TokenSettings::default();
        let service: TestService = SessionService::new(
            Arc::clone(&repository),
            Arc::new(TokenIssuer::new(SECRET, settings.clone())),
            Arc::new(TokenValidator::new(SECRET, &settings)),
        )
        .with_oidc(OidcCoordinator::new(
            repository,
            Arc::new(store),
            Arc::new(provider),
            OidcSettings::default(),
        ));

        let login = service
            .login_with_oidc_callback("code", "state")
            .await
            .unwrap();

        assert_eq!(login.redirect_to, "/inbox");
        assert_eq!(login.tokens.expires_in, 900);
    }

    #[tokio::test]
    async fn test_logout_password_session_is_local() {
        let service = service(MockAccountRepo::new());

        let outcome = service.logout(LogoutRequest::default()).await;

        assert!(outcome.end_session_url.is_none());
        assert!(outcome.limitation.is_some());
    }

    #[tokio::test]
    async fn test_logout_oidc_without_end_session_endpoint() {
        let mut provider = MockProvider::new();
        provider.expect_end_session_url().returning(|_| None);

        let repository = Arc::new(MockAccountRepo::new());
        let settings = TokenSettings::default();
        let service: TestService = SessionService::new(
            Arc::clone(&repository),
            Arc::new(TokenIssuer::new(SECRET, settings.clone())),
            Arc::new(TokenValidator::new(SECRET, &settings)),
        )
        .with_oidc(OidcCoordinator::new(
            repository,
            Arc::new(MockStateStore::new()),
            Arc::new(provider),
            OidcSettings::default(),
        ));

        let outcome = service
            .logout(LogoutRequest {
                oidc_session: true,
                post_logout_redirect: None,
            })
            .await;

        assert!(outcome.end_session_url.is_none());
        assert!(outcome
            .limitation
            .is_some_and(|l| l.contains("end-session")));
    }
}
