#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use auth::TokenIssuer;
use auth::TokenSettings;
use auth::TokenValidator;
use chrono::DateTime;
use chrono::Utc;
use jsonwebtoken::Algorithm;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use serde_json::json;
use session_service::account::errors::AccountError;
use session_service::account::models::Account;
use session_service::account::models::AccountId;
use session_service::account::models::EmailAddress;
use session_service::account::models::ExternalIdentity;
use session_service::account::ports::AccountRepository;
use session_service::config::OidcConfig;
use session_service::config::RateLimitConfig;
use session_service::domain::account::service::AccountService;
use session_service::domain::session::oidc::OidcCoordinator;
use session_service::domain::session::oidc::OidcSettings;
use session_service::domain::session::service::SessionService;
use session_service::inbound::http::rate_limit::AuthRateLimits;
use session_service::inbound::http::router::create_router;
use session_service::outbound::oidc::HttpIdentityProvider;
use session_service::outbound::state_store::InMemoryExchangeStateStore;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;

pub const TEST_SECRET: &str = "test-secret-key-for-jwt-signing-at-least-32-bytes";
pub const OIDC_CLIENT_ID: &str = "session-service-test";

const SIGNING_KEY_ID: &str = "test-signing-key";
const SIGNING_KEY: &str = include_str!("../fixtures/oidc_signing_key.pem");
const JWKS: &str = include_str!("../fixtures/oidc_jwks.json");

/// Account store kept in process memory
#[derive(Default)]
pub struct InMemoryAccountRepository {
    accounts: Mutex<Vec<Account>>,
    identities: Mutex<Vec<ExternalIdentity>>,
}

impl InMemoryAccountRepository {
    pub fn identities(&self) -> Vec<ExternalIdentity> {
        self.identities.lock().unwrap().clone()
    }

    pub fn set_active(&self, email: &str, active: bool) {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(account) = accounts.iter_mut().find(|a| a.email.as_str() == email) {
            account.is_active = active;
        }
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn create(&self, account: Account) -> Result<Account, AccountError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.iter().any(|a| a.email == account.email) {
            return Err(AccountError::EmailAlreadyExists(account.email.to_string()));
        }
        accounts.push(account.clone());
        Ok(account)
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, AccountError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == *id)
            .cloned())
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<Account>, AccountError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.email == *email)
            .cloned())
    }

    async fn find_by_external_identity(
        &self,
        issuer: &str,
        subject: &str,
    ) -> Result<Option<Account>, AccountError> {
        let account_id = self
            .identities
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.issuer == issuer && i.subject == subject)
            .map(|i| i.account_id);

        match account_id {
            Some(id) => self.find_by_id(&id).await,
            None => Ok(None),
        }
    }

    async fn link_external_identity(&self, identity: ExternalIdentity) -> Result<(), AccountError> {
        let mut identities = self.identities.lock().unwrap();
        if identities
            .iter()
            .any(|i| i.issuer == identity.issuer && i.subject == identity.subject)
        {
            return Err(AccountError::IdentityAlreadyLinked(identity.subject));
        }
        identities.push(identity);
        Ok(())
    }

    async fn touch_external_identity(
        &self,
        issuer: &str,
        subject: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AccountError> {
        let mut identities = self.identities.lock().unwrap();
        if let Some(identity) = identities
            .iter_mut()
            .find(|i| i.issuer == issuer && i.subject == subject)
        {
            identity.last_login_at = at;
        }
        Ok(())
    }

    async fn update_password(&self, id: &AccountId, password_hash: &str) -> Result<(), AccountError> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .iter_mut()
            .find(|a| a.id == *id)
            .ok_or_else(|| AccountError::NotFound(id.to_string()))?;
        account.password_hash = Some(password_hash.to_string());
        Ok(())
    }
}

/// Test application that spawns a real server
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub repository: Arc<InMemoryAccountRepository>,
    pub api_client: reqwest::Client,
    pub token_issuer: TokenIssuer,
}

/// Options for `TestApp::spawn_with`.
pub struct TestOptions {
    pub secret: String,
    pub oidc_issuer: Option<String>,
    pub auto_provision: bool,
    /// Unlimited when absent
    pub rate_limit: Option<RateLimitConfig>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            secret: TEST_SECRET.to_string(),
            oidc_issuer: None,
            auto_provision: false,
            rate_limit: None,
        }
    }
}

impl TestApp {
    /// Spawn the application with password login only
    pub async fn spawn() -> Self {
        Self::spawn_with(TestOptions::default()).await
    }

    /// Spawn the application with OIDC login against a mock provider
    pub async fn spawn_with_oidc(provider: &MockProvider, auto_provision: bool) -> Self {
        Self::spawn_with(TestOptions {
            oidc_issuer: Some(provider.issuer()),
            auto_provision,
            ..TestOptions::default()
        })
        .await
    }

    pub async fn spawn_with(options: TestOptions) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let repository = Arc::new(InMemoryAccountRepository::default());
        let settings = TokenSettings::default();
        let secret = options.secret.as_bytes();

        let mut session_service = SessionService::new(
            Arc::clone(&repository),
            Arc::new(TokenIssuer::new(secret, settings.clone())),
            Arc::new(TokenValidator::new(secret, &settings)),
        );

        if let Some(issuer) = &options.oidc_issuer {
            let provider = HttpIdentityProvider::discover(&oidc_config(issuer, port))
                .await
                .expect("Failed to discover mock provider");

            session_service = session_service.with_oidc(OidcCoordinator::new(
                Arc::clone(&repository),
                Arc::new(InMemoryExchangeStateStore::new()),
                Arc::new(provider),
                OidcSettings {
                    auto_provision: options.auto_provision,
                    state_ttl: Duration::from_secs(600),
                    post_logout_redirect_uri: Some(format!("{}/", address)),
                },
            ));
        }

        let account_service = Arc::new(AccountService::new(Arc::clone(&repository)));
        let rate_limits = options
            .rate_limit
            .as_ref()
            .and_then(AuthRateLimits::from_config);
        let router = create_router(Arc::new(session_service), account_service, rate_limits);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Server error");
        });

        Self {
            address,
            port,
            repository,
            api_client: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .expect("Failed to create reqwest client"),
            token_issuer: TokenIssuer::new(options.secret.as_bytes(), settings),
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(format!("{}{}", self.address, path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Helper to make PATCH request with Bearer token
    pub fn patch_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.api_client
            .patch(format!("{}{}", self.address, path))
            .bearer_auth(token)
    }

    /// Register an account and return its id
    pub async fn register(&self, email: &str, password: &str) -> String {
        let response = self
            .post("/api/v1/auth/register")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);

        let body: serde_json::Value = response.json().await.expect("Failed to parse response");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Log in with a password and return the response body
    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/api/v1/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }
}

fn oidc_config(issuer: &str, port: u16) -> OidcConfig {
    OidcConfig {
        enabled: true,
        issuer_url: issuer.to_string(),
        client_id: OIDC_CLIENT_ID.to_string(),
        client_secret: "provider-secret".to_string(),
        redirect_uri: format!("http://127.0.0.1:{}/api/v1/auth/oidc/callback", port),
        http_timeout_seconds: 2,
        ..OidcConfig::default()
    }
}

/// OpenID provider double served by wiremock
pub struct MockProvider {
    pub server: MockServer,
}

impl MockProvider {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let issuer = server.uri();

        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issuer": issuer,
                "authorization_endpoint": format!("{}/authorize", issuer),
                "token_endpoint": format!("{}/token", issuer),
                "end_session_endpoint": format!("{}/logout", issuer),
                "jwks_uri": format!("{}/jwks", issuer),
                "response_types_supported": ["code"],
                "subject_types_supported": ["public"],
                "id_token_signing_alg_values_supported": ["RS256"],
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(JWKS, "application/json"))
            .mount(&server)
            .await;

        Self { server }
    }

    pub fn issuer(&self) -> String {
        self.server.uri()
    }

    /// Answer the next token request with an ID token for `subject`
    pub async fn issue_identity(&self, subject: &str, email: &str, email_verified: bool, nonce: &str) {
        let claims = json!({
            "iss": self.issuer(),
            "sub": subject,
            "aud": OIDC_CLIENT_ID,
            "exp": Utc::now().timestamp() + 300,
            "iat": Utc::now().timestamp(),
            "nonce": nonce,
            "email": email,
            "email_verified": email_verified,
            "name": "Test User",
        });
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(SIGNING_KEY_ID.to_string());
        let id_token = jsonwebtoken::encode(
            &header,
            &claims,
            &EncodingKey::from_rsa_pem(SIGNING_KEY.as_bytes()).expect("Invalid signing key"),
        )
        .expect("Failed to sign ID token");

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "provider-access-token",
                "token_type": "Bearer",
                "id_token": id_token,
            })))
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
    }

    /// Number of requests the token endpoint has received
    pub async fn token_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == "/token")
            .count()
    }
}

/// Query parameter from a redirect `Location`
pub fn query_param(location: &str, name: &str) -> Option<String> {
    url::Url::parse(location)
        .ok()?
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}
