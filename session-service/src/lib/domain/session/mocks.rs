use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use mockall::mock;

use crate::account::errors::AccountError;
use crate::account::models::Account;
use crate::account::models::AccountId;
use crate::account::models::EmailAddress;
use crate::account::models::ExternalIdentity;
use crate::account::ports::AccountRepository;
use crate::session::errors::SessionError;
use crate::session::models::AuthorizationParams;
use crate::session::models::OidcExchangeState;
use crate::session::models::ProviderIdentity;
use crate::session::ports::ExchangeStateStore;
use crate::session::ports::IdentityProvider;

mock! {
    pub AccountRepo {}

    #[async_trait]
    impl AccountRepository for AccountRepo {
        async fn create(&self, account: Account) -> Result<Account, AccountError>;
        async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, AccountError>;
        async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<Account>, AccountError>;
        async fn find_by_external_identity(&self, issuer: &str, subject: &str) -> Result<Option<Account>, AccountError>;
        async fn link_external_identity(&self, identity: ExternalIdentity) -> Result<(), AccountError>;
        async fn touch_external_identity(&self, issuer: &str, subject: &str, at: DateTime<Utc>) -> Result<(), AccountError>;
        async fn update_password(&self, id: &AccountId, password_hash: &str) -> Result<(), AccountError>;
    }
}

mock! {
    pub StateStore {}

    #[async_trait]
    impl ExchangeStateStore for StateStore {
        async fn insert_if_absent(&self, key: &str, entry: OidcExchangeState, ttl: Duration) -> Result<bool, SessionError>;
        async fn take(&self, key: &str) -> Result<Option<OidcExchangeState>, SessionError>;
        async fn sweep_expired(&self) -> Result<usize, SessionError>;
    }
}

mock! {
    pub Provider {}

    #[async_trait]
    impl IdentityProvider for Provider {
        fn authorization_url(&self, params: &AuthorizationParams) -> Result<String, SessionError>;
        async fn exchange_code(&self, code: &str, pkce_verifier: &str, nonce: &str) -> Result<ProviderIdentity, SessionError>;
        fn end_session_url(&self, post_logout_redirect: Option<String>) -> Option<String>;
    }
}

pub fn email(value: &str) -> EmailAddress {
    EmailAddress::new(value.to_string()).unwrap()
}

pub fn password_account(address: &str, password: &str) -> Account {
    let hash = auth::PasswordHasher::new().hash(password).unwrap();
    Account::new(email(address), Some(hash), None)
}

pub fn exchange_state(nonce: &str, verifier: &str) -> OidcExchangeState {
    OidcExchangeState {
        nonce: nonce.to_string(),
        pkce_verifier: verifier.to_string(),
        redirect_to: "/".to_string(),
        created_at: Utc::now(),
    }
}
