use std::sync::Arc;

use crate::account::hashing::BlockingPasswordHasher;
use crate::account::models::Account;
use crate::account::models::EmailAddress;
use crate::account::ports::AccountRepository;
use crate::session::errors::SessionError;

/// Email and password check against stored Argon2 hashes.
///
/// Unknown emails still pay for one hash verification so the two failure
/// paths take comparable time.
pub struct CredentialVerifier<AR>
where
    AR: AccountRepository,
{
    repository: Arc<AR>,
    password_hasher: BlockingPasswordHasher,
}

impl<AR> CredentialVerifier<AR>
where
    AR: AccountRepository,
{
    pub fn new(repository: Arc<AR>) -> Self {
        Self {
            repository,
            password_hasher: BlockingPasswordHasher::new(),
        }
    }

    /// # Errors
    /// * `NotFound` - No account for this email
    /// * `InvalidCredentials` - Wrong password, or the account has no password
    /// * `AccountInactive` - Password matched but the account is deactivated
    pub async fn verify(&self, email: &str, password: &str) -> Result<Account, SessionError> {
        let Ok(email) = EmailAddress::new(email.to_string()) else {
            self.password_hasher.verify_dummy(password).await;
            return Err(SessionError::NotFound);
        };

        let Some(account) = self.repository.find_by_email(&email).await? else {
            self.password_hasher.verify_dummy(password).await;
            tracing::debug!("Login attempt for unknown email");
            return Err(SessionError::NotFound);
        };

        let Some(stored_hash) = account.password_hash.as_deref() else {
            self.password_hasher.verify_dummy(password).await;
            tracing::debug!(account_id = %account.id, "Password login for account without password");
            return Err(SessionError::InvalidCredentials);
        };

        let matches = self
            .password_hasher
            .verify(password, stored_hash)
            .await
            .map_err(|e| {
                tracing::error!(account_id = %account.id, error = %e, "Stored password hash unreadable");
                SessionError::from(e)
            })?;

        if !matches {
            tracing::debug!(account_id = %account.id, "Password mismatch");
            return Err(SessionError::InvalidCredentials);
        }

        if !account.is_active {
            return Err(SessionError::AccountInactive);
        }

        Ok(account)
    }
}
