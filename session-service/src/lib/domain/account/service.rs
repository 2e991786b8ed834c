use std::sync::Arc;

use async_trait::async_trait;

use crate::account::errors::AccountError;
use crate::account::hashing::BlockingPasswordHasher;
use crate::account::models::Account;
use crate::account::models::AccountId;
use crate::account::models::ChangePasswordCommand;
use crate::account::models::RegisterAccountCommand;
use crate::account::ports::AccountRepository;
use crate::account::ports::AccountServicePort;

/// Domain service implementation for account operations.
pub struct AccountService<AR>
where
    AR: AccountRepository,
{
    repository: Arc<AR>,
    password_hasher: BlockingPasswordHasher,
}

impl<AR> AccountService<AR>
where
    AR: AccountRepository,
{
    pub fn new(repository: Arc<AR>) -> Self {
        Self {
            repository,
            password_hasher: BlockingPasswordHasher::new(),
        }
    }
}

#[async_trait]
impl<AR> AccountServicePort for AccountService<AR>
where
    AR: AccountRepository,
{
    async fn register(&self, command: RegisterAccountCommand) -> Result<Account, AccountError> {
        if self.repository.find_by_email(&command.email).await?.is_some() {
            return Err(AccountError::EmailAlreadyExists(command.email.to_string()));
        }

        let password_hash = self.password_hasher.hash(command.password.expose()).await?;
        let account = Account::new(command.email, Some(password_hash), command.name);

        let created = self.repository.create(account).await?;
        tracing::info!(account_id = %created.id, "Account registered");

        Ok(created)
    }

    async fn get_account(&self, id: &AccountId) -> Result<Account, AccountError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(AccountError::NotFound(id.to_string()))
    }

    async fn change_password(
        &self,
        id: &AccountId,
        command: ChangePasswordCommand,
    ) -> Result<Account, AccountError> {
        let mut account = self.get_account(id).await?;

        if let Some(stored_hash) = &account.password_hash {
            let current = command
                .current_password
                .as_deref()
                .ok_or(AccountError::InvalidCredentials)?;

            if !self.password_hasher.verify(current, stored_hash).await? {
                tracing::warn!(account_id = %id, "Password change rejected: current password mismatch");
                return Err(AccountError::InvalidCredentials);
            }
        }

        let password_hash = self.password_hasher.hash(command.new_password.expose()).await?;
        self.repository.update_password(id, &password_hash).await?;
        account.password_hash = Some(password_hash);

        tracing::info!(account_id = %id, "Password changed");
        Ok(account)
    }
}
