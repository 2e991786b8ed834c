use auth::PasswordError;
use auth::PasswordHasher;
use tokio::task;

/// Argon2 hashing run on the blocking thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockingPasswordHasher {
    inner: PasswordHasher,
}

impl BlockingPasswordHasher {
    pub fn new() -> Self {
        Self {
            inner: PasswordHasher::new(),
        }
    }

    pub async fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let hasher = self.inner;
        let password = password.to_owned();

        task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| PasswordError::HashingFailed(format!("hashing task failed: {}", e)))?
    }

    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let hasher = self.inner;
        let password = password.to_owned();
        let hash = hash.to_owned();

        task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| {
                PasswordError::VerificationFailed(format!("verification task failed: {}", e))
            })?
    }

    /// See [`PasswordHasher::verify_dummy`].
    pub async fn verify_dummy(&self, password: &str) {
        let hasher = self.inner;
        let password = password.to_owned();

        if let Err(e) = task::spawn_blocking(move || hasher.verify_dummy(&password)).await {
            tracing::warn!(error = %e, "Dummy password verification task failed");
        }
    }
}
