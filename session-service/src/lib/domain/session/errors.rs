use auth::TokenError;
use auth::TokenType;
use thiserror::Error;

use crate::account::errors::AccountError;

/// Terminal outcome of a failed login, refresh or token check.
///
/// None of these are retried internally, and a failed attempt leaves
/// accounts and token state untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    // Credentials
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account not found")]
    NotFound,

    #[error("Account is inactive")]
    AccountInactive,

    // Tokens
    #[error("Token is malformed: {0}")]
    Malformed(String),

    #[error("Token signature is invalid")]
    SignatureInvalid,

    #[error("Token is expired")]
    Expired,

    #[error("Expected {expected} token, got {found} token")]
    WrongType {
        expected: TokenType,
        found: TokenType,
    },

    #[error("Token claims rejected: {0}")]
    InvalidClaims(String),

    #[error("Token has been revoked")]
    Revoked,

    // OIDC
    #[error("Unknown or expired OIDC state")]
    InvalidState,

    #[error("No local account is linked to this identity")]
    AccountNotLinked,

    #[error("OIDC login is not enabled")]
    OidcDisabled,

    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Identity provider rejected the request: {0}")]
    ProviderRejected(String),

    #[error("Identity provider misconfigured: {0}")]
    ProviderMisconfigured(String),

    // Infrastructure
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    /// Faults an operator must look at, as opposed to end-user mistakes.
    pub fn is_operator_error(&self) -> bool {
        matches!(
            self,
            SessionError::OidcDisabled
                | SessionError::ProviderUnavailable(_)
                | SessionError::ProviderRejected(_)
                | SessionError::ProviderMisconfigured(_)
                | SessionError::Storage(_)
                | SessionError::Internal(_)
        )
    }

    /// Failures that must be reported to the client without detail, so that
    /// responses do not reveal whether an email is registered.
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidCredentials | SessionError::NotFound
        )
    }

    /// Token rejections.
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            SessionError::Malformed(_)
                | SessionError::SignatureInvalid
                | SessionError::Expired
                | SessionError::WrongType { .. }
                | SessionError::InvalidClaims(_)
                | SessionError::Revoked
        )
    }
}

impl From<TokenError> for SessionError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed(msg) => SessionError::Malformed(msg),
            TokenError::SignatureInvalid => SessionError::SignatureInvalid,
            TokenError::InvalidClaims(msg) => SessionError::InvalidClaims(msg),
            TokenError::Expired => SessionError::Expired,
            TokenError::WrongType { expected, found } => {
                SessionError::WrongType { expected, found }
            }
            TokenError::Revoked => SessionError::Revoked,
            TokenError::Issuance(msg) => SessionError::Internal(msg),
        }
    }
}

impl From<AccountError> for SessionError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::NotFound(_) => SessionError::NotFound,
            AccountError::InvalidCredentials => SessionError::InvalidCredentials,
            AccountError::DatabaseError(msg) => SessionError::Storage(msg),
            other => SessionError::Internal(other.to_string()),
        }
    }
}

impl From<auth::PasswordError> for SessionError {
    fn from(err: auth::PasswordError) -> Self {
        SessionError::Internal(err.to_string())
    }
}
