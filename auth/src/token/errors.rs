use thiserror::Error;

use crate::jwt::JwtError;
use crate::jwt::TokenType;

/// Outcome of a rejected token.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token is malformed: {0}")]
    Malformed(String),

    #[error("Token signature is invalid")]
    SignatureInvalid,

    #[error("Token claims rejected: {0}")]
    InvalidClaims(String),

    #[error("Token is expired")]
    Expired,

    #[error("Expected {expected} token, got {found} token")]
    WrongType {
        expected: TokenType,
        found: TokenType,
    },

    #[error("Token has been revoked")]
    Revoked,

    #[error("Failed to issue token: {0}")]
    Issuance(String),
}

impl From<JwtError> for TokenError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::EncodingFailed(msg) => TokenError::Issuance(msg),
            JwtError::Malformed(msg) => TokenError::Malformed(msg),
            JwtError::SignatureInvalid => TokenError::SignatureInvalid,
            JwtError::InvalidClaims(msg) => TokenError::InvalidClaims(msg),
        }
    }
}
