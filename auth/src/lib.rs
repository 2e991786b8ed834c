//! Stateless authentication primitives.
//!
//! - Password hashing (Argon2id)
//! - Signed session tokens (HS256 JWT) with distinct access/refresh types
//! - Token issuance and validation against an explicit clock
//! - PKCE, `state` and `nonce` generation for OIDC logins
//!
//! Nothing here performs I/O. Services wire these pieces to their own storage
//! and transport.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.verify("my_password", &hash).unwrap());
//! ```
//!
//! ## Issuing and Validating Tokens
//! ```
//! use auth::{TokenIssuer, TokenSettings, TokenType, TokenValidator};
//!
//! let secret = b"secret_key_at_least_32_bytes_long!";
//! let settings = TokenSettings::default();
//! let issuer = TokenIssuer::new(secret, settings.clone());
//! let validator = TokenValidator::new(secret, &settings);
//!
//! let pair = issuer.issue_pair("42").unwrap();
//! let claims = validator.validate(&pair.access_token, TokenType::Access).unwrap();
//! assert_eq!(claims.sub, "42");
//!
//! // A refresh token is never accepted where an access token is expected
//! assert!(validator.validate(&pair.refresh_token, TokenType::Access).is_err());
//! ```

pub mod jwt;
pub mod password;
pub mod pkce;
pub mod token;

pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use jwt::TokenType;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use token::JtiDenyList;
pub use token::TokenError;
pub use token::TokenIssuer;
pub use token::TokenPair;
pub use token::TokenSettings;
pub use token::TokenValidator;
