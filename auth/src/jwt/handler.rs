use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;

use super::claims::Claims;
use super::errors::JwtError;

/// HS256 codec for [`Claims`].
///
/// Decoding verifies the signature and, when configured, the `iss`/`aud`
/// claims. Expiry and token type are left to the caller so they can be
/// checked against an explicit clock.
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtHandler {
    /// Create a handler signing with `secret`.
    ///
    /// # Security Notes
    /// - The secret should be at least 256 bits (32 bytes) for HS256
    /// - Replacing the secret invalidates every token signed with the old one
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Require `iss` to be present and equal `issuer` on decode.
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.required_spec_claims.insert("iss".to_string());
        self.validation.set_issuer(&[issuer]);
        self
    }

    /// Require `aud` to be present and equal `audience` on decode.
    pub fn with_audience(mut self, audience: &str) -> Self {
        self.validation.required_spec_claims.insert("aud".to_string());
        self.validation.validate_aud = true;
        self.validation.set_audience(&[audience]);
        self
    }

    /// Sign claims into a compact JWT.
    ///
    /// # Errors
    /// * `EncodingFailed` - Serialization or signing failed
    pub fn encode(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    /// Verify a token's signature and decode its claims.
    ///
    /// # Errors
    /// * `Malformed` - Not a JWT, or the payload is not a valid claim set
    /// * `SignatureInvalid` - Signed with another key or algorithm
    /// * `InvalidClaims` - Issuer or audience mismatch or missing
    pub fn decode(&self, token: &str) -> Result<Claims, JwtError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName
                | ErrorKind::MissingAlgorithm => JwtError::SignatureInvalid,
                ErrorKind::InvalidIssuer
                | ErrorKind::InvalidAudience
                | ErrorKind::MissingRequiredClaim(_) => JwtError::InvalidClaims(e.to_string()),
                _ => JwtError::Malformed(e.to_string()),
            })
    }
}
