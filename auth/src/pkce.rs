use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::Digest;
use sha2::Sha256;

/// Random PKCE code verifier.
///
/// 32 random bytes encoded as base64url without padding (43 characters,
/// within the 43-128 range required by RFC 7636).
pub fn generate_code_verifier() -> String {
    random_token::<32>()
}

/// S256 code challenge: `BASE64URL(SHA256(verifier))`.
pub fn generate_code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Opaque OAuth2 `state` value.
pub fn generate_state() -> String {
    random_token::<32>()
}

/// OIDC `nonce` binding the ID token to this login attempt.
pub fn generate_nonce() -> String {
    random_token::<16>()
}

fn random_token<const N: usize>() -> String {
    let bytes: [u8; N] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}
