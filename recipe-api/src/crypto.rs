use base64::{Engine as _, engine::general_purpose};
use rand::prelude::RngExt;
use rand::rng;

/// Generates an opaque API token with 256 bits of entropy.
///
/// The token is `{base64url_encoded_random_bytes}` without padding: 32 random bytes encode to
/// 43 characters, which fits the `auth_tokens.key` column.
pub fn generate_token() -> String {
    // Generate 32 bytes (256 bits) of cryptographically secure random data
    let mut key_bytes = [0u8; 32];
    rng().fill(&mut key_bytes);

    general_purpose::URL_SAFE_NO_PAD.encode(key_bytes)
}
