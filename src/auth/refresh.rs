use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Entropy of a freshly minted refresh token.
pub const REFRESH_TOKEN_BYTES: usize = 64;

/// Opaque refresh token handed to the client exactly once.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Deterministic digest stored in place of the token, so the session row
/// is a direct unique-index lookup instead of a scan over all sessions.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_generation() {
        let token1 = generate_refresh_token();
        let token2 = generate_refresh_token();

        assert_ne!(token1, token2);
        // 64 bytes base64url without padding
        assert_eq!(token1.len(), 86);
        assert!(token1
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_digest_is_deterministic() {
        let token = generate_refresh_token();

        let hash1 = hash_refresh_token(&token);
        let hash2 = hash_refresh_token(&token);

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
        assert!(hash1.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(hash1, token);
    }

    #[test]
    fn test_digest_differs_per_token() {
        assert_ne!(
            hash_refresh_token(&generate_refresh_token()),
            hash_refresh_token(&generate_refresh_token())
        );
    }

    #[test]
    fn test_known_digest() {
        // SHA-256 of the empty string
        assert_eq!(
            hash_refresh_token(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
