//! One-way digests for API key secrets.
//!
//! Secrets are never persisted. The `api_keys` table stores only the SHA-256
//! digest, and every presented secret is hashed again and matched by digest.

use sha2::{Digest, Sha256};

/// Hash a secret into a lowercase hex SHA-256 digest (64 characters).
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());

    hex::encode(hasher.finalize())
}

/// Generate a cryptographically secure random secret.
///
/// # Output
///
/// 64 hex characters (32 random bytes)
pub fn generate_secret() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Short digest prefix that is safe to put in logs.
pub fn digest_hint(digest: &str) -> &str {
    &digest[..digest.len().min(8)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_is_deterministic() {
        for secret in ["a", "sk_test_123", "with spaces and ünïcode"] {
            assert_eq!(hash_secret(secret), hash_secret(secret));
        }
    }

    #[test]
    fn distinct_secrets_produce_distinct_digests() {
        assert_ne!(hash_secret("secret-one"), hash_secret("secret-two"));
        assert_ne!(hash_secret("abc"), hash_secret("abc "));
    }

    #[test]
    fn digest_is_lowercase_hex_of_fixed_length() {
        let digest = hash_secret("abc");
        assert_eq!(digest.len(), 64);
        assert!(
            digest
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
        // Known SHA-256 test vector
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn generated_secrets_are_unique_hex() {
        let a = generate_secret();
        let b = generate_secret();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn digest_hint_truncates() {
        assert_eq!(digest_hint(&hash_secret("abc")), "ba7816bf");
        assert_eq!(digest_hint("abc"), "abc");
    }
}
