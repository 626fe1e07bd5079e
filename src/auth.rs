use argon2::{
    Argon2,
    PasswordHash,
    PasswordVerifier,
    PasswordHasher,
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

use argon2::password_hash::{SaltString, rand_core::OsRng as PHOsRng};

/// Verify a password against the Argon2 PHC string stored in account.password_hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(p) => p,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Hash a new password using Argon2id with a random salt.
pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut PHOsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| format!("argon2 hash error: {e}"))
}

/// Generate an opaque session token to hand to the client.
/// Only hash_access_token(token) is persisted.
pub fn generate_access_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a session token for storage (SHA-256 hex).
pub fn hash_access_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let out = hasher.finalize();
    hex::encode(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify_roundtrip() {
        let phc = hash_password("secret1").unwrap();
        assert!(verify_password("secret1", &phc));
        assert!(!verify_password("secret2", &phc));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(!verify_password("secret1", "not-a-phc-string"));
    }

    #[test]
    fn test_access_tokens_are_unique() {
        let a = generate_access_token();
        let b = generate_access_token();
        assert_ne!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn test_token_hash_is_stable_sha256_hex() {
        let t = "some-token";
        let h1 = hash_access_token(t);
        let h2 = hash_access_token(t);
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert_ne!(h1, hash_access_token("other-token"));
    }
}
