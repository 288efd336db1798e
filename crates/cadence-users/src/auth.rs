//! Password hashing and bearer-token generation.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::{engine::general_purpose::URL_SAFE, Engine};

use crate::error::{Result, UserError};

/// Random bytes behind every token.
pub const TOKEN_BYTES: usize = 32;

/// Hash `password` with argon2id and a fresh salt. Returns the PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| UserError::Hashing(e.to_string()))
}

/// Check `password` against a stored PHC string. A malformed hash never
/// verifies.
pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// New opaque bearer token: URL-safe base64 of [`TOKEN_BYTES`] OS-random bytes.
pub fn generate_token() -> String {
    let mut buf = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut buf);
    URL_SAFE.encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_only_the_original_password() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "s3cret"));
        assert!(!verify_password(&hash, "s3cret "));
        assert!(!verify_password("not-a-phc-string", "s3cret"));
    }

    #[test]
    fn same_password_hashes_differently() {
        assert_ne!(hash_password("x").unwrap(), hash_password("x").unwrap());
    }

    #[test]
    fn tokens_are_url_safe_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        // 32 bytes → 44 base64 chars including one '=' pad.
        assert_eq!(a.len(), 44);
        assert!(!a.contains('+') && !a.contains('/'));
        assert_eq!(URL_SAFE.decode(&a).unwrap().len(), TOKEN_BYTES);
    }
}
