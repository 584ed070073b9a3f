//! Salted secret hashing and verification.
//!
//! Client secrets and user passwords are stored as a raw Argon2id output
//! (URL-safe base64) next to a per-credential random salt. The derivation is
//! deterministic for a given salt so a stored hash can be recomputed from the
//! presented secret and compared in constant time.

use argon2::Argon2;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use subtle::ConstantTimeEq;

/// Length of the derived hash in bytes.
const HASH_LEN: usize = 32;

/// Hash and salt checked when the account being authenticated does not exist,
/// so both failure paths do the same amount of work.
const UNKNOWN_ACCOUNT_HASH: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
const UNKNOWN_ACCOUNT_SALT: &str = "unknown-account-salt";

/// Hash a secret under the given salt using Argon2id.
///
/// Fails if the salt is shorter than Argon2's 8 byte minimum.
pub fn hash_secret(secret: &str, salt: &str) -> Result<String, argon2::Error> {
    let mut out = [0u8; HASH_LEN];
    Argon2::default().hash_password_into(secret.as_bytes(), salt.as_bytes(), &mut out)?;
    Ok(URL_SAFE_NO_PAD.encode(out))
}

/// Verify a plain secret against a stored hash and its salt.
///
/// Returns true only if `secret` hashes to `stored_hash` under `salt`.
/// The comparison runs in constant time.
pub fn verify_secret(secret: &str, stored_hash: &str, salt: &str) -> bool {
    let Ok(computed) = hash_secret(secret, salt) else {
        return false;
    };
    computed.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}

/// Spend the same work as [`verify_secret`] for an account that does not exist.
///
/// The placeholder hash is not an Argon2 output, so this never succeeds.
pub fn verify_unknown_account(secret: &str) -> bool {
    verify_secret(secret, UNKNOWN_ACCOUNT_HASH, UNKNOWN_ACCOUNT_SALT)
}

/// Generate a fresh salt for a new credential.
pub fn generate_salt() -> String {
    random_token()
}

/// Generate a URL-safe, unpredictable token from 32 OS-random bytes.
///
/// Used for salts, authorization codes and access tokens.
pub fn random_token() -> String {
    let mut bytes = [0u8; 32];
    // The OS RNG failing leaves no safe way to mint credentials.
    getrandom::fill(&mut bytes).expect("Failed to generate random bytes");
    URL_SAFE_NO_PAD.encode(bytes)
}
