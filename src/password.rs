use argon2::{
    Argon2,
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand_core::OsRng;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hashing(String),
    /// The stored digest could not be parsed. Distinct from a mismatch.
    #[error("stored password digest is malformed")]
    MalformedDigest,
}

/// PasswordDigest
///
/// A salted Argon2id digest in PHC string form (`$argon2id$v=19$...`). The salt
/// travels inside the string, so nothing else needs to be stored.
///
/// Deliberately neither `Serialize` nor `Display`: the digest stays inside the
/// account manager and the storage adapters.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Wraps a digest read back from storage.
    pub fn from_stored(phc: String) -> Self {
        Self(phc)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordDigest(<redacted>)")
    }
}

/// Hash a plaintext password with Argon2id and a fresh random salt.
pub fn hash_password(plaintext: &str) -> Result<PasswordDigest, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| PasswordDigest(hash.to_string()))
        .map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Check a plaintext password against a stored digest.
///
/// A mismatch is `Ok(false)`; only an unparsable digest is an error.
pub fn verify_password(plaintext: &str, digest: &PasswordDigest) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(digest.as_str()).map_err(|_| PasswordError::MalformedDigest)?;

    match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Hashing(e.to_string())),
    }
}
