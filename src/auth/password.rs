//! Password hashing with Argon2id.
//!
//! Records are stored as `<hashHex>.<saltHex>`. Both components are lowercase
//! hex, so the `.` separator can never occur inside either of them.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

use crate::config::PasswordConfig;

const SALT_LENGTH_BYTES: usize = 32;
// Argon2 rejects anything shorter.
const MIN_SALT_BYTES: usize = 8;
const HASH_LENGTH_BYTES: usize = 64;
const JOIN_CHARACTER: char = '.';

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Invalid format for hashed password")]
    MalformedRecord,

    #[error("Password derivation failed: {0}")]
    Derivation(String),
}

#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(config: &PasswordConfig) -> Result<Self, PasswordError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            Some(HASH_LENGTH_BYTES),
        )
        .map_err(|e| PasswordError::Derivation(e.to_string()))?;

        Ok(Self { params })
    }

    fn derive(&self, password: &str, salt: &[u8]) -> Result<[u8; HASH_LENGTH_BYTES], PasswordError> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        let mut key = [0u8; HASH_LENGTH_BYTES];
        argon2
            .hash_password_into(password.as_bytes(), salt, &mut key)
            .map_err(|e| PasswordError::Derivation(e.to_string()))?;
        Ok(key)
    }

    /// Hashes `password` under a fresh random salt.
    ///
    /// This is CPU and memory heavy; async callers should run it on the
    /// blocking pool.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let mut salt = [0u8; SALT_LENGTH_BYTES];
        OsRng.fill_bytes(&mut salt);

        let key = self.derive(password, &salt)?;
        Ok(format!("{}{}{}", hex::encode(key), JOIN_CHARACTER, hex::encode(salt)))
    }

    /// Checks `password` against a record produced by [`PasswordHasher::hash`].
    pub fn compare(&self, password: &str, record: &str) -> Result<bool, PasswordError> {
        let (stored_hash, salt) = split_record(record)?;
        let derived = self.derive(password, &salt)?;
        Ok(constant_time_eq(&stored_hash, &derived))
    }
}

fn split_record(record: &str) -> Result<(Vec<u8>, Vec<u8>), PasswordError> {
    let mut parts = record.split(JOIN_CHARACTER);
    let (hash_hex, salt_hex) = match (parts.next(), parts.next(), parts.next()) {
        (Some(hash), Some(salt), None) if !hash.is_empty() && !salt.is_empty() => (hash, salt),
        _ => return Err(PasswordError::MalformedRecord),
    };

    let hash = hex::decode(hash_hex).map_err(|_| PasswordError::MalformedRecord)?;
    let salt = hex::decode(salt_hex).map_err(|_| PasswordError::MalformedRecord)?;
    if salt.len() < MIN_SALT_BYTES {
        return Err(PasswordError::MalformedRecord);
    }
    Ok((hash, salt))
}

/// Runs in time dependent only on the input lengths, never on where the
/// first differing byte is.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    std::hint::black_box(diff) == 0
}
