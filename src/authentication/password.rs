use anyhow::Context;
use argon2::password_hash::SaltString;
use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier,
    Version,
};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use secrecy::{ExposeSecret, Secret};
use sha2::{Digest, Sha256};

const ARGON2_PREFIX: &str = "$argon2";
const GENERATED_PASSWORD_LENGTH: usize = 10;

pub fn compute_password_hash(
    password: Secret<String>,
) -> Result<Secret<String>, anyhow::Error> {
    let salt = SaltString::generate(&mut thread_rng());
    let params = Params::new(15000, 2, 1, None)
        .context("Invalid argon2 parameters")?;
    let password_hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .context("Failed to hash password")?
        .to_string();
    Ok(Secret::new(password_hash))
}

/// Whether `expected` holds a PHC string rather than a legacy hash.
pub fn is_argon2_hash(expected: &Secret<String>) -> bool {
    expected.expose_secret().starts_with(ARGON2_PREFIX)
}

#[tracing::instrument(name = "Verify password hash", skip_all)]
pub fn verify_password_hash(
    expected_password_hash: &Secret<String>,
    password_candidate: &Secret<String>,
) -> bool {
    let expected = match PasswordHash::new(expected_password_hash.expose_secret())
    {
        Ok(expected) => expected,
        Err(e) => {
            tracing::warn!(error.message = %e, "Stored password hash is not a PHC string");
            return false;
        }
    };
    Argon2::default()
        .verify_password(password_candidate.expose_secret().as_bytes(), &expected)
        .is_ok()
}

/// Hex SHA-256 of `nick:password`, the format of passwords stored before
/// argon2 was introduced.
pub fn hash_password_intermediate(nick: &str, password: &Secret<String>) -> String {
    hash_generic(&format!("{}:{}", nick, password.expose_secret()))
}

pub fn hash_generic(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

pub fn generate_password() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .take(GENERATED_PASSWORD_LENGTH)
        .collect()
}
